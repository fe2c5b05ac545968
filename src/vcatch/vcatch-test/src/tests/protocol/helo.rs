/*
 * vSMTP mail transfer agent
 * Copyright (C) 2022 viridIT SAS
 *
 * This program is free software: you can redistribute it and/or modify it under
 * the terms of the GNU General Public License as published by the Free Software
 * Foundation, either version 3 of the License, or any later version.
 *
 * This program is distributed in the hope that it will be useful, but WITHOUT
 * ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
 * FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License along with
 * this program. If not, see https://www.gnu.org/licenses/.
 *
*/

use crate::run_test;

run_test! {
    fn helo,
    input = [
        "HELO client.com\r\n",
        "QUIT\r\n",
    ],
    expected = [
        "220 testserver.com Service ready\r\n",
        "250 Ok\r\n",
        "221 Service closing transmission channel\r\n",
    ],
}

run_test! {
    fn ehlo_capabilities,
    input = [
        "EHLO client.com\r\n",
        "QUIT\r\n",
    ],
    expected = [
        "220 testserver.com Service ready\r\n",
        "250-testserver.com\r\n",
        "250-SIZE 10000000\r\n",
        "250-8BITMIME\r\n",
        "250-PIPELINING\r\n",
        "250-SMTPUTF8\r\n",
        "250 AUTH PLAIN LOGIN CRAM-MD5 ANONYMOUS\r\n",
        "221 Service closing transmission channel\r\n",
    ],
}

run_test! {
    fn ehlo_without_extension,
    input = [
        "EHLO client.com\r\n",
        "QUIT\r\n",
    ],
    expected = [
        "220 testserver.com Service ready\r\n",
        "250 testserver.com\r\n",
        "221 Service closing transmission channel\r\n",
    ],
    config = {
        let mut config = crate::config::local_test();
        config.server.extensions.clear();
        config
    },
}

run_test! {
    fn helo_address_literal,
    input = [
        "HELO [127.0.0.1]\r\n",
        "EHLO [IPv6:::1]\r\n",
        "HELO [127.0.0.1.1]\r\n",
        "QUIT\r\n",
    ],
    expected = [
        "220 testserver.com Service ready\r\n",
        "250 Ok\r\n",
        "250-testserver.com\r\n",
        "250-SIZE 10000000\r\n",
        "250-8BITMIME\r\n",
        "250-PIPELINING\r\n",
        "250-SMTPUTF8\r\n",
        "250 AUTH PLAIN LOGIN CRAM-MD5 ANONYMOUS\r\n",
        "501 Syntax error in parameters or arguments\r\n",
        "221 Service closing transmission channel\r\n",
    ],
}

run_test! {
    fn helo_invalid,
    input = [
        "HELO\r\n",
        "HELO two words\r\n",
        "HELO not_a_domain!\r\n",
        "QUIT\r\n",
    ],
    expected = [
        "220 testserver.com Service ready\r\n",
        "501 Syntax error in parameters or arguments\r\n",
        "501 Syntax error in parameters or arguments\r\n",
        "501 Syntax error in parameters or arguments\r\n",
        "221 Service closing transmission channel\r\n",
    ],
}

run_test! {
    fn mail_before_helo,
    input = [
        "MAIL FROM:<john@doe.com>\r\n",
        "RCPT TO:<jane@doe.com>\r\n",
        "DATA\r\n",
        "QUIT\r\n",
    ],
    expected = [
        "220 testserver.com Service ready\r\n",
        "503 Bad sequence of commands\r\n",
        "503 Bad sequence of commands\r\n",
        "503 Bad sequence of commands\r\n",
        "221 Service closing transmission channel\r\n",
    ],
}

run_test! {
    fn unrecognized_command,
    input = [
        "FOO bar\r\n",
        "STARTTLS\r\n",
        "\r\n",
        "QUIT\r\n",
    ],
    expected = [
        "220 testserver.com Service ready\r\n",
        "500 Syntax error command unrecognized\r\n",
        "500 Syntax error command unrecognized\r\n",
        "500 Syntax error command unrecognized\r\n",
        "221 Service closing transmission channel\r\n",
    ],
}

run_test! {
    fn command_case_insensitive,
    input = [
        "ehlo client.com\r\n",
        "mail from:<john@doe.com>\r\n",
        "Rcpt To:<jane@doe.com>\r\n",
        "quit\r\n",
    ],
    expected = [
        "220 testserver.com Service ready\r\n",
        "250-testserver.com\r\n",
        "250-SIZE 10000000\r\n",
        "250-8BITMIME\r\n",
        "250-PIPELINING\r\n",
        "250-SMTPUTF8\r\n",
        "250 AUTH PLAIN LOGIN CRAM-MD5 ANONYMOUS\r\n",
        "250 Ok\r\n",
        "250 Ok\r\n",
        "221 Service closing transmission channel\r\n",
    ],
}

run_test! {
    fn command_line_too_long,
    input = [
        &format!("HELO {}\r\n", "a".repeat(600)),
        "NOOP\r\n",
        "QUIT\r\n",
    ],
    expected = [
        "220 testserver.com Service ready\r\n",
        "500 Line too long\r\n",
        "250 Ok\r\n",
        "221 Service closing transmission channel\r\n",
    ],
}

run_test! {
    fn help,
    input = [
        "HELP\r\n",
        "HELP MAIL\r\n",
        "QUIT\r\n",
    ],
    expected = [
        "220 testserver.com Service ready\r\n",
        "214 Commands: HELO EHLO MAIL RCPT DATA RSET NOOP QUIT VRFY HELP AUTH\r\n",
        "214 Commands: HELO EHLO MAIL RCPT DATA RSET NOOP QUIT VRFY HELP AUTH\r\n",
        "221 Service closing transmission channel\r\n",
    ],
}

run_test! {
    fn help_with_starttls,
    input = [
        "HELP\r\n",
        "QUIT\r\n",
    ],
    expected = [
        "220 testserver.com Service ready\r\n",
        "214 Commands: HELO EHLO MAIL RCPT DATA RSET NOOP QUIT VRFY HELP STARTTLS AUTH\r\n",
        "221 Service closing transmission channel\r\n",
    ],
    config = crate::config::with_tls(),
}

run_test! {
    fn unimplemented,
    input = [
        "EXPN staff\r\n",
        "TURN\r\n",
        "QUIT\r\n",
    ],
    expected = [
        "220 testserver.com Service ready\r\n",
        "502 Command not implemented\r\n",
        "502 Command not implemented\r\n",
        "221 Service closing transmission channel\r\n",
    ],
}

run_test! {
    fn custom_codes,
    input = [
        "HELO client.com\r\n",
        "QUIT\r\n",
    ],
    expected = [
        "220-testserver.com ESMTP catcher\r\n",
        "220 no UCE\r\n",
        "250 Hello\r\n",
        "221 Bye\r\n",
    ],
    config = {
        let mut config = crate::config::local_test();
        for (code, reply) in [
            (vcatch_common::CodeID::Greetings, "220 {domain} ESMTP catcher\r\n220 no UCE"),
            (vcatch_common::CodeID::Helo, "250 Hello"),
            (vcatch_common::CodeID::Closing, "221 Bye"),
        ] {
            config.server.smtp.codes.insert(code, reply.parse().unwrap());
        }
        vcatch_config::Config::ensure(config).unwrap()
    },
}

run_test! {
    fn replies_overridden,
    input = [
        "MAIL FROM:<john@doe.com>\r\n",
        "HELO client.com\r\n",
        "QUIT\r\n",
    ],
    expected = [
        "220 testserver.com catcher ready\r\n",
        "503 5.5.1 greet first\r\n",
        "250 Ok\r\n",
        "221-see you\r\n",
        "221 testserver.com\r\n",
    ],
    config = vcatch_config::Config::from_toml(
        r#"
[server]
domain = "testserver.com"

[server.smtp]
codes.Greetings = { code = 220, text = "{domain} catcher ready" }
codes.BadSequence = { code = 503, enhanced = "5.5.1", text = "greet first" }
codes.Closing = "221-see you\r\n221 {domain}\r\n"
"#,
    )
    .unwrap(),
}
