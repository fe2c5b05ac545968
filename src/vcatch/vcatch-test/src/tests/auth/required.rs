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
use vcatch_common::auth::Mechanism;

run_test! {
    fn mail_refused_until_authenticated,
    input = [
        "MAIL FROM:<john@doe.com>\r\n",
        "EHLO client.com\r\n",
        "MAIL FROM:<john@doe.com>\r\n",
        "AUTH PLAIN AGhlbGxvAHdvcmxk\r\n",
        "MAIL FROM:<john@doe.com>\r\n",
        "QUIT\r\n",
    ],
    expected = [
        "220 testserver.com Service ready\r\n",
        "503 Bad sequence of commands\r\n",
        "250-testserver.com\r\n",
        "250 AUTH PLAIN LOGIN\r\n",
        "530 5.7.0 Authentication required\r\n",
        "235 2.7.0 Authentication succeeded\r\n",
        "250 Ok\r\n",
        "221 Service closing transmission channel\r\n",
    ],
    config = crate::config::with_auth([Mechanism::Plain, Mechanism::Login]),
}

run_test! {
    fn clair_mechanism_refused,
    input = [
        "EHLO client.com\r\n",
        "AUTH PLAIN AGhlbGxvAHdvcmxk\r\n",
        "AUTH LOGIN\r\n",
        "AUTH ANONYMOUS dG9rZW4=\r\n",
        "MAIL FROM:<john@doe.com>\r\n",
        "QUIT\r\n",
    ],
    expected = [
        "220 testserver.com Service ready\r\n",
        "250-testserver.com\r\n",
        "250 AUTH ANONYMOUS\r\n",
        "538 5.7.11 Encryption required for requested authentication mechanism\r\n",
        "504 5.5.4 Mechanism is not supported\r\n",
        "235 2.7.0 Authentication succeeded\r\n",
        "250 Ok\r\n",
        "221 Service closing transmission channel\r\n",
    ],
    config = {
        let mut config = crate::config::with_auth([Mechanism::Plain, Mechanism::Anonymous]);
        config.server.smtp.auth.enable_dangerous_mechanism_in_clair = false;
        config
    },
}

run_test! {
    fn no_mechanism_advertised,
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
        let mut config = crate::config::with_auth([Mechanism::Login]);
        config.server.smtp.auth.enable_dangerous_mechanism_in_clair = false;
        config
    },
}
