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
use tokio::io::{AsyncBufReadExt, AsyncWriteExt};
use vcatch_common::store::MessageStore;
extern crate alloc;

const EHLO_REPLY: [&str; 7] = [
    "250-testserver.com\r\n",
    "250-SIZE 10000000\r\n",
    "250-STARTTLS\r\n",
    "250-8BITMIME\r\n",
    "250-PIPELINING\r\n",
    "250-SMTPUTF8\r\n",
    "250 AUTH PLAIN LOGIN CRAM-MD5 ANONYMOUS\r\n",
];

const EHLO_REPLY_SECURED: [&str; 6] = [
    "250-testserver.com\r\n",
    "250-SIZE 10000000\r\n",
    "250-8BITMIME\r\n",
    "250-PIPELINING\r\n",
    "250-SMTPUTF8\r\n",
    "250 AUTH PLAIN LOGIN CRAM-MD5 ANONYMOUS\r\n",
];

fn secure_connection_required() -> vcatch_config::Config {
    let mut config = crate::config::with_tls();
    if let Some(tls) = config.server.tls.as_mut() {
        tls.secure_connection_required = true;
    }
    config
}

#[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 2))]
async fn simple() {
    let outcome = crate::receiver::test_receiver_inner(
        crate::config::with_tls(),
        vec!["EHLO client.com\r\n".to_string(), "STARTTLS\r\n".to_string()],
        std::iter::once("220 testserver.com Service ready\r\n")
            .chain(EHLO_REPLY)
            .chain(["220 TLS go ahead\r\n"])
            .chain(EHLO_REPLY_SECURED)
            .chain([
                "250 Ok\r\n",
                "250 Ok\r\n",
                "354 Start mail input; end with <CRLF>.<CRLF>\r\n",
                "250 Ok\r\n",
                "221 Service closing transmission channel\r\n",
            ])
            .map(str::to_string)
            .collect(),
        Some(
            [
                "EHLO client.com\r\n",
                "MAIL FROM:<john@doe.com>\r\n",
                "RCPT TO:<jane@doe.com>\r\n",
                "DATA\r\n",
                "Subject: secured\r\n",
                ".\r\n",
                "QUIT\r\n",
            ]
            .into_iter()
            .map(str::to_string)
            .collect(),
        ),
        false,
    )
    .await;
    outcome.result.unwrap();

    let page = outcome
        .store
        .list_paged(&Default::default(), Default::default(), 1, 10)
        .await
        .unwrap();
    let stored = outcome.store.get(&page.items[0].id).await.unwrap();
    assert!(stored.message.is_secured());
}

run_test! {
    fn session_reset_after_handshake,
    input = [
        "EHLO client.com\r\n",
        "STARTTLS\r\n",
    ],
    expected = [
        "220 testserver.com Service ready\r\n",
        "250-testserver.com\r\n",
        "250-SIZE 10000000\r\n",
        "250-STARTTLS\r\n",
        "250-8BITMIME\r\n",
        "250-PIPELINING\r\n",
        "250-SMTPUTF8\r\n",
        "250 AUTH PLAIN LOGIN CRAM-MD5 ANONYMOUS\r\n",
        "220 TLS go ahead\r\n",
        "503 Bad sequence of commands\r\n",
        "503 Bad sequence of commands\r\n",
        "221 Service closing transmission channel\r\n",
    ],
    starttls = [
        "MAIL FROM:<john@doe.com>\r\n",
        "STARTTLS\r\n",
        "QUIT\r\n",
    ],
    config = crate::config::with_tls(),
}

run_test! {
    fn pipelined,
    input = [
        "EHLO client.com\r\n",
        "STARTTLS\r\n",
        "NOOP\r\n",
        "QUIT\r\n",
    ],
    expected = [
        "220 testserver.com Service ready\r\n",
        "250-testserver.com\r\n",
        "250-SIZE 10000000\r\n",
        "250-STARTTLS\r\n",
        "250-8BITMIME\r\n",
        "250-PIPELINING\r\n",
        "250-SMTPUTF8\r\n",
        "250 AUTH PLAIN LOGIN CRAM-MD5 ANONYMOUS\r\n",
        "501 5.5.2 Pipelining after STARTTLS is not allowed\r\n",
        "250 Ok\r\n",
        "221 Service closing transmission channel\r\n",
    ],
    config = crate::config::with_tls(),
}

run_test! {
    fn with_argument,
    input = [
        "STARTTLS now\r\n",
        "QUIT\r\n",
    ],
    expected = [
        "220 testserver.com Service ready\r\n",
        "501 Syntax error in parameters or arguments\r\n",
        "221 Service closing transmission channel\r\n",
    ],
    config = crate::config::with_tls(),
}

run_test! {
    fn not_advertised_without_tls,
    input = [
        "STARTTLS\r\n",
        "QUIT\r\n",
    ],
    expected = [
        "220 testserver.com Service ready\r\n",
        "500 Syntax error command unrecognized\r\n",
        "221 Service closing transmission channel\r\n",
    ],
}

run_test! {
    fn required,
    input = [
        "EHLO client.com\r\n",
        "MAIL FROM:<john@doe.com>\r\n",
        "AUTH PLAIN AGhlbGxvAHdvcmxk\r\n",
        "STARTTLS\r\n",
    ],
    expected = [
        "220 testserver.com Service ready\r\n",
        "250-testserver.com\r\n",
        "250-SIZE 10000000\r\n",
        "250-STARTTLS\r\n",
        "250-8BITMIME\r\n",
        "250-PIPELINING\r\n",
        "250-SMTPUTF8\r\n",
        "250 AUTH PLAIN LOGIN CRAM-MD5 ANONYMOUS\r\n",
        "530 Must issue a STARTTLS command first\r\n",
        "530 Must issue a STARTTLS command first\r\n",
        "220 TLS go ahead\r\n",
        "250-testserver.com\r\n",
        "250-SIZE 10000000\r\n",
        "250-8BITMIME\r\n",
        "250-PIPELINING\r\n",
        "250-SMTPUTF8\r\n",
        "250 AUTH PLAIN LOGIN CRAM-MD5 ANONYMOUS\r\n",
        "235 2.7.0 Authentication succeeded\r\n",
        "250 Ok\r\n",
        "221 Service closing transmission channel\r\n",
    ],
    starttls = [
        "EHLO client.com\r\n",
        "AUTH PLAIN AGhlbGxvAHdvcmxk\r\n",
        "MAIL FROM:<john@doe.com>\r\n",
        "QUIT\r\n",
    ],
    config = secure_connection_required(),
}

#[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 2))]
async fn handshake_timeout() {
    let store = alloc::sync::Arc::new(vcatch_server::store::InMemoryStore::new(10));
    let context = alloc::sync::Arc::new(
        vcatch_server::ServerContext::new(crate::config::with_tls(), store, None).unwrap(),
    );

    let (client, server) = tokio::io::duplex(1024);
    let connection = vcatch_server::Connection::new(
        context,
        server,
        "127.0.0.1:53844".parse().unwrap(),
        "127.0.0.1:25".parse().unwrap(),
        vcatch_protocol::ConnectionKind::Opportunistic,
    );
    let handle = tokio::spawn(connection.run());

    let mut client = tokio::io::BufReader::new(client);
    let mut line = String::new();
    client.read_line(&mut line).await.unwrap();
    assert_eq!(line, "220 testserver.com Service ready\r\n");

    client.write_all(b"STARTTLS\r\n").await.unwrap();
    line.clear();
    client.read_line(&mut line).await.unwrap();
    assert_eq!(line, "220 TLS go ahead\r\n");

    // the client never starts the handshake
    assert!(handle.await.unwrap().is_err());
}
