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
    fn hard_error_count,
    input = [
        "FOO\r\n",
        "BAR\r\n",
        "BAZ\r\n",
        "NOOP\r\n",
    ],
    expected = [
        "220 testserver.com Service ready\r\n",
        "500 Syntax error command unrecognized\r\n",
        "500 Syntax error command unrecognized\r\n",
        "451-Syntax error command unrecognized\r\n",
        "451 Too many errors from the client\r\n",
    ],
    config = {
        let mut config = crate::config::local_test();
        config.server.smtp.error.soft_count = -1;
        config.server.smtp.error.hard_count = 3;
        config
    },
}

#[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 2))]
async fn soft_error_delay() {
    let start = tokio::time::Instant::now();
    run_test! {
        input = [
            "FOO\r\n",
            "BAR\r\n",
            "QUIT\r\n",
        ],
        expected = [
            "220 testserver.com Service ready\r\n",
            "500 Syntax error command unrecognized\r\n",
            "500 Syntax error command unrecognized\r\n",
            "221 Service closing transmission channel\r\n",
        ],
        config = {
            let mut config = crate::config::local_test();
            config.server.smtp.error.soft_count = 1;
            config.server.smtp.error.hard_count = -1;
            config.server.smtp.error.delay = std::time::Duration::from_millis(100);
            config
        }
    };
    assert!(start.elapsed() >= std::time::Duration::from_millis(200));
}

#[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 2))]
async fn idle_timeout() {
    let config = {
        let mut config = crate::config::local_test();
        config.server.smtp.timeout_client.idle = std::time::Duration::from_millis(100);
        config
    };
    let store = std::sync::Arc::new(vcatch_server::store::InMemoryStore::new(10));
    let context =
        std::sync::Arc::new(vcatch_server::ServerContext::new(config, store, None).unwrap());

    let (client, server) = tokio::io::duplex(1024);
    let connection = vcatch_server::Connection::new(
        context,
        server,
        "127.0.0.1:53844".parse().unwrap(),
        "127.0.0.1:25".parse().unwrap(),
        vcatch_protocol::ConnectionKind::Opportunistic,
    );

    let (result, output) = tokio::join!(connection.run(), async move {
        let mut client = client;
        let mut output = String::new();
        tokio::io::AsyncReadExt::read_to_string(&mut client, &mut output)
            .await
            .unwrap();
        output
    });

    assert!(matches!(result, Err(vcatch_protocol::Error::Timeout(_))));
    pretty_assertions::assert_eq!(
        output,
        concat!(
            "220 testserver.com Service ready\r\n",
            "421 testserver.com Timeout - closing connection\r\n",
        )
    );
}

#[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 2))]
async fn session_timeout() {
    let config = {
        let mut config = crate::config::local_test();
        config.server.smtp.timeout_client.session = Some(std::time::Duration::from_millis(200));
        config
    };
    let store = std::sync::Arc::new(vcatch_server::store::InMemoryStore::new(10));
    let context =
        std::sync::Arc::new(vcatch_server::ServerContext::new(config, store, None).unwrap());

    let (client, server) = tokio::io::duplex(1024);
    let connection = vcatch_server::Connection::new(
        context,
        server,
        "127.0.0.1:53844".parse().unwrap(),
        "127.0.0.1:25".parse().unwrap(),
        vcatch_protocol::ConnectionKind::Opportunistic,
    );

    let (result, output) = tokio::join!(connection.run(), async move {
        let (mut read, mut write) = tokio::io::split(client);
        let writer = async move {
            for _ in 0..10 {
                if tokio::io::AsyncWriteExt::write_all(&mut write, b"NOOP\r\n")
                    .await
                    .is_err()
                {
                    break;
                }
                tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            }
        };
        let reader = async move {
            let mut output = String::new();
            tokio::io::AsyncReadExt::read_to_string(&mut read, &mut output)
                .await
                .unwrap();
            output
        };
        tokio::join!(writer, reader).1
    });

    assert!(matches!(result, Err(vcatch_protocol::Error::Timeout(_))));
    assert!(output.starts_with("220 testserver.com Service ready\r\n250 Ok\r\n"));
    assert!(output.ends_with("421 testserver.com Timeout - closing connection\r\n"));
}
