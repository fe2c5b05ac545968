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
use vcatch_common::store::MessageStore;

async fn single_body(outcome: &crate::receiver::TestOutcome) -> String {
    let page = outcome
        .store
        .list_paged(&Default::default(), Default::default(), 1, 10)
        .await
        .unwrap();
    assert_eq!(page.total, 1);

    let stored = outcome.store.get(&page.items[0].id).await.unwrap();
    String::from_utf8(stored.message.body().to_vec()).unwrap()
}

#[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 2))]
async fn dot_stuffing() {
    let outcome = run_test! {
        input = [
            "HELO client.com\r\n",
            "MAIL FROM:<john@doe.com>\r\n",
            "RCPT TO:<jane@doe.com>\r\n",
            "DATA\r\n",
            "Subject: dots\r\n",
            "\r\n",
            "..\r\n",
            "..hidden\r\n",
            "end.\r\n",
            ".\r\n",
            "QUIT\r\n",
        ],
        expected = [
            "220 testserver.com Service ready\r\n",
            "250 Ok\r\n",
            "250 Ok\r\n",
            "250 Ok\r\n",
            "354 Start mail input; end with <CRLF>.<CRLF>\r\n",
            "250 Ok\r\n",
            "221 Service closing transmission channel\r\n",
        ]
    };

    pretty_assertions::assert_eq!(
        single_body(&outcome).await,
        "Subject: dots\r\n\r\n.\r\n.hidden\r\nend.\r\n"
    );
}

#[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 2))]
async fn two_transactions() {
    let outcome = run_test! {
        input = [
            "HELO client.com\r\n",
            "MAIL FROM:<john@doe.com>\r\n",
            "RCPT TO:<jane@doe.com>\r\n",
            "DATA\r\n",
            "Subject: first\r\n",
            ".\r\n",
            "MAIL FROM:<jane@doe.com>\r\n",
            "RCPT TO:<john@doe.com>\r\n",
            "DATA\r\n",
            "Subject: second\r\n",
            ".\r\n",
            "QUIT\r\n",
        ],
        expected = [
            "220 testserver.com Service ready\r\n",
            "250 Ok\r\n",
            "250 Ok\r\n",
            "250 Ok\r\n",
            "354 Start mail input; end with <CRLF>.<CRLF>\r\n",
            "250 Ok\r\n",
            "250 Ok\r\n",
            "250 Ok\r\n",
            "354 Start mail input; end with <CRLF>.<CRLF>\r\n",
            "250 Ok\r\n",
            "221 Service closing transmission channel\r\n",
        ]
    };

    let page = outcome
        .store
        .list_paged(&Default::default(), Default::default(), 1, 10)
        .await
        .unwrap();
    assert_eq!(
        page.items
            .iter()
            .map(|i| i.subject.clone().unwrap())
            .collect::<Vec<_>>(),
        vec!["first", "second"]
    );
}

#[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 2))]
async fn size_exceeded() {
    let outcome = run_test! {
        input = [
            "HELO client.com\r\n",
            "MAIL FROM:<john@doe.com>\r\n",
            "RCPT TO:<jane@doe.com>\r\n",
            "DATA\r\n",
            &format!("{}\r\n", "x".repeat(50)),
            &format!("{}\r\n", "x".repeat(50)),
            ".\r\n",
            "MAIL FROM:<john@doe.com>\r\n",
            "RCPT TO:<jane@doe.com>\r\n",
            "DATA\r\n",
            "small\r\n",
            ".\r\n",
            "QUIT\r\n",
        ],
        expected = [
            "220 testserver.com Service ready\r\n",
            "250 Ok\r\n",
            "250 Ok\r\n",
            "250 Ok\r\n",
            "354 Start mail input; end with <CRLF>.<CRLF>\r\n",
            "552 4.3.1 Message size exceeds fixed maximum message size\r\n",
            "250 Ok\r\n",
            "250 Ok\r\n",
            "354 Start mail input; end with <CRLF>.<CRLF>\r\n",
            "250 Ok\r\n",
            "221 Service closing transmission channel\r\n",
        ],
        config = {
            let mut config = crate::config::local_test();
            config.server.message_size_limit = 64;
            config
        }
    };

    assert_eq!(single_body(&outcome).await, "small\r\n");
}

run_test! {
    fn size_exceeded_closes,
    input = [
        "HELO client.com\r\n",
        "MAIL FROM:<john@doe.com>\r\n",
        "RCPT TO:<jane@doe.com>\r\n",
        "DATA\r\n",
        &format!("{}\r\n", "x".repeat(100)),
        ".\r\n",
        "NOOP\r\n",
    ],
    expected = [
        "220 testserver.com Service ready\r\n",
        "250 Ok\r\n",
        "250 Ok\r\n",
        "250 Ok\r\n",
        "354 Start mail input; end with <CRLF>.<CRLF>\r\n",
        "552 4.3.1 Message size exceeds fixed maximum message size\r\n",
    ],
    config = {
        let mut config = crate::config::local_test();
        config.server.message_size_limit = 64;
        config.server.smtp.close_on_size_exceeded = true;
        config
    },
}

#[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 2))]
async fn text_line_too_long() {
    let outcome = run_test! {
        input = [
            "HELO client.com\r\n",
            "MAIL FROM:<john@doe.com>\r\n",
            "RCPT TO:<jane@doe.com>\r\n",
            "DATA\r\n",
            &format!("{}\r\n", "x".repeat(1000)),
            "after\r\n",
            ".\r\n",
            "NOOP\r\n",
            "QUIT\r\n",
        ],
        expected = [
            "220 testserver.com Service ready\r\n",
            "250 Ok\r\n",
            "250 Ok\r\n",
            "250 Ok\r\n",
            "354 Start mail input; end with <CRLF>.<CRLF>\r\n",
            "500 Line too long\r\n",
            "250 Ok\r\n",
            "221 Service closing transmission channel\r\n",
        ]
    };

    let page = outcome
        .store
        .list_paged(&Default::default(), Default::default(), 1, 10)
        .await
        .unwrap();
    assert_eq!(page.total, 0);
}

run_test! {
    fn data_with_argument,
    input = [
        "HELO client.com\r\n",
        "MAIL FROM:<john@doe.com>\r\n",
        "RCPT TO:<jane@doe.com>\r\n",
        "DATA now\r\n",
        "QUIT\r\n",
    ],
    expected = [
        "220 testserver.com Service ready\r\n",
        "250 Ok\r\n",
        "250 Ok\r\n",
        "250 Ok\r\n",
        "501 Syntax error in parameters or arguments\r\n",
        "221 Service closing transmission channel\r\n",
    ],
}

#[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 2))]
async fn store_retention() {
    let outcome = run_test! {
        input = [
            "HELO client.com\r\n",
            "MAIL FROM:<john@doe.com>\r\n",
            "RCPT TO:<jane@doe.com>\r\n",
            "DATA\r\n",
            "Subject: first\r\n",
            ".\r\n",
            "MAIL FROM:<john@doe.com>\r\n",
            "RCPT TO:<jane@doe.com>\r\n",
            "DATA\r\n",
            "Subject: second\r\n",
            ".\r\n",
            "QUIT\r\n",
        ],
        expected = [
            "220 testserver.com Service ready\r\n",
            "250 Ok\r\n",
            "250 Ok\r\n",
            "250 Ok\r\n",
            "354 Start mail input; end with <CRLF>.<CRLF>\r\n",
            "250 Ok\r\n",
            "250 Ok\r\n",
            "250 Ok\r\n",
            "354 Start mail input; end with <CRLF>.<CRLF>\r\n",
            "250 Ok\r\n",
            "221 Service closing transmission channel\r\n",
        ],
        config = {
            let mut config = crate::config::local_test();
            config.server.store.message_count_max = 1;
            config
        }
    };

    let page = outcome
        .store
        .list_paged(&Default::default(), Default::default(), 1, 10)
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].subject.as_deref(), Some("second"));
}
