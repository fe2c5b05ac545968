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
use vcatch_common::{addr, store::MessageStore};

run_test! {
    fn rcpt_count_max,
    input = [
        "HELO client.com\r\n",
        "MAIL FROM:<john@doe.com>\r\n",
        "RCPT TO:<aa@doe.com>\r\n",
        "RCPT TO:<bb@doe.com>\r\n",
        "RCPT TO:<cc@doe.com>\r\n",
        "QUIT\r\n",
    ],
    expected = [
        "220 testserver.com Service ready\r\n",
        "250 Ok\r\n",
        "250 Ok\r\n",
        "250 Ok\r\n",
        "250 Ok\r\n",
        "452 Requested action not taken: too many recipients\r\n",
        "221 Service closing transmission channel\r\n",
    ],
    config = {
        let mut config = crate::config::local_test();
        config.server.smtp.rcpt_count_max = 2;
        config
    },
}

run_test! {
    fn rcpt_invalid,
    input = [
        "HELO client.com\r\n",
        "MAIL FROM:<john@doe.com>\r\n",
        "RCPT TO:<>\r\n",
        "RCPT TO:jane@doe.com\r\n",
        "RCPT FROM:<jane@doe.com>\r\n",
        "RCPT TO:<jane@doe.com> NOTIFY=NEVER\r\n",
        "DATA\r\n",
        "QUIT\r\n",
    ],
    expected = [
        "220 testserver.com Service ready\r\n",
        "250 Ok\r\n",
        "250 Ok\r\n",
        "501 Syntax error in parameters or arguments\r\n",
        "501 Syntax error in parameters or arguments\r\n",
        "501 Syntax error in parameters or arguments\r\n",
        "504 Command parameter not implemented\r\n",
        "503 Bad sequence of commands\r\n",
        "221 Service closing transmission channel\r\n",
    ],
}

#[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 2))]
async fn rejected_recipients() {
    let outcome = run_test! {
        input = [
            "HELO client.com\r\n",
            "MAIL FROM:<john@doe.com>\r\n",
            "RCPT TO:<jane@spam.com>\r\n",
            "RCPT TO:<Admin@Doe.com>\r\n",
            "RCPT TO:<jane@doe.com>\r\n",
            "DATA\r\n",
            ".\r\n",
            "QUIT\r\n",
        ],
        expected = [
            "220 testserver.com Service ready\r\n",
            "250 Ok\r\n",
            "250 Ok\r\n",
            "550 Mailbox unavailable\r\n",
            "550 Mailbox unavailable\r\n",
            "250 Ok\r\n",
            "354 Start mail input; end with <CRLF>.<CRLF>\r\n",
            "250 Ok\r\n",
            "221 Service closing transmission channel\r\n",
        ],
        config = {
            let mut config = crate::config::local_test();
            config.server.smtp.rejected_recipients =
                vec!["@spam.com".parse().unwrap(), "admin@doe.com".parse().unwrap()];
            config
        }
    };

    let page = outcome
        .store
        .list_paged(&Default::default(), Default::default(), 1, 10)
        .await
        .unwrap();
    let stored = outcome.store.get(&page.items[0].id).await.unwrap();
    assert_eq!(stored.message.recipients(), &[addr!("jane@doe.com")]);
}

#[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 2))]
async fn recipients_in_order() {
    let outcome = run_test! {
        input = [
            "HELO client.com\r\n",
            "MAIL FROM:<john@doe.com>\r\n",
            "RCPT TO:<bb@doe.com>\r\n",
            "RCPT TO:<aa@doe.com>\r\n",
            "RCPT TO:<bb@doe.com>\r\n",
            "DATA\r\n",
            ".\r\n",
            "QUIT\r\n",
        ],
        expected = [
            "220 testserver.com Service ready\r\n",
            "250 Ok\r\n",
            "250 Ok\r\n",
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
        page.items[0].recipients,
        vec!["bb@doe.com", "aa@doe.com", "bb@doe.com"]
    );
}

#[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 2))]
async fn too_many_recipients_aborts_transaction() {
    let outcome = run_test! {
        input = [
            "HELO client.com\r\n",
            "MAIL FROM:<john@doe.com>\r\n",
            "RCPT TO:<aa@doe.com>\r\n",
            "RCPT TO:<bb@doe.com>\r\n",
            "DATA\r\n",
            ".\r\n",
            "QUIT\r\n",
        ],
        expected = [
            "220 testserver.com Service ready\r\n",
            "250 Ok\r\n",
            "250 Ok\r\n",
            "250 Ok\r\n",
            "452 Requested action not taken: too many recipients\r\n",
            "503 Bad sequence of commands\r\n",
            "500 Syntax error command unrecognized\r\n",
            "221 Service closing transmission channel\r\n",
        ],
        config = {
            let mut config = crate::config::local_test();
            config.server.smtp.rcpt_count_max = 1;
            config
        }
    };

    let page = outcome
        .store
        .list_paged(&Default::default(), Default::default(), 1, 10)
        .await
        .unwrap();
    assert_eq!(page.total, 0);
}
