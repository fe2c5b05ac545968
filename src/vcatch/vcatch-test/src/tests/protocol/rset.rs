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

#[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 2))]
async fn reset_transaction() {
    let outcome = run_test! {
        input = [
            "HELO client.com\r\n",
            "MAIL FROM:<john@doe.com>\r\n",
            "RCPT TO:<jane@doe.com>\r\n",
            "RSET\r\n",
            "DATA\r\n",
            "MAIL FROM:<jane@doe.com>\r\n",
            "RCPT TO:<john@doe.com>\r\n",
            "DATA\r\n",
            "Subject: after reset\r\n",
            ".\r\n",
            "QUIT\r\n",
        ],
        expected = [
            "220 testserver.com Service ready\r\n",
            "250 Ok\r\n",
            "250 Ok\r\n",
            "250 Ok\r\n",
            "250 Ok\r\n",
            "503 Bad sequence of commands\r\n",
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
    assert_eq!(page.total, 1);

    let stored = outcome.store.get(&page.items[0].id).await.unwrap();
    assert_eq!(stored.message.sender(), Some(&addr!("jane@doe.com")));
    assert_eq!(stored.message.recipients(), &[addr!("john@doe.com")]);
    assert_eq!(stored.message.client_domain(), Some("client.com"));
}

run_test! {
    fn reset_before_helo,
    input = [
        "RSET\r\n",
        "MAIL FROM:<john@doe.com>\r\n",
        "QUIT\r\n",
    ],
    expected = [
        "220 testserver.com Service ready\r\n",
        "250 Ok\r\n",
        "503 Bad sequence of commands\r\n",
        "221 Service closing transmission channel\r\n",
    ],
}

run_test! {
    fn reset_with_argument,
    input = [
        "HELO client.com\r\n",
        "RSET now\r\n",
        "QUIT\r\n",
    ],
    expected = [
        "220 testserver.com Service ready\r\n",
        "250 Ok\r\n",
        "501 Syntax error in parameters or arguments\r\n",
        "221 Service closing transmission channel\r\n",
    ],
}

run_test! {
    fn helo_resets_transaction,
    input = [
        "HELO client.com\r\n",
        "MAIL FROM:<john@doe.com>\r\n",
        "HELO other.com\r\n",
        "RCPT TO:<jane@doe.com>\r\n",
        "QUIT\r\n",
    ],
    expected = [
        "220 testserver.com Service ready\r\n",
        "250 Ok\r\n",
        "250 Ok\r\n",
        "250 Ok\r\n",
        "503 Bad sequence of commands\r\n",
        "221 Service closing transmission channel\r\n",
    ],
}
