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

async fn single(outcome: &crate::receiver::TestOutcome) -> vcatch_common::Message {
    let page = outcome
        .store
        .list_paged(&Default::default(), Default::default(), 1, 10)
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    outcome.store.get(&page.items[0].id).await.unwrap().message
}

#[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 2))]
async fn smtputf8_transaction() {
    let outcome = run_test! {
        input = [
            "EHLO client.com\r\n",
            "MAIL FROM:<john@doe.com> SMTPUTF8\r\n",
            "RCPT TO:<jane@doe.com>\r\n",
            "DATA\r\n",
            "Subject: Qu'est-ce que c'est ?\r\n",
            "\r\n",
            "Ça marche très bien, ありがとう\r\n",
            ".\r\n",
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
            "250 Ok\r\n",
            "250 Ok\r\n",
            "354 Start mail input; end with <CRLF>.<CRLF>\r\n",
            "250 Ok\r\n",
            "221 Service closing transmission channel\r\n",
        ]
    };

    let message = single(&outcome).await;
    assert!(message.is_utf8());
    pretty_assertions::assert_eq!(
        std::str::from_utf8(message.body()).unwrap(),
        "Subject: Qu'est-ce que c'est ?\r\n\r\nÇa marche très bien, ありがとう\r\n"
    );
}

#[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 2))]
async fn without_smtputf8() {
    let outcome = run_test! {
        input = [
            "HELO client.com\r\n",
            "MAIL FROM:<john@doe.com>\r\n",
            "RCPT TO:<jane@doe.com>\r\n",
            "DATA\r\n",
            "Subject: raw\r\n",
            "\r\n",
            "été\r\n",
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

    let message = single(&outcome).await;
    assert!(!message.is_utf8());
    // the body is kept as received, whatever the command encoding
    assert_eq!(message.body(), "Subject: raw\r\n\r\nété\r\n".as_bytes());
}

run_test! {
    fn smtputf8_with_value,
    input = [
        "EHLO client.com\r\n",
        "MAIL FROM:<john@doe.com> SMTPUTF8=yes\r\n",
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
        "501 Syntax error in parameters or arguments\r\n",
        "221 Service closing transmission channel\r\n",
    ],
}
