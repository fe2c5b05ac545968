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
use vcatch_common::{addr, store::MessageStore, BodyType};

const EHLO_REPLY: [&str; 6] = [
    "250-testserver.com\r\n",
    "250-SIZE 10000000\r\n",
    "250-8BITMIME\r\n",
    "250-PIPELINING\r\n",
    "250-SMTPUTF8\r\n",
    "250 AUTH PLAIN LOGIN CRAM-MD5 ANONYMOUS\r\n",
];

fn expected(replies: &[&str]) -> Vec<String> {
    std::iter::once("220 testserver.com Service ready\r\n")
        .chain(EHLO_REPLY)
        .chain(replies.iter().copied())
        .map(str::to_string)
        .collect()
}

async fn send(input: &[&str], replies: &[&str]) -> crate::receiver::TestOutcome {
    crate::receiver::test_receiver_inner(
        crate::config::local_test(),
        std::iter::once("EHLO client.com\r\n")
            .chain(input.iter().copied())
            .map(str::to_string)
            .collect(),
        expected(replies),
        None,
        false,
    )
    .await
}

#[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 2))]
async fn null_reverse_path() {
    let outcome = send(
        &[
            "MAIL FROM:<>\r\n",
            "RCPT TO:<postmaster@testserver.com>\r\n",
            "DATA\r\n",
            "Subject: bounce\r\n",
            ".\r\n",
            "QUIT\r\n",
        ],
        &[
            "250 Ok\r\n",
            "250 Ok\r\n",
            "354 Start mail input; end with <CRLF>.<CRLF>\r\n",
            "250 Ok\r\n",
            "221 Service closing transmission channel\r\n",
        ],
    )
    .await;

    let page = outcome
        .store
        .list_paged(&Default::default(), Default::default(), 1, 10)
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].sender, None);
    assert_eq!(page.items[0].subject.as_deref(), Some("bounce"));
}

#[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 2))]
async fn parameters() {
    let outcome = send(
        &[
            "MAIL FROM:<john@doe.com> SIZE=42 BODY=8BITMIME\r\n",
            "RCPT TO:<jane@doe.com>\r\n",
            "DATA\r\n",
            "hello\r\n",
            ".\r\n",
            "QUIT\r\n",
        ],
        &[
            "250 Ok\r\n",
            "250 Ok\r\n",
            "354 Start mail input; end with <CRLF>.<CRLF>\r\n",
            "250 Ok\r\n",
            "221 Service closing transmission channel\r\n",
        ],
    )
    .await;

    let page = outcome
        .store
        .list_paged(&Default::default(), Default::default(), 1, 10)
        .await
        .unwrap();
    let stored = outcome.store.get(&page.items[0].id).await.unwrap();
    assert_eq!(stored.message.sender(), Some(&addr!("john@doe.com")));
    assert_eq!(stored.message.declared_size(), Some(42));
    assert_eq!(stored.message.body_type(), BodyType::EightBitMime);
    assert_eq!(stored.message.client_domain(), Some("client.com"));
}

run_test! {
    fn parameter_unknown,
    input = [
        "EHLO client.com\r\n",
        "MAIL FROM:<john@doe.com> RET=FULL\r\n",
        "RCPT TO:<jane@doe.com>\r\n",
        "MAIL FROM:<john@doe.com>\r\n",
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
        "504 Command parameter not implemented\r\n",
        "503 Bad sequence of commands\r\n",
        "250 Ok\r\n",
        "221 Service closing transmission channel\r\n",
    ],
}

run_test! {
    fn parameter_not_negotiated,
    input = [
        "HELO client.com\r\n",
        "MAIL FROM:<john@doe.com> SIZE=42\r\n",
        "MAIL FROM:<john@doe.com> BODY=8BITMIME\r\n",
        "QUIT\r\n",
    ],
    expected = [
        "220 testserver.com Service ready\r\n",
        "250 Ok\r\n",
        "504 Command parameter not implemented\r\n",
        "504 Command parameter not implemented\r\n",
        "221 Service closing transmission channel\r\n",
    ],
}

run_test! {
    fn parameter_invalid_value,
    input = [
        "EHLO client.com\r\n",
        "MAIL FROM:<john@doe.com> SIZE=abc\r\n",
        "MAIL FROM:<john@doe.com> BODY=9BITMIME\r\n",
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
        "501 Syntax error in parameters or arguments\r\n",
        "501 Syntax error in parameters or arguments\r\n",
        "221 Service closing transmission channel\r\n",
    ],
}

run_test! {
    fn declared_size_exceeded,
    input = [
        "EHLO client.com\r\n",
        "MAIL FROM:<john@doe.com> SIZE=10000001\r\n",
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
        "552 4.3.1 Message size exceeds fixed maximum message size\r\n",
        "221 Service closing transmission channel\r\n",
    ],
}

run_test! {
    fn invalid_reverse_path,
    input = [
        "HELO client.com\r\n",
        "MAIL FROM:john@doe.com\r\n",
        "MAIL FROM:<john>\r\n",
        "MAIL TO:<john@doe.com>\r\n",
        "MAIL FROM:<@relay.com:john@doe.com>\r\n",
        "QUIT\r\n",
    ],
    expected = [
        "220 testserver.com Service ready\r\n",
        "250 Ok\r\n",
        "501 Syntax error in parameters or arguments\r\n",
        "501 Syntax error in parameters or arguments\r\n",
        "501 Syntax error in parameters or arguments\r\n",
        "250 Ok\r\n",
        "221 Service closing transmission channel\r\n",
    ],
}

run_test! {
    fn mail_twice,
    input = [
        "HELO client.com\r\n",
        "MAIL FROM:<john@doe.com>\r\n",
        "MAIL FROM:<john@doe.com>\r\n",
        "QUIT\r\n",
    ],
    expected = [
        "220 testserver.com Service ready\r\n",
        "250 Ok\r\n",
        "250 Ok\r\n",
        "503 Bad sequence of commands\r\n",
        "221 Service closing transmission channel\r\n",
    ],
}
