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

use crate::{Connection, Flow, Verb, VerbMap};
use vcatch_common::{CodeID, Phase, Reply, ReplyCode, Session};
use vcatch_protocol::{Error, HeloArgs, MailFromArgs, RcptToArgs, UnparsedArgs, TEXT_LINE_MAX};
extern crate alloc;

/// Keywords handled without any extension.
const BUILTINS: [&str; 12] = [
    "HELO", "EHLO", "MAIL", "RCPT", "DATA", "RSET", "NOOP", "QUIT", "VRFY", "HELP", "EXPN", "TURN",
];

/// Register the verbs of RFC5321, before the ones of the extensions.
pub fn register_builtins(verbs: &mut VerbMap) {
    let builtins: [alloc::sync::Arc<dyn Verb>; 12] = [
        alloc::sync::Arc::new(Helo),
        alloc::sync::Arc::new(Ehlo),
        alloc::sync::Arc::new(MailFrom),
        alloc::sync::Arc::new(RcptTo),
        alloc::sync::Arc::new(Data),
        alloc::sync::Arc::new(Rset),
        alloc::sync::Arc::new(Noop),
        alloc::sync::Arc::new(Quit),
        alloc::sync::Arc::new(Vrfy),
        alloc::sync::Arc::new(Help),
        alloc::sync::Arc::new(Unimplemented("EXPN")),
        alloc::sync::Arc::new(Unimplemented("TURN")),
    ];
    for verb in builtins {
        verbs.register(verb, None);
    }
}

struct Helo;

#[async_trait::async_trait]
impl Verb for Helo {
    fn keyword(&self) -> &'static str {
        "HELO"
    }

    fn is_applicable(&self, _: &Session) -> bool {
        true
    }

    async fn execute(&self, conn: &mut Connection, args: UnparsedArgs) -> Result<Flow, Error> {
        let args = match HeloArgs::try_from(args) {
            Ok(args) => args,
            Err(error) => {
                tracing::debug!(%error, "Invalid HELO.");
                conn.send_code(CodeID::SyntaxErrorParams).await?;
                return Ok(Flow::Continue);
            }
        };

        conn.abort_message();
        conn.reset_default_encoding();
        conn.session_mut()
            .greet(args.client_name.to_string(), false, []);

        conn.send_code(CodeID::Helo).await?;
        Ok(Flow::Continue)
    }
}

struct Ehlo;

#[async_trait::async_trait]
impl Verb for Ehlo {
    fn keyword(&self) -> &'static str {
        "EHLO"
    }

    fn is_applicable(&self, _: &Session) -> bool {
        true
    }

    async fn execute(&self, conn: &mut Connection, args: UnparsedArgs) -> Result<Flow, Error> {
        let args = match HeloArgs::try_from(args) {
            Ok(args) => args,
            Err(error) => {
                tracing::debug!(%error, "Invalid EHLO.");
                conn.send_code(CodeID::SyntaxErrorParams).await?;
                return Ok(Flow::Continue);
            }
        };

        conn.abort_message();
        conn.reset_default_encoding();

        let context = alloc::sync::Arc::clone(conn.context());
        let advertised = context
            .extensions
            .iter()
            .filter_map(|extension| {
                extension
                    .capability(conn.session())
                    .map(|capability| (extension, capability))
            })
            .collect::<Vec<_>>();

        conn.session_mut().greet(
            args.client_name.to_string(),
            true,
            advertised.iter().filter_map(|(_, capability)| {
                capability
                    .split_whitespace()
                    .next()
                    .map(str::to_ascii_uppercase)
            }),
        );

        let lines = std::iter::once(context.config.server.domain.clone())
            .chain(advertised.iter().map(|(_, capability)| capability.clone()))
            .collect::<Vec<_>>();
        conn.send_reply(Reply::with_lines(ReplyCode::Code { code: 250 }, lines))
            .await?;

        for (extension, _) in &advertised {
            extension.on_negotiated(conn);
        }
        Ok(Flow::Continue)
    }
}

struct MailFrom;

#[async_trait::async_trait]
impl Verb for MailFrom {
    fn keyword(&self) -> &'static str {
        "MAIL"
    }

    fn is_applicable(&self, session: &Session) -> bool {
        session.phase() == Phase::Greeted
    }

    async fn execute(&self, conn: &mut Connection, args: UnparsedArgs) -> Result<Flow, Error> {
        let args = match MailFromArgs::try_from(args) {
            Ok(args) => args,
            Err(error) => {
                tracing::debug!(%error, "Invalid MAIL FROM.");
                conn.send_code(CodeID::SyntaxErrorParams).await?;
                return Ok(Flow::Continue);
            }
        };

        conn.new_message(args.reverse_path);

        let context = alloc::sync::Arc::clone(conn.context());
        for param in &args.params {
            let handler = context.extensions.iter().find(|extension| {
                conn.session()
                    .is_negotiated(&extension.kind().to_string())
                    && extension.handles_mail_parameter(&param.keyword)
            });

            let result = handler.map_or(Err(CodeID::ParameterUnimplemented), |extension| {
                extension.on_mail_parameter(conn, param)
            });
            if let Err(code) = result {
                tracing::debug!(keyword = %param.keyword, %code, "MAIL FROM parameter refused.");
                conn.abort_message();
                conn.send_code(code).await?;
                return Ok(Flow::Continue);
            }
        }

        conn.set_phase(Phase::HasSender);
        conn.send_code(CodeID::Ok).await?;
        Ok(Flow::Continue)
    }
}

struct RcptTo;

#[async_trait::async_trait]
impl Verb for RcptTo {
    fn keyword(&self) -> &'static str {
        "RCPT"
    }

    fn is_applicable(&self, session: &Session) -> bool {
        matches!(session.phase(), Phase::HasSender | Phase::HasRecipients)
    }

    async fn execute(&self, conn: &mut Connection, args: UnparsedArgs) -> Result<Flow, Error> {
        let args = match RcptToArgs::try_from(args) {
            Ok(args) => args,
            Err(error) => {
                tracing::debug!(%error, "Invalid RCPT TO.");
                conn.send_code(CodeID::SyntaxErrorParams).await?;
                return Ok(Flow::Continue);
            }
        };
        if !args.params.is_empty() {
            conn.send_code(CodeID::ParameterUnimplemented).await?;
            return Ok(Flow::Continue);
        }

        let smtp = &conn.config().server.smtp;
        let rcpt_count_max = smtp.rcpt_count_max;
        let rejected = smtp
            .rejected_recipients
            .iter()
            .any(|pattern| pattern.matches(&args.forward_path));
        let count = conn.message().map_or(0, |message| message.recipients().len());

        let code = if count >= rcpt_count_max {
            tracing::warn!(rcpt_count_max, "Too many recipients, transaction aborted.");
            conn.abort_message();
            CodeID::TooManyRecipients
        } else if rejected {
            tracing::info!(rcpt = %args.forward_path, "Recipient rejected.");
            CodeID::MailboxUnavailable
        } else {
            let added = conn
                .message_mut()
                .map(|message| message.add_recipient(args.forward_path));
            if matches!(added, Some(Ok(()))) {
                conn.set_phase(Phase::HasRecipients);
                CodeID::Ok
            } else {
                CodeID::Failure
            }
        };

        conn.send_code(code).await?;
        Ok(Flow::Continue)
    }
}

struct Data;

impl Data {
    /// Read the body up to the terminating ".", the reply to send if it cannot be committed.
    async fn read_body(conn: &mut Connection) -> Result<Option<CodeID>, Error> {
        let size_limit = conn.config().server.message_size_limit;
        let mut size = 0;
        let mut failure = None;

        loop {
            let line = match conn.read_line_bytes(TEXT_LINE_MAX).await {
                Ok(line) => line,
                Err(Error::BufferTooLong { expected, got }) => {
                    tracing::warn!(expected, got, "Text line too long.");
                    failure.get_or_insert(CodeID::LineTooLong);
                    continue;
                }
                Err(error) => return Err(error),
            };

            if line == b"." {
                return Ok(failure);
            }
            if failure.is_some() {
                continue;
            }

            let line = line.strip_prefix(b".").unwrap_or(&line[..]);
            size += line.len() + 2;
            if size > size_limit {
                tracing::warn!(size_limit, "Message size exceeded.");
                failure = Some(CodeID::MessageSizeExceeded);
                continue;
            }

            let appended = conn.message_mut().map(|message| {
                message
                    .append_body(line)
                    .and_then(|()| message.append_body(b"\r\n"))
            });
            if !matches!(appended, Some(Ok(()))) {
                failure = Some(CodeID::Failure);
            }
        }
    }
}

#[async_trait::async_trait]
impl Verb for Data {
    fn keyword(&self) -> &'static str {
        "DATA"
    }

    fn is_applicable(&self, session: &Session) -> bool {
        session.phase() == Phase::HasRecipients
    }

    async fn execute(&self, conn: &mut Connection, args: UnparsedArgs) -> Result<Flow, Error> {
        if args.expect_empty().is_err() {
            conn.send_code(CodeID::SyntaxErrorParams).await?;
            return Ok(Flow::Continue);
        }

        conn.send_code(CodeID::DataStart).await?;
        conn.set_phase(Phase::ReceivingData);

        match Self::read_body(conn).await? {
            None => match conn.commit_message().await {
                Ok(_) => conn.send_code(CodeID::Ok).await?,
                Err(code) => {
                    conn.abort_message();
                    conn.send_code(code).await?;
                }
            },
            Some(code) => {
                conn.abort_message();
                conn.send_code(code).await?;

                if code == CodeID::MessageSizeExceeded
                    && conn.config().server.smtp.close_on_size_exceeded
                {
                    return Ok(Flow::Close);
                }
            }
        }
        Ok(Flow::Continue)
    }
}

struct Rset;

#[async_trait::async_trait]
impl Verb for Rset {
    fn keyword(&self) -> &'static str {
        "RSET"
    }

    fn is_applicable(&self, _: &Session) -> bool {
        true
    }

    async fn execute(&self, conn: &mut Connection, args: UnparsedArgs) -> Result<Flow, Error> {
        if args.expect_empty().is_err() {
            conn.send_code(CodeID::SyntaxErrorParams).await?;
            return Ok(Flow::Continue);
        }

        // the greeting survives, only the transaction is dropped
        conn.abort_message();
        conn.send_code(CodeID::Ok).await?;
        Ok(Flow::Continue)
    }
}

struct Noop;

#[async_trait::async_trait]
impl Verb for Noop {
    fn keyword(&self) -> &'static str {
        "NOOP"
    }

    fn is_applicable(&self, _: &Session) -> bool {
        true
    }

    async fn execute(&self, conn: &mut Connection, _: UnparsedArgs) -> Result<Flow, Error> {
        conn.send_code(CodeID::Ok).await?;
        Ok(Flow::Continue)
    }
}

struct Quit;

#[async_trait::async_trait]
impl Verb for Quit {
    fn keyword(&self) -> &'static str {
        "QUIT"
    }

    fn is_applicable(&self, _: &Session) -> bool {
        true
    }

    async fn execute(&self, conn: &mut Connection, _: UnparsedArgs) -> Result<Flow, Error> {
        conn.send_code(CodeID::Closing).await?;
        Ok(Flow::Close)
    }
}

struct Vrfy;

#[async_trait::async_trait]
impl Verb for Vrfy {
    fn keyword(&self) -> &'static str {
        "VRFY"
    }

    fn is_applicable(&self, _: &Session) -> bool {
        true
    }

    async fn execute(&self, conn: &mut Connection, args: UnparsedArgs) -> Result<Flow, Error> {
        let code = if args.expect_empty().is_ok() {
            CodeID::SyntaxErrorParams
        } else {
            CodeID::CannotVerify
        };
        conn.send_code(code).await?;
        Ok(Flow::Continue)
    }
}

struct Help;

#[async_trait::async_trait]
impl Verb for Help {
    fn keyword(&self) -> &'static str {
        "HELP"
    }

    fn is_applicable(&self, _: &Session) -> bool {
        true
    }

    async fn execute(&self, conn: &mut Connection, _: UnparsedArgs) -> Result<Flow, Error> {
        let reply = conn.config().reply(CodeID::Help);
        let contributed = conn
            .context()
            .verbs
            .keywords()
            .into_iter()
            .filter(|keyword| !BUILTINS.contains(keyword))
            .collect::<Vec<_>>();

        let reply = if contributed.is_empty() {
            reply
        } else {
            let mut lines = reply.lines().to_vec();
            if let Some(last) = lines.last_mut() {
                last.push(' ');
                last.push_str(&contributed.join(" "));
            }
            Reply::with_lines(reply.code().clone(), lines)
        };

        conn.send_reply(reply).await?;
        Ok(Flow::Continue)
    }
}

struct Unimplemented(&'static str);

#[async_trait::async_trait]
impl Verb for Unimplemented {
    fn keyword(&self) -> &'static str {
        self.0
    }

    fn is_applicable(&self, _: &Session) -> bool {
        true
    }

    async fn execute(&self, conn: &mut Connection, _: UnparsedArgs) -> Result<Flow, Error> {
        conn.send_code(CodeID::Unimplemented).await?;
        Ok(Flow::Continue)
    }
}
