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

use crate::{extension::upgrade_tls, Flow, Resolution, ServerContext};
use vcatch_common::{Address, CodeID, Message, Phase, Reply, Session, TlsProperties};
use vcatch_config::Config;
use vcatch_protocol::{
    AsyncIo, BoxedIo, Command, ConnectionKind, Encoding, Error, ErrorCounter, ErrorSeverity,
    Transport, COMMAND_LINE_MAX,
};
extern crate alloc;

/// One client connected to the server, and the state of its SMTP dialogue.
pub struct Connection {
    context: alloc::sync::Arc<ServerContext>,
    transport: Transport,
    session: Session,
    message: Option<Message>,
    kind: ConnectionKind,
    encoding: Encoding,
    default_encoding: Encoding,
    error_counter: ErrorCounter,
    session_deadline: Option<tokio::time::Instant>,
    force_close: tokio::sync::watch::Receiver<bool>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("session", &self.session)
            .field("kind", &self.kind)
            .field("encoding", &self.encoding)
            .field("transport", &self.transport)
            .finish_non_exhaustive()
    }
}

impl Connection {
    ///
    #[must_use]
    pub fn new(
        context: alloc::sync::Arc<ServerContext>,
        io: impl AsyncIo + 'static,
        client_addr: std::net::SocketAddr,
        server_addr: std::net::SocketAddr,
        kind: ConnectionKind,
    ) -> Self {
        let smtp = &context.config.server.smtp;
        let default_encoding = smtp.default_encoding;
        let error_counter = ErrorCounter::new(smtp.error.soft_count, smtp.error.hard_count);
        let session_deadline = smtp
            .timeout_client
            .session
            .map(|lifetime| tokio::time::Instant::now() + lifetime);
        let force_close = context.subscribe_force_close();

        Self {
            transport: Transport::new(io),
            session: Session::new(client_addr, server_addr),
            message: None,
            kind,
            encoding: default_encoding,
            default_encoding,
            error_counter,
            session_deadline,
            force_close,
            context,
        }
    }

    ///
    #[must_use]
    pub const fn context(&self) -> &alloc::sync::Arc<ServerContext> {
        &self.context
    }

    ///
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.context.config
    }

    ///
    #[must_use]
    pub const fn kind(&self) -> ConnectionKind {
        self.kind
    }

    ///
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    ///
    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Move the session to `phase`, an illegal transition is logged and ignored.
    pub fn set_phase(&mut self, phase: Phase) {
        if let Err(error) = self.session.set_phase(phase) {
            tracing::error!(%error, "Illegal phase transition.");
        }
    }

    /// The transaction in progress.
    #[must_use]
    pub const fn message(&self) -> Option<&Message> {
        self.message.as_ref()
    }

    ///
    pub fn message_mut(&mut self) -> Option<&mut Message> {
        self.message.as_mut()
    }

    /// Are some bytes of the client waiting to be processed ?
    #[must_use]
    pub fn has_buffered_input(&self) -> bool {
        self.transport.has_buffered()
    }

    /// Decoding of the next command lines, until the end of the transaction.
    pub fn switch_reader_encoding(&mut self, encoding: Encoding) {
        self.encoding = encoding;
    }

    ///
    pub fn switch_reader_encoding_to_default(&mut self) {
        self.encoding = self.default_encoding;
    }

    /// Decoding of the command lines for the rest of the session.
    pub fn set_default_encoding(&mut self, encoding: Encoding) {
        self.default_encoding = encoding;
        self.encoding = encoding;
    }

    /// Back to the encoding of the configuration, before a new negotiation.
    pub fn reset_default_encoding(&mut self) {
        self.set_default_encoding(self.context.config.server.smtp.default_encoding);
    }

    /// Reset the session once the transport has been upgraded to TLS.
    pub fn on_transport_secured(&mut self, tls: TlsProperties) {
        self.session.on_transport_secured(tls);
        self.reset_default_encoding();
    }

    /// Read and decode one command line.
    ///
    /// # Errors
    ///
    /// * see [`Connection::read_line_bytes`]
    pub async fn read_line(&mut self) -> Result<String, Error> {
        let line = self.read_line_bytes(COMMAND_LINE_MAX).await?;
        Ok(self.encoding.decode(&line))
    }

    /// Read one line, CRLF stripped, bounded by the idle and session timeouts.
    ///
    /// # Errors
    ///
    /// * [`Error::BufferTooLong`] the line has been discarded, the connection is usable
    /// * [`Error::Timeout`] the client has been notified and the connection closed
    /// * [`Error::Closed`] the client left, or the server is shutting down
    pub async fn read_line_bytes(&mut self, max_length: usize) -> Result<Vec<u8>, Error> {
        if *self.force_close.borrow() {
            return self.on_force_close().await;
        }

        let now = tokio::time::Instant::now();
        let idle = now + self.context.config.server.smtp.timeout_client.idle;
        let deadline = self
            .session_deadline
            .map_or(idle, |session| session.min(idle));

        tokio::select! {
            Ok(()) = self.force_close.changed() => self.on_force_close().await,
            line = tokio::time::timeout_at(deadline, self.transport.read_line(max_length)) => {
                if let Ok(line) = line {
                    let line = line?;
                    tracing::trace!("<< {:?}", String::from_utf8_lossy(&line));
                    Ok(line)
                } else {
                    let elapsed = deadline.duration_since(now);
                    tracing::info!(?elapsed, "Client timed out.");

                    let reply = self.context.config.reply(CodeID::Timeout);
                    if let Err(error) = self.write_reply(&reply).await {
                        tracing::debug!(%error, "Cannot notify the timeout.");
                    }
                    self.close_connection().await;
                    Err(Error::Timeout(elapsed))
                }
            }
        }
    }

    async fn on_force_close<T>(&mut self) -> Result<T, Error> {
        let reply = self.context.config.reply(CodeID::ShuttingDown);
        if let Err(error) = self.write_reply(&reply).await {
            tracing::debug!(%error, "Cannot notify the shutdown.");
        }
        self.close_connection().await;
        Err(Error::Closed)
    }

    /// Send the reply configured for `code`.
    ///
    /// # Errors
    ///
    /// * see [`Connection::send_reply`]
    pub async fn send_code(&mut self, code: CodeID) -> Result<(), Error> {
        let reply = self.context.config.reply(code);
        self.send_reply(reply).await
    }

    /// Send `reply`, and account it if it is an error.
    ///
    /// # Errors
    ///
    /// * [`Error::Closed`] the hard error count has been reached, the connection is closed
    /// * the transport failed
    pub async fn send_reply(&mut self, reply: Reply) -> Result<(), Error> {
        match self.error_counter.record(reply.code()) {
            ErrorSeverity::None => self.write_reply(&reply).await,
            ErrorSeverity::Soft => {
                self.write_reply(&reply).await?;

                let error = &self.context.config.server.smtp.error;
                tracing::warn!(
                    max = error.soft_count,
                    "Soft error max count reached, delaying connection."
                );
                tokio::time::sleep(error.delay).await;
                Ok(())
            }
            ErrorSeverity::Hard => {
                tracing::warn!(
                    max = self.error_counter.threshold_hard_error,
                    "Hard error count max reached, closing connection."
                );
                let reply = reply.extended(&self.context.config.reply(CodeID::TooManyError));
                self.write_reply(&reply).await?;
                self.close_connection().await;
                Err(Error::Closed)
            }
        }
    }

    async fn write_reply(&mut self, reply: &Reply) -> Result<(), Error> {
        let folded = reply.to_string();
        tracing::trace!(">> {folded:?}");
        self.transport.write_all(folded.as_bytes()).await
    }

    /// Replace the transport by `filter(transport)`, see [`Transport::apply_filter`].
    ///
    /// # Errors
    ///
    /// * see [`Transport::apply_filter`]
    pub async fn apply_stream_filter<F, Fut, T>(&mut self, filter: F) -> Result<T, Error>
    where
        F: FnOnce(BoxedIo) -> Fut + Send,
        Fut: std::future::Future<Output = std::io::Result<(BoxedIo, T)>> + Send,
    {
        self.transport.apply_filter(filter).await
    }

    /// Open a transaction, the one in progress is dropped.
    pub fn new_message(&mut self, sender: Option<Address>) -> &mut Message {
        self.abort_message();
        self.message.insert(Message::new(&self.session, sender))
    }

    /// Drop the transaction in progress, if any.
    pub fn abort_message(&mut self) {
        if let Some(mut message) = self.message.take() {
            if let Err(error) = message.abort() {
                tracing::debug!(%error, "Message already closed.");
            }
            tracing::debug!(message = %message.id(), "Transaction aborted.");
        }
        if self.session.phase().in_transaction() {
            self.set_phase(Phase::Greeted);
        }
        self.switch_reader_encoding_to_default();
    }

    /// Close the transaction and hand the message to the store.
    ///
    /// # Errors
    ///
    /// * [`CodeID::Failure`] no transaction, or the store refused the message
    pub async fn commit_message(&mut self) -> Result<uuid::Uuid, CodeID> {
        self.set_phase(Phase::Greeted);
        self.switch_reader_encoding_to_default();

        let mut message = self.message.take().ok_or(CodeID::Failure)?;
        message.commit().map_err(|error| {
            tracing::error!(%error, "Cannot commit the message.");
            CodeID::Failure
        })?;

        let id = *message.id();
        self.context
            .store
            .save(message.clone())
            .await
            .map_err(|error| {
                tracing::error!(%error, "Cannot store the message.");
                CodeID::Failure
            })?;
        tracing::info!(
            message = %id,
            size = message.body().len(),
            recipients = message.recipients().len(),
            "Message received."
        );

        self.context.spawn_automatic_relay(&message);
        Ok(id)
    }

    /// Shut the transport down, idempotent.
    pub async fn close_connection(&mut self) {
        if let Err(error) = self.transport.shutdown().await {
            tracing::debug!(%error, "Shutdown of the transport failed.");
        }
    }

    /// Serve the client until QUIT, a fatal error or the shutdown of the server.
    ///
    /// # Errors
    ///
    /// * the TLS handshake of a tunneled connection failed
    /// * the client timed out
    /// * the transport failed
    #[tracing::instrument(name = "connection", skip_all, fields(session = %self.session.id(), kind = %self.kind))]
    pub async fn run(mut self) -> Result<(), Error> {
        tracing::info!(client = %self.session.client_addr(), "Connection accepted.");

        let result = self.serve().await;

        self.abort_message();
        self.close_connection().await;

        match result {
            Ok(()) | Err(Error::Closed) => {
                tracing::info!("Connection closed.");
                Ok(())
            }
            Err(error) => {
                tracing::warn!(%error, "Connection closed with an error.");
                Err(error)
            }
        }
    }

    async fn serve(&mut self) -> Result<(), Error> {
        if self.kind == ConnectionKind::Tunneled {
            let (Some(tls_config), Some(tls)) = (
                self.context.tls_config.clone(),
                self.context.config.server.tls.as_ref(),
            ) else {
                tracing::error!("Tunneled connection without TLS configuration.");
                return Err(Error::Closed);
            };
            let handshake_timeout = tls.handshake_timeout;
            upgrade_tls(self, tls_config, handshake_timeout).await?;
        }

        self.send_code(CodeID::Greetings).await?;

        loop {
            let line = match self.read_line().await {
                Ok(line) => line,
                Err(Error::BufferTooLong { expected, got }) => {
                    tracing::warn!(expected, got, "Command line too long.");
                    self.send_code(CodeID::LineTooLong).await?;
                    continue;
                }
                Err(error) => return Err(error),
            };

            if self.dispatch(&line).await? == Flow::Close {
                return Ok(());
            }
        }
    }

    async fn dispatch(&mut self, line: &str) -> Result<Flow, Error> {
        let command = Command::parse(line);
        let context = alloc::sync::Arc::clone(&self.context);

        let entry = match context.verbs.resolve(&command.keyword, &self.session) {
            Resolution::Found(entry) => entry,
            Resolution::BadSequence => {
                tracing::debug!(keyword = %command.keyword, phase = %self.session.phase(), "Bad sequence.");
                self.send_code(CodeID::BadSequence).await?;
                return Ok(Flow::Continue);
            }
            Resolution::Unknown => {
                tracing::debug!(keyword = %command.keyword, "Unrecognized command.");
                self.send_code(CodeID::UnrecognizedCommand).await?;
                return Ok(Flow::Continue);
            }
        };

        match entry.verb.execute(self, command.args).await? {
            Flow::Activated(activation) => {
                if let Some(owner) = &entry.owner {
                    owner.on_activated(self, activation).await?;
                }
                Ok(Flow::Continue)
            }
            flow => Ok(flow),
        }
    }
}
