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

use crate::{
    extension::{Activation, Extension},
    Connection, Flow, Verb, VerbMap,
};
use tokio_rustls::rustls;
use vcatch_common::{CodeID, Phase, Session, TlsProperties};
use vcatch_config::field::ExtensionKind;
use vcatch_protocol::{BoxedIo, Error, UnparsedArgs};
extern crate alloc;

/// Upgrade of the clear-text transport to TLS.
///
/// See <https://datatracker.ietf.org/doc/html/rfc3207>
pub struct StartTls {
    tls_config: alloc::sync::Arc<rustls::ServerConfig>,
    handshake_timeout: std::time::Duration,
}

impl std::fmt::Debug for StartTls {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StartTls")
            .field("handshake_timeout", &self.handshake_timeout)
            .finish_non_exhaustive()
    }
}

impl StartTls {
    ///
    #[must_use]
    pub fn new(
        tls_config: alloc::sync::Arc<rustls::ServerConfig>,
        handshake_timeout: std::time::Duration,
    ) -> Self {
        Self {
            tls_config,
            handshake_timeout,
        }
    }
}

#[async_trait::async_trait]
impl Extension for StartTls {
    fn kind(&self) -> ExtensionKind {
        ExtensionKind::StartTls
    }

    fn capability(&self, session: &Session) -> Option<String> {
        (!session.is_secured()).then(|| self.kind().to_string())
    }

    fn register_verbs(self: alloc::sync::Arc<Self>, verbs: &mut VerbMap) {
        verbs.register(alloc::sync::Arc::new(StartTlsVerb), Some(self));
    }

    async fn on_activated(&self, conn: &mut Connection, activation: Activation) -> Result<(), Error> {
        if activation != Activation::Transport {
            return Ok(());
        }

        match upgrade_tls(
            conn,
            alloc::sync::Arc::clone(&self.tls_config),
            self.handshake_timeout,
        )
        .await
        {
            Ok(()) => Ok(()),
            Err(Error::BufferNotEmpty(buffered)) => {
                tracing::warn!(buffered, "Bytes received before the TLS handshake.");
                conn.send_code(CodeID::PipelinedStartTls).await
            }
            Err(error) => Err(error),
        }
    }
}

struct StartTlsVerb;

#[async_trait::async_trait]
impl Verb for StartTlsVerb {
    fn keyword(&self) -> &'static str {
        "STARTTLS"
    }

    fn is_applicable(&self, session: &Session) -> bool {
        !session.is_secured() && !session.phase().in_transaction()
    }

    async fn execute(&self, conn: &mut Connection, args: UnparsedArgs) -> Result<Flow, Error> {
        if args.expect_empty().is_err() {
            conn.send_code(CodeID::SyntaxErrorParams).await?;
            return Ok(Flow::Continue);
        }
        if conn.has_buffered_input() {
            conn.send_code(CodeID::PipelinedStartTls).await?;
            return Ok(Flow::Continue);
        }

        conn.send_code(CodeID::TlsGoAhead).await?;
        Ok(Flow::Activated(Activation::Transport))
    }
}

/// Replace the transport of `conn` by a TLS stream, and reset the session.
///
/// # Errors
///
/// * [`Error::BufferNotEmpty`] the client sent bytes after the command, the transport is kept
/// * the handshake failed or timed out, the connection is closed
#[tracing::instrument(name = "tls-handshake", skip_all)]
pub async fn upgrade_tls(
    conn: &mut Connection,
    tls_config: alloc::sync::Arc<rustls::ServerConfig>,
    handshake_timeout: std::time::Duration,
) -> Result<(), Error> {
    let acceptor = tokio_rustls::TlsAcceptor::from(tls_config);

    let properties = conn
        .apply_stream_filter(|io: BoxedIo| async move {
            let stream = tokio::time::timeout(handshake_timeout, acceptor.accept(io)).await??;

            let (_, tls) = stream.get_ref();
            let properties = TlsProperties {
                sni: tls.sni_hostname().map(str::to_string),
                protocol_version: tls
                    .protocol_version()
                    .map_or_else(String::new, |version| format!("{version:?}")),
                cipher_suite: tls
                    .negotiated_cipher_suite()
                    .map_or_else(String::new, |suite| format!("{:?}", suite.suite())),
            };

            Ok((Box::new(stream) as BoxedIo, properties))
        })
        .await?;

    tracing::info!(
        sni = ?properties.sni,
        protocol_version = %properties.protocol_version,
        cipher_suite = %properties.cipher_suite,
        "Connection secured."
    );
    conn.on_transport_secured(properties);
    Ok(())
}

/// MAIL FROM and AUTH refused until the transport is secured.
///
/// Registered when `secure_connection_required` is set, in front of every other candidate.
pub struct TlsRequired {
    keyword: &'static str,
}

impl TlsRequired {
    /// Shadow MAIL and AUTH.
    pub fn register(verbs: &mut VerbMap) {
        for keyword in ["MAIL", "AUTH"] {
            verbs.shadow(alloc::sync::Arc::new(Self { keyword }), None);
        }
    }
}

#[async_trait::async_trait]
impl Verb for TlsRequired {
    fn keyword(&self) -> &'static str {
        self.keyword
    }

    fn is_applicable(&self, session: &Session) -> bool {
        !session.is_secured() && session.phase() == Phase::Greeted
    }

    async fn execute(&self, conn: &mut Connection, _: UnparsedArgs) -> Result<Flow, Error> {
        conn.send_code(CodeID::TlsRequired).await?;
        Ok(Flow::Continue)
    }
}
