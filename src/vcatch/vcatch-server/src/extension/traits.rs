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
    extension::{Auth, EightBitMime, Pipelining, Size, SmtpUtf8, StartTls},
    Connection, VerbMap,
};
use tokio_rustls::rustls;
use vcatch_common::{auth::Credentials, CodeID, Session};
use vcatch_config::{field::ExtensionKind, Config};
use vcatch_protocol::{Error, MailParameter};
extern crate alloc;

/// What a verb of an extension obtained, handed to [`Extension::on_activated`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    /// The client is ready to start the TLS handshake.
    Transport,
    /// The SASL exchange succeeded with these credentials.
    Authenticated(Credentials),
}

/// An ESMTP extension enabled on the server.
///
/// The instances are built once with the server and shared by every connection.
#[async_trait::async_trait]
pub trait Extension: Send + Sync {
    ///
    fn kind(&self) -> ExtensionKind;

    /// Line advertised in the reply to EHLO, `None` to hide the extension now.
    fn capability(&self, session: &Session) -> Option<String>;

    /// Add the verbs of the extension.
    fn register_verbs(self: alloc::sync::Arc<Self>, _verbs: &mut VerbMap) {}

    /// Does the extension process the MAIL FROM parameter `keyword` ?
    fn handles_mail_parameter(&self, _keyword: &str) -> bool {
        false
    }

    /// Apply a MAIL FROM parameter to the message in progress.
    ///
    /// # Errors
    ///
    /// * the reply refusing the command
    fn on_mail_parameter(
        &self,
        _conn: &mut Connection,
        _param: &MailParameter,
    ) -> Result<(), CodeID> {
        Err(CodeID::ParameterUnimplemented)
    }

    /// Called after the reply to EHLO if the extension has been advertised.
    fn on_negotiated(&self, _conn: &mut Connection) {}

    /// Called once a verb of this extension returned [`crate::Flow::Activated`].
    ///
    /// # Errors
    ///
    /// * the transport failed, the connection is over
    async fn on_activated(
        &self,
        _conn: &mut Connection,
        _activation: Activation,
    ) -> Result<(), Error> {
        Ok(())
    }
}

/// Build the extensions enabled in `config`, in the order of the configuration.
#[must_use]
pub fn build_extensions(
    config: &Config,
    tls_config: Option<&alloc::sync::Arc<rustls::ServerConfig>>,
) -> Vec<alloc::sync::Arc<dyn Extension>> {
    config
        .server
        .extensions
        .iter()
        .filter_map(|kind| -> Option<alloc::sync::Arc<dyn Extension>> {
            match kind {
                ExtensionKind::Size => Some(alloc::sync::Arc::new(Size::new(
                    config.server.message_size_limit,
                ))),
                ExtensionKind::EightBitMime => Some(alloc::sync::Arc::new(EightBitMime)),
                ExtensionKind::Pipelining => Some(alloc::sync::Arc::new(Pipelining)),
                ExtensionKind::SmtpUtf8 => Some(alloc::sync::Arc::new(SmtpUtf8)),
                ExtensionKind::StartTls => {
                    match (tls_config, config.server.tls.as_ref()) {
                        (Some(tls_config), Some(tls)) => Some(alloc::sync::Arc::new(
                            StartTls::new(alloc::sync::Arc::clone(tls_config), tls.handshake_timeout),
                        )),
                        _ => {
                            tracing::warn!("STARTTLS is enabled without TLS configuration, ignored.");
                            None
                        }
                    }
                }
                ExtensionKind::Auth => Some(alloc::sync::Arc::new(Auth::new(
                    config.server.smtp.auth.clone(),
                ))),
            }
        })
        .collect()
}
