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

use vcatch_config::field::{FieldRelayCredentials, RelayTlsMode};
extern crate alloc;

/// How to reach one upstream server.
#[derive(Debug, Eq, Clone, Hash, PartialEq)]
pub struct SenderParameters {
    ///
    pub server: String,
    ///
    pub port: u16,
    ///
    pub hello_name: String,
    ///
    pub tls: RelayTlsMode,
    ///
    pub accept_invalid_certificates: bool,
    ///
    pub credentials: Option<FieldRelayCredentials>,
    /// Timeout of each SMTP command.
    pub timeout: core::time::Duration,
}

/// Outbound SMTP client used by the [`crate::RelayEngine`].
#[async_trait::async_trait]
pub trait RelayTransport: Send + Sync {
    /// Run one SMTP transaction delivering `message` with `envelope` to the server `params`.
    ///
    /// # Errors
    ///
    /// * the transaction failed, at any step
    async fn send(
        &self,
        params: &SenderParameters,
        envelope: &lettre::address::Envelope,
        message: &[u8],
    ) -> anyhow::Result<()>;
}

type SenderInner = alloc::sync::Arc<lettre::AsyncSmtpTransport<lettre::Tokio1Executor>>;

/// [`RelayTransport`] using `lettre`, the transports are built once per set of parameters.
#[derive(Default)]
pub struct Sender {
    senders: std::sync::RwLock<std::collections::HashMap<SenderParameters, SenderInner>>,
}

impl Sender {
    fn get_or_build(&self, params: &SenderParameters) -> anyhow::Result<SenderInner> {
        if let Some(sender) = self
            .senders
            .read()
            .map_err(|e| anyhow::anyhow!(e.to_string()))?
            .get(params)
        {
            return Ok(alloc::sync::Arc::clone(sender));
        }

        tracing::trace!(?params, "Key no found for transport with parameters");
        let new_sender = Self::build_sender(params)?;

        let mut writer = self
            .senders
            .write()
            .map_err(|e| anyhow::anyhow!(e.to_string()))?;
        Ok(alloc::sync::Arc::clone(
            writer.entry(params.clone()).or_insert(new_sender),
        ))
    }

    fn build_sender(params: &SenderParameters) -> anyhow::Result<SenderInner> {
        use lettre::transport::smtp::{
            authentication::Credentials,
            client::{Tls, TlsParameters},
            extension::ClientId,
        };

        tracing::trace!(?params, "Creating a transport");

        let tls_parameters = || {
            TlsParameters::builder(params.server.clone())
                .dangerous_accept_invalid_certs(params.accept_invalid_certificates)
                .build()
        };

        let tls = match params.tls {
            RelayTlsMode::None => Tls::None,
            RelayTlsMode::Opportunistic => Tls::Opportunistic(tls_parameters()?),
            RelayTlsMode::Required => Tls::Required(tls_parameters()?),
            RelayTlsMode::Wrapper => Tls::Wrapper(tls_parameters()?),
        };

        let mut builder = lettre::AsyncSmtpTransport::<lettre::Tokio1Executor>::builder_dangerous(
            params.server.clone(),
        )
        .port(params.port)
        .hello_name(ClientId::Domain(params.hello_name.clone()))
        .timeout(Some(params.timeout))
        .tls(tls);

        if let Some(FieldRelayCredentials { login, password }) = &params.credentials {
            builder = builder.credentials(Credentials::new(login.clone(), password.clone()));
        }

        Ok(alloc::sync::Arc::new(builder.build()))
    }
}

#[async_trait::async_trait]
impl RelayTransport for Sender {
    async fn send(
        &self,
        params: &SenderParameters,
        envelope: &lettre::address::Envelope,
        message: &[u8],
    ) -> anyhow::Result<()> {
        let sender = self.get_or_build(params)?;

        let response = lettre::AsyncTransport::send_raw(&*sender, envelope, message).await?;
        tracing::debug!(code = %response.code(), "Upstream server accepted the message.");
        Ok(())
    }
}
