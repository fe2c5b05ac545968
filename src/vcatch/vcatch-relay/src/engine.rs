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

use crate::{RelayError, RelayTransport, Sender, SenderParameters};
use trust_dns_resolver::{error::ResolveErrorKind, TokioAsyncResolver};
use vcatch_common::{Address, Message, RelayOutcome, RelayResult};
use vcatch_config::{
    field::{FieldRelay, RelayTarget},
    Config,
};

/// Forward the captured messages to the upstream configured in `[relay]`.
pub struct RelayEngine {
    config: FieldRelay,
    hello_name: String,
    transport: std::sync::Arc<dyn RelayTransport>,
    resolver: Option<TokioAsyncResolver>,
}

impl std::fmt::Debug for RelayEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayEngine")
            .field("config", &self.config)
            .field("hello_name", &self.hello_name)
            .finish_non_exhaustive()
    }
}

impl RelayEngine {
    /// Build the engine of the configuration, `None` if the relay is not configured.
    ///
    /// # Errors
    ///
    /// * the target is `mx` and the system resolver cannot be read
    pub fn new(config: &Config) -> anyhow::Result<Option<Self>> {
        config
            .relay
            .as_ref()
            .map(|relay| {
                Self::with_transport(
                    relay.clone(),
                    config.server.domain.clone(),
                    std::sync::Arc::new(Sender::default()),
                )
            })
            .transpose()
    }

    /// Build an engine delivering through `transport`.
    ///
    /// # Errors
    ///
    /// * the target is `mx` and the system resolver cannot be read
    pub fn with_transport(
        config: FieldRelay,
        server_domain: String,
        transport: std::sync::Arc<dyn RelayTransport>,
    ) -> anyhow::Result<Self> {
        let resolver = match config.target {
            RelayTarget::Mx => Some(TokioAsyncResolver::tokio_from_system_conf()?),
            RelayTarget::Host { .. } => None,
        };

        Ok(Self {
            hello_name: config.hello_name.clone().unwrap_or(server_domain),
            config,
            transport,
            resolver,
        })
    }

    /// Should `message` be relayed as soon as it is received ?
    #[must_use]
    pub fn is_automatic(&self, message: &Message) -> bool {
        message
            .recipients()
            .iter()
            .any(|rcpt| self.config.is_automatic(rcpt))
    }

    /// Recipients of the relay: `recipients_override` if not empty, the recipients of
    /// the message otherwise. Duplicates are removed, the first occurrence is kept.
    #[must_use]
    pub fn effective_recipients(message: &Message, recipients_override: &[Address]) -> Vec<Address> {
        let recipients = if recipients_override.is_empty() {
            message.recipients()
        } else {
            recipients_override
        };

        let mut seen = std::collections::HashSet::new();
        recipients
            .iter()
            .filter(|rcpt| seen.insert(*rcpt))
            .cloned()
            .collect()
    }

    /// Deliver `message` to each effective recipient, independently.
    ///
    /// A failure is recorded in the result and never stops the other deliveries.
    #[tracing::instrument(name = "relay", skip_all, fields(message = %message.id()))]
    pub async fn relay(&self, message: &Message, recipients_override: &[Address]) -> RelayResult {
        let recipients = Self::effective_recipients(message, recipients_override);
        tracing::debug!(count = recipients.len(), "Relaying message.");

        let futures = recipients.into_iter().map(|rcpt| async move {
            let outcome = self.relay_one(message, &rcpt).await;
            (rcpt, outcome)
        });

        let mut result = RelayResult::default();
        for (rcpt, outcome) in futures_util::future::join_all(futures).await {
            match outcome {
                Ok(()) => {
                    tracing::info!(%rcpt, "Message relayed.");
                    result.insert(rcpt, RelayOutcome::success_now());
                }
                Err(error) => {
                    tracing::warn!(%rcpt, %error, "Relay failure.");
                    result.insert(
                        rcpt,
                        RelayOutcome::Failure {
                            error: error.to_string(),
                        },
                    );
                }
            }
        }
        result
    }

    #[tracing::instrument(name = "relay-one", skip_all, fields(rcpt = %rcpt))]
    async fn relay_one(&self, message: &Message, rcpt: &Address) -> Result<(), RelayError> {
        let envelope = self.envelope(message, rcpt)?;
        tracing::trace!(?envelope);

        let mut last_error = None;
        for (server, port) in self.targets(rcpt).await? {
            let params = SenderParameters {
                server,
                port,
                hello_name: self.hello_name.clone(),
                tls: self.config.tls,
                accept_invalid_certificates: self.config.accept_invalid_certificates,
                credentials: self.config.credentials.clone(),
                timeout: self.config.timeout,
            };

            match self.transport.send(&params, &envelope, message.body()).await {
                Ok(()) => return Ok(()),
                Err(error) => {
                    tracing::warn!(server = params.server, %error, "Failed to send message.");
                    last_error = Some(error);
                }
            }
        }

        Err(RelayError::Transport(last_error.unwrap_or_else(|| {
            anyhow::anyhow!("no valid mail exchanger found for '{}'", rcpt.domain())
        })))
    }

    fn envelope(
        &self,
        message: &Message,
        rcpt: &Address,
    ) -> Result<lettre::address::Envelope, RelayError> {
        let invalid = |e: lettre::address::AddressError| RelayError::Envelope(e.to_string());

        let reverse_path = self
            .config
            .sender_address
            .as_ref()
            .or_else(|| message.sender())
            .map(Address::to_lettre)
            .transpose()
            .map_err(invalid)?;

        lettre::address::Envelope::new(reverse_path, vec![rcpt.to_lettre().map_err(invalid)?])
            .map_err(|e| RelayError::Envelope(e.to_string()))
    }

    async fn targets(&self, rcpt: &Address) -> Result<Vec<(String, u16)>, RelayError> {
        match (&self.config.target, &self.resolver) {
            (RelayTarget::Host { host, port }, _) => Ok(vec![(host.clone(), *port)]),
            (RelayTarget::Mx, Some(resolver)) => {
                Self::get_mx_records(resolver, rcpt.domain()).await
            }
            (RelayTarget::Mx, None) => Ok(vec![(
                rcpt.domain().to_string(),
                vcatch_common::SMTP_PORT,
            )]),
        }
    }

    /// Mail exchangers of `domain`, by order of preference.
    async fn get_mx_records(
        resolver: &TokioAsyncResolver,
        domain: &str,
    ) -> Result<Vec<(String, u16)>, RelayError> {
        let mut records_by_priority = match resolver.mx_lookup(domain).await {
            Ok(records) => records.into_iter().collect::<Vec<_>>(),
            Err(error) if matches!(error.kind(), ResolveErrorKind::NoRecordsFound { .. }) => {
                vec![]
            }
            Err(error) => {
                return Err(RelayError::Resolve {
                    domain: domain.to_string(),
                    error,
                })
            }
        };
        records_by_priority.sort_by_key(trust_dns_resolver::proto::rr::rdata::MX::preference);

        if records_by_priority.is_empty() {
            tracing::warn!("empty set of MX records found for '{domain}'");
            // implicit MX, see https://www.rfc-editor.org/rfc/rfc5321#section-5.1
            return Ok(vec![(domain.to_string(), vcatch_common::SMTP_PORT)]);
        }

        records_by_priority
            .iter()
            .map(|record| {
                let host = record.exchange().to_ascii();
                if host == "." {
                    Err(RelayError::NoMxRecord(domain.to_string()))
                } else {
                    Ok((
                        host.trim_end_matches('.').to_string(),
                        vcatch_common::SMTP_PORT,
                    ))
                }
            })
            .collect()
    }
}
