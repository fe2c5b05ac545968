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
    extension::{build_extensions, Extension, TlsRequired},
    register_builtins, VerbMap,
};
use tokio_rustls::rustls;
use vcatch_common::{store::MessageStore, Message};
use vcatch_config::{get_rustls_config, Config};
use vcatch_relay::RelayEngine;
extern crate alloc;

/// Everything a connection reads from the server.
///
/// Built once, then shared by every connection without any lock.
pub struct ServerContext {
    /// Configuration of the server.
    pub config: alloc::sync::Arc<Config>,
    /// TLS configuration of the incoming connections, if `[server.tls]` is set.
    pub tls_config: Option<alloc::sync::Arc<rustls::ServerConfig>>,
    /// Enabled extensions, in the order of the reply to EHLO.
    pub extensions: Vec<alloc::sync::Arc<dyn Extension>>,
    /// Registry of the verbs, built-in and contributed by the extensions.
    pub verbs: VerbMap,
    /// Destination of the committed messages.
    pub store: alloc::sync::Arc<dyn MessageStore>,
    /// Relay of the captured messages, if `[relay]` is set.
    pub relay: Option<alloc::sync::Arc<RelayEngine>>,
    force_close: tokio::sync::watch::Sender<bool>,
}

impl std::fmt::Debug for ServerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerContext")
            .field("domain", &self.config.server.domain)
            .field(
                "extensions",
                &self.extensions.iter().map(|i| i.kind()).collect::<Vec<_>>(),
            )
            .field("verbs", &self.verbs)
            .field("relay", &self.relay)
            .finish_non_exhaustive()
    }
}

impl ServerContext {
    /// Build the extensions and the verb map of `config`.
    ///
    /// # Errors
    ///
    /// * cannot initialize [rustls] config
    pub fn new(
        config: Config,
        store: alloc::sync::Arc<dyn MessageStore>,
        relay: Option<RelayEngine>,
    ) -> anyhow::Result<Self> {
        let config = alloc::sync::Arc::new(config);

        let tls_config = config
            .server
            .tls
            .as_ref()
            .map(get_rustls_config)
            .transpose()?
            .map(alloc::sync::Arc::new);

        let extensions = build_extensions(&config, tls_config.as_ref());

        let mut verbs = VerbMap::default();
        register_builtins(&mut verbs);
        for extension in &extensions {
            alloc::sync::Arc::clone(extension).register_verbs(&mut verbs);
        }
        if config
            .server
            .tls
            .as_ref()
            .map_or(false, |tls| tls.secure_connection_required)
        {
            TlsRequired::register(&mut verbs);
        }

        let (force_close, _) = tokio::sync::watch::channel(false);

        Ok(Self {
            config,
            tls_config,
            extensions,
            verbs,
            store,
            relay: relay.map(alloc::sync::Arc::new),
            force_close,
        })
    }

    /// Receiver notified when the connections in progress must stop.
    #[must_use]
    pub fn subscribe_force_close(&self) -> tokio::sync::watch::Receiver<bool> {
        self.force_close.subscribe()
    }

    /// Ask every connection in progress to reply `ShuttingDown` and close.
    pub fn force_close(&self) {
        self.force_close.send_replace(true);
    }

    /// Relay `message` in the background if one of its recipients is an automatic one.
    ///
    /// The successful relays are recorded in the store.
    pub fn spawn_automatic_relay(&self, message: &Message) {
        let Some(relay) = self.relay.as_ref().filter(|relay| relay.is_automatic(message)) else {
            return;
        };

        let (relay, store, message) = (
            alloc::sync::Arc::clone(relay),
            alloc::sync::Arc::clone(&self.store),
            message.clone(),
        );

        tokio::spawn(async move {
            let result = relay.relay(&message, &[]).await;
            if !result.was_relayed() {
                tracing::warn!(
                    message = %message.id(),
                    failures = %result.failure_summary(),
                    "Automatic relay failure."
                );
            }

            let records = result.records();
            if !records.is_empty() {
                if let Err(error) = store.record_relays(message.id(), records).await {
                    tracing::error!(%error, "Failed to record the relays.");
                }
            }
        });
    }
}
