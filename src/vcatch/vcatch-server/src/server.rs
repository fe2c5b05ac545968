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

use crate::{Connection, ServerContext};
use anyhow::Context;
use tracing::Instrument;
use vcatch_common::{store::MessageStore, Address, CodeID, Message, RelayResult};
use vcatch_config::Config;
use vcatch_protocol::ConnectionKind;
use vcatch_relay::RelayEngine;
extern crate alloc;

/// Time left to the connections to write the `ShuttingDown` reply once the grace period is over.
const FORCE_CLOSE_DELAY: std::time::Duration = std::time::Duration::from_millis(500);

/// TCP/IP server
pub struct Server {
    context: alloc::sync::Arc<ServerContext>,
    client_counter: alloc::sync::Arc<std::sync::atomic::AtomicI64>,
    running: std::sync::atomic::AtomicBool,
    local_addrs: tokio::sync::watch::Sender<Vec<std::net::SocketAddr>>,
    shutdown: tokio::sync::watch::Sender<bool>,
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("context", &self.context)
            .field("connection_count", &self.connection_count())
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

/// Create a `TCPListener` ready to be listened to
///
/// # Errors
///
/// * failed to bind to the socket address
/// * failed to set the listener to non blocking
pub fn socket_bind_anyhow<A: std::net::ToSocketAddrs + std::fmt::Debug>(
    addr: A,
) -> anyhow::Result<std::net::TcpListener> {
    let socket = std::net::TcpListener::bind(&addr)
        .with_context(|| format!("Failed to bind socket on addr: '{addr:?}'"))?;

    socket
        .set_nonblocking(true)
        .with_context(|| format!("Failed to set non-blocking socket on addr: '{addr:?}'"))?;

    Ok(socket)
}

type ListenerStreamItem = std::io::Result<(tokio::net::TcpStream, std::net::SocketAddr)>;

fn listener_to_stream(
    listener: &tokio::net::TcpListener,
) -> impl tokio_stream::Stream<Item = ListenerStreamItem> + '_ {
    async_stream::try_stream! {
        loop {
            let client = listener.accept().await?;
            yield client;
        }
    }
}

/// Decrement the number of clients served once the connection task is over, or aborted.
struct ClientGuard(alloc::sync::Arc<std::sync::atomic::AtomicI64>);

impl Drop for ClientGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, std::sync::atomic::Ordering::SeqCst);
    }
}

impl Server {
    /// Create a server with the configuration provided, relaying as configured in `[relay]`.
    ///
    /// # Errors
    ///
    /// * cannot initialize [rustls] config
    /// * cannot initialize the relay
    pub fn new(config: Config, store: alloc::sync::Arc<dyn MessageStore>) -> anyhow::Result<Self> {
        let relay = RelayEngine::new(&config).context("could not initialize the relay")?;
        Self::with_relay(config, store, relay)
    }

    /// Create a server relaying with `relay`.
    ///
    /// # Errors
    ///
    /// * cannot initialize [rustls] config
    pub fn with_relay(
        config: Config,
        store: alloc::sync::Arc<dyn MessageStore>,
        relay: Option<RelayEngine>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            context: alloc::sync::Arc::new(ServerContext::new(config, store, relay)?),
            client_counter: alloc::sync::Arc::new(std::sync::atomic::AtomicI64::new(0)),
            running: std::sync::atomic::AtomicBool::new(false),
            local_addrs: tokio::sync::watch::channel(vec![]).0,
            shutdown: tokio::sync::watch::channel(false).0,
        })
    }

    ///
    #[must_use]
    pub const fn context(&self) -> &alloc::sync::Arc<ServerContext> {
        &self.context
    }

    /// Destination of the captured messages.
    #[must_use]
    pub fn store(&self) -> &alloc::sync::Arc<dyn MessageStore> {
        &self.context.store
    }

    /// Number of clients served right now.
    #[must_use]
    pub fn connection_count(&self) -> i64 {
        self.client_counter.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// Is the server accepting clients ?
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// Addresses listened on, empty until [`Server::listen_and_serve`] is called.
    #[must_use]
    pub fn local_addrs(&self) -> Vec<std::net::SocketAddr> {
        self.local_addrs.borrow().clone()
    }

    /// Stop accepting clients, and close the connections in progress after the grace period.
    pub fn shutdown(&self) {
        tracing::info!("Shutdown requested.");
        self.shutdown.send_replace(true);
    }

    /// Deliver `message` with the relay engine, see [`RelayEngine::relay`].
    ///
    /// Persisting the successful relays is left to the caller.
    ///
    /// # Errors
    ///
    /// * the section `[relay]` is missing
    pub async fn relay(
        &self,
        message: &Message,
        recipients_override: &[Address],
    ) -> anyhow::Result<RelayResult> {
        let relay = self
            .context
            .relay
            .as_ref()
            .context("the relay is not configured")?;

        Ok(relay.relay(message, recipients_override).await)
    }

    #[tracing::instrument(name = "handle-client", skip_all, fields(client = %client_addr, server = %server_addr))]
    async fn handle_client(
        &self,
        connections: &mut tokio::task::JoinSet<()>,
        kind: ConnectionKind,
        mut stream: tokio::net::TcpStream,
        client_addr: std::net::SocketAddr,
        server_addr: std::net::SocketAddr,
    ) {
        let client_count_max = self.context.config.server.client_count_max;
        if client_count_max != -1 && self.connection_count() >= client_count_max {
            tracing::warn!(
                max = client_count_max,
                "Connection count max reached, rejecting connection.",
            );

            if let Err(error) = tokio::io::AsyncWriteExt::write_all(
                &mut stream,
                self.context
                    .config
                    .reply(CodeID::ConnectionMaxReached)
                    .to_string()
                    .as_bytes(),
            )
            .await
            {
                tracing::error!(%error, "Code delivery failure.");
            }

            if let Err(error) = tokio::io::AsyncWriteExt::shutdown(&mut stream).await {
                tracing::error!(%error, "Closing connection failure.");
            }
            return;
        }

        self.client_counter
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let guard = ClientGuard(alloc::sync::Arc::clone(&self.client_counter));

        let connection = Connection::new(
            alloc::sync::Arc::clone(&self.context),
            stream,
            client_addr,
            server_addr,
            kind,
        );
        connections.spawn(
            async move {
                let _guard = guard;
                // the outcome is logged by the connection
                let _ = connection.run().await;
            }
            .in_current_span(),
        );
    }

    /// Main loop of `vCatch`'s server, until [`Server::shutdown`] is called.
    ///
    /// # Errors
    ///
    /// * failed to convert sockets to `[tokio::net::TcpListener]`
    /// * implicit TLS listeners without TLS configuration
    #[tracing::instrument(name = "serve", skip_all)]
    pub async fn listen_and_serve(
        &self,
        sockets: (Vec<std::net::TcpListener>, Vec<std::net::TcpListener>),
    ) -> anyhow::Result<()> {
        fn to_tokio(
            s: Vec<std::net::TcpListener>,
        ) -> std::io::Result<Vec<tokio::net::TcpListener>> {
            s.into_iter()
                .map(tokio::net::TcpListener::from_std)
                .collect::<std::io::Result<Vec<tokio::net::TcpListener>>>()
        }

        anyhow::ensure!(
            self.context.tls_config.is_some() || sockets.1.is_empty(),
            "No TLS configuration provided, cannot listen on submissions protocol (port 465)"
        );

        let (listener, listener_tunneled) = (to_tokio(sockets.0)?, to_tokio(sockets.1)?);

        let mut map = tokio_stream::StreamMap::new();
        for (kind, sockets) in [
            (ConnectionKind::Opportunistic, &listener),
            (ConnectionKind::Tunneled, &listener_tunneled),
        ] {
            for listener in sockets {
                let accept = listener_to_stream(listener);
                let transform = tokio_stream::StreamExt::map(accept, move |client| (kind, client));

                map.insert(listener.local_addr()?, Box::pin(transform));
            }
        }

        let interfaces = map.keys().copied().collect::<Vec<_>>();
        tracing::info!(?interfaces, "Listening for clients.");
        self.local_addrs.send_replace(interfaces);

        let mut shutdown = self.shutdown.subscribe();
        let mut connections = tokio::task::JoinSet::new();
        self.running
            .store(!*shutdown.borrow(), std::sync::atomic::Ordering::SeqCst);

        while self.is_running() {
            tokio::select! {
                Some((server_addr, (kind, client))) = tokio_stream::StreamExt::next(&mut map) => {
                    match client {
                        Ok((stream, client_addr)) => {
                            self.handle_client(&mut connections, kind, stream, client_addr, server_addr)
                                .await;
                        }
                        Err(error) => tracing::warn!(%error, "Accept failure."),
                    }
                }
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
                Ok(()) = shutdown.changed() => {
                    self.running.store(false, std::sync::atomic::Ordering::SeqCst);
                }
            }
        }

        drop(map);
        self.stop(connections).await;
        Ok(())
    }

    async fn stop(&self, mut connections: tokio::task::JoinSet<()>) {
        let grace_period = self.context.config.server.shutdown_grace_period;
        tracing::info!(
            count = connections.len(),
            ?grace_period,
            "Waiting for the connections in progress."
        );

        async fn join_all(connections: &mut tokio::task::JoinSet<()>) {
            while connections.join_next().await.is_some() {}
        }

        if tokio::time::timeout(grace_period, join_all(&mut connections))
            .await
            .is_ok()
        {
            tracing::info!("Server stopped.");
            return;
        }

        tracing::warn!(
            count = connections.len(),
            "Grace period elapsed, closing the connections in progress."
        );
        self.context.force_close();
        if tokio::time::timeout(FORCE_CLOSE_DELAY, join_all(&mut connections))
            .await
            .is_err()
        {
            connections.abort_all();
            join_all(&mut connections).await;
        }
        tracing::info!("Server stopped.");
    }
}
