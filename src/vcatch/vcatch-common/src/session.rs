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

use crate::{auth::Credentials, Phase, PhaseError};

/// Properties of the TLS layer once the handshake is completed.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TlsProperties {
    /// Server Name Indication sent by the client
    pub sni: Option<String>,
    /// negotiated protocol version, as printed by rustls
    pub protocol_version: String,
    /// negotiated cipher suite, as printed by rustls
    pub cipher_suite: String,
}

/// Protocol state of one connection.
///
/// Owned by the connection processing it, never shared.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Session {
    id: uuid::Uuid,
    #[serde(with = "time::serde::rfc3339")]
    connected_at: time::OffsetDateTime,
    client_addr: std::net::SocketAddr,
    server_addr: std::net::SocketAddr,
    phase: Phase,
    client_domain: Option<String>,
    extended: bool,
    negotiated_extensions: std::collections::BTreeSet<String>,
    tls: Option<TlsProperties>,
    authenticated: Option<Credentials>,
}

impl Session {
    /// Create the state of a newly accepted connection.
    #[must_use]
    pub fn new(client_addr: std::net::SocketAddr, server_addr: std::net::SocketAddr) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            connected_at: time::OffsetDateTime::now_utc(),
            client_addr,
            server_addr,
            phase: Phase::Connected,
            client_domain: None,
            extended: false,
            negotiated_extensions: std::collections::BTreeSet::new(),
            tls: None,
            authenticated: None,
        }
    }

    ///
    #[must_use]
    pub const fn id(&self) -> &uuid::Uuid {
        &self.id
    }

    ///
    #[must_use]
    pub const fn connected_at(&self) -> &time::OffsetDateTime {
        &self.connected_at
    }

    ///
    #[must_use]
    pub const fn client_addr(&self) -> &std::net::SocketAddr {
        &self.client_addr
    }

    ///
    #[must_use]
    pub const fn server_addr(&self) -> &std::net::SocketAddr {
        &self.server_addr
    }

    ///
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Move to the phase `to`.
    ///
    /// # Errors
    ///
    /// * see [`Phase::advance`]
    pub fn set_phase(&mut self, to: Phase) -> Result<(), PhaseError> {
        self.phase = self.phase.advance(to)?;
        Ok(())
    }

    /// Domain declared by HELO/EHLO, if any since the last transport upgrade.
    #[must_use]
    pub fn client_domain(&self) -> Option<&str> {
        self.client_domain.as_deref()
    }

    /// Was the session opened with EHLO (and not HELO) ?
    #[must_use]
    pub const fn is_extended(&self) -> bool {
        self.extended
    }

    /// Record a HELO/EHLO, the previous transaction is dropped.
    ///
    /// `extensions` holds the capability keywords advertised in the reply to EHLO.
    pub fn greet(
        &mut self,
        client_domain: String,
        extended: bool,
        extensions: impl IntoIterator<Item = String>,
    ) {
        self.client_domain = Some(client_domain);
        self.extended = extended;
        self.negotiated_extensions = extensions.into_iter().collect();
        self.phase = Phase::Greeted;
    }

    /// Capability keywords (first word of the EHLO line) advertised to this client.
    #[must_use]
    pub const fn negotiated_extensions(&self) -> &std::collections::BTreeSet<String> {
        &self.negotiated_extensions
    }

    /// Has the `keyword` capability been advertised to this client ?
    #[must_use]
    pub fn is_negotiated(&self, keyword: &str) -> bool {
        self.negotiated_extensions.contains(keyword)
    }

    /// Is the transport encrypted ?
    #[must_use]
    pub const fn is_secured(&self) -> bool {
        self.tls.is_some()
    }

    ///
    #[must_use]
    pub const fn tls(&self) -> Option<&TlsProperties> {
        self.tls.as_ref()
    }

    /// The transport has been replaced by a TLS stream.
    ///
    /// Everything learned on the clear-text channel is forgotten, the client must
    /// issue EHLO again.
    pub fn on_transport_secured(&mut self, tls: TlsProperties) {
        self.tls = Some(tls);
        self.client_domain = None;
        self.extended = false;
        self.negotiated_extensions.clear();
        self.authenticated = None;
        self.phase = Phase::Connected;
    }

    /// Credentials of a successful AUTH exchange.
    #[must_use]
    pub const fn authenticated(&self) -> Option<&Credentials> {
        self.authenticated.as_ref()
    }

    ///
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.authenticated.is_some()
    }

    /// Identity of the authenticated client, if any.
    #[must_use]
    pub fn authenticated_identity(&self) -> Option<&str> {
        self.authenticated.as_ref().map(Credentials::identity)
    }

    ///
    pub fn set_authenticated(&mut self, credentials: Credentials) {
        self.authenticated = Some(credentials);
    }
}
