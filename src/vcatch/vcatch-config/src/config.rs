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

use vcatch_common::{auth::Mechanism, Address, CodeID, Reply};

/// This structure contains all the field to configure the server at the startup.
///
/// This structure will be loaded from a configuration file `-c, --config`
/// argument of the program. See [`crate::Config::from_toml`].
///
/// All field are optional and defaulted if missing.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// vCatch's version requirement to parse this configuration file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_requirement: Option<semver::VersionReq>,
    /// see [`field::FieldServer`]
    #[serde(default)]
    pub server: field::FieldServer,
    /// see [`field::FieldRelay`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relay: Option<field::FieldRelay>,
}

/// The inner field of the `vCatch`'s configuration.
#[allow(clippy::module_name_repetitions)]
pub mod field {
    use super::{Address, CodeID, Mechanism, Reply};

    /// This structure contains all the field to configure the server at the startup.
    #[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
    #[serde(deny_unknown_fields)]
    pub struct FieldServer {
        /// Name of the server.
        ///
        /// Replace `{domain}` in the replies, and first line of the reply to EHLO.
        #[serde(default = "FieldServer::hostname")]
        pub domain: String,
        /// Maximum number of client served at the same time.
        ///
        /// The client will be rejected with [`CodeID::ConnectionMaxReached`] if the server is full.
        ///
        /// If this value is `-1`, then the server will accept any number of client.
        #[serde(default = "FieldServer::default_client_count_max")]
        pub client_count_max: i64,
        /// Maximum size in bytes of the message.
        #[serde(default = "FieldServer::default_message_size_limit")]
        pub message_size_limit: usize,
        /// Extensions enabled on every connection, in the order of the reply to EHLO.
        #[serde(default = "FieldServer::default_extensions")]
        pub extensions: Vec<ExtensionKind>,
        /// Time given to the connections in progress to finish when the server stops.
        #[serde(
            default = "FieldServer::default_shutdown_grace_period",
            with = "humantime_serde"
        )]
        pub shutdown_grace_period: std::time::Duration,
        /// see [`FieldServerSystem`]
        #[serde(default)]
        pub system: FieldServerSystem,
        /// see [`FieldServerInterfaces`]
        #[serde(default)]
        pub interfaces: FieldServerInterfaces,
        /// see [`FieldServerLogs`]
        #[serde(default)]
        pub logs: FieldServerLogs,
        /// see [`FieldServerTls`]
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub tls: Option<FieldServerTls>,
        /// see [`FieldServerSMTP`]
        #[serde(default)]
        pub smtp: FieldServerSMTP,
        /// see [`FieldServerStore`]
        #[serde(default)]
        pub store: FieldServerStore,
    }

    /// ESMTP extensions which can be enabled.
    #[derive(
        Debug,
        Copy,
        Clone,
        PartialEq,
        Eq,
        Hash,
        PartialOrd,
        Ord,
        strum::Display,
        strum::EnumString,
        strum::EnumIter,
        serde_with::DeserializeFromStr,
        serde_with::SerializeDisplay,
    )]
    #[strum(ascii_case_insensitive)]
    pub enum ExtensionKind {
        /// RFC1870
        #[strum(serialize = "SIZE")]
        Size,
        /// RFC6152
        #[strum(serialize = "8BITMIME")]
        EightBitMime,
        /// RFC2920
        #[strum(serialize = "PIPELINING")]
        Pipelining,
        /// RFC6531
        #[strum(serialize = "SMTPUTF8")]
        SmtpUtf8,
        /// RFC3207
        #[strum(serialize = "STARTTLS")]
        StartTls,
        /// RFC4954
        #[strum(serialize = "AUTH")]
        Auth,
    }

    /// The field related to the thread allocation.
    #[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
    #[serde(deny_unknown_fields)]
    pub struct FieldServerSystem {
        /// Number of worker threads of the runtime handling the clients.
        #[serde(default = "FieldServerSystem::default_worker_threads")]
        pub worker_threads: usize,
    }

    /// Address served by `vCatch`. Either ipv4 or ipv6.
    #[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
    #[serde(deny_unknown_fields)]
    pub struct FieldServerInterfaces {
        /// Clear-text listeners, upgradable with STARTTLS.
        #[serde(default = "FieldServerInterfaces::default_addr")]
        pub addr: Vec<std::net::SocketAddr>,
        /// Listeners where the TLS handshake is done before the greetings.
        #[serde(default)]
        pub addr_submissions: Vec<std::net::SocketAddr>,
    }

    /// The field related to the logs.
    #[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
    #[serde(deny_unknown_fields)]
    pub struct FieldServerLogs {
        /// Directory of the server's log.
        ///
        /// A daily rolling file will be created at `{filepath}/vcatch.{YYYY-MM-DD}`.
        /// The logs are written on the standard output if missing.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub filepath: Option<std::path::PathBuf>,
        /// Customize the log level of the different part of the program.
        ///
        /// See <https://docs.rs/tracing-subscriber/0.3.15/tracing_subscriber/filter/struct.EnvFilter.html>
        #[serde(
            default = "FieldServerLogs::default_level",
            serialize_with = "crate::parser::tracing_directive::serialize",
            deserialize_with = "crate::parser::tracing_directive::deserialize"
        )]
        pub level: Vec<tracing_subscriber::filter::Directive>,
    }

    /// A file path, and the value read from the file.
    #[doc(hidden)]
    #[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
    #[serde(transparent, deny_unknown_fields)]
    pub struct SecretFile<T> {
        #[serde(skip_serializing)]
        pub inner: T,
        pub path: std::path::PathBuf,
    }

    /// The TLS parameter for the **INCOMING SIDE** of the server.
    #[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
    #[serde(deny_unknown_fields)]
    pub struct FieldServerTls {
        /// Certificate chain to use for the TLS connection.
        pub certificate: SecretFile<Vec<rustls::Certificate>>,
        /// Private key to use for the TLS connection.
        pub private_key: SecretFile<rustls::PrivateKey>,
        /// Ignore the client’s ciphersuite order.
        /// Instead, choose the top ciphersuite in the server list which is supported by the client.
        #[serde(default)]
        pub preempt_cipherlist: bool,
        /// Timeout for the TLS handshake. The connection is closed when it elapses.
        #[serde(
            default = "FieldServerTls::default_handshake_timeout",
            with = "humantime_serde"
        )]
        pub handshake_timeout: std::time::Duration,
        /// MAIL FROM and AUTH are refused with [`CodeID::TlsRequired`] on a clear-text transport.
        #[serde(default)]
        pub secure_connection_required: bool,
    }

    /// Configuration of the error counter of a connection.
    #[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
    #[serde(deny_unknown_fields)]
    pub struct FieldServerSMTPError {
        /// Past this number of error, each error reply is delayed. `-1` to disable.
        pub soft_count: i64,
        /// Past this number of error, the connection is closed. `-1` to disable.
        pub hard_count: i64,
        /// Delay added to the error replies past `soft_count`.
        #[serde(with = "humantime_serde")]
        pub delay: std::time::Duration,
    }

    /// Timeouts of a client connection.
    #[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
    #[serde(deny_unknown_fields)]
    pub struct FieldServerSMTPTimeoutClient {
        /// Maximum time waiting for one line of the client.
        #[serde(default = "FieldServerSMTPTimeoutClient::default_idle", with = "humantime_serde")]
        pub idle: std::time::Duration,
        /// Maximum lifetime of a connection.
        #[serde(default, with = "humantime_serde")]
        pub session: Option<std::time::Duration>,
    }

    /// Configuration of the authentication extension.
    #[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
    #[serde(deny_unknown_fields)]
    pub struct FieldServerSMTPAuth {
        /// MAIL FROM is refused with [`CodeID::AuthRequired`] until the client is authenticated.
        #[serde(default)]
        pub require_authentication: bool,
        /// Mechanisms advertised and accepted, in this order.
        #[serde(default = "FieldServerSMTPAuth::default_mechanisms")]
        pub mechanisms: Vec<Mechanism>,
        /// Allow the mechanisms sending the secret readable (PLAIN, LOGIN) on a clear-text transport.
        #[serde(default = "FieldServerSMTPAuth::default_enable_dangerous_mechanism_in_clair")]
        pub enable_dangerous_mechanism_in_clair: bool,
    }

    /// Configuration of the SMTP dialogue.
    #[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
    #[serde(deny_unknown_fields)]
    pub struct FieldServerSMTP {
        /// Maximum number of recipients of a message.
        #[serde(default = "FieldServerSMTP::default_rcpt_count_max")]
        pub rcpt_count_max: usize,
        /// Decoding of the lines received before any negotiation.
        #[serde(default)]
        pub default_encoding: vcatch_protocol::Encoding,
        /// Close the connection after [`CodeID::MessageSizeExceeded`].
        #[serde(default)]
        pub close_on_size_exceeded: bool,
        /// Recipients refused with [`CodeID::MailboxUnavailable`].
        #[serde(default)]
        pub rejected_recipients: Vec<AddressPattern>,
        /// see [`FieldServerSMTPError`]
        #[serde(default)]
        pub error: FieldServerSMTPError,
        /// see [`FieldServerSMTPTimeoutClient`]
        #[serde(default)]
        pub timeout_client: FieldServerSMTPTimeoutClient,
        /// Override of the replies sent to the clients.
        #[serde(default = "FieldServerSMTP::default_smtp_codes")]
        pub codes: std::collections::BTreeMap<CodeID, Reply>,
        /// see [`FieldServerSMTPAuth`]
        #[serde(default)]
        pub auth: FieldServerSMTPAuth,
    }

    /// Retention of the captured messages.
    #[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
    #[serde(deny_unknown_fields)]
    pub struct FieldServerStore {
        /// The oldest messages are removed past this count.
        #[serde(default = "FieldServerStore::default_message_count_max")]
        pub message_count_max: usize,
    }

    /// Match an [`Address`]: `*` for any, `@domain` or `*@domain` for a whole domain,
    /// or a full address (case insensitive).
    #[derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        serde_with::DeserializeFromStr,
        serde_with::SerializeDisplay,
    )]
    pub struct AddressPattern(String);

    impl std::str::FromStr for AddressPattern {
        type Err = anyhow::Error;

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            let s = s.trim();
            anyhow::ensure!(!s.is_empty(), "empty address pattern");
            anyhow::ensure!(s == "*" || s.contains('@'), "'{s}' is not an address pattern");
            Ok(Self(s.to_ascii_lowercase()))
        }
    }

    impl std::fmt::Display for AddressPattern {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(&self.0)
        }
    }

    impl AddressPattern {
        /// Does `address` match this pattern ?
        #[must_use]
        pub fn matches(&self, address: &Address) -> bool {
            let full = address.full().to_ascii_lowercase();
            match self.0.as_str() {
                "*" => true,
                pattern => pattern.strip_prefix('*').unwrap_or(pattern).strip_prefix('@').map_or(
                    full == pattern,
                    |domain| address.domain().eq_ignore_ascii_case(domain),
                ),
            }
        }
    }

    /// Where the relayed messages are sent.
    #[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
    #[serde(deny_unknown_fields, tag = "type", rename_all = "lowercase")]
    pub enum RelayTarget {
        /// A fixed upstream server.
        Host {
            ///
            host: String,
            ///
            #[serde(default = "RelayTarget::default_port")]
            port: u16,
        },
        /// The MX records of the domain of each recipient.
        Mx,
    }

    /// Usage of TLS on the outbound connection.
    #[derive(
        Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize,
    )]
    #[serde(rename_all = "lowercase")]
    pub enum RelayTlsMode {
        /// clear-text only
        None,
        /// STARTTLS if the upstream server advertises it
        #[default]
        Opportunistic,
        /// STARTTLS is mandatory
        Required,
        /// TLS from the first byte
        Wrapper,
    }

    /// Credentials used to authenticate on the upstream server.
    #[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize)]
    #[serde(deny_unknown_fields)]
    pub struct FieldRelayCredentials {
        ///
        pub login: String,
        ///
        pub password: String,
    }

    /// Configuration of the relay of the captured messages.
    #[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
    #[serde(deny_unknown_fields)]
    pub struct FieldRelay {
        /// see [`RelayTarget`]
        pub target: RelayTarget,
        /// see [`RelayTlsMode`]
        #[serde(default)]
        pub tls: RelayTlsMode,
        /// Accept any certificate presented by the upstream server.
        #[serde(default)]
        pub accept_invalid_certificates: bool,
        /// see [`FieldRelayCredentials`]
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub credentials: Option<FieldRelayCredentials>,
        /// Name sent with EHLO, [`FieldServer::domain`] if missing.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub hello_name: Option<String>,
        /// Reverse path used instead of the sender of the message.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub sender_address: Option<Address>,
        /// Messages with a recipient matching one of these are relayed as soon as received.
        #[serde(default)]
        pub automatic_emails: Vec<AddressPattern>,
        /// Timeout of each outbound SMTP command.
        #[serde(default = "FieldRelay::default_timeout", with = "humantime_serde")]
        pub timeout: std::time::Duration,
    }

    impl FieldRelay {
        /// Should a message sent to `recipient` be relayed automatically ?
        #[must_use]
        pub fn is_automatic(&self, recipient: &Address) -> bool {
            self.automatic_emails.iter().any(|i| i.matches(recipient))
        }
    }
}

impl Config {
    /// Reply configured for `code`.
    pub fn reply(&self, code: CodeID) -> Reply {
        self.server
            .smtp
            .codes
            .get(&code)
            .cloned()
            .unwrap_or_else(|| field::FieldServerSMTP::default_reply(code))
    }

    /// Is the extension `kind` enabled ?
    #[must_use]
    pub fn has_extension(&self, kind: field::ExtensionKind) -> bool {
        self.server.extensions.contains(&kind)
    }
}
