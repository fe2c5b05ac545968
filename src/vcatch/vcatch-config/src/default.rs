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
    config::field::{
        ExtensionKind, FieldRelay, FieldServer, FieldServerInterfaces, FieldServerLogs,
        FieldServerSMTP, FieldServerSMTPAuth, FieldServerSMTPError, FieldServerSMTPTimeoutClient,
        FieldServerStore, FieldServerSystem, FieldServerTls, RelayTarget,
    },
    Config,
};
use vcatch_common::{auth::Mechanism, CodeID, Reply, ReplyCode};

impl Default for Config {
    fn default() -> Self {
        Self {
            version_requirement: None,
            server: FieldServer::default(),
            relay: None,
        }
    }
}

impl Default for FieldServer {
    fn default() -> Self {
        Self {
            domain: Self::hostname(),
            client_count_max: Self::default_client_count_max(),
            message_size_limit: Self::default_message_size_limit(),
            extensions: Self::default_extensions(),
            shutdown_grace_period: Self::default_shutdown_grace_period(),
            system: FieldServerSystem::default(),
            interfaces: FieldServerInterfaces::default(),
            logs: FieldServerLogs::default(),
            tls: None,
            smtp: FieldServerSMTP::default(),
            store: FieldServerStore::default(),
        }
    }
}

impl FieldServer {
    pub(crate) fn hostname() -> String {
        hostname::get()
            .ok()
            .and_then(|name| name.into_string().ok())
            .unwrap_or_else(|| "localhost".to_string())
    }

    pub(crate) const fn default_client_count_max() -> i64 {
        16
    }

    pub(crate) const fn default_message_size_limit() -> usize {
        10_000_000
    }

    pub(crate) fn default_extensions() -> Vec<ExtensionKind> {
        vec![
            ExtensionKind::Size,
            ExtensionKind::EightBitMime,
            ExtensionKind::Pipelining,
            ExtensionKind::SmtpUtf8,
            ExtensionKind::Auth,
        ]
    }

    pub(crate) const fn default_shutdown_grace_period() -> std::time::Duration {
        std::time::Duration::from_secs(5)
    }
}

impl Default for FieldServerSystem {
    fn default() -> Self {
        Self {
            worker_threads: Self::default_worker_threads(),
        }
    }
}

impl FieldServerSystem {
    pub(crate) fn default_worker_threads() -> usize {
        std::thread::available_parallelism()
            .map(std::num::NonZeroUsize::get)
            .unwrap_or(1)
    }
}

impl Default for FieldServerInterfaces {
    fn default() -> Self {
        Self {
            addr: Self::default_addr(),
            addr_submissions: vec![],
        }
    }
}

impl FieldServerInterfaces {
    pub(crate) fn default_addr() -> Vec<std::net::SocketAddr> {
        vec![std::net::SocketAddr::new(
            std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
            vcatch_common::SMTP_PORT,
        )]
    }
}

impl Default for FieldServerLogs {
    fn default() -> Self {
        Self {
            filepath: None,
            level: Self::default_level(),
        }
    }
}

impl FieldServerLogs {
    pub(crate) fn default_level() -> Vec<tracing_subscriber::filter::Directive> {
        vec![tracing_subscriber::filter::LevelFilter::WARN.into()]
    }
}

impl FieldServerTls {
    pub(crate) const fn default_handshake_timeout() -> std::time::Duration {
        std::time::Duration::from_secs(1)
    }
}

impl Default for FieldServerSMTPError {
    fn default() -> Self {
        Self {
            soft_count: 10,
            hard_count: 20,
            delay: std::time::Duration::from_millis(1000),
        }
    }
}

impl Default for FieldServerSMTPTimeoutClient {
    fn default() -> Self {
        Self {
            idle: Self::default_idle(),
            session: None,
        }
    }
}

impl FieldServerSMTPTimeoutClient {
    pub(crate) const fn default_idle() -> std::time::Duration {
        std::time::Duration::from_secs(5 * 60)
    }
}

impl Default for FieldServerSMTPAuth {
    fn default() -> Self {
        Self {
            require_authentication: false,
            mechanisms: Self::default_mechanisms(),
            enable_dangerous_mechanism_in_clair: Self::default_enable_dangerous_mechanism_in_clair(
            ),
        }
    }
}

impl FieldServerSMTPAuth {
    pub(crate) fn default_mechanisms() -> Vec<Mechanism> {
        <Mechanism as strum::IntoEnumIterator>::iter().collect()
    }

    pub(crate) const fn default_enable_dangerous_mechanism_in_clair() -> bool {
        true
    }
}

impl Default for FieldServerSMTP {
    fn default() -> Self {
        Self {
            rcpt_count_max: Self::default_rcpt_count_max(),
            default_encoding: vcatch_protocol::Encoding::default(),
            close_on_size_exceeded: false,
            rejected_recipients: vec![],
            error: FieldServerSMTPError::default(),
            timeout_client: FieldServerSMTPTimeoutClient::default(),
            codes: Self::default_smtp_codes(),
            auth: FieldServerSMTPAuth::default(),
        }
    }
}

impl FieldServerSMTP {
    pub(crate) const fn default_rcpt_count_max() -> usize {
        1000
    }

    pub(crate) fn default_smtp_codes() -> std::collections::BTreeMap<CodeID, Reply> {
        <CodeID as strum::IntoEnumIterator>::iter()
            .map(|code| (code, Self::default_reply(code)))
            .collect()
    }

    /// Reply sent for `code` when the configuration does not override it.
    pub fn default_reply(code: CodeID) -> Reply {
        let simple = |code| ReplyCode::Code { code };
        let enhanced = |code, enhanced: &str| ReplyCode::Enhanced {
            code,
            enhanced: enhanced.to_string(),
        };

        match code {
            CodeID::Greetings => Reply::new(simple(220), "{domain} Service ready"),
            CodeID::Help => Reply::new(
                simple(214),
                "Commands: HELO EHLO MAIL RCPT DATA RSET NOOP QUIT VRFY HELP",
            ),
            CodeID::Closing => Reply::new(simple(221), "Service closing transmission channel"),
            CodeID::Helo | CodeID::Ok => Reply::new(simple(250), "Ok"),
            CodeID::DataStart => {
                Reply::new(simple(354), "Start mail input; end with <CRLF>.<CRLF>")
            }
            CodeID::CannotVerify => Reply::new(
                simple(252),
                "Cannot VRFY user, but will accept message and attempt delivery",
            ),
            CodeID::Failure => Reply::new(
                simple(451),
                "Requested action aborted: local error in processing",
            ),
            CodeID::MailboxUnavailable => Reply::new(simple(550), "Mailbox unavailable"),
            CodeID::UnrecognizedCommand => {
                Reply::new(simple(500), "Syntax error command unrecognized")
            }
            CodeID::SyntaxErrorParams => {
                Reply::new(simple(501), "Syntax error in parameters or arguments")
            }
            CodeID::ParameterUnimplemented => {
                Reply::new(simple(504), "Command parameter not implemented")
            }
            CodeID::Unimplemented => Reply::new(simple(502), "Command not implemented"),
            CodeID::BadSequence => Reply::new(simple(503), "Bad sequence of commands"),
            CodeID::LineTooLong => Reply::new(simple(500), "Line too long"),
            CodeID::MessageSizeExceeded => Reply::new(
                enhanced(552, "4.3.1"),
                "Message size exceeds fixed maximum message size",
            ),
            CodeID::TooManyRecipients => Reply::new(
                simple(452),
                "Requested action not taken: too many recipients",
            ),
            CodeID::ConnectionMaxReached => Reply::new(
                simple(421),
                "Service not available, closing transmission channel",
            ),
            CodeID::TooManyError => Reply::new(simple(451), "Too many errors from the client"),
            CodeID::Timeout => Reply::new(simple(421), "{domain} Timeout - closing connection"),
            CodeID::ShuttingDown => Reply::new(simple(421), "{domain} Service shutting down"),
            CodeID::TlsGoAhead => Reply::new(simple(220), "TLS go ahead"),
            CodeID::TlsNotAvailable => {
                Reply::new(simple(454), "TLS not available due to temporary reason")
            }
            CodeID::TlsRequired => Reply::new(simple(530), "Must issue a STARTTLS command first"),
            CodeID::PipelinedStartTls => Reply::new(
                enhanced(501, "5.5.2"),
                "Pipelining after STARTTLS is not allowed",
            ),
            CodeID::AuthSucceeded => {
                Reply::new(enhanced(235, "2.7.0"), "Authentication succeeded")
            }
            CodeID::AuthMechNotSupported => {
                Reply::new(enhanced(504, "5.5.4"), "Mechanism is not supported")
            }
            CodeID::AuthClientCanceled => {
                Reply::new(simple(501), "Authentication canceled by client")
            }
            CodeID::AuthMechanismMustBeEncrypted => Reply::new(
                enhanced(538, "5.7.11"),
                "Encryption required for requested authentication mechanism",
            ),
            CodeID::AuthInvalidCredentials => Reply::new(
                enhanced(535, "5.7.8"),
                "Authentication credentials invalid",
            ),
            CodeID::AuthRequired => Reply::new(enhanced(530, "5.7.0"), "Authentication required"),
            CodeID::AuthErrorDecode64 => Reply::new(enhanced(501, "5.5.2"), "Invalid, not base64"),
        }
    }
}

impl Default for FieldServerStore {
    fn default() -> Self {
        Self {
            message_count_max: Self::default_message_count_max(),
        }
    }
}

impl FieldServerStore {
    pub(crate) const fn default_message_count_max() -> usize {
        100
    }
}

impl RelayTarget {
    pub(crate) const fn default_port() -> u16 {
        vcatch_common::SMTP_PORT
    }
}

impl FieldRelay {
    pub(crate) const fn default_timeout() -> std::time::Duration {
        std::time::Duration::from_secs(30)
    }
}
