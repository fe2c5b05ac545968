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
use base64::{engine::general_purpose::STANDARD, Engine};
use vcatch_common::{
    auth::{Credentials, Mechanism},
    CodeID, Phase, Reply, ReplyCode, Session,
};
use vcatch_config::field::{ExtensionKind, FieldServerSMTPAuth};
use vcatch_protocol::{AuthArgs, Error, ParseArgsError, UnparsedArgs};
extern crate alloc;

/// Maximum length of a line of the SASL exchange.
///
/// Defined in [RFC4954](https://www.rfc-editor.org/rfc/rfc4954#section-4)
const AUTH_LINE_MAX: usize = 12288;

/// SMTP service extension for authentication.
///
/// Every credentials are accepted, the identity claimed is recorded on the session.
///
/// See <https://datatracker.ietf.org/doc/html/rfc4954>
#[derive(Debug)]
pub struct Auth {
    config: FieldServerSMTPAuth,
}

impl Auth {
    ///
    #[must_use]
    pub const fn new(config: FieldServerSMTPAuth) -> Self {
        Self { config }
    }

    fn is_allowed(config: &FieldServerSMTPAuth, mechanism: Mechanism, session: &Session) -> bool {
        !mechanism.must_be_under_tls()
            || session.is_secured()
            || config.enable_dangerous_mechanism_in_clair
    }
}

#[async_trait::async_trait]
impl Extension for Auth {
    fn kind(&self) -> ExtensionKind {
        ExtensionKind::Auth
    }

    fn capability(&self, session: &Session) -> Option<String> {
        if session.is_authenticated() {
            return None;
        }

        let mechanisms = self
            .config
            .mechanisms
            .iter()
            .filter(|mechanism| Self::is_allowed(&self.config, **mechanism, session))
            .map(ToString::to_string)
            .collect::<Vec<_>>();

        (!mechanisms.is_empty()).then(|| format!("AUTH {}", mechanisms.join(" ")))
    }

    fn register_verbs(self: alloc::sync::Arc<Self>, verbs: &mut VerbMap) {
        if self.config.require_authentication {
            verbs.shadow(alloc::sync::Arc::new(AuthRequired), None);
        }
        verbs.register(
            alloc::sync::Arc::new(AuthVerb {
                config: self.config.clone(),
            }),
            Some(self),
        );
    }

    async fn on_activated(&self, conn: &mut Connection, activation: Activation) -> Result<(), Error> {
        if let Activation::Authenticated(credentials) = activation {
            tracing::info!(identity = credentials.identity(), "Client authenticated.");
            conn.session_mut().set_authenticated(credentials);
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
enum AuthExchangeError {
    #[error("authentication invalid")]
    Failed,
    #[error("authentication cancelled")]
    Canceled,
    #[error("base64 decoding error")]
    InvalidBase64,
    #[error("client started the authentication but server did not send any challenge: `{0}`")]
    ClientMustNotStart(Mechanism),
    #[error("response line too long")]
    LineTooLong,
    #[error("error while reading the response: `{0}`")]
    Transport(Error),
}

impl From<Error> for AuthExchangeError {
    fn from(value: Error) -> Self {
        match value {
            Error::BufferTooLong { .. } => Self::LineTooLong,
            otherwise => Self::Transport(otherwise),
        }
    }
}

/// Decode one client response, `*` cancels the exchange and `=` is the empty response.
fn decode_response(buffer: &[u8]) -> Result<Vec<u8>, AuthExchangeError> {
    match buffer {
        b"*" => Err(AuthExchangeError::Canceled),
        b"=" => Ok(vec![]),
        _ => STANDARD
            .decode(buffer)
            .map_err(|_| AuthExchangeError::InvalidBase64),
    }
}

fn to_utf8(buffer: Vec<u8>) -> Result<String, AuthExchangeError> {
    String::from_utf8(buffer).map_err(|_| AuthExchangeError::Failed)
}

/// `[authzid] NUL authcid NUL passwd`
fn parse_plain(buffer: Vec<u8>) -> Result<Credentials, AuthExchangeError> {
    let message = to_utf8(buffer)?;
    let mut fields = message.split('\0');

    match (fields.next(), fields.next(), fields.next(), fields.next()) {
        (Some(_authzid), Some(authid), Some(authpass), None) if !authid.is_empty() => {
            Ok(Credentials::Verify {
                authid: authid.to_string(),
                authpass: authpass.to_string(),
            })
        }
        _ => Err(AuthExchangeError::Failed),
    }
}

/// `user SP digest`
fn parse_cram_md5(buffer: Vec<u8>) -> Result<Credentials, AuthExchangeError> {
    let message = to_utf8(buffer)?;
    match message.rsplit_once(' ') {
        Some((authid, digest)) if !authid.is_empty() && !digest.is_empty() => {
            Ok(Credentials::Challenge {
                authid: authid.to_string(),
                digest: digest.to_string(),
            })
        }
        _ => Err(AuthExchangeError::Failed),
    }
}

async fn challenge(conn: &mut Connection, payload: &[u8]) -> Result<Vec<u8>, AuthExchangeError> {
    conn.send_reply(Reply::new(
        ReplyCode::Code { code: 334 },
        STANDARD.encode(payload),
    ))
    .await?;

    let response = conn.read_line_bytes(AUTH_LINE_MAX).await?;
    decode_response(&response)
}

async fn initial_or_challenge(
    conn: &mut Connection,
    initial_response: Option<String>,
    payload: &[u8],
) -> Result<Vec<u8>, AuthExchangeError> {
    match initial_response {
        Some(initial_response) => decode_response(initial_response.as_bytes()),
        None => challenge(conn, payload).await,
    }
}

#[tracing::instrument(name = "sasl-exchange", skip(conn, initial_response))]
async fn exchange(
    conn: &mut Connection,
    mechanism: Mechanism,
    initial_response: Option<String>,
) -> Result<Credentials, AuthExchangeError> {
    match mechanism {
        Mechanism::Plain => {
            parse_plain(initial_or_challenge(conn, initial_response, b"").await?)
        }
        Mechanism::Login => {
            let authid =
                to_utf8(initial_or_challenge(conn, initial_response, b"Username:").await?)?;
            let authpass = to_utf8(challenge(conn, b"Password:").await?)?;
            if authid.is_empty() {
                return Err(AuthExchangeError::Failed);
            }
            Ok(Credentials::Verify { authid, authpass })
        }
        Mechanism::CramMd5 => {
            if initial_response.is_some() {
                return Err(AuthExchangeError::ClientMustNotStart(mechanism));
            }
            let nonce = format!(
                "<{}.{}@{}>",
                uuid::Uuid::new_v4().simple(),
                time::OffsetDateTime::now_utc().unix_timestamp(),
                conn.config().server.domain
            );
            parse_cram_md5(challenge(conn, nonce.as_bytes()).await?)
        }
        Mechanism::Anonymous => Ok(Credentials::AnonymousToken {
            token: to_utf8(initial_or_challenge(conn, initial_response, b"").await?)?,
        }),
    }
}

struct AuthVerb {
    config: FieldServerSMTPAuth,
}

#[async_trait::async_trait]
impl Verb for AuthVerb {
    fn keyword(&self) -> &'static str {
        "AUTH"
    }

    fn is_applicable(&self, session: &Session) -> bool {
        !session.is_authenticated() && session.phase() == Phase::Greeted
    }

    async fn execute(&self, conn: &mut Connection, args: UnparsedArgs) -> Result<Flow, Error> {
        let AuthArgs {
            mechanism,
            initial_response,
        } = match AuthArgs::try_from(args) {
            Ok(args) => args,
            Err(ParseArgsError::InvalidMechanism(mechanism)) => {
                tracing::debug!(%mechanism, "Unknown mechanism.");
                conn.send_code(CodeID::AuthMechNotSupported).await?;
                return Ok(Flow::Continue);
            }
            Err(error) => {
                tracing::debug!(%error, "Invalid AUTH.");
                conn.send_code(CodeID::SyntaxErrorParams).await?;
                return Ok(Flow::Continue);
            }
        };

        if !self.config.mechanisms.contains(&mechanism) {
            conn.send_code(CodeID::AuthMechNotSupported).await?;
            return Ok(Flow::Continue);
        }
        if !Auth::is_allowed(&self.config, mechanism, conn.session()) {
            conn.send_code(CodeID::AuthMechanismMustBeEncrypted).await?;
            return Ok(Flow::Continue);
        }
        if mechanism.must_be_under_tls() && !conn.session().is_secured() {
            tracing::warn!(
                %mechanism,
                "An unsecured AUTH mechanism is used on a non-encrypted connection!"
            );
        }

        let code = match exchange(conn, mechanism, initial_response).await {
            Ok(credentials) => {
                conn.send_code(CodeID::AuthSucceeded).await?;
                return Ok(Flow::Activated(Activation::Authenticated(credentials)));
            }
            Err(AuthExchangeError::Transport(error)) => return Err(error),
            Err(AuthExchangeError::Canceled) => CodeID::AuthClientCanceled,
            Err(AuthExchangeError::InvalidBase64) => CodeID::AuthErrorDecode64,
            Err(AuthExchangeError::Failed) => CodeID::AuthInvalidCredentials,
            Err(AuthExchangeError::ClientMustNotStart(_)) => CodeID::SyntaxErrorParams,
            Err(AuthExchangeError::LineTooLong) => CodeID::LineTooLong,
        };

        tracing::info!(%mechanism, %code, "Authentication failed.");
        conn.send_code(code).await?;
        Ok(Flow::Continue)
    }
}

/// MAIL FROM refused until the client is authenticated.
struct AuthRequired;

#[async_trait::async_trait]
impl Verb for AuthRequired {
    fn keyword(&self) -> &'static str {
        "MAIL"
    }

    fn is_applicable(&self, session: &Session) -> bool {
        !session.is_authenticated() && session.phase() == Phase::Greeted
    }

    async fn execute(&self, conn: &mut Connection, _: UnparsedArgs) -> Result<Flow, Error> {
        conn.send_code(CodeID::AuthRequired).await?;
        Ok(Flow::Continue)
    }
}
