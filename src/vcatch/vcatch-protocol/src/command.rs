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

use vcatch_common::Address;

/// Arguments of a command, as received.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UnparsedArgs(pub String);

/// A command line split in its keyword and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Upper-cased first word of the line.
    pub keyword: String,
    /// The rest of the line, the separating space excluded.
    pub args: UnparsedArgs,
}

impl Command {
    /// Split a line, CRLF already stripped.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let (keyword, args) = line.split_once(' ').unwrap_or((line, ""));
        Self {
            keyword: keyword.to_ascii_uppercase(),
            args: UnparsedArgs(args.to_string()),
        }
    }
}

/// Identity of the client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum ClientName {
    /// FQDN of the client.
    Domain(String),
    /// IP address of the client.
    Ip4(std::net::Ipv4Addr),
    /// IP address of the client.
    Ip6(std::net::Ipv6Addr),
}

impl std::fmt::Display for ClientName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Domain(domain) => write!(f, "{domain}"),
            Self::Ip4(ip) => write!(f, "[{ip}]"),
            Self::Ip6(ip) => write!(f, "[IPv6:{ip}]"),
        }
    }
}

/// Information received from the client at the HELO or EHLO command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeloArgs {
    /// Name of the client.
    pub client_name: ClientName,
}

/// A `KEYWORD[=value]` parameter of MAIL FROM or RCPT TO.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailParameter {
    /// Upper-cased keyword.
    pub keyword: String,
    ///
    pub value: Option<String>,
}

/// Information received from the client at the MAIL FROM command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailFromArgs {
    /// Sender address, `None` for the null reverse path `<>`.
    pub reverse_path: Option<Address>,
    /// ESMTP parameters, in order.
    pub params: Vec<MailParameter>,
}

/// Information received from the client at the RCPT TO command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RcptToArgs {
    /// Recipient address.
    pub forward_path: Address,
    /// ESMTP parameters, in order.
    pub params: Vec<MailParameter>,
}

/// Information received from the client at the AUTH command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthArgs {
    /// Authentication mechanism.
    pub mechanism: vcatch_common::auth::Mechanism,
    /// First buffer of the challenge, optionally issued by the client.
    /// [`base64`](https://datatracker.ietf.org/doc/html/rfc4648) encoded buffer.
    pub initial_response: Option<String>,
}

/// Error while parsing the arguments of a command.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseArgsError {
    /// The command expects an argument.
    #[error("missing argument")]
    MissingArgument,
    /// The command does not take any argument.
    #[error("unexpected argument '{0}'")]
    UnexpectedArgument(String),
    /// Invalid IP address literal.
    #[error("invalid address literal '{0}'")]
    BadTypeAddr(String),
    /// Invalid domain.
    #[error("invalid domain '{0}'")]
    InvalidDomain(String),
    /// Invalid mailbox.
    #[error("invalid mailbox '{0}'")]
    InvalidMailbox(String),
    /// The mechanism is unknown.
    #[error("unknown mechanism '{0}'")]
    InvalidMechanism(String),
    /// Other.
    #[error("invalid arguments '{0}'")]
    InvalidArgs(String),
}

impl UnparsedArgs {
    /// # Errors
    ///
    /// * the command has an argument (surrounding spaces are ignored)
    pub fn expect_empty(&self) -> Result<(), ParseArgsError> {
        let args = self.0.trim();
        if args.is_empty() {
            Ok(())
        } else {
            Err(ParseArgsError::UnexpectedArgument(args.to_string()))
        }
    }
}

impl TryFrom<UnparsedArgs> for HeloArgs {
    type Error = ParseArgsError;

    fn try_from(value: UnparsedArgs) -> Result<Self, Self::Error> {
        let value = value.0.trim();
        if value.is_empty() {
            return Err(ParseArgsError::MissingArgument);
        }
        if value.contains(char::is_whitespace) {
            return Err(ParseArgsError::InvalidArgs(value.to_string()));
        }

        let bad_literal = |_| ParseArgsError::BadTypeAddr(value.to_string());

        let client_name = match value {
            ipv6 if ipv6.to_ascii_lowercase().starts_with("[ipv6:") && ipv6.ends_with(']') => {
                ClientName::Ip6(
                    ipv6["[IPv6:".len()..ipv6.len() - 1]
                        .parse::<std::net::Ipv6Addr>()
                        .map_err(bad_literal)?,
                )
            }
            ipv4 if ipv4.starts_with('[') && ipv4.ends_with(']') => ClientName::Ip4(
                ipv4[1..ipv4.len() - 1]
                    .parse::<std::net::Ipv4Addr>()
                    .map_err(bad_literal)?,
            ),
            domain => ClientName::Domain(
                addr::parse_domain_name(domain)
                    .map_err(|_| ParseArgsError::InvalidDomain(domain.to_string()))?
                    .to_string(),
            ),
        };

        Ok(Self { client_name })
    }
}

/// Remove a case insensitive `prefix` ("FROM:" or "TO:"), and the spaces after it.
fn strip_prefix_ignore_case<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    if value.len() >= prefix.len()
        && value.is_char_boundary(prefix.len())
        && value[..prefix.len()].eq_ignore_ascii_case(prefix)
    {
        Some(value[prefix.len()..].trim_start())
    } else {
        None
    }
}

/// Split `<path> [params]` in the path (brackets removed) and its parameters.
fn split_path(value: &str) -> Result<(&str, Vec<MailParameter>), ParseArgsError> {
    let invalid = || ParseArgsError::InvalidArgs(value.to_string());

    let inner = value.strip_prefix('<').ok_or_else(invalid)?;
    let end = inner.find('>').ok_or_else(invalid)?;
    let (path, rest) = (&inner[..end], &inner[end + 1..]);

    if !rest.is_empty() && !rest.starts_with(' ') {
        return Err(invalid());
    }

    let params = rest
        .split_whitespace()
        .map(|param| {
            let (keyword, value) = param
                .split_once('=')
                .map_or((param, None), |(k, v)| (k, Some(v.to_string())));
            if keyword.is_empty() || !keyword.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
            {
                return Err(ParseArgsError::InvalidArgs(param.to_string()));
            }
            Ok(MailParameter {
                keyword: keyword.to_ascii_uppercase(),
                value,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    // source route, obsolete but still allowed by rfc5321: `<@a,@b:user@domain>`
    let path = match path.strip_prefix('@') {
        Some(route) => route.split_once(':').map_or(path, |(_, mailbox)| mailbox),
        None => path,
    };

    Ok((path, params))
}

fn parse_mailbox(path: &str) -> Result<Address, ParseArgsError> {
    path.parse::<Address>()
        .map_err(|_| ParseArgsError::InvalidMailbox(path.to_string()))
}

impl TryFrom<UnparsedArgs> for MailFromArgs {
    type Error = ParseArgsError;

    fn try_from(value: UnparsedArgs) -> Result<Self, Self::Error> {
        let value = value.0.trim();
        let value = strip_prefix_ignore_case(value, "FROM:")
            .ok_or_else(|| ParseArgsError::InvalidArgs(value.to_string()))?;

        let (path, params) = split_path(value)?;
        Ok(Self {
            reverse_path: if path.is_empty() {
                None
            } else {
                Some(parse_mailbox(path)?)
            },
            params,
        })
    }
}

impl TryFrom<UnparsedArgs> for RcptToArgs {
    type Error = ParseArgsError;

    fn try_from(value: UnparsedArgs) -> Result<Self, Self::Error> {
        let value = value.0.trim();
        let value = strip_prefix_ignore_case(value, "TO:")
            .ok_or_else(|| ParseArgsError::InvalidArgs(value.to_string()))?;

        let (path, params) = split_path(value)?;
        Ok(Self {
            forward_path: parse_mailbox(path)?,
            params,
        })
    }
}

impl TryFrom<UnparsedArgs> for AuthArgs {
    type Error = ParseArgsError;

    fn try_from(value: UnparsedArgs) -> Result<Self, Self::Error> {
        let value = value.0.trim();
        if value.is_empty() {
            return Err(ParseArgsError::MissingArgument);
        }

        let (mechanism, initial_response) = value
            .split_once(char::is_whitespace)
            .map_or((value, None), |(mechanism, initial_response)| {
                (mechanism, Some(initial_response.trim().to_string()))
            });

        Ok(Self {
            mechanism: mechanism
                .parse()
                .map_err(|_| ParseArgsError::InvalidMechanism(mechanism.to_string()))?,
            initial_response,
        })
    }
}
