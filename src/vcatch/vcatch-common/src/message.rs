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

use crate::{Address, Session};

/// Lifecycle of a [`Message`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, strum::Display,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageState {
    /// envelope and body can still be modified
    Open,
    /// handed to the storage
    Committed,
    /// dropped by RSET, QUIT, a new MAIL FROM, a limit or a transport error
    Aborted,
}

/// Value of the `BODY=` parameter of MAIL FROM (RFC6152)
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum BodyType {
    ///
    #[default]
    #[strum(serialize = "7BIT")]
    SevenBit,
    ///
    #[strum(serialize = "8BITMIME")]
    EightBitMime,
}

/// Error produced when modifying a [`Message`] which is not [`MessageState::Open`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MessageError {
    /// the message reached a terminal state
    #[error("message is {state}, no further mutation is allowed")]
    NotOpen {
        /// current state
        state: MessageState,
    },
}

/// One mail transaction: the envelope and the body received with DATA.
#[serde_with::serde_as]
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Message {
    id: uuid::Uuid,
    #[serde(with = "time::serde::rfc3339")]
    received_at: time::OffsetDateTime,
    session_id: uuid::Uuid,
    client_addr: std::net::SocketAddr,
    client_domain: Option<String>,
    secured: bool,
    authenticated_identity: Option<String>,
    sender: Option<Address>,
    recipients: Vec<Address>,
    declared_size: Option<usize>,
    body_type: BodyType,
    utf8: bool,
    #[serde_as(as = "serde_with::base64::Base64")]
    body: Vec<u8>,
    state: MessageState,
}

impl Message {
    /// Start a transaction on `session`, `sender` is `None` for the null reverse path `<>`.
    #[must_use]
    pub fn new(session: &Session, sender: Option<Address>) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            received_at: time::OffsetDateTime::now_utc(),
            session_id: *session.id(),
            client_addr: *session.client_addr(),
            client_domain: session.client_domain().map(str::to_string),
            secured: session.is_secured(),
            authenticated_identity: session.authenticated_identity().map(str::to_string),
            sender,
            recipients: vec![],
            declared_size: None,
            body_type: BodyType::default(),
            utf8: false,
            body: vec![],
            state: MessageState::Open,
        }
    }

    const fn ensure_open(&self) -> Result<(), MessageError> {
        match self.state {
            MessageState::Open => Ok(()),
            state => Err(MessageError::NotOpen { state }),
        }
    }

    ///
    #[must_use]
    pub const fn id(&self) -> &uuid::Uuid {
        &self.id
    }

    ///
    #[must_use]
    pub const fn received_at(&self) -> &time::OffsetDateTime {
        &self.received_at
    }

    /// Identifier of the session which produced this message.
    #[must_use]
    pub const fn session_id(&self) -> &uuid::Uuid {
        &self.session_id
    }

    ///
    #[must_use]
    pub const fn client_addr(&self) -> &std::net::SocketAddr {
        &self.client_addr
    }

    ///
    #[must_use]
    pub fn client_domain(&self) -> Option<&str> {
        self.client_domain.as_deref()
    }

    /// Was the message received on an encrypted transport ?
    #[must_use]
    pub const fn is_secured(&self) -> bool {
        self.secured
    }

    ///
    #[must_use]
    pub fn authenticated_identity(&self) -> Option<&str> {
        self.authenticated_identity.as_deref()
    }

    /// Reverse path, `None` for the null sender.
    #[must_use]
    pub const fn sender(&self) -> Option<&Address> {
        self.sender.as_ref()
    }

    /// Recipients in the order of the RCPT TO commands, duplicates included.
    #[must_use]
    pub fn recipients(&self) -> &[Address] {
        &self.recipients
    }

    /// Raw body, after dot-unstuffing.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    ///
    #[must_use]
    pub const fn state(&self) -> MessageState {
        self.state
    }

    /// Size announced with the `SIZE=` parameter.
    #[must_use]
    pub const fn declared_size(&self) -> Option<usize> {
        self.declared_size
    }

    ///
    #[must_use]
    pub const fn body_type(&self) -> BodyType {
        self.body_type
    }

    /// Was the `SMTPUTF8` parameter received ?
    #[must_use]
    pub const fn is_utf8(&self) -> bool {
        self.utf8
    }

    /// Value of the first `Subject:` header, if any.
    #[must_use]
    pub fn subject(&self) -> Option<String> {
        String::from_utf8_lossy(&self.body)
            .split("\r\n")
            .take_while(|line| !line.is_empty())
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("subject")
                    .then(|| value.trim().to_string())
            })
    }

    ///
    /// # Errors
    ///
    /// * the message is not open
    pub fn add_recipient(&mut self, recipient: Address) -> Result<(), MessageError> {
        self.ensure_open()?;
        self.recipients.push(recipient);
        Ok(())
    }

    ///
    /// # Errors
    ///
    /// * the message is not open
    pub fn set_declared_size(&mut self, size: usize) -> Result<(), MessageError> {
        self.ensure_open()?;
        self.declared_size = Some(size);
        Ok(())
    }

    ///
    /// # Errors
    ///
    /// * the message is not open
    pub fn set_body_type(&mut self, body_type: BodyType) -> Result<(), MessageError> {
        self.ensure_open()?;
        self.body_type = body_type;
        Ok(())
    }

    ///
    /// # Errors
    ///
    /// * the message is not open
    pub fn set_utf8(&mut self) -> Result<(), MessageError> {
        self.ensure_open()?;
        self.utf8 = true;
        Ok(())
    }

    /// Append raw octets at the end of the body.
    ///
    /// # Errors
    ///
    /// * the message is not open
    pub fn append_body(&mut self, bytes: &[u8]) -> Result<(), MessageError> {
        self.ensure_open()?;
        self.body.extend_from_slice(bytes);
        Ok(())
    }

    /// Mark the message as complete, [`Message::received_at`] is the time of the commit.
    ///
    /// # Errors
    ///
    /// * the message is not open
    pub fn commit(&mut self) -> Result<(), MessageError> {
        self.ensure_open()?;
        self.received_at = time::OffsetDateTime::now_utc();
        self.state = MessageState::Committed;
        Ok(())
    }

    /// Drop the message, the received body is released.
    ///
    /// # Errors
    ///
    /// * the message is not open
    pub fn abort(&mut self) -> Result<(), MessageError> {
        self.ensure_open()?;
        self.state = MessageState::Aborted;
        self.body = vec![];
        Ok(())
    }
}
