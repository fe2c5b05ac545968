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

use crate::{Message, RelayRecord};

/// Error returned by a [`MessageStore`]
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// no message with this id
    #[error("message '{0}' not found")]
    NotFound(uuid::Uuid),
    /// the backend cannot process the request
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// A committed message and what happened to it afterward.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StoredMessage {
    ///
    pub message: Message,
    ///
    pub is_unread: bool,
    /// successful relays, in order of insertion
    pub relays: Vec<RelayRecord>,
}

/// Lightweight view of a [`StoredMessage`] for listings.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MessageSummary {
    ///
    pub id: uuid::Uuid,
    ///
    #[serde(with = "time::serde::rfc3339")]
    pub received_at: time::OffsetDateTime,
    ///
    pub sender: Option<String>,
    ///
    pub recipients: Vec<String>,
    ///
    pub subject: Option<String>,
    ///
    pub size: usize,
    ///
    pub is_unread: bool,
    ///
    pub is_relayed: bool,
}

impl From<&StoredMessage> for MessageSummary {
    fn from(value: &StoredMessage) -> Self {
        Self {
            id: *value.message.id(),
            received_at: *value.message.received_at(),
            sender: value.message.sender().map(ToString::to_string),
            recipients: value
                .message
                .recipients()
                .iter()
                .map(ToString::to_string)
                .collect(),
            subject: value.message.subject(),
            size: value.message.body().len(),
            is_unread: value.is_unread,
            is_relayed: !value.relays.is_empty(),
        }
    }
}

/// Order of a listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// oldest first
    Ascending,
    /// newest first
    #[default]
    Descending,
}

/// Criteria of a listing, `None` matches every message.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MessageFilter {
    /// case insensitive substring of the sender, a recipient or the subject
    pub search: Option<String>,
    ///
    pub unread_only: bool,
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Page<T> {
    ///
    pub items: Vec<T>,
    /// index of this page, starting at 1
    pub page: usize,
    ///
    pub page_size: usize,
    /// number of items matching the filter, all pages included
    pub total: usize,
}

/// Change notified by a [`MessageStore`].
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum MessageEvent {
    ///
    Added {
        ///
        id: uuid::Uuid,
    },
    ///
    Deleted {
        ///
        id: uuid::Uuid,
    },
    ///
    Read {
        ///
        id: uuid::Uuid,
    },
    ///
    Relayed {
        ///
        id: uuid::Uuid,
    },
    /// every message has been deleted
    Cleared,
}

/// Persistence of the captured messages.
///
/// The connections only call [`MessageStore::save`], every other operation is used by
/// the management layer. Implementations serialize their own writes.
#[async_trait::async_trait]
pub trait MessageStore: Send + Sync {
    /// Store a committed message.
    async fn save(&self, message: Message) -> Result<(), StoreError>;

    /// Fetch a message by its id.
    async fn get(&self, id: &uuid::Uuid) -> Result<StoredMessage, StoreError>;

    /// Remove a message.
    async fn delete(&self, id: &uuid::Uuid) -> Result<(), StoreError>;

    /// Remove every message.
    async fn delete_all(&self) -> Result<(), StoreError>;

    /// Clear the unread flag of a message.
    async fn mark_read(&self, id: &uuid::Uuid) -> Result<(), StoreError>;

    /// Append successful relays to a message.
    async fn record_relays(
        &self,
        id: &uuid::Uuid,
        relays: Vec<RelayRecord>,
    ) -> Result<(), StoreError>;

    /// List the messages matching `filter`, `page` starts at 1.
    async fn list_paged(
        &self,
        filter: &MessageFilter,
        sort: SortOrder,
        page: usize,
        page_size: usize,
    ) -> Result<Page<MessageSummary>, StoreError>;
}
