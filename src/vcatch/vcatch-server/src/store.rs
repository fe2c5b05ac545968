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

use vcatch_common::{
    store::{
        MessageEvent, MessageFilter, MessageStore, MessageSummary, Page, SortOrder, StoreError,
        StoredMessage,
    },
    Message, RelayRecord,
};

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// [`MessageStore`] keeping the `message_count_max` most recent messages in memory.
pub struct InMemoryStore {
    message_count_max: usize,
    messages: tokio::sync::RwLock<Vec<StoredMessage>>,
    events: tokio::sync::broadcast::Sender<MessageEvent>,
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStore")
            .field("message_count_max", &self.message_count_max)
            .finish_non_exhaustive()
    }
}

impl InMemoryStore {
    ///
    #[must_use]
    pub fn new(message_count_max: usize) -> Self {
        let (events, _) = tokio::sync::broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            message_count_max,
            messages: tokio::sync::RwLock::new(vec![]),
            events,
        }
    }

    /// Receive the changes made to the store from now on.
    #[must_use]
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<MessageEvent> {
        self.events.subscribe()
    }

    fn notify(&self, event: MessageEvent) {
        // no subscriber is not an error
        let _ = self.events.send(event);
    }

    fn matches(filter: &MessageFilter, stored: &StoredMessage) -> bool {
        if filter.unread_only && !stored.is_unread {
            return false;
        }

        let Some(search) = filter.search.as_ref().map(|i| i.to_lowercase()) else {
            return true;
        };
        let message = &stored.message;

        message
            .sender()
            .map(|sender| sender.full().to_lowercase())
            .into_iter()
            .chain(message.recipients().iter().map(|i| i.full().to_lowercase()))
            .chain(message.subject().map(|subject| subject.to_lowercase()))
            .any(|field| field.contains(&search))
    }
}

#[async_trait::async_trait]
impl MessageStore for InMemoryStore {
    async fn save(&self, message: Message) -> Result<(), StoreError> {
        let id = *message.id();
        let pruned = {
            let mut messages = self.messages.write().await;
            messages.push(StoredMessage {
                message,
                is_unread: true,
                relays: vec![],
            });

            let excess = messages.len().saturating_sub(self.message_count_max);
            messages
                .drain(..excess)
                .map(|stored| *stored.message.id())
                .collect::<Vec<_>>()
        };

        self.notify(MessageEvent::Added { id });
        for id in pruned {
            tracing::debug!(message = %id, "Oldest message pruned.");
            self.notify(MessageEvent::Deleted { id });
        }
        Ok(())
    }

    async fn get(&self, id: &uuid::Uuid) -> Result<StoredMessage, StoreError> {
        self.messages
            .read()
            .await
            .iter()
            .find(|stored| stored.message.id() == id)
            .cloned()
            .ok_or(StoreError::NotFound(*id))
    }

    async fn delete(&self, id: &uuid::Uuid) -> Result<(), StoreError> {
        {
            let mut messages = self.messages.write().await;
            let position = messages
                .iter()
                .position(|stored| stored.message.id() == id)
                .ok_or(StoreError::NotFound(*id))?;
            messages.remove(position);
        }

        self.notify(MessageEvent::Deleted { id: *id });
        Ok(())
    }

    async fn delete_all(&self) -> Result<(), StoreError> {
        self.messages.write().await.clear();
        self.notify(MessageEvent::Cleared);
        Ok(())
    }

    async fn mark_read(&self, id: &uuid::Uuid) -> Result<(), StoreError> {
        {
            let mut messages = self.messages.write().await;
            let stored = messages
                .iter_mut()
                .find(|stored| stored.message.id() == id)
                .ok_or(StoreError::NotFound(*id))?;
            if !stored.is_unread {
                return Ok(());
            }
            stored.is_unread = false;
        }

        self.notify(MessageEvent::Read { id: *id });
        Ok(())
    }

    async fn record_relays(
        &self,
        id: &uuid::Uuid,
        relays: Vec<RelayRecord>,
    ) -> Result<(), StoreError> {
        {
            let mut messages = self.messages.write().await;
            let stored = messages
                .iter_mut()
                .find(|stored| stored.message.id() == id)
                .ok_or(StoreError::NotFound(*id))?;
            stored.relays.extend(relays);
        }

        self.notify(MessageEvent::Relayed { id: *id });
        Ok(())
    }

    async fn list_paged(
        &self,
        filter: &MessageFilter,
        sort: SortOrder,
        page: usize,
        page_size: usize,
    ) -> Result<Page<MessageSummary>, StoreError> {
        let page = page.max(1);
        let messages = self.messages.read().await;

        let mut matching = messages
            .iter()
            .filter(|stored| Self::matches(filter, stored))
            .collect::<Vec<_>>();
        // stable, the order of arrival decides between equal timestamps
        matching.sort_by_key(|stored| *stored.message.received_at());
        if sort == SortOrder::Descending {
            matching.reverse();
        }

        Ok(Page {
            total: matching.len(),
            items: matching
                .into_iter()
                .skip((page - 1).saturating_mul(page_size))
                .take(page_size)
                .map(MessageSummary::from)
                .collect(),
            page,
            page_size,
        })
    }
}
