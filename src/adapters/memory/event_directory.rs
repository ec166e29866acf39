use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, EventId, UserId};
use crate::ports::{EventDirectory, EventSummary, UserContact};

#[derive(Default)]
pub struct InMemoryEventDirectory {
    events: RwLock<HashMap<EventId, EventSummary>>,
    contacts: RwLock<HashMap<UserId, UserContact>>,
}

impl InMemoryEventDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_event(&self, title: impl Into<String>) -> EventId {
        let id = EventId::new();
        self.events.write().await.insert(
            id,
            EventSummary {
                id,
                title: title.into(),
            },
        );
        id
    }

    pub async fn add_contact(&self, contact: UserContact) {
        self.contacts
            .write()
            .await
            .insert(contact.user_id.clone(), contact);
    }
}

#[async_trait]
impl EventDirectory for InMemoryEventDirectory {
    async fn find_event(&self, id: &EventId) -> Result<Option<EventSummary>, DomainError> {
        Ok(self.events.read().await.get(id).cloned())
    }

    async fn find_user_contact(
        &self,
        user_id: &UserId,
    ) -> Result<Option<UserContact>, DomainError> {
        Ok(self.contacts.read().await.get(user_id).cloned())
    }
}
