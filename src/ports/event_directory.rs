//! Event directory port.
//!
//! Billing does not own events or user accounts; it only needs enough of
//! each to validate a checkout and address an email.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, EventId, UserId};

/// The parts of an event that billing reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSummary {
    pub id: EventId,
    pub title: String,
}

/// Where to send a user's billing mail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContact {
    pub user_id: UserId,
    pub email: String,
    pub name: String,
}

#[async_trait]
pub trait EventDirectory: Send + Sync {
    async fn find_event(&self, id: &EventId) -> Result<Option<EventSummary>, DomainError>;

    async fn find_user_contact(&self, user_id: &UserId)
        -> Result<Option<UserContact>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_directory_is_object_safe() {
        fn _accepts_dyn(_directory: &dyn EventDirectory) {}
    }
}
