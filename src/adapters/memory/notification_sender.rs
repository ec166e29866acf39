use std::sync::Mutex;
use std::sync::PoisonError;

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::{Notification, NotificationSender};

/// Keeps every notification instead of delivering it.
#[derive(Default)]
pub struct RecordingNotificationSender {
    sent: Mutex<Vec<Notification>>,
    failing: Mutex<bool>,
}

impl RecordingNotificationSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sender whose every delivery fails.
    pub fn failing() -> Self {
        let sender = Self::default();
        *sender.failing.lock().unwrap_or_else(PoisonError::into_inner) = true;
        sender
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.sent().iter().map(Notification::kind).collect()
    }
}

#[async_trait]
impl NotificationSender for RecordingNotificationSender {
    async fn send(&self, notification: Notification) -> Result<(), DomainError> {
        if *self.failing.lock().unwrap_or_else(PoisonError::into_inner) {
            return Err(DomainError::new(
                ErrorCode::ExternalServiceError,
                "Mail delivery failed",
            ));
        }
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification);
        Ok(())
    }
}
