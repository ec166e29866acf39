//! PurgeWebhookEventsHandler - Drops processed-webhook records past retention.
//!
//! Providers stop redelivering long before the retention window ends, so a
//! purged record can no longer cause a duplicate to be applied.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::domain::billing::BillingError;
use crate::ports::WebhookEventRepository;

#[derive(Debug, Clone, Copy)]
pub struct PurgeWebhookEventsCommand {
    pub now: DateTime<Utc>,
    pub retention_days: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurgeWebhookEventsResult {
    pub deleted: u64,
}

pub struct PurgeWebhookEventsHandler {
    webhook_events: Arc<dyn WebhookEventRepository>,
}

impl PurgeWebhookEventsHandler {
    pub fn new(webhook_events: Arc<dyn WebhookEventRepository>) -> Self {
        Self { webhook_events }
    }

    pub async fn handle(
        &self,
        cmd: PurgeWebhookEventsCommand,
    ) -> Result<PurgeWebhookEventsResult, BillingError> {
        if cmd.retention_days < 1 {
            return Err(BillingError::validation(
                "retention_days",
                "Retention must be at least one day",
            ));
        }

        let cutoff = cmd.now - Duration::days(cmd.retention_days);
        let deleted = self.webhook_events.delete_before(cutoff).await?;

        if deleted > 0 {
            tracing::info!(deleted, cutoff = %cutoff, "Purged processed webhook events");
        }
        Ok(PurgeWebhookEventsResult { deleted })
    }
}
