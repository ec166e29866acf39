//! PostgreSQL implementation of EventDirectory.
//!
//! Reads the `directory_events` and `directory_users` projections. Billing
//! never writes to them.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{DomainError, EventId, UserId};
use crate::ports::{EventDirectory, EventSummary, UserContact};

use super::{db_error, user_id};

pub struct PostgresEventDirectory {
    pool: PgPool,
}

impl PostgresEventDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventDirectory for PostgresEventDirectory {
    async fn find_event(&self, id: &EventId) -> Result<Option<EventSummary>, DomainError> {
        let row: Option<(Uuid, String)> =
            sqlx::query_as("SELECT id, title FROM directory_events WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("Failed to find event", e))?;

        Ok(row.map(|(id, title)| EventSummary {
            id: EventId::from_uuid(id),
            title,
        }))
    }

    async fn find_user_contact(
        &self,
        user: &UserId,
    ) -> Result<Option<UserContact>, DomainError> {
        let row: Option<(String, String, String)> = sqlx::query_as(
            "SELECT user_id, email, name FROM directory_users WHERE user_id = $1",
        )
        .bind(user.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to find user contact", e))?;

        row.map(|(id, email, name)| {
            Ok(UserContact {
                user_id: user_id(id)?,
                email,
                name,
            })
        })
        .transpose()
    }
}
