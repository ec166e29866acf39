//! PostgreSQL implementation of RefundRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::billing::{Refund, RefundStatus};
use crate::domain::foundation::{
    DomainError, ErrorCode, PaymentId, RefundId, RefundReference, Timestamp,
};
use crate::ports::RefundRepository;

use super::{corrupt, db_error, gateway_response, money, user_id};

pub struct PostgresRefundRepository {
    pool: PgPool,
}

impl PostgresRefundRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const SELECT_REFUND: &str = r#"
    SELECT id, reference, payment_id, user_id, currency, amount_minor, reason, status,
           transaction_id, gateway_response, refund_date, created_at, updated_at
    FROM refunds
"#;

#[derive(Debug, sqlx::FromRow)]
struct RefundRow {
    id: Uuid,
    reference: String,
    payment_id: Uuid,
    user_id: String,
    currency: String,
    amount_minor: i64,
    reason: String,
    status: String,
    transaction_id: Option<String>,
    gateway_response: serde_json::Value,
    refund_date: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RefundRow> for Refund {
    type Error = DomainError;

    fn try_from(row: RefundRow) -> Result<Self, Self::Error> {
        Ok(Refund {
            id: RefundId::from_uuid(row.id),
            reference: RefundReference::parse(row.reference.clone())
                .map_err(|_| corrupt("refund reference", &row.reference))?,
            payment_id: PaymentId::from_uuid(row.payment_id),
            user_id: user_id(row.user_id)?,
            amount: money(row.amount_minor, row.currency.trim())?,
            reason: row.reason,
            status: parse_status(&row.status)?,
            transaction_id: row.transaction_id,
            gateway_response: gateway_response(row.gateway_response),
            refund_date: row.refund_date.map(Timestamp::from_datetime),
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn parse_status(s: &str) -> Result<RefundStatus, DomainError> {
    match s {
        "pending" => Ok(RefundStatus::Pending),
        "processing" => Ok(RefundStatus::Processing),
        "completed" => Ok(RefundStatus::Completed),
        "failed" => Ok(RefundStatus::Failed),
        other => Err(corrupt("refund status", other)),
    }
}

#[async_trait]
impl RefundRepository for PostgresRefundRepository {
    async fn save(&self, refund: &Refund) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO refunds (
                id, reference, payment_id, user_id, currency, amount_minor, reason, status,
                transaction_id, gateway_response, refund_date, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(refund.id.as_uuid())
        .bind(refund.reference.as_str())
        .bind(refund.payment_id.as_uuid())
        .bind(refund.user_id.as_str())
        .bind(refund.amount.currency().code())
        .bind(refund.amount.minor_units())
        .bind(&refund.reason)
        .bind(refund.status.as_str())
        .bind(&refund.transaction_id)
        .bind(serde_json::Value::Object(refund.gateway_response.clone()))
        .bind(refund.refund_date.map(|t| *t.as_datetime()))
        .bind(refund.created_at.as_datetime())
        .bind(refund.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to save refund", e))?;

        Ok(())
    }

    async fn update(&self, refund: &Refund) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE refunds SET
                status = $2,
                transaction_id = $3,
                gateway_response = $4,
                refund_date = $5,
                updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(refund.id.as_uuid())
        .bind(refund.status.as_str())
        .bind(&refund.transaction_id)
        .bind(serde_json::Value::Object(refund.gateway_response.clone()))
        .bind(refund.refund_date.map(|t| *t.as_datetime()))
        .bind(refund.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to update refund", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(ErrorCode::RefundNotFound, "Refund not found"));
        }

        Ok(())
    }

    async fn find_by_id(&self, id: &RefundId) -> Result<Option<Refund>, DomainError> {
        let row: Option<RefundRow> = sqlx::query_as(&format!("{} WHERE id = $1", SELECT_REFUND))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to find refund", e))?;

        row.map(Refund::try_from).transpose()
    }

    async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<Refund>, DomainError> {
        let row: Option<RefundRow> =
            sqlx::query_as(&format!("{} WHERE transaction_id = $1", SELECT_REFUND))
                .bind(transaction_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("Failed to find refund", e))?;

        row.map(Refund::try_from).transpose()
    }

    async fn find_by_payment(&self, payment_id: &PaymentId) -> Result<Vec<Refund>, DomainError> {
        let rows: Vec<RefundRow> = sqlx::query_as(&format!(
            "{} WHERE payment_id = $1 ORDER BY created_at ASC",
            SELECT_REFUND
        ))
        .bind(payment_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list refunds", e))?;

        rows.into_iter().map(Refund::try_from).collect()
    }
}
