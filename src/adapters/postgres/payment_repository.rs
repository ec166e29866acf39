//! PostgreSQL implementation of PaymentRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::billing::{Payment, PaymentStatus};
use crate::domain::foundation::{
    DomainError, ErrorCode, InvoiceId, PaymentId, PaymentReference, Timestamp, UserId,
};
use crate::ports::PaymentRepository;

use super::{corrupt, db_error, gateway_response, is_unique_violation, money, user_id};

const TRANSACTION_ID_CONSTRAINT: &str = "payments_transaction_id_key";

pub struct PostgresPaymentRepository {
    pool: PgPool,
}

impl PostgresPaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_one_where(
        &self,
        clause: &str,
        bind: &str,
    ) -> Result<Option<Payment>, DomainError> {
        let row: Option<PaymentRow> =
            sqlx::query_as(&format!("{} WHERE {}", SELECT_PAYMENT, clause))
                .bind(bind)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("Failed to find payment", e))?;

        row.map(Payment::try_from).transpose()
    }
}

const SELECT_PAYMENT: &str = r#"
    SELECT id, reference, invoice_id, user_id, currency, amount_minor, processing_fee_minor,
           payment_method, status, transaction_id, gateway_response, expires_at,
           payment_date, created_at, updated_at, version
    FROM payments
"#;

#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    reference: String,
    invoice_id: Uuid,
    user_id: String,
    currency: String,
    amount_minor: i64,
    processing_fee_minor: i64,
    payment_method: String,
    status: String,
    transaction_id: Option<String>,
    gateway_response: serde_json::Value,
    expires_at: Option<DateTime<Utc>>,
    payment_date: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: i32,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = DomainError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let currency = row.currency.trim();
        Ok(Payment {
            id: PaymentId::from_uuid(row.id),
            reference: PaymentReference::parse(row.reference.clone())
                .map_err(|_| corrupt("payment reference", &row.reference))?,
            invoice_id: InvoiceId::from_uuid(row.invoice_id),
            user_id: user_id(row.user_id)?,
            amount: money(row.amount_minor, currency)?,
            payment_method: row.payment_method,
            processing_fee: money(row.processing_fee_minor, currency)?,
            status: parse_status(&row.status)?,
            transaction_id: row.transaction_id,
            gateway_response: gateway_response(row.gateway_response),
            expires_at: row.expires_at.map(Timestamp::from_datetime),
            payment_date: row.payment_date.map(Timestamp::from_datetime),
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
            version: row.version,
        })
    }
}

fn parse_status(s: &str) -> Result<PaymentStatus, DomainError> {
    match s {
        "pending" => Ok(PaymentStatus::Pending),
        "completed" => Ok(PaymentStatus::Completed),
        "failed" => Ok(PaymentStatus::Failed),
        "refunded" => Ok(PaymentStatus::Refunded),
        other => Err(corrupt("payment status", other)),
    }
}

fn write_error(context: &str, err: sqlx::Error) -> DomainError {
    if is_unique_violation(&err, TRANSACTION_ID_CONSTRAINT) {
        return DomainError::new(
            ErrorCode::DuplicateTransaction,
            "Gateway transaction is already assigned to another payment",
        );
    }
    db_error(context, err)
}

#[async_trait]
impl PaymentRepository for PostgresPaymentRepository {
    async fn save(&self, payment: &Payment) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO payments (
                id, reference, invoice_id, user_id, currency, amount_minor, processing_fee_minor,
                payment_method, status, transaction_id, gateway_response, expires_at,
                payment_date, created_at, updated_at, version
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(payment.reference.as_str())
        .bind(payment.invoice_id.as_uuid())
        .bind(payment.user_id.as_str())
        .bind(payment.amount.currency().code())
        .bind(payment.amount.minor_units())
        .bind(payment.processing_fee.minor_units())
        .bind(&payment.payment_method)
        .bind(payment.status.as_str())
        .bind(&payment.transaction_id)
        .bind(serde_json::Value::Object(payment.gateway_response.clone()))
        .bind(payment.expires_at.map(|t| *t.as_datetime()))
        .bind(payment.payment_date.map(|t| *t.as_datetime()))
        .bind(payment.created_at.as_datetime())
        .bind(payment.updated_at.as_datetime())
        .bind(payment.version)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error("Failed to save payment", e))?;

        Ok(())
    }

    async fn update(&self, payment: &Payment) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE payments SET
                status = $2,
                transaction_id = $3,
                gateway_response = $4,
                payment_date = $5,
                updated_at = $6,
                version = version + 1
            WHERE id = $1 AND version = $7
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(payment.status.as_str())
        .bind(&payment.transaction_id)
        .bind(serde_json::Value::Object(payment.gateway_response.clone()))
        .bind(payment.payment_date.map(|t| *t.as_datetime()))
        .bind(payment.updated_at.as_datetime())
        .bind(payment.version)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error("Failed to update payment", e))?;

        if result.rows_affected() == 0 {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM payments WHERE id = $1)")
                    .bind(payment.id.as_uuid())
                    .fetch_one(&self.pool)
                    .await
                    .map_err(|e| db_error("Failed to update payment", e))?;

            return Err(if exists {
                DomainError::new(
                    ErrorCode::ConcurrentModification,
                    format!("Payment {} was modified concurrently", payment.reference),
                )
            } else {
                DomainError::new(ErrorCode::PaymentNotFound, "Payment not found")
            });
        }

        Ok(())
    }

    async fn find_by_id(&self, id: &PaymentId) -> Result<Option<Payment>, DomainError> {
        let row: Option<PaymentRow> = sqlx::query_as(&format!("{} WHERE id = $1", SELECT_PAYMENT))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to find payment", e))?;

        row.map(Payment::try_from).transpose()
    }

    async fn find_by_reference(
        &self,
        reference: &PaymentReference,
    ) -> Result<Option<Payment>, DomainError> {
        self.fetch_one_where("reference = $1", reference.as_str())
            .await
    }

    async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<Payment>, DomainError> {
        self.fetch_one_where("transaction_id = $1", transaction_id)
            .await
    }

    async fn find_by_user(&self, user_id: &UserId) -> Result<Vec<Payment>, DomainError> {
        let rows: Vec<PaymentRow> = sqlx::query_as(&format!(
            "{} WHERE user_id = $1 ORDER BY created_at DESC",
            SELECT_PAYMENT
        ))
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list payments", e))?;

        rows.into_iter().map(Payment::try_from).collect()
    }

    async fn find_by_invoice(&self, invoice_id: &InvoiceId) -> Result<Vec<Payment>, DomainError> {
        let rows: Vec<PaymentRow> = sqlx::query_as(&format!(
            "{} WHERE invoice_id = $1 ORDER BY created_at DESC",
            SELECT_PAYMENT
        ))
        .bind(invoice_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list payments", e))?;

        rows.into_iter().map(Payment::try_from).collect()
    }

    async fn find_expired_pending(&self, now: &Timestamp) -> Result<Vec<Payment>, DomainError> {
        let rows: Vec<PaymentRow> = sqlx::query_as(&format!(
            "{} WHERE status = 'pending' AND expires_at IS NOT NULL AND expires_at <= $1 \
             ORDER BY expires_at ASC",
            SELECT_PAYMENT
        ))
        .bind(now.as_datetime())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list expired payments", e))?;

        rows.into_iter().map(Payment::try_from).collect()
    }
}
