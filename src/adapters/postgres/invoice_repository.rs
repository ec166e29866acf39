//! PostgreSQL implementation of InvoiceRepository.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::billing::{Invoice, InvoiceStatus};
use crate::domain::foundation::{
    DomainError, ErrorCode, EventId, InvoiceId, InvoiceNumber, Timestamp, UserId,
};
use crate::ports::InvoiceRepository;

use super::{corrupt, db_error, money, user_id};

pub struct PostgresInvoiceRepository {
    pool: PgPool,
}

impl PostgresInvoiceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const SELECT_INVOICE: &str = r#"
    SELECT id, invoice_number, event_id, user_id, issue_date, due_date, currency,
           subtotal_minor, tax_minor, discount_minor, total_minor, paid_minor,
           status, created_at, updated_at, version
    FROM invoices
"#;

#[derive(Debug, sqlx::FromRow)]
struct InvoiceRow {
    id: Uuid,
    invoice_number: String,
    event_id: Uuid,
    user_id: String,
    issue_date: NaiveDate,
    due_date: NaiveDate,
    currency: String,
    subtotal_minor: i64,
    tax_minor: i64,
    discount_minor: i64,
    total_minor: i64,
    paid_minor: i64,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: i32,
}

impl TryFrom<InvoiceRow> for Invoice {
    type Error = DomainError;

    fn try_from(row: InvoiceRow) -> Result<Self, Self::Error> {
        let currency = row.currency.trim();
        Ok(Invoice {
            id: InvoiceId::from_uuid(row.id),
            invoice_number: InvoiceNumber::parse(row.invoice_number.clone())
                .map_err(|_| corrupt("invoice_number", &row.invoice_number))?,
            event_id: EventId::from_uuid(row.event_id),
            user_id: user_id(row.user_id)?,
            issue_date: row.issue_date,
            due_date: row.due_date,
            subtotal: money(row.subtotal_minor, currency)?,
            tax_amount: money(row.tax_minor, currency)?,
            discount_amount: money(row.discount_minor, currency)?,
            total_amount: money(row.total_minor, currency)?,
            paid_amount: money(row.paid_minor, currency)?,
            status: parse_status(&row.status)?,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
            version: row.version,
        })
    }
}

fn parse_status(s: &str) -> Result<InvoiceStatus, DomainError> {
    match s {
        "draft" => Ok(InvoiceStatus::Draft),
        "sent" => Ok(InvoiceStatus::Sent),
        "paid" => Ok(InvoiceStatus::Paid),
        "overdue" => Ok(InvoiceStatus::Overdue),
        "cancelled" => Ok(InvoiceStatus::Cancelled),
        other => Err(corrupt("invoice status", other)),
    }
}

#[async_trait]
impl InvoiceRepository for PostgresInvoiceRepository {
    async fn save(&self, invoice: &Invoice) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO invoices (
                id, invoice_number, event_id, user_id, issue_date, due_date, currency,
                subtotal_minor, tax_minor, discount_minor, total_minor, paid_minor,
                status, created_at, updated_at, version
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(invoice.id.as_uuid())
        .bind(invoice.invoice_number.as_str())
        .bind(invoice.event_id.as_uuid())
        .bind(invoice.user_id.as_str())
        .bind(invoice.issue_date)
        .bind(invoice.due_date)
        .bind(invoice.total_amount.currency().code())
        .bind(invoice.subtotal.minor_units())
        .bind(invoice.tax_amount.minor_units())
        .bind(invoice.discount_amount.minor_units())
        .bind(invoice.total_amount.minor_units())
        .bind(invoice.paid_amount.minor_units())
        .bind(invoice.status.as_str())
        .bind(invoice.created_at.as_datetime())
        .bind(invoice.updated_at.as_datetime())
        .bind(invoice.version)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to save invoice", e))?;

        Ok(())
    }

    async fn update(&self, invoice: &Invoice) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE invoices SET
                status = $2,
                paid_minor = $3,
                discount_minor = $4,
                total_minor = $5,
                updated_at = $6,
                version = version + 1
            WHERE id = $1 AND version = $7
            "#,
        )
        .bind(invoice.id.as_uuid())
        .bind(invoice.status.as_str())
        .bind(invoice.paid_amount.minor_units())
        .bind(invoice.discount_amount.minor_units())
        .bind(invoice.total_amount.minor_units())
        .bind(invoice.updated_at.as_datetime())
        .bind(invoice.version)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to update invoice", e))?;

        if result.rows_affected() == 0 {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM invoices WHERE id = $1)")
                    .bind(invoice.id.as_uuid())
                    .fetch_one(&self.pool)
                    .await
                    .map_err(|e| db_error("Failed to update invoice", e))?;

            return Err(if exists {
                DomainError::new(
                    ErrorCode::ConcurrentModification,
                    format!("Invoice {} was modified concurrently", invoice.invoice_number),
                )
            } else {
                DomainError::new(ErrorCode::InvoiceNotFound, "Invoice not found")
            });
        }

        Ok(())
    }

    async fn find_by_id(&self, id: &InvoiceId) -> Result<Option<Invoice>, DomainError> {
        let row: Option<InvoiceRow> = sqlx::query_as(&format!("{} WHERE id = $1", SELECT_INVOICE))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to find invoice", e))?;

        row.map(Invoice::try_from).transpose()
    }

    async fn find_by_user(&self, user_id: &UserId) -> Result<Vec<Invoice>, DomainError> {
        let rows: Vec<InvoiceRow> = sqlx::query_as(&format!(
            "{} WHERE user_id = $1 ORDER BY created_at DESC",
            SELECT_INVOICE
        ))
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list invoices", e))?;

        rows.into_iter().map(Invoice::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_every_stored_value() {
        for status in [
            InvoiceStatus::Draft,
            InvoiceStatus::Sent,
            InvoiceStatus::Paid,
            InvoiceStatus::Overdue,
            InvoiceStatus::Cancelled,
        ] {
            assert_eq!(parse_status(status.as_str()).unwrap(), status);
        }
        assert!(parse_status("void").is_err());
    }
}
