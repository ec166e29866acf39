//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresInvoiceRepository`, `PostgresPaymentRepository` - optimistic
//!   locking on the `version` column
//! - `PostgresRefundRepository`
//! - `PostgresPaymentMethodCatalog` - reads the `payment_methods` table
//! - `PostgresWebhookEventRepository` - processed webhooks, `ON CONFLICT DO NOTHING`
//! - `PostgresEventDirectory` - read-only event and user projections

mod event_directory;
mod invoice_repository;
mod payment_method_catalog;
mod payment_repository;
mod refund_repository;
mod webhook_event_repository;

pub use event_directory::PostgresEventDirectory;
pub use invoice_repository::PostgresInvoiceRepository;
pub use payment_method_catalog::PostgresPaymentMethodCatalog;
pub use payment_repository::PostgresPaymentRepository;
pub use refund_repository::PostgresRefundRepository;
pub use webhook_event_repository::PostgresWebhookEventRepository;

use crate::domain::billing::GatewayResponse;
use crate::domain::foundation::{Currency, DomainError, ErrorCode, Money, UserId};

fn db_error(context: &str, err: sqlx::Error) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("{}: {}", context, err))
}

fn corrupt(column: &str, value: impl std::fmt::Display) -> DomainError {
    DomainError::new(
        ErrorCode::DatabaseError,
        format!("Invalid {} value: {}", column, value),
    )
}

fn money(minor_units: i64, currency: &str) -> Result<Money, DomainError> {
    let currency = Currency::new(currency).map_err(|_| corrupt("currency", currency))?;
    Ok(Money::from_minor(minor_units, currency))
}

fn user_id(raw: String) -> Result<UserId, DomainError> {
    UserId::new(raw.clone()).map_err(|_| corrupt("user_id", raw))
}

fn gateway_response(value: serde_json::Value) -> GatewayResponse {
    match value {
        serde_json::Value::Object(map) => map,
        _ => GatewayResponse::new(),
    }
}

fn is_unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.constraint() == Some(constraint),
        _ => false,
    }
}
