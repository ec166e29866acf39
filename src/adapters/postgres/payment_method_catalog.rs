//! PostgreSQL implementation of PaymentMethodCatalog.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::billing::{PaymentMethod, PaymentType};
use crate::domain::foundation::DomainError;
use crate::ports::PaymentMethodCatalog;

use super::{corrupt, db_error};

pub struct PostgresPaymentMethodCatalog {
    pool: PgPool,
}

impl PostgresPaymentMethodCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const SELECT_METHOD: &str = r#"
    SELECT name, description, payment_type, gateway, processing_fee_bps,
           processing_fee_fixed_minor, is_active, payment_window_secs
    FROM payment_methods
"#;

#[derive(Debug, sqlx::FromRow)]
struct PaymentMethodRow {
    name: String,
    description: String,
    payment_type: String,
    gateway: String,
    processing_fee_bps: i64,
    processing_fee_fixed_minor: i64,
    is_active: bool,
    payment_window_secs: Option<i64>,
}

impl TryFrom<PaymentMethodRow> for PaymentMethod {
    type Error = DomainError;

    fn try_from(row: PaymentMethodRow) -> Result<Self, Self::Error> {
        Ok(PaymentMethod {
            payment_type: PaymentType::parse(&row.payment_type)
                .map_err(|_| corrupt("payment_type", &row.payment_type))?,
            name: row.name,
            description: row.description,
            gateway: row.gateway,
            processing_fee_bps: row.processing_fee_bps,
            processing_fee_fixed_minor: row.processing_fee_fixed_minor,
            is_active: row.is_active,
            payment_window_secs: row.payment_window_secs,
        })
    }
}

#[async_trait]
impl PaymentMethodCatalog for PostgresPaymentMethodCatalog {
    async fn find_active(&self, name: &str) -> Result<Option<PaymentMethod>, DomainError> {
        let row: Option<PaymentMethodRow> = sqlx::query_as(&format!(
            "{} WHERE name = $1 AND is_active = TRUE",
            SELECT_METHOD
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to find payment method", e))?;

        row.map(PaymentMethod::try_from).transpose()
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<PaymentMethod>, DomainError> {
        let row: Option<PaymentMethodRow> =
            sqlx::query_as(&format!("{} WHERE name = $1", SELECT_METHOD))
                .bind(name)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("Failed to find payment method", e))?;

        row.map(PaymentMethod::try_from).transpose()
    }

    async fn list_active(&self) -> Result<Vec<PaymentMethod>, DomainError> {
        let rows: Vec<PaymentMethodRow> = sqlx::query_as(&format!(
            "{} WHERE is_active = TRUE ORDER BY name",
            SELECT_METHOD
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list payment methods", e))?;

        rows.into_iter().map(PaymentMethod::try_from).collect()
    }
}
