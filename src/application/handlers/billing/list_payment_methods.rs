//! ListPaymentMethodsHandler - Active payment channels and their fee schedules.

use std::sync::Arc;

use crate::domain::billing::{BillingError, PaymentMethod};
use crate::ports::PaymentMethodCatalog;

#[derive(Debug, Clone, Default)]
pub struct ListPaymentMethodsQuery;

pub struct ListPaymentMethodsHandler {
    catalog: Arc<dyn PaymentMethodCatalog>,
}

impl ListPaymentMethodsHandler {
    pub fn new(catalog: Arc<dyn PaymentMethodCatalog>) -> Self {
        Self { catalog }
    }

    pub async fn handle(
        &self,
        _query: ListPaymentMethodsQuery,
    ) -> Result<Vec<PaymentMethod>, BillingError> {
        Ok(self.catalog.list_active().await?)
    }
}
