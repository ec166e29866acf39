//! CalculateFeesHandler - Fee preview for an amount and a payment method.

use std::sync::Arc;

use crate::domain::billing::{BillingError, FeeBreakdown, PaymentMethod};
use crate::domain::foundation::Money;
use crate::ports::PaymentMethodCatalog;

#[derive(Debug, Clone)]
pub struct CalculateFeesQuery {
    pub payment_method: String,
    pub amount: Money,
}

#[derive(Debug, Clone)]
pub struct CalculateFeesResult {
    pub method: PaymentMethod,
    pub breakdown: FeeBreakdown,
}

pub struct CalculateFeesHandler {
    catalog: Arc<dyn PaymentMethodCatalog>,
}

impl CalculateFeesHandler {
    pub fn new(catalog: Arc<dyn PaymentMethodCatalog>) -> Self {
        Self { catalog }
    }

    pub async fn handle(&self, query: CalculateFeesQuery) -> Result<CalculateFeesResult, BillingError> {
        if !query.amount.is_positive() {
            return Err(BillingError::invalid_amount("Invalid amount"));
        }

        let method = self
            .catalog
            .find_active(&query.payment_method)
            .await?
            .ok_or_else(|| BillingError::unknown_payment_method(&query.payment_method))?;

        let breakdown = method.calculate_fees(&query.amount);
        Ok(CalculateFeesResult { method, breakdown })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryPaymentMethodCatalog;
    use crate::domain::foundation::Currency;

    fn handler() -> CalculateFeesHandler {
        CalculateFeesHandler::new(Arc::new(InMemoryPaymentMethodCatalog::new()))
    }

    #[tokio::test]
    async fn card_fees_include_fixed_part() {
        let result = handler()
            .handle(CalculateFeesQuery {
                payment_method: "stripe".into(),
                amount: Money::from_minor(100_000, Currency::inr()),
            })
            .await
            .unwrap();

        assert_eq!(result.breakdown.percentage_fee.minor_units(), 2_900);
        assert_eq!(result.breakdown.fixed_fee.minor_units(), 30);
        assert_eq!(result.breakdown.total_amount.minor_units(), 102_930);
    }

    #[tokio::test]
    async fn rejects_bad_amount_and_unknown_method() {
        let err = handler()
            .handle(CalculateFeesQuery {
                payment_method: "stripe".into(),
                amount: Money::zero(Currency::inr()),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::InvalidAmount(_)));

        let err = handler()
            .handle(CalculateFeesQuery {
                payment_method: "bitcoin".into(),
                amount: Money::from_minor(100, Currency::inr()),
            })
            .await
            .unwrap_err();
        assert_eq!(err, BillingError::unknown_payment_method("bitcoin"));
    }
}
