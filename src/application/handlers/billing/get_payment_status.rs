//! GetPaymentStatusHandler - Query handler for one payment.

use std::sync::Arc;

use crate::domain::billing::{BillingError, Payment, Refund};
use crate::domain::foundation::{PaymentReference, UserId};
use crate::ports::{PaymentRepository, RefundRepository};

#[derive(Debug, Clone)]
pub struct GetPaymentStatusQuery {
    pub user_id: UserId,
    pub payment_reference: PaymentReference,
}

#[derive(Debug, Clone)]
pub struct GetPaymentStatusResult {
    pub payment: Payment,
    pub refunds: Vec<Refund>,
}

pub struct GetPaymentStatusHandler {
    payments: Arc<dyn PaymentRepository>,
    refunds: Arc<dyn RefundRepository>,
}

impl GetPaymentStatusHandler {
    pub fn new(payments: Arc<dyn PaymentRepository>, refunds: Arc<dyn RefundRepository>) -> Self {
        Self { payments, refunds }
    }

    pub async fn handle(
        &self,
        query: GetPaymentStatusQuery,
    ) -> Result<GetPaymentStatusResult, BillingError> {
        // Other users' payments look the same as missing ones
        let payment = self
            .payments
            .find_by_reference(&query.payment_reference)
            .await?
            .filter(|p| p.user_id == query.user_id)
            .ok_or_else(|| {
                BillingError::payment_not_found(query.payment_reference.to_string())
            })?;

        let refunds = self.refunds.find_by_payment(&payment.id).await?;

        Ok(GetPaymentStatusResult { payment, refunds })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::billing::test_support::Harness;
    use crate::domain::billing::PaymentStatus;
    use crate::domain::foundation::ErrorCode;

    #[tokio::test]
    async fn owner_sees_status() {
        let h = Harness::new().await;
        let checkout = h.checkout("stripe", 100_000).await;

        let result = h
            .status_handler()
            .handle(GetPaymentStatusQuery {
                user_id: h.user_id.clone(),
                payment_reference: checkout.payment.reference.clone(),
            })
            .await
            .unwrap();

        assert_eq!(result.payment.status, PaymentStatus::Pending);
        assert!(result.refunds.is_empty());
    }

    #[tokio::test]
    async fn other_users_get_not_found() {
        let h = Harness::new().await;
        let checkout = h.checkout("stripe", 100_000).await;

        let err = h
            .status_handler()
            .handle(GetPaymentStatusQuery {
                user_id: UserId::new("intruder").unwrap(),
                payment_reference: checkout.payment.reference,
            })
            .await
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::PaymentNotFound);
    }
}
