//! ExpirePendingPaymentsHandler - Fails pending payments whose window elapsed.
//!
//! Only methods with a payment window (QR codes) set `expires_at`; card and
//! wallet payments wait for their webhook indefinitely.

use std::sync::Arc;

use crate::domain::billing::BillingError;
use crate::domain::foundation::{PaymentReference, Timestamp};
use crate::ports::PaymentRepository;

use super::notifier::BillingNotifier;

const EXPIRED_REASON: &str = "Payment window expired";

#[derive(Debug, Clone, Copy)]
pub struct ExpirePendingPaymentsCommand {
    pub now: Timestamp,
}

#[derive(Debug, Clone, Default)]
pub struct ExpirePendingPaymentsResult {
    pub expired: Vec<PaymentReference>,
    /// Payments that changed under us; the next sweep looks again.
    pub skipped: usize,
}

pub struct ExpirePendingPaymentsHandler {
    payments: Arc<dyn PaymentRepository>,
    notifier: BillingNotifier,
}

impl ExpirePendingPaymentsHandler {
    pub fn new(payments: Arc<dyn PaymentRepository>, notifier: BillingNotifier) -> Self {
        Self { payments, notifier }
    }

    pub async fn handle(
        &self,
        cmd: ExpirePendingPaymentsCommand,
    ) -> Result<ExpirePendingPaymentsResult, BillingError> {
        let mut result = ExpirePendingPaymentsResult::default();

        for mut payment in self.payments.find_expired_pending(&cmd.now).await? {
            if !payment.is_expired(&cmd.now) {
                continue;
            }
            if let Err(e) = payment.fail(EXPIRED_REASON) {
                tracing::warn!(payment_id = %payment.reference, error = %e, "Cannot expire payment");
                result.skipped += 1;
                continue;
            }
            if let Err(e) = self.payments.update(&payment).await {
                tracing::warn!(payment_id = %payment.reference, error = %e, "Expiry not saved");
                result.skipped += 1;
                continue;
            }

            tracing::info!(payment_id = %payment.reference, "Pending payment expired");
            self.notifier.payment_failed(&payment).await;
            result.expired.push(payment.reference);
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::billing::test_support::Harness;
    use crate::domain::billing::PaymentStatus;

    #[tokio::test]
    async fn expires_only_elapsed_qr_payments() {
        let h = Harness::new().await;
        let qr = h.checkout("upi_qr", 50_000).await.payment;
        let card = h.checkout("stripe", 50_000).await.payment;

        let later = Timestamp::now().plus_secs(121);
        let result = h
            .expire_handler()
            .handle(ExpirePendingPaymentsCommand { now: later })
            .await
            .unwrap();

        assert_eq!(result.expired, vec![qr.reference.clone()]);
        let qr = h.payment(&qr.reference).await;
        assert_eq!(qr.status, PaymentStatus::Failed);
        assert_eq!(qr.failure_reason(), Some("Payment window expired"));
        assert_eq!(h.payment(&card.reference).await.status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn open_window_is_left_alone() {
        let h = Harness::new().await;
        let qr = h.checkout("upi_qr", 50_000).await.payment;

        let result = h
            .expire_handler()
            .handle(ExpirePendingPaymentsCommand {
                now: Timestamp::now(),
            })
            .await
            .unwrap();

        assert!(result.expired.is_empty());
        assert_eq!(h.payment(&qr.reference).await.status, PaymentStatus::Pending);
    }
}
