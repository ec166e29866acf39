//! RequestRefundHandler - Command handler for user-initiated refunds.
//!
//! The refund is created pending, handed to the payment's gateway and left
//! `processing`. Only the gateway's refund webhook promotes it to completed.

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::domain::billing::{BillingError, Refund};
use crate::domain::foundation::{Money, PaymentReference, Timestamp, UserId};
use crate::ports::{
    CreateRefundRequest, GatewayRegistry, PaymentMethodCatalog, PaymentRepository,
    RefundRepository,
};

use super::notifier::BillingNotifier;

#[derive(Debug, Clone)]
pub struct RequestRefundCommand {
    pub user_id: UserId,
    pub payment_reference: PaymentReference,
    /// Major units in the payment's currency; the full payment when absent.
    pub amount: Option<Decimal>,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct RequestRefundResult {
    pub refund: Refund,
    /// Staff must move the money by hand.
    pub requires_manual_processing: bool,
}

pub struct RequestRefundHandler {
    payments: Arc<dyn PaymentRepository>,
    refunds: Arc<dyn RefundRepository>,
    catalog: Arc<dyn PaymentMethodCatalog>,
    gateways: GatewayRegistry,
    notifier: BillingNotifier,
}

impl RequestRefundHandler {
    pub fn new(
        payments: Arc<dyn PaymentRepository>,
        refunds: Arc<dyn RefundRepository>,
        catalog: Arc<dyn PaymentMethodCatalog>,
        gateways: GatewayRegistry,
        notifier: BillingNotifier,
    ) -> Self {
        Self {
            payments,
            refunds,
            catalog,
            gateways,
            notifier,
        }
    }

    pub async fn handle(
        &self,
        cmd: RequestRefundCommand,
    ) -> Result<RequestRefundResult, BillingError> {
        // 1. Only the owner sees the payment
        let payment = self
            .payments
            .find_by_reference(&cmd.payment_reference)
            .await?
            .filter(|p| p.user_id == cmd.user_id)
            .ok_or_else(|| BillingError::payment_not_found(cmd.payment_reference.to_string()))?;

        if !payment.is_refundable() {
            return Err(BillingError::invalid_state(
                payment.status.as_str(),
                "refund",
            ));
        }

        let amount = match cmd.amount {
            Some(major) => Money::from_major(major, payment.amount.currency().clone())
                .map_err(|e| BillingError::validation("amount", e.to_string()))?,
            None => payment.amount.clone(),
        };

        let method = self
            .catalog
            .find_by_name(&payment.payment_method)
            .await?
            .ok_or_else(|| BillingError::unknown_payment_method(&payment.payment_method))?;
        let gateway = self
            .gateways
            .get(&method.gateway)
            .ok_or_else(|| BillingError::gateway_unavailable(&method.gateway))?;

        // 2. Cap against everything already claimed
        let mut already_refunded = Money::zero(payment.amount.currency().clone());
        for refund in self.refunds.find_by_payment(&payment.id).await? {
            if refund.status.counts_against_payment() {
                already_refunded = already_refunded.checked_add(&refund.amount)?;
            }
        }

        let mut refund = Refund::request(
            &payment,
            amount,
            &already_refunded,
            cmd.reason,
            Timestamp::now(),
        )?;
        self.refunds.save(&refund).await?;

        // 3. Hand it to the gateway
        let request = CreateRefundRequest {
            refund_reference: refund.reference.clone(),
            payment_transaction_id: payment.transaction_id.clone(),
            capture_id: payment.capture_id().map(str::to_string),
            amount: refund.amount.clone(),
            reason: refund.reason.clone(),
        };

        let receipt = match gateway.create_refund(request).await {
            Ok(receipt) => receipt,
            Err(e) => {
                tracing::warn!(
                    refund_id = %refund.reference,
                    payment_id = %payment.reference,
                    error = %e,
                    "Gateway rejected refund"
                );
                refund.fail(e.message.clone())?;
                self.refunds.update(&refund).await?;
                return Err(BillingError::gateway_failed(
                    e.message,
                    Some(payment.reference),
                ));
            }
        };

        refund.start_processing(receipt.refund_id.clone(), receipt.response.clone())?;
        self.refunds.update(&refund).await?;

        tracing::info!(
            refund_id = %refund.reference,
            payment_id = %payment.reference,
            amount = %refund.amount,
            manual = receipt.requires_manual_processing,
            "Refund requested"
        );

        if receipt.requires_manual_processing {
            self.notifier.refund_requested(&refund, &payment).await;
        }

        Ok(RequestRefundResult {
            refund,
            requires_manual_processing: receipt.requires_manual_processing,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::billing::test_support::Harness;
    use crate::domain::billing::{PaymentStatus, RefundStatus};
    use crate::domain::foundation::ErrorCode;
    use crate::ports::PaymentError;

    fn major(amount: &str) -> Decimal {
        amount.parse().unwrap()
    }

    fn command(
        h: &Harness,
        reference: &PaymentReference,
        amount: Option<Decimal>,
    ) -> RequestRefundCommand {
        RequestRefundCommand {
            user_id: h.user_id.clone(),
            payment_reference: reference.clone(),
            amount,
            reason: "Cannot attend".into(),
        }
    }

    #[tokio::test]
    async fn full_refund_goes_processing_with_provider_id() {
        let h = Harness::new().await;
        let reference = h.completed_payment("stripe").await;

        let result = h
            .refund_handler()
            .handle(command(&h, &reference, None))
            .await
            .unwrap();

        assert_eq!(result.refund.status, RefundStatus::Processing);
        assert_eq!(result.refund.amount.minor_units(), 118_000);
        assert!(result.refund.transaction_id.as_deref().unwrap().starts_with("re_mock_"));
        assert!(!result.requires_manual_processing);
        // payment stays completed until the gateway confirms
        assert_eq!(h.payment(&reference).await.status, PaymentStatus::Completed);
    }

    #[tokio::test]
    async fn refunds_pass_capture_id_to_gateway() {
        let h = Harness::new().await;
        let reference = h.completed_payment("stripe").await;
        let payment = h.payment(&reference).await;

        h.refund_handler()
            .handle(command(&h, &reference, Some(major("100.00"))))
            .await
            .unwrap();

        let call = h
            .stripe
            .calls()
            .into_iter()
            .find(|c| c.method == "create_refund")
            .unwrap();
        assert_eq!(call.args[1], payment.transaction_id.unwrap());
        assert_eq!(call.args[2], "10000");
    }

    #[tokio::test]
    async fn amount_above_payment_is_rejected() {
        let h = Harness::new().await;
        let reference = h.completed_payment("stripe").await;

        let err = h
            .refund_handler()
            .handle(command(&h, &reference, Some(major("1180.01"))))
            .await
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::RefundExceedsPayment);
        assert!(h.refunds.is_empty().await);
        assert!(!h.stripe.was_called("create_refund"));
    }

    #[tokio::test]
    async fn partial_refunds_are_capped_cumulatively() {
        let h = Harness::new().await;
        let reference = h.completed_payment("stripe").await;

        h.refund_handler()
            .handle(command(&h, &reference, Some(major("1000"))))
            .await
            .unwrap();
        let err = h
            .refund_handler()
            .handle(command(&h, &reference, Some(major("200"))))
            .await
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::RefundExceedsPayment);
        h.refund_handler()
            .handle(command(&h, &reference, Some(major("180"))))
            .await
            .unwrap();
        assert_eq!(h.refunds.len().await, 2);
    }

    #[tokio::test]
    async fn zero_amount_is_invalid() {
        let h = Harness::new().await;
        let reference = h.completed_payment("stripe").await;

        let err = h
            .refund_handler()
            .handle(command(&h, &reference, Some(major("0"))))
            .await
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::InvalidAmount);
    }

    #[tokio::test]
    async fn other_users_payment_is_not_found() {
        let h = Harness::new().await;
        let reference = h.completed_payment("stripe").await;
        let mut cmd = command(&h, &reference, None);
        cmd.user_id = UserId::new("someone-else").unwrap();

        let err = h.refund_handler().handle(cmd).await.unwrap_err();

        assert_eq!(err.code(), ErrorCode::PaymentNotFound);
    }

    #[tokio::test]
    async fn pending_payment_cannot_be_refunded() {
        let h = Harness::new().await;
        let result = h.checkout("stripe", 100_000).await;

        let err = h
            .refund_handler()
            .handle(command(&h, &result.payment.reference, None))
            .await
            .unwrap_err();

        assert_eq!(err, BillingError::invalid_state("pending", "refund"));
        assert_eq!(err.message(), "Cannot refund a pending payment");
    }

    #[tokio::test]
    async fn gateway_error_fails_refund() {
        let h = Harness::new().await;
        let reference = h.completed_payment("stripe").await;
        h.stripe
            .set_method_error("create_refund", PaymentError::provider("Charge already refunded"));

        let err = h
            .refund_handler()
            .handle(command(&h, &reference, None))
            .await
            .unwrap_err();

        assert!(matches!(err, BillingError::GatewayFailed { .. }));
        let refunds = h.refunds.all().await;
        assert_eq!(refunds[0].status, RefundStatus::Failed);
        assert_eq!(refunds[0].gateway_response["error"], "Charge already refunded");

        // a failed refund no longer counts against the payment
        h.stripe.clear_errors();
        h.refund_handler()
            .handle(command(&h, &reference, None))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn manual_refund_notifies_staff() {
        let h = Harness::new().await;
        let reference = h.completed_payment("bank_transfer").await;

        let result = h
            .refund_handler()
            .handle(command(&h, &reference, None))
            .await
            .unwrap();

        assert!(result.requires_manual_processing);
        assert_eq!(result.refund.status, RefundStatus::Processing);
        assert!(result.refund.transaction_id.is_none());
        assert!(h.sender.kinds().contains(&"refund_requested"));
    }
}
