//! ConfirmManualPaymentHandler - Staff confirmation of bank transfers and QR payments.
//!
//! Manual channels have no webhook, so staff settle them by hand once the
//! money has (or has not) arrived.

use std::sync::Arc;

use crate::domain::billing::{BillingError, Payment};
use crate::domain::foundation::{PaymentReference, Timestamp};
use crate::ports::{InvoiceRepository, PaymentMethodCatalog, PaymentRepository};

use super::notifier::BillingNotifier;

const NOT_RECEIVED_REASON: &str = "Payment not received";

/// What staff observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManualConfirmation {
    Received,
    NotReceived,
}

impl ManualConfirmation {
    pub fn parse(action: &str) -> Option<Self> {
        match action {
            "received" => Some(ManualConfirmation::Received),
            "not_received" => Some(ManualConfirmation::NotReceived),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfirmManualPaymentCommand {
    pub payment_reference: PaymentReference,
    pub confirmation: ManualConfirmation,
    /// Set for admin and manager roles.
    pub is_staff: bool,
}

#[derive(Debug, Clone)]
pub struct ConfirmManualPaymentResult {
    pub payment: Payment,
}

pub struct ConfirmManualPaymentHandler {
    payments: Arc<dyn PaymentRepository>,
    invoices: Arc<dyn InvoiceRepository>,
    catalog: Arc<dyn PaymentMethodCatalog>,
    notifier: BillingNotifier,
}

impl ConfirmManualPaymentHandler {
    pub fn new(
        payments: Arc<dyn PaymentRepository>,
        invoices: Arc<dyn InvoiceRepository>,
        catalog: Arc<dyn PaymentMethodCatalog>,
        notifier: BillingNotifier,
    ) -> Self {
        Self {
            payments,
            invoices,
            catalog,
            notifier,
        }
    }

    pub async fn handle(
        &self,
        cmd: ConfirmManualPaymentCommand,
    ) -> Result<ConfirmManualPaymentResult, BillingError> {
        if !cmd.is_staff {
            return Err(BillingError::forbidden("Only staff can confirm payments"));
        }

        let mut payment = self
            .payments
            .find_by_reference(&cmd.payment_reference)
            .await?
            .ok_or_else(|| BillingError::payment_not_found(cmd.payment_reference.to_string()))?;

        let is_manual = self
            .catalog
            .find_by_name(&payment.payment_method)
            .await?
            .map(|m| m.is_manual())
            .unwrap_or(false);
        if !is_manual {
            return Err(BillingError::invalid_state(&payment.payment_method, "confirm"));
        }

        match cmd.confirmation {
            ManualConfirmation::Received => {
                let now = Timestamp::now();
                payment
                    .complete(now)
                    .map_err(|_| BillingError::invalid_state(payment.status.as_str(), "confirm"))?;
                self.payments.update(&payment).await?;

                let mut invoice = self
                    .invoices
                    .find_by_id(&payment.invoice_id)
                    .await?
                    .ok_or_else(|| BillingError::invoice_not_found(payment.invoice_id.to_string()))?;
                invoice.record_payment(&payment)?;
                self.invoices.update(&invoice).await?;

                tracing::info!(
                    payment_id = %payment.reference,
                    invoice_number = %invoice.invoice_number,
                    "Manual payment confirmed"
                );
                self.notifier.payment_confirmed(&payment, &invoice).await;
            }
            ManualConfirmation::NotReceived => {
                payment
                    .fail(NOT_RECEIVED_REASON)
                    .map_err(|_| BillingError::invalid_state(payment.status.as_str(), "reject"))?;
                self.payments.update(&payment).await?;

                tracing::info!(payment_id = %payment.reference, "Manual payment rejected");
                self.notifier.payment_failed(&payment).await;
            }
        }

        Ok(ConfirmManualPaymentResult { payment })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::billing::test_support::Harness;
    use crate::domain::billing::{InvoiceStatus, PaymentStatus};
    use crate::domain::foundation::ErrorCode;

    fn command(reference: &PaymentReference, confirmation: ManualConfirmation) -> ConfirmManualPaymentCommand {
        ConfirmManualPaymentCommand {
            payment_reference: reference.clone(),
            confirmation,
            is_staff: true,
        }
    }

    #[tokio::test]
    async fn received_completes_payment_and_invoice() {
        let h = Harness::new().await;
        let checkout = h.checkout("bank_transfer", 50_000).await;

        let result = h
            .confirm_handler()
            .handle(command(&checkout.payment.reference, ManualConfirmation::Received))
            .await
            .unwrap();

        assert_eq!(result.payment.status, PaymentStatus::Completed);
        let invoice = h.invoice(&checkout.invoice.id).await;
        assert_eq!(invoice.status, InvoiceStatus::Paid);
        assert_eq!(invoice.paid_amount, checkout.payment.amount);
        assert!(h.sender.kinds().contains(&"payment_confirmed"));
    }

    #[tokio::test]
    async fn not_received_fails_payment() {
        let h = Harness::new().await;
        let checkout = h.checkout("upi_qr", 50_000).await;

        h.confirm_handler()
            .handle(command(&checkout.payment.reference, ManualConfirmation::NotReceived))
            .await
            .unwrap();

        let payment = h.payment(&checkout.payment.reference).await;
        assert_eq!(payment.status, PaymentStatus::Failed);
        assert_eq!(payment.failure_reason(), Some("Payment not received"));
    }

    #[tokio::test]
    async fn customers_cannot_confirm() {
        let h = Harness::new().await;
        let checkout = h.checkout("bank_transfer", 50_000).await;
        let mut cmd = command(&checkout.payment.reference, ManualConfirmation::Received);
        cmd.is_staff = false;

        let err = h.confirm_handler().handle(cmd).await.unwrap_err();

        assert_eq!(err.code(), ErrorCode::Forbidden);
        let payment = h.payment(&checkout.payment.reference).await;
        assert_eq!(payment.status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn card_payments_cannot_be_confirmed_by_hand() {
        let h = Harness::new().await;
        let checkout = h.checkout("stripe", 50_000).await;

        let err = h
            .confirm_handler()
            .handle(command(&checkout.payment.reference, ManualConfirmation::Received))
            .await
            .unwrap_err();

        assert_eq!(err, BillingError::invalid_state("stripe", "confirm"));
    }

    #[tokio::test]
    async fn settled_payment_cannot_be_confirmed_again() {
        let h = Harness::new().await;
        let checkout = h.checkout("bank_transfer", 50_000).await;
        let reference = checkout.payment.reference;
        h.confirm_handler()
            .handle(command(&reference, ManualConfirmation::Received))
            .await
            .unwrap();

        let err = h
            .confirm_handler()
            .handle(command(&reference, ManualConfirmation::NotReceived))
            .await
            .unwrap_err();

        assert_eq!(err, BillingError::invalid_state("completed", "reject"));
    }

    #[test]
    fn parses_form_actions() {
        assert_eq!(ManualConfirmation::parse("received"), Some(ManualConfirmation::Received));
        assert_eq!(
            ManualConfirmation::parse("not_received"),
            Some(ManualConfirmation::NotReceived)
        );
        assert_eq!(ManualConfirmation::parse("maybe"), None);
    }
}
