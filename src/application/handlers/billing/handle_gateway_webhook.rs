//! HandleGatewayWebhookHandler - Command handler for signed gateway callbacks.
//!
//! The only writer of gateway-driven state transitions. Each verified event
//! is applied at most once per `(provider, event id)`:
//!
//! 1. Resolve the gateway by provider name
//! 2. Verify the signature (fails closed, nothing is read or written)
//! 3. Short-circuit events already recorded
//! 4. Apply the event
//! 5. Record the outcome
//!
//! Events that cannot apply (unknown transaction, illegal transition) are
//! recorded as ignored and acknowledged so the provider stops retrying.
//! Storage failures are not recorded; the provider's retry reprocesses them.

use std::sync::Arc;

use crate::domain::billing::{PaymentStatus, Refund, RefundStatus, WebhookError};
use crate::domain::foundation::{Currency, DomainError, ErrorCode, Money, Timestamp};
use crate::ports::{
    GatewayEvent, GatewayEventData, GatewayEventType, GatewayRegistry, InvoiceRepository,
    PaymentRepository, RefundRepository, SaveResult, WebhookEventRecord, WebhookEventRepository,
    WebhookResult,
};

use super::notifier::BillingNotifier;

const GATEWAY_REFUND_REASON: &str = "Refund issued by payment gateway";

/// Command carrying one raw webhook delivery.
#[derive(Debug, Clone)]
pub struct HandleGatewayWebhookCommand {
    /// Provider path segment, e.g. `stripe`.
    pub provider: String,
    pub payload: Vec<u8>,
    /// Value of the provider's signature header, if present.
    pub signature: Option<String>,
}

/// What applying an event did.
enum Applied {
    Changed,
    Skipped(String),
}

pub struct HandleGatewayWebhookHandler {
    gateways: GatewayRegistry,
    invoices: Arc<dyn InvoiceRepository>,
    payments: Arc<dyn PaymentRepository>,
    refunds: Arc<dyn RefundRepository>,
    webhook_events: Arc<dyn WebhookEventRepository>,
    notifier: BillingNotifier,
}

impl HandleGatewayWebhookHandler {
    pub fn new(
        gateways: GatewayRegistry,
        invoices: Arc<dyn InvoiceRepository>,
        payments: Arc<dyn PaymentRepository>,
        refunds: Arc<dyn RefundRepository>,
        webhook_events: Arc<dyn WebhookEventRepository>,
        notifier: BillingNotifier,
    ) -> Self {
        Self {
            gateways,
            invoices,
            payments,
            refunds,
            webhook_events,
            notifier,
        }
    }

    pub async fn handle(
        &self,
        cmd: HandleGatewayWebhookCommand,
    ) -> Result<WebhookResult, WebhookError> {
        let gateway = self
            .gateways
            .get(&cmd.provider)
            .ok_or_else(|| WebhookError::UnknownProvider(cmd.provider.clone()))?;

        let signature = cmd.signature.as_deref().ok_or_else(|| {
            tracing::warn!(provider = %cmd.provider, "Webhook without signature header");
            WebhookError::InvalidSignature
        })?;

        let event = gateway
            .verify_webhook(&cmd.payload, signature)
            .await
            .map_err(|e| {
                tracing::warn!(provider = %cmd.provider, error = %e, "Webhook verification failed");
                WebhookError::InvalidSignature
            })?;

        if self
            .webhook_events
            .find(&cmd.provider, &event.id)
            .await
            .map_err(storage_error)?
            .is_some()
        {
            tracing::info!(
                provider = %cmd.provider,
                event_id = %event.id,
                "Webhook already processed"
            );
            return Ok(WebhookResult::AlreadyProcessed);
        }

        let applied = match self.apply(&event).await {
            Ok(applied) => applied,
            Err(e) if is_rejected_transition(&e) => Applied::Skipped(e.message),
            Err(e) => {
                tracing::error!(
                    provider = %cmd.provider,
                    event_id = %event.id,
                    error = %e,
                    "Webhook processing failed"
                );
                return Err(storage_error(e));
            }
        };

        let event_type = event.event_type.to_string();
        let (record, result) = match applied {
            Applied::Changed => (
                WebhookEventRecord::success(&cmd.provider, &event.id, event_type, event.payload),
                WebhookResult::Processed,
            ),
            Applied::Skipped(reason) => {
                tracing::info!(
                    provider = %cmd.provider,
                    event_id = %event.id,
                    reason = %reason,
                    "Webhook acknowledged without changes"
                );
                (
                    WebhookEventRecord::ignored(
                        &cmd.provider,
                        &event.id,
                        event_type,
                        reason,
                        event.payload,
                    ),
                    WebhookResult::Ignored,
                )
            }
        };

        match self.webhook_events.save(record).await.map_err(storage_error)? {
            SaveResult::Inserted => Ok(result),
            SaveResult::AlreadyExists => Ok(WebhookResult::AlreadyProcessed),
        }
    }

    async fn apply(&self, event: &GatewayEvent) -> Result<Applied, DomainError> {
        match (&event.event_type, &event.data) {
            (
                GatewayEventType::PaymentSucceeded,
                GatewayEventData::Payment {
                    transaction_id,
                    capture_id,
                    ..
                },
            ) => {
                self.payment_succeeded(transaction_id, capture_id.as_deref())
                    .await
            }
            (
                GatewayEventType::PaymentFailed,
                GatewayEventData::Payment {
                    transaction_id,
                    failure_reason,
                    ..
                },
            ) => {
                self.payment_failed(transaction_id, failure_reason.as_deref())
                    .await
            }
            (
                GatewayEventType::RefundIssued,
                GatewayEventData::Refund {
                    transaction_id,
                    refund_id,
                    amount_minor,
                    currency,
                },
            ) => {
                self.refund_issued(transaction_id, refund_id.as_deref(), *amount_minor, currency)
                    .await
            }
            (event_type, _) => Ok(Applied::Skipped(format!(
                "Unhandled event type: {}",
                event_type
            ))),
        }
    }

    async fn payment_succeeded(
        &self,
        transaction_id: &str,
        capture_id: Option<&str>,
    ) -> Result<Applied, DomainError> {
        let Some(mut payment) = self.payments.find_by_transaction_id(transaction_id).await? else {
            tracing::warn!(transaction_id, "Payment not found for succeeded webhook");
            return Ok(Applied::Skipped("Payment not found".to_string()));
        };

        // A completed payment with an unpaid invoice is a delivery that failed
        // between the two writes; finish settling instead of rejecting it.
        let resuming = payment.status == PaymentStatus::Completed;
        if !resuming {
            payment.complete(Timestamp::now())?;
            if let Some(capture_id) = capture_id {
                payment.record_capture(capture_id);
            }
            self.payments.update(&payment).await?;

            tracing::info!(
                payment_id = %payment.reference,
                transaction_id,
                amount = %payment.amount,
                "Payment completed"
            );
        }

        let Some(mut invoice) = self.invoices.find_by_id(&payment.invoice_id).await? else {
            tracing::error!(
                payment_id = %payment.reference,
                invoice_id = %payment.invoice_id,
                "Invoice missing for completed payment"
            );
            return Ok(if resuming {
                Applied::Skipped("Invoice missing".to_string())
            } else {
                Applied::Changed
            });
        };

        match invoice.record_payment(&payment) {
            Ok(()) => {
                self.invoices.update(&invoice).await?;
                tracing::info!(
                    invoice_number = %invoice.invoice_number,
                    resumed = resuming,
                    "Invoice paid"
                );
            }
            Err(_) if resuming => {
                return Ok(Applied::Skipped(format!(
                    "Payment {} is already completed",
                    payment.reference
                )));
            }
            Err(e) => {
                tracing::warn!(
                    invoice_number = %invoice.invoice_number,
                    error = %e,
                    "Invoice not settled by completed payment"
                );
            }
        }

        self.notifier.payment_confirmed(&payment, &invoice).await;
        Ok(Applied::Changed)
    }

    async fn payment_failed(
        &self,
        transaction_id: &str,
        reason: Option<&str>,
    ) -> Result<Applied, DomainError> {
        let Some(mut payment) = self.payments.find_by_transaction_id(transaction_id).await? else {
            tracing::warn!(transaction_id, "Payment not found for failed webhook");
            return Ok(Applied::Skipped("Payment not found".to_string()));
        };

        let reason = reason.unwrap_or("Unknown error");
        payment.fail(reason)?;
        self.payments.update(&payment).await?;

        tracing::info!(payment_id = %payment.reference, reason, "Payment failed");

        self.notifier.payment_failed(&payment).await;
        Ok(Applied::Changed)
    }

    async fn refund_issued(
        &self,
        transaction_id: &str,
        provider_refund_id: Option<&str>,
        amount_minor: i64,
        currency: &str,
    ) -> Result<Applied, DomainError> {
        let Some(mut payment) = self.payments.find_by_transaction_id(transaction_id).await? else {
            tracing::warn!(transaction_id, "Payment not found for refund webhook");
            return Ok(Applied::Skipped("Payment not found".to_string()));
        };

        if !payment.is_refundable() {
            return Ok(Applied::Skipped(format!(
                "Cannot refund a {} payment",
                payment.status.as_str()
            )));
        }

        let existing = match provider_refund_id {
            Some(id) => self.refunds.find_by_transaction_id(id).await?,
            None => None,
        };

        let now = Timestamp::now();
        let refund = match existing {
            Some(mut refund) if refund.status == RefundStatus::Processing => {
                refund.complete(now)?;
                self.refunds.update(&refund).await?;
                refund
            }
            // Completed on an earlier delivery that failed before the payment was marked.
            Some(refund)
                if refund.status == RefundStatus::Completed
                    && payment.status != PaymentStatus::Refunded =>
            {
                tracing::info!(refund_id = %refund.reference, "Resuming refund settlement");
                refund
            }
            Some(refund) => {
                return Ok(Applied::Skipped(format!(
                    "Refund {} is already {}",
                    refund.reference,
                    refund.status.as_str()
                )));
            }
            None => {
                let currency = Currency::new(currency)?;
                let refund = Refund::from_gateway_notice(
                    &payment,
                    Money::from_minor(amount_minor, currency),
                    provider_refund_id.map(str::to_string),
                    GATEWAY_REFUND_REASON,
                    now,
                );
                self.refunds.save(&refund).await?;
                refund
            }
        };

        payment.mark_refunded()?;
        self.payments.update(&payment).await?;

        tracing::info!(
            payment_id = %payment.reference,
            refund_id = %refund.reference,
            amount = %refund.amount,
            "Refund completed"
        );

        self.notifier.refund_processed(&refund, &payment).await;
        Ok(Applied::Changed)
    }
}

/// Domain rejections that a redelivery cannot fix.
fn is_rejected_transition(err: &DomainError) -> bool {
    matches!(
        err.code,
        ErrorCode::InvalidStateTransition
            | ErrorCode::InvalidFormat
            | ErrorCode::EmptyField
            | ErrorCode::OutOfRange
            | ErrorCode::ValidationFailed
            | ErrorCode::CurrencyMismatch
            | ErrorCode::InvalidAmount
    )
}

fn storage_error(err: DomainError) -> WebhookError {
    WebhookError::Database(err.to_string())
}
