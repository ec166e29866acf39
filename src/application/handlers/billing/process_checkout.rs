//! ProcessCheckoutHandler - Command handler for starting a payment.
//!
//! Issues the invoice, records a pending payment and asks the method's
//! gateway for a client-side handle. Both rows are written before the
//! gateway is called, so a provider failure leaves a failed payment and a
//! sent invoice behind for audit.

use std::sync::Arc;

use crate::domain::billing::{BillingError, Invoice, Payment, PaymentMethod};
use crate::domain::foundation::{EventId, Money, Timestamp, UserId};
use crate::ports::{
    CreatePaymentRequest, EventDirectory, GatewayRegistry, InvoiceRepository,
    PaymentGateway, PaymentHandle, PaymentMethodCatalog, PaymentRepository,
};

use super::notifier::BillingNotifier;

const DEV_MODE_MESSAGE: &str = "Payment completed in development mode.";

/// Command to pay for an event.
#[derive(Debug, Clone)]
pub struct ProcessCheckoutCommand {
    pub user_id: UserId,
    pub event_id: EventId,
    /// Subtotal before tax.
    pub amount: Money,
    pub payment_method: String,
}

#[derive(Debug, Clone)]
pub struct ProcessCheckoutResult {
    pub invoice: Invoice,
    pub payment: Payment,
    pub handle: PaymentHandle,
}

pub struct ProcessCheckoutHandler {
    directory: Arc<dyn EventDirectory>,
    catalog: Arc<dyn PaymentMethodCatalog>,
    invoices: Arc<dyn InvoiceRepository>,
    payments: Arc<dyn PaymentRepository>,
    gateways: GatewayRegistry,
    notifier: BillingNotifier,
    dev_mode: bool,
}

impl ProcessCheckoutHandler {
    pub fn new(
        directory: Arc<dyn EventDirectory>,
        catalog: Arc<dyn PaymentMethodCatalog>,
        invoices: Arc<dyn InvoiceRepository>,
        payments: Arc<dyn PaymentRepository>,
        gateways: GatewayRegistry,
        notifier: BillingNotifier,
    ) -> Self {
        Self {
            directory,
            catalog,
            invoices,
            payments,
            gateways,
            notifier,
            dev_mode: false,
        }
    }

    /// Complete payments at checkout without calling any gateway.
    pub fn with_dev_mode(mut self, dev_mode: bool) -> Self {
        self.dev_mode = dev_mode;
        self
    }

    pub async fn handle(
        &self,
        cmd: ProcessCheckoutCommand,
    ) -> Result<ProcessCheckoutResult, BillingError> {
        // 1. Validate before anything is written
        if !cmd.amount.is_positive() {
            return Err(BillingError::invalid_amount("Invalid amount"));
        }

        let event = self
            .directory
            .find_event(&cmd.event_id)
            .await?
            .ok_or_else(|| BillingError::event_not_found(cmd.event_id.to_string()))?;

        let method = self
            .catalog
            .find_active(&cmd.payment_method)
            .await?
            .ok_or_else(|| BillingError::unknown_payment_method(&cmd.payment_method))?;

        let gateway = self.gateway_for(&method)?;

        let now = Timestamp::now();
        let invoice = Invoice::issue(event.id, cmd.user_id.clone(), cmd.amount, now)?;
        let mut payment = Payment::initiate(&invoice, &method, now);

        if self.dev_mode {
            return self.complete_without_gateway(invoice, payment, now).await;
        }

        // 2. Persist before the external call
        self.invoices.save(&invoice).await?;
        self.payments.save(&payment).await?;

        tracing::info!(
            payment_id = %payment.reference,
            invoice_number = %invoice.invoice_number,
            event_id = %event.id,
            amount = %payment.amount,
            method = %method.name,
            "Checkout started"
        );

        // 3. Ask the gateway for a handle
        let request = CreatePaymentRequest {
            payment_reference: payment.reference.clone(),
            amount: payment.amount.clone(),
            user_id: cmd.user_id,
            event_id: event.id,
            invoice_number: invoice.invoice_number.clone(),
            description: format!("Registration for {}", event.title),
        };

        let handle = match gateway.create_payment(request).await {
            Ok(handle) => handle,
            Err(e) => {
                tracing::warn!(
                    payment_id = %payment.reference,
                    provider = %gateway.provider(),
                    error = %e,
                    "Gateway rejected payment"
                );
                payment.fail_with_gateway_error(e.message.clone())?;
                self.payments.update(&payment).await?;
                return Err(BillingError::gateway_failed(
                    e.message,
                    Some(payment.reference),
                ));
            }
        };

        payment.attach_gateway_handle(
            handle.transaction_id().map(str::to_string),
            handle.to_response(),
        )?;
        self.payments.update(&payment).await?;

        if method.is_manual() {
            self.notifier.payment_instructions(&payment, &invoice).await;
        }

        Ok(ProcessCheckoutResult {
            invoice,
            payment,
            handle,
        })
    }

    fn gateway_for(&self, method: &PaymentMethod) -> Result<Arc<dyn PaymentGateway>, BillingError> {
        self.gateways
            .get(&method.gateway)
            .ok_or_else(|| BillingError::gateway_unavailable(&method.gateway))
    }

    async fn complete_without_gateway(
        &self,
        mut invoice: Invoice,
        mut payment: Payment,
        now: Timestamp,
    ) -> Result<ProcessCheckoutResult, BillingError> {
        payment.complete(now)?;
        invoice.record_payment(&payment)?;

        self.invoices.save(&invoice).await?;
        self.payments.save(&payment).await?;

        tracing::info!(
            payment_id = %payment.reference,
            invoice_number = %invoice.invoice_number,
            "Payment completed without gateway (dev mode)"
        );

        self.notifier.payment_confirmed(&payment, &invoice).await;

        Ok(ProcessCheckoutResult {
            invoice,
            payment,
            handle: PaymentHandle::Instructions {
                message: DEV_MODE_MESSAGE.to_string(),
            },
        })
    }
}
