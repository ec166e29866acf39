//! Shared wiring for billing handler tests.
//!
//! Every port is backed by its in-memory adapter. The `stripe` and `razorpay`
//! gateways are mocks; `manual` is the real manual gateway.

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::adapters::document::MarkdownInvoiceGenerator;
use crate::adapters::manual::ManualGateway;
use crate::adapters::memory::{
    InMemoryEventDirectory, InMemoryInvoiceRepository, InMemoryPaymentMethodCatalog,
    InMemoryPaymentRepository, InMemoryRefundRepository, InMemoryWebhookEventRepository,
    RecordingNotificationSender,
};
use crate::adapters::mock::MockPaymentGateway;
use crate::domain::billing::{Invoice, Payment, Refund};
use crate::domain::foundation::{
    Currency, EventId, InvoiceId, Money, PaymentReference, Timestamp, UserId,
};
use crate::ports::{GatewayRegistry, InvoiceRepository, PaymentRepository, UserContact};

use super::{
    BillingNotifier, CalculateFeesHandler, ConfirmManualPaymentHandler,
    ExpirePendingPaymentsHandler, GetInvoiceHandler, GetPaymentStatusHandler,
    HandleGatewayWebhookHandler, ListPaymentMethodsHandler, ListPaymentsHandler,
    ProcessCheckoutCommand, ProcessCheckoutHandler, ProcessCheckoutResult,
    PurgeWebhookEventsHandler, RequestRefundCommand, RequestRefundHandler,
};

pub(crate) struct Harness {
    pub invoices: Arc<InMemoryInvoiceRepository>,
    pub payments: Arc<InMemoryPaymentRepository>,
    pub refunds: Arc<InMemoryRefundRepository>,
    pub catalog: Arc<InMemoryPaymentMethodCatalog>,
    pub directory: Arc<InMemoryEventDirectory>,
    pub webhooks: Arc<InMemoryWebhookEventRepository>,
    pub sender: Arc<RecordingNotificationSender>,
    pub stripe: MockPaymentGateway,
    pub registry: GatewayRegistry,
    pub event_id: EventId,
    pub user_id: UserId,
}

impl Harness {
    pub async fn new() -> Self {
        let directory = Arc::new(InMemoryEventDirectory::new());
        let event_id = directory.add_event("RustConf").await;
        let user_id = UserId::new("user-1").unwrap();
        directory
            .add_contact(UserContact {
                user_id: user_id.clone(),
                email: "asha@example.com".into(),
                name: "Asha".into(),
            })
            .await;

        let stripe = MockPaymentGateway::named("stripe");
        let registry = GatewayRegistry::new()
            .with(Arc::new(stripe.clone()))
            .with(Arc::new(MockPaymentGateway::named("razorpay")))
            .with(Arc::new(ManualGateway::new()));

        Self {
            invoices: Arc::new(InMemoryInvoiceRepository::new()),
            payments: Arc::new(InMemoryPaymentRepository::new()),
            refunds: Arc::new(InMemoryRefundRepository::new()),
            catalog: Arc::new(InMemoryPaymentMethodCatalog::new()),
            directory,
            webhooks: Arc::new(InMemoryWebhookEventRepository::new()),
            sender: Arc::new(RecordingNotificationSender::new()),
            stripe,
            registry,
            event_id,
            user_id,
        }
    }

    pub fn notifier(&self) -> BillingNotifier {
        BillingNotifier::new(
            self.directory.clone(),
            self.invoices.clone(),
            self.sender.clone(),
            Arc::new(MarkdownInvoiceGenerator::new()),
        )
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Handlers
    // ════════════════════════════════════════════════════════════════════════════

    pub fn checkout_handler(&self) -> ProcessCheckoutHandler {
        ProcessCheckoutHandler::new(
            self.directory.clone(),
            self.catalog.clone(),
            self.invoices.clone(),
            self.payments.clone(),
            self.registry.clone(),
            self.notifier(),
        )
    }

    pub fn webhook_handler(&self) -> HandleGatewayWebhookHandler {
        self.webhook_handler_with(self.registry.clone())
    }

    pub fn webhook_handler_with(&self, registry: GatewayRegistry) -> HandleGatewayWebhookHandler {
        HandleGatewayWebhookHandler::new(
            registry,
            self.invoices.clone(),
            self.payments.clone(),
            self.refunds.clone(),
            self.webhooks.clone(),
            self.notifier(),
        )
    }

    pub fn refund_handler(&self) -> RequestRefundHandler {
        RequestRefundHandler::new(
            self.payments.clone(),
            self.refunds.clone(),
            self.catalog.clone(),
            self.registry.clone(),
            self.notifier(),
        )
    }

    pub fn confirm_handler(&self) -> ConfirmManualPaymentHandler {
        ConfirmManualPaymentHandler::new(
            self.payments.clone(),
            self.invoices.clone(),
            self.catalog.clone(),
            self.notifier(),
        )
    }

    pub fn expire_handler(&self) -> ExpirePendingPaymentsHandler {
        ExpirePendingPaymentsHandler::new(self.payments.clone(), self.notifier())
    }

    pub fn status_handler(&self) -> GetPaymentStatusHandler {
        GetPaymentStatusHandler::new(self.payments.clone(), self.refunds.clone())
    }

    pub fn list_handler(&self) -> ListPaymentsHandler {
        ListPaymentsHandler::new(self.payments.clone())
    }

    pub fn invoice_handler(&self) -> GetInvoiceHandler {
        GetInvoiceHandler::new(
            self.invoices.clone(),
            self.payments.clone(),
            self.refunds.clone(),
        )
    }

    pub fn methods_handler(&self) -> ListPaymentMethodsHandler {
        ListPaymentMethodsHandler::new(self.catalog.clone())
    }

    pub fn fees_handler(&self) -> CalculateFeesHandler {
        CalculateFeesHandler::new(self.catalog.clone())
    }

    pub fn purge_handler(&self) -> PurgeWebhookEventsHandler {
        PurgeWebhookEventsHandler::new(self.webhooks.clone())
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Scenarios
    // ════════════════════════════════════════════════════════════════════════════

    /// Checkout for `user-1` with a subtotal of `minor` paise.
    pub async fn checkout(&self, method: &str, minor: i64) -> ProcessCheckoutResult {
        self.checkout_handler()
            .handle(ProcessCheckoutCommand {
                user_id: self.user_id.clone(),
                event_id: self.event_id,
                amount: Money::from_minor(minor, Currency::inr()),
                payment_method: method.to_string(),
            })
            .await
            .unwrap()
    }

    /// A settled 1000.00 INR checkout, as if the gateway webhook had arrived.
    pub async fn completed_payment(&self, method: &str) -> PaymentReference {
        let checkout = self.checkout(method, 100_000).await;
        let mut payment = self.payment(&checkout.payment.reference).await;
        payment.complete(Timestamp::now()).unwrap();
        if let Some(txn) = payment.transaction_id.clone() {
            payment.record_capture(format!("ch_{}", txn));
        }
        self.payments.update(&payment).await.unwrap();

        let mut invoice = self.invoice(&payment.invoice_id).await;
        invoice.record_payment(&payment).unwrap();
        self.invoices.update(&invoice).await.unwrap();

        payment.reference
    }

    pub async fn request_refund(
        &self,
        reference: &PaymentReference,
        amount: Option<Decimal>,
    ) -> Refund {
        self.refund_handler()
            .handle(RequestRefundCommand {
                user_id: self.user_id.clone(),
                payment_reference: reference.clone(),
                amount,
                reason: "Cannot attend".into(),
            })
            .await
            .unwrap()
            .refund
    }

    pub async fn payment(&self, reference: &PaymentReference) -> Payment {
        self.payments
            .find_by_reference(reference)
            .await
            .unwrap()
            .unwrap()
    }

    pub async fn invoice(&self, id: &InvoiceId) -> Invoice {
        self.invoices.find_by_id(id).await.unwrap().unwrap()
    }
}
