//! Shared wiring for the integration tests.
//!
//! Everything runs on the in-memory adapters. `stripe` is a mock gateway the
//! tests can script; `manual` is the real manual gateway.

#![allow(dead_code)]

use std::sync::Arc;

use event_payments::adapters::document::MarkdownInvoiceGenerator;
use event_payments::adapters::http::BillingAppState;
use event_payments::adapters::manual::ManualGateway;
use event_payments::adapters::memory::{
    InMemoryEventDirectory, InMemoryInvoiceRepository, InMemoryPaymentMethodCatalog,
    InMemoryPaymentRepository, InMemoryRefundRepository, InMemoryWebhookEventRepository,
    RecordingNotificationSender,
};
use event_payments::adapters::mock::MockPaymentGateway;
use event_payments::application::{
    BillingNotifier, HandleGatewayWebhookCommand, ProcessCheckoutCommand, ProcessCheckoutResult,
};
use event_payments::domain::billing::{BillingError, Invoice, Payment, WebhookError};
use event_payments::domain::foundation::{
    Currency, EventId, InvoiceId, Money, PaymentReference, UserId,
};
use event_payments::ports::{
    GatewayEvent, GatewayRegistry, InvoiceRepository, PaymentRepository, UserContact,
    WebhookResult,
};

pub struct TestApp {
    pub state: BillingAppState,
    pub invoices: Arc<InMemoryInvoiceRepository>,
    pub payments: Arc<InMemoryPaymentRepository>,
    pub refunds: Arc<InMemoryRefundRepository>,
    pub webhooks: Arc<InMemoryWebhookEventRepository>,
    pub sender: Arc<RecordingNotificationSender>,
    pub stripe: MockPaymentGateway,
    pub event_id: EventId,
    pub user_id: UserId,
}

impl TestApp {
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

        let invoices = Arc::new(InMemoryInvoiceRepository::new());
        let payments = Arc::new(InMemoryPaymentRepository::new());
        let refunds = Arc::new(InMemoryRefundRepository::new());
        let webhooks = Arc::new(InMemoryWebhookEventRepository::new());
        let sender = Arc::new(RecordingNotificationSender::new());
        let stripe = MockPaymentGateway::named("stripe");

        let notifier = BillingNotifier::new(
            directory.clone(),
            invoices.clone(),
            sender.clone(),
            Arc::new(MarkdownInvoiceGenerator::new()),
        );

        let state = BillingAppState {
            directory,
            catalog: Arc::new(InMemoryPaymentMethodCatalog::new()),
            invoices: invoices.clone(),
            payments: payments.clone(),
            refunds: refunds.clone(),
            webhook_events: webhooks.clone(),
            gateways: GatewayRegistry::new()
                .with(Arc::new(stripe.clone()))
                .with(Arc::new(ManualGateway::new())),
            notifier,
            default_currency: Currency::inr(),
            dev_mode: false,
            verbose_errors: false,
        };

        Self {
            state,
            invoices,
            payments,
            refunds,
            webhooks,
            sender,
            stripe,
            event_id,
            user_id,
        }
    }

    pub fn inr(minor: i64) -> Money {
        Money::from_minor(minor, Currency::inr())
    }

    pub async fn try_checkout(
        &self,
        method: &str,
        minor: i64,
    ) -> Result<ProcessCheckoutResult, BillingError> {
        self.state
            .checkout_handler()
            .handle(ProcessCheckoutCommand {
                user_id: self.user_id.clone(),
                event_id: self.event_id,
                amount: Self::inr(minor),
                payment_method: method.to_string(),
            })
            .await
    }

    pub async fn checkout(&self, method: &str, minor: i64) -> ProcessCheckoutResult {
        self.try_checkout(method, minor).await.unwrap()
    }

    /// Delivers `event` to the stripe webhook receiver with a valid signature.
    pub async fn deliver(&self, event: &GatewayEvent) -> Result<WebhookResult, WebhookError> {
        self.state
            .webhook_handler()
            .handle(HandleGatewayWebhookCommand {
                provider: "stripe".into(),
                payload: serde_json::to_vec(event).unwrap(),
                signature: Some("t=1,v1=mock".into()),
            })
            .await
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
