//! Mock payment gateway for testing.
//!
//! Provides a configurable implementation of `PaymentGateway` for unit and
//! integration tests. Supports:
//! - Pre-configured payment handles and refund receipts
//! - Error injection
//! - Call tracking
//! - Webhook event simulation

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::ports::{
    CreatePaymentRequest, CreateRefundRequest, GatewayEvent, GatewayEventData, GatewayEventType,
    PaymentError, PaymentGateway, PaymentHandle, RefundReceipt,
};

/// Mock gateway.
///
/// # Example
///
/// ```ignore
/// let gateway = MockPaymentGateway::named("stripe");
/// gateway.set_method_error("create_payment", PaymentError::card_declined("Declined"));
/// let registry = GatewayRegistry::new().with(Arc::new(gateway.clone()));
/// ```
#[derive(Clone)]
pub struct MockPaymentGateway {
    provider: String,
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    next_handles: VecDeque<PaymentHandle>,
    next_receipts: VecDeque<RefundReceipt>,
    next_webhook_events: VecDeque<GatewayEvent>,

    /// Error to return on the next call to any method.
    next_error: Option<PaymentError>,

    /// Errors returned on every call to a method.
    method_errors: HashMap<String, PaymentError>,

    call_log: Vec<MethodCall>,
    webhook_verify_mode: WebhookVerifyMode,
}

/// Recorded method call for assertions.
#[derive(Debug, Clone)]
pub struct MethodCall {
    pub method: String,
    pub args: Vec<String>,
}

#[derive(Default, Clone, Copy)]
enum WebhookVerifyMode {
    /// Return the queued event, or parse the payload as a `GatewayEvent`.
    #[default]
    AcceptAll,
    AlwaysFail,
}

impl Default for MockPaymentGateway {
    fn default() -> Self {
        Self::named("mock")
    }
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mock registered under `provider`, e.g. to stand in for `stripe`.
    pub fn named(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            inner: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// A mock that fails all webhook verifications.
    pub fn rejecting_webhooks(provider: impl Into<String>) -> Self {
        let mock = Self::named(provider);
        mock.state().webhook_verify_mode = WebhookVerifyMode::AlwaysFail;
        mock
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration
    // ════════════════════════════════════════════════════════════════════════════

    /// Queue the handle returned by the next `create_payment`.
    pub fn push_handle(&self, handle: PaymentHandle) {
        self.state().next_handles.push_back(handle);
    }

    /// Queue the receipt returned by the next `create_refund`.
    pub fn push_refund_receipt(&self, receipt: RefundReceipt) {
        self.state().next_receipts.push_back(receipt);
    }

    /// Queue the event returned by the next `verify_webhook`.
    pub fn push_webhook_event(&self, event: GatewayEvent) {
        self.state().next_webhook_events.push_back(event);
    }

    pub fn set_error(&self, error: PaymentError) {
        self.state().next_error = Some(error);
    }

    pub fn set_method_error(&self, method: &str, error: PaymentError) {
        self.state()
            .method_errors
            .insert(method.to_string(), error);
    }

    pub fn clear_errors(&self) {
        let mut state = self.state();
        state.next_error = None;
        state.method_errors.clear();
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Call Tracking
    // ════════════════════════════════════════════════════════════════════════════

    pub fn calls(&self) -> Vec<MethodCall> {
        self.state().call_log.clone()
    }

    pub fn was_called(&self, method: &str) -> bool {
        self.state().call_log.iter().any(|c| c.method == method)
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.state()
            .call_log
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Internal Helpers
    // ════════════════════════════════════════════════════════════════════════════

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record_call(&self, method: &str, args: Vec<String>) {
        self.state().call_log.push(MethodCall {
            method: method.to_string(),
            args,
        });
    }

    fn check_error(&self, method: &str) -> Result<(), PaymentError> {
        let mut state = self.state();

        if let Some(error) = state.method_errors.get(method) {
            return Err(error.clone());
        }

        if let Some(error) = state.next_error.take() {
            return Err(error);
        }

        Ok(())
    }
}

fn short_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..12].to_string()
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    fn provider(&self) -> &str {
        &self.provider
    }

    fn signature_header(&self) -> &'static str {
        "X-Mock-Signature"
    }

    async fn create_payment(
        &self,
        request: CreatePaymentRequest,
    ) -> Result<PaymentHandle, PaymentError> {
        self.record_call(
            "create_payment",
            vec![
                request.payment_reference.to_string(),
                request.amount.minor_units().to_string(),
                request.amount.currency().code().to_string(),
            ],
        );
        self.check_error("create_payment")?;

        let handle = self.state().next_handles.pop_front().unwrap_or_else(|| {
            let intent_id = format!("pi_mock_{}", short_id());
            PaymentHandle::ClientSecret {
                client_secret: format!("{}_secret_mock", intent_id),
                intent_id,
            }
        });
        Ok(handle)
    }

    async fn create_refund(
        &self,
        request: CreateRefundRequest,
    ) -> Result<RefundReceipt, PaymentError> {
        self.record_call(
            "create_refund",
            vec![
                request.refund_reference.to_string(),
                request.payment_transaction_id.clone().unwrap_or_default(),
                request.amount.minor_units().to_string(),
            ],
        );
        self.check_error("create_refund")?;

        let receipt = self
            .state()
            .next_receipts
            .pop_front()
            .unwrap_or_else(|| RefundReceipt::accepted(format!("re_mock_{}", short_id())));
        Ok(receipt)
    }

    async fn verify_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<GatewayEvent, PaymentError> {
        self.record_call("verify_webhook", vec![signature.to_string()]);
        self.check_error("verify_webhook")?;

        let mut state = self.state();
        match state.webhook_verify_mode {
            WebhookVerifyMode::AlwaysFail => {
                Err(PaymentError::invalid_webhook("Mock: webhook verification failed"))
            }
            WebhookVerifyMode::AcceptAll => match state.next_webhook_events.pop_front() {
                Some(event) => Ok(event),
                None => serde_json::from_slice(payload).map_err(|e| {
                    PaymentError::invalid_webhook(format!("Mock: unparseable event: {}", e))
                }),
            },
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Event builders
// ════════════════════════════════════════════════════════════════════════════

/// A payment-succeeded event for the intent/order `transaction_id`.
pub fn payment_succeeded_event(event_id: &str, transaction_id: &str) -> GatewayEvent {
    build_event(
        event_id,
        GatewayEventType::PaymentSucceeded,
        GatewayEventData::Payment {
            transaction_id: transaction_id.to_string(),
            capture_id: Some(format!("ch_{}", transaction_id)),
            failure_reason: None,
        },
    )
}

pub fn payment_failed_event(event_id: &str, transaction_id: &str, reason: &str) -> GatewayEvent {
    build_event(
        event_id,
        GatewayEventType::PaymentFailed,
        GatewayEventData::Payment {
            transaction_id: transaction_id.to_string(),
            capture_id: None,
            failure_reason: Some(reason.to_string()),
        },
    )
}

/// A refund notice for `amount_minor` INR against `transaction_id`.
pub fn refund_issued_event(
    event_id: &str,
    transaction_id: &str,
    refund_id: Option<&str>,
    amount_minor: i64,
) -> GatewayEvent {
    build_event(
        event_id,
        GatewayEventType::RefundIssued,
        GatewayEventData::Refund {
            transaction_id: transaction_id.to_string(),
            refund_id: refund_id.map(str::to_string),
            amount_minor,
            currency: "INR".to_string(),
        },
    )
}

fn build_event(event_id: &str, event_type: GatewayEventType, data: GatewayEventData) -> GatewayEvent {
    GatewayEvent {
        id: event_id.to_string(),
        event_type,
        data,
        created_at: chrono::Utc::now().timestamp(),
        payload: serde_json::json!({ "id": event_id }),
    }
}
