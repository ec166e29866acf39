//! Payment gateway port for external payment processing.
//!
//! Each provider (card processor, regional wallet, manual transfer) implements
//! [`PaymentGateway`]. Handlers never name a provider directly; they look the
//! gateway up in a [`GatewayRegistry`] by the payment method's `gateway` key.
//!
//! # Design
//!
//! - **Gateway agnostic**: one contract for order creation, refunds and webhooks
//! - **Minor units**: amounts cross the port as [`Money`] minor units
//! - **No retries**: a failed call is reported once and the caller decides

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::billing::GatewayResponse;
use crate::domain::foundation::{
    DomainError, EventId, InvoiceNumber, Money, PaymentReference, RefundReference, UserId,
};

/// Port for payment provider integrations.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Registry key, e.g. `stripe`.
    fn provider(&self) -> &str;

    /// HTTP header carrying the webhook signature.
    fn signature_header(&self) -> &'static str;

    /// Create the remote payment intent or order.
    async fn create_payment(
        &self,
        request: CreatePaymentRequest,
    ) -> Result<PaymentHandle, PaymentError>;

    /// Ask the provider to return money for a captured payment.
    async fn create_refund(
        &self,
        request: CreateRefundRequest,
    ) -> Result<RefundReceipt, PaymentError>;

    /// Verify a webhook signature and parse the event.
    ///
    /// Must fail closed: any doubt about authenticity is an error.
    async fn verify_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<GatewayEvent, PaymentError>;
}

/// Request to create a remote payment.
#[derive(Debug, Clone)]
pub struct CreatePaymentRequest {
    /// External payment id, also used as the idempotency key / receipt.
    pub payment_reference: PaymentReference,
    pub amount: Money,
    pub user_id: UserId,
    pub event_id: EventId,
    pub invoice_number: InvoiceNumber,
    /// Human-readable line for the provider dashboard.
    pub description: String,
}

/// What the client needs to finish paying.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PaymentHandle {
    /// Card flow: the browser confirms the intent with the client secret.
    ClientSecret {
        intent_id: String,
        client_secret: String,
    },
    /// Wallet flow: the checkout widget opens the order.
    Order { order_id: String },
    /// No remote call; the user is told how to pay.
    Instructions { message: String },
}

impl PaymentHandle {
    /// Provider id the payment is later matched on, if any.
    pub fn transaction_id(&self) -> Option<&str> {
        match self {
            PaymentHandle::ClientSecret { intent_id, .. } => Some(intent_id),
            PaymentHandle::Order { order_id } => Some(order_id),
            PaymentHandle::Instructions { .. } => None,
        }
    }

    /// Fields kept in the payment's gateway response.
    pub fn to_response(&self) -> GatewayResponse {
        let mut response = GatewayResponse::new();
        match self {
            PaymentHandle::ClientSecret { client_secret, .. } => {
                response.insert("client_secret".into(), client_secret.clone().into());
            }
            PaymentHandle::Order { order_id } => {
                response.insert("order_id".into(), order_id.clone().into());
            }
            PaymentHandle::Instructions { message } => {
                response.insert("instructions".into(), message.clone().into());
            }
        }
        response
    }
}

/// Request to refund a captured payment.
#[derive(Debug, Clone)]
pub struct CreateRefundRequest {
    pub refund_reference: RefundReference,
    /// Intent or order id of the original payment.
    pub payment_transaction_id: Option<String>,
    /// Captured-charge id, when the provider refunds against it.
    pub capture_id: Option<String>,
    pub amount: Money,
    pub reason: String,
}

/// Provider acknowledgement of a refund request.
#[derive(Debug, Clone, PartialEq)]
pub struct RefundReceipt {
    pub refund_id: Option<String>,
    /// Staff must move the money by hand.
    pub requires_manual_processing: bool,
    pub response: GatewayResponse,
}

impl RefundReceipt {
    pub fn accepted(refund_id: impl Into<String>) -> Self {
        let refund_id = refund_id.into();
        let mut response = GatewayResponse::new();
        response.insert("refund_id".into(), refund_id.clone().into());
        Self {
            refund_id: Some(refund_id),
            requires_manual_processing: false,
            response,
        }
    }

    pub fn manual() -> Self {
        let mut response = GatewayResponse::new();
        response.insert("manual".into(), true.into());
        Self {
            refund_id: None,
            requires_manual_processing: true,
            response,
        }
    }
}

/// Verified webhook event, normalized across providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayEvent {
    /// Provider event id, the deduplication key.
    pub id: String,
    pub event_type: GatewayEventType,
    pub data: GatewayEventData,
    /// When the provider created the event (Unix timestamp).
    pub created_at: i64,
    /// Raw payload kept with the processing record.
    pub payload: serde_json::Value,
}

/// Events the billing flow reacts to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayEventType {
    PaymentSucceeded,
    PaymentFailed,
    RefundIssued,
    /// Anything else; carries the provider's event name.
    Unknown(String),
}

impl std::fmt::Display for GatewayEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayEventType::PaymentSucceeded => write!(f, "payment_succeeded"),
            GatewayEventType::PaymentFailed => write!(f, "payment_failed"),
            GatewayEventType::RefundIssued => write!(f, "refund_issued"),
            GatewayEventType::Unknown(name) => write!(f, "{}", name),
        }
    }
}

/// Event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GatewayEventData {
    Payment {
        /// Intent or order id stored on the payment.
        transaction_id: String,
        /// Captured-charge id, needed for later refunds.
        capture_id: Option<String>,
        failure_reason: Option<String>,
    },
    Refund {
        /// Intent or order id of the refunded payment.
        transaction_id: String,
        /// Provider refund id; matches a processing refund when we asked for it.
        refund_id: Option<String>,
        amount_minor: i64,
        currency: String,
    },
    Raw,
}

/// Errors from payment provider operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentError {
    pub code: PaymentErrorCode,
    pub message: String,
    /// Provider's own error code, when it sent one.
    pub provider_code: Option<String>,
    pub retryable: bool,
}

impl PaymentError {
    pub fn new(code: PaymentErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
            retryable: code.is_retryable(),
        }
    }

    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::NetworkError, message)
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::AuthenticationError, message)
    }

    pub fn card_declined(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::CardDeclined, message)
    }

    pub fn invalid_webhook(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::InvalidWebhook, message)
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::ProviderError, message)
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::Unsupported, message)
    }
}

impl std::fmt::Display for PaymentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for PaymentError {}

impl From<PaymentError> for DomainError {
    fn from(err: PaymentError) -> Self {
        use crate::domain::foundation::ErrorCode;

        let code = match err.code {
            PaymentErrorCode::CardDeclined
            | PaymentErrorCode::InsufficientFunds
            | PaymentErrorCode::InvalidRequest => ErrorCode::PaymentFailed,
            PaymentErrorCode::InvalidWebhook => ErrorCode::Unauthorized,
            _ => ErrorCode::ExternalServiceError,
        };

        DomainError::new(code, err.message)
    }
}

/// Payment error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentErrorCode {
    NetworkError,
    AuthenticationError,
    CardDeclined,
    InsufficientFunds,
    /// Provider rejected the request parameters.
    InvalidRequest,
    RateLimitExceeded,
    InvalidWebhook,
    /// Operation not offered by this gateway.
    Unsupported,
    ProviderError,
}

impl PaymentErrorCode {
    /// Check if this error type is typically retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentErrorCode::NetworkError | PaymentErrorCode::RateLimitExceeded
        )
    }
}

impl std::fmt::Display for PaymentErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentErrorCode::NetworkError => "network_error",
            PaymentErrorCode::AuthenticationError => "authentication_error",
            PaymentErrorCode::CardDeclined => "card_declined",
            PaymentErrorCode::InsufficientFunds => "insufficient_funds",
            PaymentErrorCode::InvalidRequest => "invalid_request",
            PaymentErrorCode::RateLimitExceeded => "rate_limit_exceeded",
            PaymentErrorCode::InvalidWebhook => "invalid_webhook",
            PaymentErrorCode::Unsupported => "unsupported",
            PaymentErrorCode::ProviderError => "provider_error",
        };
        write!(f, "{}", s)
    }
}

/// Gateways keyed by provider name.
#[derive(Clone, Default)]
pub struct GatewayRegistry {
    gateways: HashMap<String, Arc<dyn PaymentGateway>>,
}

impl GatewayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a gateway under its own provider name, replacing any previous one.
    pub fn register(&mut self, gateway: Arc<dyn PaymentGateway>) {
        self.gateways.insert(gateway.provider().to_string(), gateway);
    }

    pub fn with(mut self, gateway: Arc<dyn PaymentGateway>) -> Self {
        self.register(gateway);
        self
    }

    pub fn get(&self, provider: &str) -> Option<Arc<dyn PaymentGateway>> {
        self.gateways.get(provider).cloned()
    }

    pub fn providers(&self) -> Vec<String> {
        let mut names: Vec<String> = self.gateways.keys().cloned().collect();
        names.sort();
        names
    }
}

impl std::fmt::Debug for GatewayRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayRegistry")
            .field("providers", &self.providers())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NamedGateway(&'static str);

    #[async_trait]
    impl PaymentGateway for NamedGateway {
        fn provider(&self) -> &str {
            self.0
        }

        fn signature_header(&self) -> &'static str {
            "X-Signature"
        }

        async fn create_payment(
            &self,
            _request: CreatePaymentRequest,
        ) -> Result<PaymentHandle, PaymentError> {
            Err(PaymentError::unsupported("test"))
        }

        async fn create_refund(
            &self,
            _request: CreateRefundRequest,
        ) -> Result<RefundReceipt, PaymentError> {
            Ok(RefundReceipt::manual())
        }

        async fn verify_webhook(
            &self,
            _payload: &[u8],
            _signature: &str,
        ) -> Result<GatewayEvent, PaymentError> {
            Err(PaymentError::invalid_webhook("test"))
        }
    }

    #[test]
    fn payment_gateway_is_object_safe() {
        fn _accepts_dyn(_gateway: &dyn PaymentGateway) {}
    }

    #[test]
    fn registry_resolves_by_provider_name() {
        let registry = GatewayRegistry::new()
            .with(Arc::new(NamedGateway("stripe")))
            .with(Arc::new(NamedGateway("razorpay")));

        assert_eq!(registry.get("stripe").unwrap().provider(), "stripe");
        assert!(registry.get("paypal").is_none());
        assert_eq!(registry.providers(), vec!["razorpay", "stripe"]);
    }

    #[test]
    fn handle_exposes_transaction_id_for_remote_flows_only() {
        let secret = PaymentHandle::ClientSecret {
            intent_id: "pi_1".into(),
            client_secret: "pi_1_secret".into(),
        };
        assert_eq!(secret.transaction_id(), Some("pi_1"));
        assert_eq!(secret.to_response()["client_secret"], "pi_1_secret");

        let order = PaymentHandle::Order {
            order_id: "order_9".into(),
        };
        assert_eq!(order.transaction_id(), Some("order_9"));

        let manual = PaymentHandle::Instructions {
            message: "Pay at the desk".into(),
        };
        assert_eq!(manual.transaction_id(), None);
    }

    #[test]
    fn event_type_displays_snake_case() {
        assert_eq!(GatewayEventType::RefundIssued.to_string(), "refund_issued");
        assert_eq!(
            GatewayEventType::Unknown("customer.created".into()).to_string(),
            "customer.created"
        );
    }

    #[test]
    fn payment_error_retryable() {
        assert!(PaymentError::network("timeout").retryable);
        assert!(!PaymentError::card_declined("no").retryable);
    }

    #[test]
    fn declined_card_converts_to_payment_failed() {
        let domain: DomainError = PaymentError::card_declined("Declined").into();
        assert_eq!(domain.code, crate::domain::foundation::ErrorCode::PaymentFailed);
        assert!(domain.message.contains("Declined"));
    }
}
