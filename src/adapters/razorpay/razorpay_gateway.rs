//! Razorpay regional wallet gateway.
//!
//! Checkout creates an Orders API order that the Razorpay widget opens on the
//! client. Refunds are issued against the captured payment id that arrives
//! with `payment.captured`. Webhooks carry a hex HMAC-SHA256 of the raw body
//! in `X-Razorpay-Signature`.

use std::collections::HashMap;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::ports::{
    CreatePaymentRequest, CreateRefundRequest, GatewayEvent, GatewayEventData, GatewayEventType,
    PaymentError, PaymentErrorCode, PaymentGateway, PaymentHandle, RefundReceipt,
};

use super::types::{
    CreateOrderBody, CreateRefundBody, RazorpayErrorBody, RazorpayOrder, RazorpayRefund,
    RazorpayWebhook,
};

type HmacSha256 = Hmac<Sha256>;

/// Registry key of this gateway.
pub const RAZORPAY_PROVIDER: &str = "razorpay";

/// Razorpay API configuration.
#[derive(Clone)]
pub struct RazorpayConfig {
    /// rzp_live_... or rzp_test_...
    key_id: String,
    key_secret: SecretString,
    webhook_secret: SecretString,
    api_base_url: String,
}

impl RazorpayConfig {
    pub fn new(
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
        webhook_secret: impl Into<String>,
    ) -> Self {
        Self {
            key_id: key_id.into(),
            key_secret: SecretString::new(key_secret.into()),
            webhook_secret: SecretString::new(webhook_secret.into()),
            api_base_url: "https://api.razorpay.com".to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Public key id, safe to hand to the checkout widget.
    pub fn key_id(&self) -> &str {
        &self.key_id
    }
}

impl std::fmt::Debug for RazorpayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RazorpayConfig")
            .field("key_id", &self.key_id)
            .field("api_base_url", &self.api_base_url)
            .finish_non_exhaustive()
    }
}

pub struct RazorpayGateway {
    config: RazorpayConfig,
    http_client: reqwest::Client,
}

impl RazorpayGateway {
    pub fn new(config: RazorpayConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    pub fn with_client(config: RazorpayConfig, http_client: reqwest::Client) -> Self {
        Self {
            config,
            http_client,
        }
    }

    fn verify_signature(&self, payload: &[u8], signature: &str) -> Result<(), PaymentError> {
        let provided = hex::decode(signature.trim())
            .map_err(|_| PaymentError::invalid_webhook("Signature is not valid hex"))?;

        let mut mac =
            HmacSha256::new_from_slice(self.config.webhook_secret.expose_secret().as_bytes())
                .map_err(|e| PaymentError::invalid_webhook(format!("Bad signing key: {}", e)))?;
        mac.update(payload);
        let expected = mac.finalize().into_bytes();

        if expected.as_slice().ct_eq(provided.as_slice()).unwrap_u8() != 1 {
            tracing::warn!("Invalid Razorpay webhook signature");
            return Err(PaymentError::invalid_webhook("Invalid signature"));
        }
        Ok(())
    }

    fn parse_event(&self, payload: &[u8]) -> Result<GatewayEvent, PaymentError> {
        let raw: serde_json::Value = serde_json::from_slice(payload).map_err(|e| {
            tracing::warn!(error = %e, "Failed to parse Razorpay webhook payload");
            PaymentError::invalid_webhook(format!("Invalid JSON: {}", e))
        })?;
        let webhook: RazorpayWebhook = serde_json::from_value(raw.clone())
            .map_err(|e| PaymentError::invalid_webhook(format!("Invalid event: {}", e)))?;

        let (event_type, data, entity_id) = extract_event(&webhook);

        Ok(GatewayEvent {
            // Razorpay has no event id in the body; the event name plus the
            // entity id is stable across redeliveries.
            id: format!("{}:{}", webhook.event, entity_id),
            event_type,
            data,
            created_at: webhook.created_at,
            payload: raw,
        })
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, PaymentError> {
        let url = format!("{}{}", self.config.api_base_url, path);

        let response = self
            .http_client
            .post(&url)
            .basic_auth(&self.config.key_id, Some(self.config.key_secret.expose_secret()))
            .json(body)
            .send()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), path, error = %error_text, "Razorpay API call failed");
            return Err(map_api_error(status.as_u16(), &error_text));
        }

        response.json().await.map_err(|e| {
            PaymentError::provider(format!("Failed to parse Razorpay response: {}", e))
        })
    }
}

/// Returns the event type, its data and the id of the entity it is about.
fn extract_event(webhook: &RazorpayWebhook) -> (GatewayEventType, GatewayEventData, String) {
    let payment = webhook.payload.payment.as_ref().map(|p| &p.entity);
    let refund = webhook.payload.refund.as_ref().map(|r| &r.entity);
    let unknown = || GatewayEventType::Unknown(webhook.event.clone());

    match (webhook.event.as_str(), payment, refund) {
        ("payment.captured", Some(payment), _) | ("payment.failed", Some(payment), _) => {
            let Some(order_id) = payment.order_id.clone() else {
                // payments outside the Orders API are not ours
                return (unknown(), GatewayEventData::Raw, payment.id.clone());
            };
            let succeeded = webhook.event == "payment.captured";
            let event_type = if succeeded {
                GatewayEventType::PaymentSucceeded
            } else {
                GatewayEventType::PaymentFailed
            };
            let failure_reason = (!succeeded).then(|| {
                payment
                    .error_description
                    .clone()
                    .unwrap_or_else(|| "Unknown error".to_string())
            });
            (
                event_type,
                GatewayEventData::Payment {
                    transaction_id: order_id,
                    capture_id: Some(payment.id.clone()),
                    failure_reason,
                },
                payment.id.clone(),
            )
        }

        ("refund.processed", Some(payment), Some(refund)) => match payment.order_id.clone() {
            Some(order_id) => (
                GatewayEventType::RefundIssued,
                GatewayEventData::Refund {
                    transaction_id: order_id,
                    refund_id: Some(refund.id.clone()),
                    amount_minor: refund.amount,
                    currency: refund
                        .currency
                        .clone()
                        .unwrap_or_else(|| payment.currency.clone())
                        .to_ascii_uppercase(),
                },
                refund.id.clone(),
            ),
            None => (unknown(), GatewayEventData::Raw, refund.id.clone()),
        },

        (_, payment, refund) => {
            let entity_id = refund
                .map(|r| r.id.clone())
                .or_else(|| payment.map(|p| p.id.clone()))
                .unwrap_or_else(|| webhook.created_at.to_string());
            (unknown(), GatewayEventData::Raw, entity_id)
        }
    }
}

fn map_api_error(status: u16, body: &str) -> PaymentError {
    let parsed = serde_json::from_str::<RazorpayErrorBody>(body).ok();
    let message = parsed
        .as_ref()
        .and_then(|b| b.error.description.clone())
        .unwrap_or_else(|| format!("Razorpay API error ({})", status));
    let provider_code = parsed
        .as_ref()
        .and_then(|b| b.error.reason.clone().or_else(|| b.error.code.clone()));

    let code = match status {
        401 | 403 => PaymentErrorCode::AuthenticationError,
        429 => PaymentErrorCode::RateLimitExceeded,
        400 | 404 | 409 => PaymentErrorCode::InvalidRequest,
        _ => PaymentErrorCode::ProviderError,
    };

    let err = PaymentError::new(code, message);
    match provider_code {
        Some(provider_code) => err.with_provider_code(provider_code),
        None => err,
    }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    fn provider(&self) -> &str {
        RAZORPAY_PROVIDER
    }

    fn signature_header(&self) -> &'static str {
        "X-Razorpay-Signature"
    }

    async fn create_payment(
        &self,
        request: CreatePaymentRequest,
    ) -> Result<PaymentHandle, PaymentError> {
        let notes = HashMap::from([
            ("payment_id".to_string(), request.payment_reference.to_string()),
            ("user_id".to_string(), request.user_id.to_string()),
            ("event_id".to_string(), request.event_id.to_string()),
            ("invoice_number".to_string(), request.invoice_number.to_string()),
        ]);
        let body = CreateOrderBody {
            amount: request.amount.minor_units(),
            currency: request.amount.currency().code().to_string(),
            receipt: request.payment_reference.to_string(),
            notes,
        };

        let order: RazorpayOrder = self.post_json("/v1/orders", &body).await?;

        tracing::info!(
            payment_id = %request.payment_reference,
            order_id = %order.id,
            amount = order.amount,
            status = %order.status,
            "Created Razorpay order"
        );

        Ok(PaymentHandle::Order { order_id: order.id })
    }

    async fn create_refund(
        &self,
        request: CreateRefundRequest,
    ) -> Result<RefundReceipt, PaymentError> {
        let capture_id = request.capture_id.clone().ok_or_else(|| {
            PaymentError::new(
                PaymentErrorCode::InvalidRequest,
                "Payment has no captured Razorpay payment",
            )
        })?;

        let body = CreateRefundBody {
            amount: request.amount.minor_units(),
            receipt: request.refund_reference.to_string(),
            notes: HashMap::from([
                ("refund_id".to_string(), request.refund_reference.to_string()),
                ("reason".to_string(), request.reason.clone()),
            ]),
        };

        let refund: RazorpayRefund = self
            .post_json(&format!("/v1/payments/{}/refund", capture_id), &body)
            .await?;

        tracing::info!(
            refund_id = %request.refund_reference,
            razorpay_refund_id = %refund.id,
            "Created Razorpay refund"
        );

        let mut receipt = RefundReceipt::accepted(refund.id);
        if let Some(status) = refund.status {
            receipt.response.insert("status".into(), status.into());
        }
        Ok(receipt)
    }

    async fn verify_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<GatewayEvent, PaymentError> {
        if signature.trim().is_empty() {
            return Err(PaymentError::invalid_webhook("Missing signature"));
        }
        self.verify_signature(payload, signature)?;
        let event = self.parse_event(payload)?;

        tracing::info!(
            event_id = %event.id,
            event_type = %event.event_type,
            "Verified Razorpay webhook"
        );

        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "rzp_webhook_secret";

    fn gateway() -> RazorpayGateway {
        RazorpayGateway::new(RazorpayConfig::new("rzp_test_key", "key_secret", SECRET))
    }

    fn sign(secret: &str, payload: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(payload.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn captured_payload() -> String {
        serde_json::json!({
            "entity": "event",
            "event": "payment.captured",
            "created_at": 1704067200,
            "payload": {"payment": {"entity": {
                "id": "pay_1", "order_id": "order_1", "amount": 118000,
                "currency": "INR", "status": "captured"
            }}}
        })
        .to_string()
    }

    #[test]
    fn config_debug_hides_secrets() {
        let rendered = format!("{:?}", RazorpayConfig::new("rzp_test_key", "key_secret", SECRET));
        assert!(rendered.contains("rzp_test_key"));
        assert!(!rendered.contains("key_secret\""));
        assert!(!rendered.contains(SECRET));
    }

    #[tokio::test]
    async fn verifies_and_parses_captured_payment() {
        let payload = captured_payload();
        let signature = sign(SECRET, &payload);

        let event = gateway()
            .verify_webhook(payload.as_bytes(), &signature)
            .await
            .unwrap();

        assert_eq!(event.id, "payment.captured:pay_1");
        assert_eq!(event.event_type, GatewayEventType::PaymentSucceeded);
        assert_eq!(
            event.data,
            GatewayEventData::Payment {
                transaction_id: "order_1".into(),
                capture_id: Some("pay_1".into()),
                failure_reason: None,
            }
        );
    }

    #[tokio::test]
    async fn rejects_wrong_secret() {
        let payload = captured_payload();
        let signature = sign("other_secret", &payload);

        let err = gateway()
            .verify_webhook(payload.as_bytes(), &signature)
            .await
            .unwrap_err();
        assert_eq!(err.code, PaymentErrorCode::InvalidWebhook);
    }

    #[tokio::test]
    async fn rejects_missing_or_non_hex_signature() {
        let payload = captured_payload();
        assert!(gateway().verify_webhook(payload.as_bytes(), "").await.is_err());
        assert!(gateway()
            .verify_webhook(payload.as_bytes(), "not-hex")
            .await
            .is_err());
    }

    #[test]
    fn failed_payment_carries_error_description() {
        let payload = serde_json::json!({
            "event": "payment.failed",
            "payload": {"payment": {"entity": {
                "id": "pay_2", "order_id": "order_2", "amount": 500,
                "currency": "INR", "status": "failed",
                "error_description": "Payment was declined by the bank"
            }}}
        })
        .to_string();

        let event = gateway().parse_event(payload.as_bytes()).unwrap();

        assert_eq!(event.event_type, GatewayEventType::PaymentFailed);
        match event.data {
            GatewayEventData::Payment { failure_reason, .. } => assert_eq!(
                failure_reason.as_deref(),
                Some("Payment was declined by the bank")
            ),
            other => panic!("Expected payment data, got {:?}", other),
        }
    }

    #[test]
    fn refund_processed_uses_order_from_payment_entity() {
        let payload = serde_json::json!({
            "event": "refund.processed",
            "payload": {
                "refund": {"entity": {"id": "rfnd_1", "payment_id": "pay_1", "amount": 50000, "currency": "INR"}},
                "payment": {"entity": {"id": "pay_1", "order_id": "order_1", "amount": 118000, "currency": "INR", "status": "refunded"}}
            }
        })
        .to_string();

        let event = gateway().parse_event(payload.as_bytes()).unwrap();

        assert_eq!(event.id, "refund.processed:rfnd_1");
        assert_eq!(
            event.data,
            GatewayEventData::Refund {
                transaction_id: "order_1".into(),
                refund_id: Some("rfnd_1".into()),
                amount_minor: 50000,
                currency: "INR".into(),
            }
        );
    }

    #[test]
    fn unrelated_events_are_unknown() {
        let payload = serde_json::json!({
            "event": "order.paid",
            "created_at": 42,
            "payload": {}
        })
        .to_string();

        let event = gateway().parse_event(payload.as_bytes()).unwrap();

        assert_eq!(event.event_type, GatewayEventType::Unknown("order.paid".into()));
        assert_eq!(event.id, "order.paid:42");
    }

    #[test]
    fn api_errors_keep_description_and_reason() {
        let body = r#"{"error":{"code":"BAD_REQUEST_ERROR","description":"The amount must be at least INR 1.00","reason":"input_validation_failed"}}"#;
        let err = map_api_error(400, body);
        assert_eq!(err.code, PaymentErrorCode::InvalidRequest);
        assert_eq!(err.message, "The amount must be at least INR 1.00");
        assert_eq!(err.provider_code.as_deref(), Some("input_validation_failed"));
    }

    #[tokio::test]
    async fn refund_requires_capture_id() {
        use crate::domain::foundation::{Currency, Money, RefundReference};

        let err = gateway()
            .create_refund(CreateRefundRequest {
                refund_reference: RefundReference::generate(),
                payment_transaction_id: Some("order_1".into()),
                capture_id: None,
                amount: Money::from_minor(100, Currency::inr()),
                reason: "test".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code, PaymentErrorCode::InvalidRequest);
    }
}
