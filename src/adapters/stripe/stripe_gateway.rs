//! Stripe card gateway.
//!
//! Implements [`PaymentGateway`] on Stripe PaymentIntents: checkout creates an
//! intent and hands its client secret to the browser, refunds go through
//! `/v1/refunds`, and webhooks are verified with the `Stripe-Signature` header.
//!
//! # Security
//!
//! - HMAC-SHA256 signature verification with constant-time comparison
//! - Timestamp validation (5 minutes old, 60 seconds ahead) against replays
//! - Secrets held as `secrecy::SecretString`

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::ports::{
    CreatePaymentRequest, CreateRefundRequest, GatewayEvent, GatewayEventData, GatewayEventType,
    PaymentError, PaymentErrorCode, PaymentGateway, PaymentHandle, RefundReceipt,
};

use super::webhook_types::{
    SignatureHeader, StripeCharge, StripeErrorBody, StripePaymentIntent, StripeRefund,
    StripeWebhookEvent,
};

type HmacSha256 = Hmac<Sha256>;

/// Registry key of this gateway.
pub const STRIPE_PROVIDER: &str = "stripe";

/// Maximum age for webhook events (5 minutes).
const MAX_TIMESTAMP_AGE_SECS: i64 = 300;

/// Clock skew tolerance for future timestamps (60 seconds).
const MAX_FUTURE_TOLERANCE_SECS: i64 = 60;

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Webhook signing secret (whsec_...).
    webhook_secret: SecretString,

    api_base_url: String,

    /// Reject test-mode events.
    require_livemode: bool,
}

impl StripeConfig {
    pub fn new(api_key: impl Into<String>, webhook_secret: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            webhook_secret: SecretString::new(webhook_secret.into()),
            api_base_url: "https://api.stripe.com".to_string(),
            require_livemode: false,
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    pub fn with_require_livemode(mut self, require: bool) -> Self {
        self.require_livemode = require;
        self
    }
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("api_base_url", &self.api_base_url)
            .field("require_livemode", &self.require_livemode)
            .finish_non_exhaustive()
    }
}

/// Stripe card gateway.
pub struct StripeGateway {
    config: StripeConfig,
    http_client: reqwest::Client,
}

impl StripeGateway {
    pub fn new(config: StripeConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    /// Use a preconfigured client (timeouts, proxies).
    pub fn with_client(config: StripeConfig, http_client: reqwest::Client) -> Self {
        Self {
            config,
            http_client,
        }
    }

    /// Verify webhook signature using HMAC-SHA256.
    fn verify_signature(&self, payload: &[u8], header: &SignatureHeader) -> Result<(), PaymentError> {
        let now = chrono::Utc::now().timestamp();
        let age = now - header.timestamp;

        if age > MAX_TIMESTAMP_AGE_SECS {
            tracing::warn!(
                event_timestamp = header.timestamp,
                current_time = now,
                age_secs = age,
                "Stripe webhook too old - possible replay"
            );
            return Err(PaymentError::invalid_webhook(format!(
                "Event too old ({} seconds)",
                age
            )));
        }

        if age < -MAX_FUTURE_TOLERANCE_SECS {
            tracing::warn!(
                event_timestamp = header.timestamp,
                current_time = now,
                "Stripe webhook from the future - clock skew or manipulation"
            );
            return Err(PaymentError::invalid_webhook("Event timestamp in future"));
        }

        let mut mac =
            HmacSha256::new_from_slice(self.config.webhook_secret.expose_secret().as_bytes())
                .map_err(|e| PaymentError::invalid_webhook(format!("Bad signing key: {}", e)))?;
        mac.update(header.timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        let expected = mac.finalize().into_bytes();

        let matched = header
            .v1_signatures
            .iter()
            .any(|provided| expected.as_slice().ct_eq(provided.as_slice()).into());

        if !matched {
            tracing::warn!("Invalid Stripe webhook signature");
            return Err(PaymentError::invalid_webhook("Invalid signature"));
        }

        Ok(())
    }

    /// Parse a verified payload into a gateway event.
    fn parse_event(&self, payload: &[u8]) -> Result<GatewayEvent, PaymentError> {
        let raw: serde_json::Value = serde_json::from_slice(payload).map_err(|e| {
            tracing::warn!(error = %e, "Failed to parse Stripe webhook payload");
            PaymentError::invalid_webhook(format!("Invalid JSON: {}", e))
        })?;
        let stripe_event: StripeWebhookEvent = serde_json::from_value(raw.clone())
            .map_err(|e| PaymentError::invalid_webhook(format!("Invalid event: {}", e)))?;

        if self.config.require_livemode && !stripe_event.livemode {
            tracing::warn!(event_id = %stripe_event.id, "Rejected test mode event");
            return Err(PaymentError::invalid_webhook(
                "Test mode events not allowed in production",
            ));
        }

        let (event_type, data) = extract_event(&stripe_event)?;

        Ok(GatewayEvent {
            id: stripe_event.id,
            event_type,
            data,
            created_at: stripe_event.created,
            payload: raw,
        })
    }

    async fn post_form<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        idempotency_key: &str,
        params: &[(&str, String)],
    ) -> Result<T, PaymentError> {
        let url = format!("{}{}", self.config.api_base_url, path);

        let response = self
            .http_client
            .post(&url)
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .header("Idempotency-Key", idempotency_key)
            .form(params)
            .send()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), path, error = %error_text, "Stripe API call failed");
            return Err(map_api_error(status.as_u16(), &error_text));
        }

        response.json().await.map_err(|e| {
            PaymentError::provider(format!("Failed to parse Stripe response: {}", e))
        })
    }
}

fn extract_event(
    event: &StripeWebhookEvent,
) -> Result<(GatewayEventType, GatewayEventData), PaymentError> {
    match event.event_type.as_str() {
        "payment_intent.succeeded" | "payment_intent.payment_failed" => {
            let intent: StripePaymentIntent = serde_json::from_value(event.data.object.clone())
                .map_err(|e| PaymentError::invalid_webhook(format!("Invalid payment intent: {}", e)))?;
            let succeeded = event.event_type == "payment_intent.succeeded";
            let failure_reason = (!succeeded).then(|| intent.failure_message());
            let event_type = if succeeded {
                GatewayEventType::PaymentSucceeded
            } else {
                GatewayEventType::PaymentFailed
            };
            Ok((
                event_type,
                GatewayEventData::Payment {
                    transaction_id: intent.id,
                    capture_id: intent.latest_charge,
                    failure_reason,
                },
            ))
        }

        "charge.refunded" => {
            let charge: StripeCharge = serde_json::from_value(event.data.object.clone())
                .map_err(|e| PaymentError::invalid_webhook(format!("Invalid charge: {}", e)))?;
            let Some(intent_id) = charge.payment_intent.clone() else {
                // charges made outside PaymentIntents are not ours
                return Ok((
                    GatewayEventType::Unknown(event.event_type.clone()),
                    GatewayEventData::Raw,
                ));
            };
            let latest = charge.refunds.as_ref().and_then(|list| list.data.first());
            let amount_minor = latest
                .map(|refund| refund.amount)
                .filter(|amount| *amount > 0)
                .unwrap_or(charge.amount_refunded);
            Ok((
                GatewayEventType::RefundIssued,
                GatewayEventData::Refund {
                    transaction_id: intent_id,
                    refund_id: charge.latest_refund_id(),
                    amount_minor,
                    currency: charge.currency.to_ascii_uppercase(),
                },
            ))
        }

        other => Ok((GatewayEventType::Unknown(other.to_string()), GatewayEventData::Raw)),
    }
}

/// Maps a failed Stripe response to a payment error.
fn map_api_error(status: u16, body: &str) -> PaymentError {
    let parsed = serde_json::from_str::<StripeErrorBody>(body).ok();
    let message = parsed
        .as_ref()
        .and_then(|b| b.error.message.clone())
        .unwrap_or_else(|| format!("Stripe API error ({})", status));
    let provider_code = parsed.as_ref().and_then(|b| {
        b.error
            .decline_code
            .clone()
            .or_else(|| b.error.code.clone())
    });
    let is_card_error = parsed
        .as_ref()
        .and_then(|b| b.error.error_type.as_deref())
        .map(|t| t == "card_error")
        .unwrap_or(false);

    let code = match status {
        401 | 403 => PaymentErrorCode::AuthenticationError,
        429 => PaymentErrorCode::RateLimitExceeded,
        402 => PaymentErrorCode::CardDeclined,
        _ if is_card_error => PaymentErrorCode::CardDeclined,
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
impl PaymentGateway for StripeGateway {
    fn provider(&self) -> &str {
        STRIPE_PROVIDER
    }

    fn signature_header(&self) -> &'static str {
        "Stripe-Signature"
    }

    async fn create_payment(
        &self,
        request: CreatePaymentRequest,
    ) -> Result<PaymentHandle, PaymentError> {
        let params = vec![
            ("amount", request.amount.minor_units().to_string()),
            (
                "currency",
                request.amount.currency().code().to_ascii_lowercase(),
            ),
            ("description", request.description.clone()),
            ("automatic_payment_methods[enabled]", "true".to_string()),
            ("metadata[payment_id]", request.payment_reference.to_string()),
            ("metadata[user_id]", request.user_id.to_string()),
            ("metadata[event_id]", request.event_id.to_string()),
            ("metadata[invoice_number]", request.invoice_number.to_string()),
        ];

        let intent: StripePaymentIntent = self
            .post_form(
                "/v1/payment_intents",
                request.payment_reference.as_str(),
                &params,
            )
            .await?;

        let client_secret = intent
            .client_secret
            .ok_or_else(|| PaymentError::provider("Stripe returned no client secret"))?;

        tracing::info!(
            payment_id = %request.payment_reference,
            intent_id = %intent.id,
            amount = request.amount.minor_units(),
            "Created Stripe payment intent"
        );

        Ok(PaymentHandle::ClientSecret {
            intent_id: intent.id,
            client_secret,
        })
    }

    async fn create_refund(
        &self,
        request: CreateRefundRequest,
    ) -> Result<RefundReceipt, PaymentError> {
        let intent_id = request
            .payment_transaction_id
            .clone()
            .ok_or_else(|| PaymentError::new(PaymentErrorCode::InvalidRequest, "Payment has no Stripe intent"))?;

        let params = vec![
            ("payment_intent", intent_id),
            ("amount", request.amount.minor_units().to_string()),
            ("reason", "requested_by_customer".to_string()),
            ("metadata[refund_id]", request.refund_reference.to_string()),
        ];

        let refund: StripeRefund = self
            .post_form("/v1/refunds", request.refund_reference.as_str(), &params)
            .await?;

        tracing::info!(
            refund_id = %request.refund_reference,
            stripe_refund_id = %refund.id,
            "Created Stripe refund"
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
        let header = SignatureHeader::parse(signature).map_err(|e| {
            tracing::warn!(error = %e, "Malformed Stripe-Signature header");
            PaymentError::invalid_webhook(e.to_string())
        })?;

        self.verify_signature(payload, &header)?;
        let event = self.parse_event(payload)?;

        tracing::info!(
            event_id = %event.id,
            event_type = %event.event_type,
            "Verified Stripe webhook"
        );

        Ok(event)
    }
}

#[cfg(test)]
pub(crate) fn sign_for_test(secret: &str, timestamp: i64, payload: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(format!("{}.{}", timestamp, payload).as_bytes());
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}
