//! Razorpay API and webhook payload types.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Body of `POST /v1/orders`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateOrderBody {
    pub amount: i64,
    pub currency: String,
    pub receipt: String,
    pub notes: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RazorpayOrder {
    /// order_...
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
}

/// Body of `POST /v1/payments/{id}/refund`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateRefundBody {
    pub amount: i64,
    pub receipt: String,
    pub notes: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RazorpayRefund {
    /// rfnd_...
    pub id: String,
    pub payment_id: Option<String>,
    #[serde(default)]
    pub amount: i64,
    pub currency: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RazorpayPayment {
    /// pay_...
    pub id: String,
    pub order_id: Option<String>,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    pub error_description: Option<String>,
}

/// Webhook envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct RazorpayWebhook {
    pub event: String,
    #[serde(default)]
    pub payload: RazorpayWebhookPayload,
    #[serde(default)]
    pub created_at: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RazorpayWebhookPayload {
    pub payment: Option<Entity<RazorpayPayment>>,
    pub refund: Option<Entity<RazorpayRefund>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Entity<T> {
    pub entity: T,
}

/// Error body of a failed API call.
#[derive(Debug, Clone, Deserialize)]
pub struct RazorpayErrorBody {
    pub error: RazorpayApiError,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RazorpayApiError {
    pub code: Option<String>,
    pub description: Option<String>,
    pub reason: Option<String>,
}
