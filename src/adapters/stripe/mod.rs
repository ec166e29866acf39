//! Stripe card gateway adapter.
//!
//! Implements the `PaymentGateway` port on Stripe PaymentIntents, including:
//! - Payment intent creation with an idempotency key per payment
//! - Refunds against an intent
//! - Webhook signature verification
//!
//! # Security
//!
//! - Webhook signatures use HMAC-SHA256 with constant-time comparison
//! - Timestamps are validated to prevent replay attacks (5-minute window)
//! - All secrets are handled via `secrecy::SecretString`

mod stripe_gateway;
mod webhook_types;

pub use stripe_gateway::{StripeConfig, StripeGateway, STRIPE_PROVIDER};
pub use webhook_types::{
    SignatureHeader, SignatureParseError, StripeCharge, StripePaymentIntent, StripeRefund,
    StripeWebhookEvent,
};

#[cfg(test)]
pub(crate) use stripe_gateway::sign_for_test;
