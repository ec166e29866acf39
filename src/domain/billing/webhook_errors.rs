//! Webhook error types for gateway callback handling.
//!
//! Status codes decide whether the provider retries a delivery: 2xx stops
//! retries, 4xx stops retries, 5xx asks for redelivery.

use axum::http::StatusCode;
use thiserror::Error;

/// Errors that occur while receiving a gateway webhook.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// No gateway is registered under the provider path segment.
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    /// Signature header missing, malformed, stale, or not matching the body.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Persisting the outcome failed.
    #[error("Database error: {0}")]
    Database(String),
}

impl WebhookError {
    /// Only storage failures are worth a redelivery.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WebhookError::Database(_))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::UnknownProvider(_) => StatusCode::NOT_FOUND,
            WebhookError::InvalidSignature => StatusCode::BAD_REQUEST,
            WebhookError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_signature_is_bad_request() {
        let err = WebhookError::InvalidSignature;
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(!err.is_retryable());
        assert_eq!(err.to_string(), "Invalid signature");
    }

    #[test]
    fn unknown_provider_is_not_found() {
        let err = WebhookError::UnknownProvider("paypal".into());
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "Unknown provider: paypal");
    }

    #[test]
    fn database_errors_ask_for_redelivery() {
        let err = WebhookError::Database("connection reset".into());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.is_retryable());
    }
}
