//! Billing-specific error types.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | InvalidAmount | 400 |
//! | UnknownPaymentMethod | 400 |
//! | ValidationFailed | 400 |
//! | RefundExceedsPayment | 400 |
//! | EventNotFound | 404 |
//! | PaymentNotFound | 404 |
//! | InvoiceNotFound | 404 |
//! | Forbidden | 403 |
//! | InvalidState | 409 |
//! | GatewayFailed | 402 |
//! | GatewayUnavailable | 503 |
//! | Infrastructure | 500 |

use crate::domain::foundation::{DomainError, ErrorCode, PaymentReference, ValidationError};

/// Errors returned by the billing command and query handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingError {
    /// Requested amount is zero or negative.
    InvalidAmount(String),

    /// No active payment method with this name.
    UnknownPaymentMethod(String),

    /// Event id does not resolve.
    EventNotFound(String),

    PaymentNotFound(String),

    InvoiceNotFound(String),

    /// Caller may not perform this action.
    Forbidden(String),

    /// The aggregate is not in a state that allows the action.
    InvalidState { current: String, attempted: String },

    RefundExceedsPayment { requested: String, available: String },

    ValidationFailed { field: String, message: String },

    /// No gateway is registered for the method's provider.
    GatewayUnavailable(String),

    /// The provider rejected the call. The payment, if any, is already marked failed.
    GatewayFailed {
        reason: String,
        payment_id: Option<PaymentReference>,
    },

    Infrastructure(String),
}

impl BillingError {
    pub fn invalid_amount(message: impl Into<String>) -> Self {
        BillingError::InvalidAmount(message.into())
    }

    pub fn unknown_payment_method(name: impl Into<String>) -> Self {
        BillingError::UnknownPaymentMethod(name.into())
    }

    pub fn event_not_found(event_id: impl Into<String>) -> Self {
        BillingError::EventNotFound(event_id.into())
    }

    pub fn payment_not_found(payment_id: impl Into<String>) -> Self {
        BillingError::PaymentNotFound(payment_id.into())
    }

    pub fn invoice_not_found(invoice_id: impl Into<String>) -> Self {
        BillingError::InvoiceNotFound(invoice_id.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        BillingError::Forbidden(message.into())
    }

    pub fn invalid_state(current: impl Into<String>, attempted: impl Into<String>) -> Self {
        BillingError::InvalidState {
            current: current.into(),
            attempted: attempted.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        BillingError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn gateway_unavailable(provider: impl Into<String>) -> Self {
        BillingError::GatewayUnavailable(provider.into())
    }

    pub fn gateway_failed(reason: impl Into<String>, payment_id: Option<PaymentReference>) -> Self {
        BillingError::GatewayFailed {
            reason: reason.into(),
            payment_id,
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        BillingError::Infrastructure(message.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            BillingError::InvalidAmount(_) => ErrorCode::InvalidAmount,
            BillingError::UnknownPaymentMethod(_) => ErrorCode::PaymentMethodNotFound,
            BillingError::EventNotFound(_) => ErrorCode::EventNotFound,
            BillingError::PaymentNotFound(_) => ErrorCode::PaymentNotFound,
            BillingError::InvoiceNotFound(_) => ErrorCode::InvoiceNotFound,
            BillingError::Forbidden(_) => ErrorCode::Forbidden,
            BillingError::InvalidState { .. } => ErrorCode::InvalidStateTransition,
            BillingError::RefundExceedsPayment { .. } => ErrorCode::RefundExceedsPayment,
            BillingError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            BillingError::GatewayUnavailable(_) => ErrorCode::ExternalServiceError,
            BillingError::GatewayFailed { .. } => ErrorCode::PaymentFailed,
            BillingError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }

    /// User-facing message.
    pub fn message(&self) -> String {
        match self {
            BillingError::InvalidAmount(msg) => msg.clone(),
            BillingError::UnknownPaymentMethod(name) => {
                format!("Invalid payment method: {}", name)
            }
            BillingError::EventNotFound(id) => format!("Event not found: {}", id),
            BillingError::PaymentNotFound(id) => format!("Payment not found: {}", id),
            BillingError::InvoiceNotFound(id) => format!("Invoice not found: {}", id),
            BillingError::Forbidden(msg) => msg.clone(),
            BillingError::InvalidState { current, attempted } => {
                format!("Cannot {} a {} payment", attempted, current)
            }
            BillingError::RefundExceedsPayment {
                requested,
                available,
            } => format!(
                "Refund amount cannot exceed payment amount (requested {}, refundable {})",
                requested, available
            ),
            BillingError::ValidationFailed { field, message } => {
                format!("Validation failed for '{}': {}", field, message)
            }
            BillingError::GatewayUnavailable(provider) => {
                format!("Payment provider '{}' is not available", provider)
            }
            BillingError::GatewayFailed { reason, .. } => format!("Payment failed: {}", reason),
            BillingError::Infrastructure(msg) => format!("Error: {}", msg),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BillingError::Infrastructure(_) | BillingError::GatewayUnavailable(_)
        )
    }
}

impl std::fmt::Display for BillingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for BillingError {}

impl From<ValidationError> for BillingError {
    fn from(err: ValidationError) -> Self {
        DomainError::from(err).into()
    }
}

impl From<DomainError> for BillingError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::InvalidAmount => BillingError::InvalidAmount(err.message),
            ErrorCode::PaymentNotFound => BillingError::PaymentNotFound(err.message),
            ErrorCode::InvoiceNotFound => BillingError::InvoiceNotFound(err.message),
            ErrorCode::EventNotFound => BillingError::EventNotFound(err.message),
            ErrorCode::PaymentMethodNotFound => BillingError::UnknownPaymentMethod(err.message),
            ErrorCode::Forbidden | ErrorCode::Unauthorized => BillingError::Forbidden(err.message),
            ErrorCode::InvalidStateTransition
            | ErrorCode::ConcurrentModification
            | ErrorCode::DuplicateTransaction => BillingError::InvalidState {
                current: err.code.to_string(),
                attempted: err.message,
            },
            ErrorCode::RefundExceedsPayment => BillingError::RefundExceedsPayment {
                requested: err.details.get("requested").cloned().unwrap_or_default(),
                available: err
                    .details
                    .get("payment_amount")
                    .cloned()
                    .unwrap_or_default(),
            },
            ErrorCode::ValidationFailed
            | ErrorCode::EmptyField
            | ErrorCode::OutOfRange
            | ErrorCode::InvalidFormat
            | ErrorCode::CurrencyMismatch => BillingError::ValidationFailed {
                field: err
                    .details
                    .get("field")
                    .cloned()
                    .unwrap_or_else(|| "request".to_string()),
                message: err.message,
            },
            ErrorCode::PaymentFailed => BillingError::GatewayFailed {
                reason: err.message,
                payment_id: None,
            },
            ErrorCode::ExternalServiceError => BillingError::GatewayUnavailable(err.message),
            _ => BillingError::Infrastructure(err.to_string()),
        }
    }
}

impl From<BillingError> for DomainError {
    fn from(err: BillingError) -> Self {
        DomainError::new(err.code(), err.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_convert_to_validation_failed() {
        let err: BillingError = ValidationError::invalid_format("amount", "amount is too large").into();
        assert!(matches!(err, BillingError::ValidationFailed { .. }), "got {:?}", err);
        assert_eq!(err.code(), ErrorCode::ValidationFailed);

        let err: BillingError = ValidationError::invalid_transition("pending", "refunded").into();
        assert!(matches!(err, BillingError::InvalidState { .. }), "got {:?}", err);
    }

    #[test]
    fn invalid_amount_uses_message_verbatim() {
        let err = BillingError::invalid_amount("Invalid amount");
        assert_eq!(err.message(), "Invalid amount");
        assert_eq!(err.code(), ErrorCode::InvalidAmount);
    }

    #[test]
    fn unknown_payment_method_names_the_method() {
        let err = BillingError::unknown_payment_method("bitcoin");
        assert!(err.message().contains("bitcoin"));
        assert_eq!(err.code(), ErrorCode::PaymentMethodNotFound);
    }

    #[test]
    fn gateway_failed_keeps_payment_reference() {
        let reference = PaymentReference::generate();
        let err = BillingError::gateway_failed("card declined", Some(reference.clone()));
        assert!(matches!(
            err,
            BillingError::GatewayFailed { payment_id: Some(ref r), .. } if *r == reference
        ));
        assert_eq!(err.message(), "Payment failed: card declined");
    }

    #[test]
    fn only_infrastructure_and_unavailable_gateways_are_retryable() {
        assert!(BillingError::infrastructure("db down").is_retryable());
        assert!(BillingError::gateway_unavailable("stripe").is_retryable());
        assert!(!BillingError::gateway_failed("declined", None).is_retryable());
        assert!(!BillingError::invalid_amount("x").is_retryable());
    }

    #[test]
    fn domain_transition_error_becomes_invalid_state() {
        let err: BillingError =
            DomainError::new(ErrorCode::InvalidStateTransition, "Cannot move payment").into();
        assert_eq!(err.code(), ErrorCode::InvalidStateTransition);
    }

    #[test]
    fn domain_refund_error_carries_amounts() {
        let domain = DomainError::new(ErrorCode::RefundExceedsPayment, "too much")
            .with_detail("requested", "2000.00 INR")
            .with_detail("payment_amount", "1180.00 INR");
        let err: BillingError = domain.into();
        assert_eq!(
            err,
            BillingError::RefundExceedsPayment {
                requested: "2000.00 INR".into(),
                available: "1180.00 INR".into(),
            }
        );
    }

    #[test]
    fn database_errors_become_infrastructure() {
        let err: BillingError = DomainError::database("connection refused").into();
        assert!(matches!(err, BillingError::Infrastructure(_)));
    }

    #[test]
    fn converts_back_to_domain_error() {
        let domain: DomainError = BillingError::payment_not_found("PAY1").into();
        assert_eq!(domain.code, ErrorCode::PaymentNotFound);
        assert!(domain.message.contains("PAY1"));
    }
}
