//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, and error types
//! that form the vocabulary of the billing domain.

mod errors;
mod ids;
mod money;
mod state_machine;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{
    EventId, InvoiceId, InvoiceNumber, PaymentId, PaymentReference, RefundId, RefundReference,
    UserId,
};
pub use money::{Currency, Money, BASIS_POINTS_PER_UNIT};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
