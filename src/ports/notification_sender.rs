//! Notification sender port - billing mail to users and staff.
//!
//! Notifications never decide the outcome of a billing flow. Callers log a
//! failed send and carry on.

use async_trait::async_trait;

use crate::domain::foundation::{
    DomainError, InvoiceNumber, Money, PaymentReference, RefundReference,
};

use super::event_directory::UserContact;

/// Billing notifications.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// Payment completed; carries the rendered invoice when one was generated.
    PaymentConfirmed {
        to: UserContact,
        event_title: String,
        payment_reference: PaymentReference,
        amount: Money,
        invoice_number: InvoiceNumber,
        invoice_document: Option<String>,
    },
    PaymentFailed {
        to: UserContact,
        event_title: String,
        payment_reference: PaymentReference,
        reason: String,
    },
    /// Manual payment methods: how to pay.
    PaymentInstructions {
        to: UserContact,
        event_title: String,
        payment_reference: PaymentReference,
        amount: Money,
        payment_method: String,
    },
    RefundProcessed {
        to: UserContact,
        event_title: String,
        refund_reference: RefundReference,
        amount: Money,
    },
    /// Sent to staff when a refund needs handling by hand.
    RefundRequested {
        requested_by: UserContact,
        event_title: String,
        refund_reference: RefundReference,
        payment_reference: PaymentReference,
        amount: Money,
        reason: String,
    },
}

impl Notification {
    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::PaymentConfirmed { .. } => "payment_confirmed",
            Notification::PaymentFailed { .. } => "payment_failed",
            Notification::PaymentInstructions { .. } => "payment_instructions",
            Notification::RefundProcessed { .. } => "refund_processed",
            Notification::RefundRequested { .. } => "refund_requested",
        }
    }
}

#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, notification: Notification) -> Result<(), DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_sender_is_object_safe() {
        fn _accepts_dyn(_sender: &dyn NotificationSender) {}
    }
}
