//! Billing domain - invoices, payments, refunds and payment methods.
//!
//! # Lifecycle
//!
//! ```text
//! checkout ──► Invoice(sent) + Payment(pending)
//!                                 │
//!               gateway webhook   ├──► completed ──► refunded
//!                                 └──► failed
//! ```
//!
//! Each aggregate owns a transition table; every status write is checked
//! against it before the field changes.

mod errors;
mod invoice;
mod payment;
mod payment_method;
mod refund;
mod webhook_errors;

pub use errors::BillingError;
pub use invoice::{Invoice, InvoiceStatus, PAYMENT_TERMS_DAYS, TAX_RATE_BPS};
pub use payment::{GatewayResponse, Payment, PaymentStatus};
pub use payment_method::{FeeBreakdown, PaymentMethod, PaymentType, MANUAL_GATEWAY};
pub use refund::{Refund, RefundStatus};
pub use webhook_errors::WebhookError;

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::domain::foundation::{Currency, EventId, Money, Timestamp, UserId};

    /// A sent INR invoice for `subtotal_minor` paise.
    pub fn issued_invoice(subtotal_minor: i64) -> Invoice {
        Invoice::issue(
            EventId::new(),
            UserId::new("user-1").unwrap(),
            Money::from_minor(subtotal_minor, Currency::inr()),
            Timestamp::now(),
        )
        .unwrap()
    }

    pub fn card_method() -> PaymentMethod {
        PaymentMethod {
            name: "stripe".to_string(),
            description: "Card".to_string(),
            payment_type: PaymentType::CreditCard,
            gateway: "stripe".to_string(),
            processing_fee_bps: 290,
            processing_fee_fixed_minor: 30,
            is_active: true,
            payment_window_secs: None,
        }
    }

    pub fn qr_method() -> PaymentMethod {
        PaymentMethod {
            name: "upi_qr".to_string(),
            description: "UPI QR".to_string(),
            payment_type: PaymentType::Upi,
            gateway: "manual".to_string(),
            processing_fee_bps: 0,
            processing_fee_fixed_minor: 0,
            is_active: true,
            payment_window_secs: Some(120),
        }
    }
}
