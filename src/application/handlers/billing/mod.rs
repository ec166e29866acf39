//! Billing handlers.
//!
//! Command and query handlers for the payment lifecycle:
//!
//! ## Commands
//! - Checkout: invoice, payment and gateway handle in one step
//! - Gateway webhooks, deduplicated per provider event
//! - User refunds
//! - Staff confirmation of manual transfers
//! - Expiry sweep for QR payment windows
//! - Purge of old webhook records
//!
//! ## Queries
//! - Payment status, payment list, invoice detail
//! - Active payment methods and fee preview

mod calculate_fees;
mod confirm_manual_payment;
mod expire_pending_payments;
mod get_invoice;
mod get_payment_status;
mod handle_gateway_webhook;
mod list_payment_methods;
mod list_payments;
mod notifier;
mod process_checkout;
mod purge_webhook_events;
mod request_refund;

#[cfg(test)]
pub(crate) mod test_support;

pub use notifier::BillingNotifier;

// Commands
pub use confirm_manual_payment::{
    ConfirmManualPaymentCommand, ConfirmManualPaymentHandler, ConfirmManualPaymentResult,
    ManualConfirmation,
};
pub use expire_pending_payments::{
    ExpirePendingPaymentsCommand, ExpirePendingPaymentsHandler, ExpirePendingPaymentsResult,
};
pub use handle_gateway_webhook::{HandleGatewayWebhookCommand, HandleGatewayWebhookHandler};
pub use process_checkout::{ProcessCheckoutCommand, ProcessCheckoutHandler, ProcessCheckoutResult};
pub use purge_webhook_events::{
    PurgeWebhookEventsCommand, PurgeWebhookEventsHandler, PurgeWebhookEventsResult,
};
pub use request_refund::{RequestRefundCommand, RequestRefundHandler, RequestRefundResult};

// Queries
pub use calculate_fees::{CalculateFeesHandler, CalculateFeesQuery, CalculateFeesResult};
pub use get_invoice::{GetInvoiceHandler, GetInvoiceQuery, GetInvoiceResult};
pub use get_payment_status::{GetPaymentStatusHandler, GetPaymentStatusQuery, GetPaymentStatusResult};
pub use list_payment_methods::{ListPaymentMethodsHandler, ListPaymentMethodsQuery};
pub use list_payments::{ListPaymentsHandler, ListPaymentsQuery, ListPaymentsResult, PaymentSummary};
