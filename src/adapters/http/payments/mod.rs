//! HTTP adapter for payment endpoints.
//!
//! Exposes the billing handlers via REST API:
//! - `POST /payments/process/` - Checkout
//! - `GET /payments/` - The caller's payments
//! - `GET /payments/:payment_id/status/` - Payment status
//! - `POST /payments/:payment_id/refund/` - Refund request
//! - `POST /payments/:payment_id/confirm/` - Staff confirmation of manual payments
//! - `GET /invoices/:invoice_id/` - Invoice detail
//! - `GET /payment-methods/` - Active payment methods
//! - `POST /payment-methods/calculate-fees/` - Fee preview
//! - `POST /webhooks/:provider/` - Gateway webhooks

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::{AuthenticatedUser, BillingApiError, BillingAppState};
pub use routes::payments_router;
