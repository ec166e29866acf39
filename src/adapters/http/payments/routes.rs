//! Axum router configuration for payment endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    calculate_fees, confirm_manual_payment, get_invoice, get_payment_status, handle_webhook,
    list_payment_methods, list_payments, process_checkout, request_refund, BillingAppState,
};

/// Payment endpoints for authenticated users and staff, mounted under `/payments`.
///
/// # Routes
/// - `POST /process/` - Checkout
/// - `GET /:payment_id/status/` - Payment status
/// - `POST /:payment_id/refund/` - Refund request
/// - `POST /:payment_id/confirm/` - Manual payment confirmation (staff)
///
/// The collection route `GET /payments/` is registered by [`payments_router`]
/// because a nested `/` only matches the prefix without its trailing slash.
pub fn payment_routes() -> Router<BillingAppState> {
    Router::new()
        .route("/process/", post(process_checkout))
        .route("/:payment_id/status/", get(get_payment_status))
        .route("/:payment_id/refund/", post(request_refund))
        .route("/:payment_id/confirm/", post(confirm_manual_payment))
}

pub fn invoice_routes() -> Router<BillingAppState> {
    Router::new().route("/:invoice_id/", get(get_invoice))
}

pub fn payment_method_routes() -> Router<BillingAppState> {
    Router::new().route("/calculate-fees/", post(calculate_fees))
}

/// Gateway callbacks; no user authentication, the signature is verified instead.
pub fn webhook_routes() -> Router<BillingAppState> {
    Router::new().route("/:provider/", post(handle_webhook))
}

/// Create the complete payments router.
///
/// # Example
///
/// ```ignore
/// let app = payments_router().with_state(state);
/// ```
pub fn payments_router() -> Router<BillingAppState> {
    Router::new()
        .route("/payments/", get(list_payments))
        .route("/payment-methods/", get(list_payment_methods))
        .nest("/payments", payment_routes())
        .nest("/invoices", invoice_routes())
        .nest("/payment-methods", payment_method_routes())
        .nest("/webhooks", webhook_routes())
}
