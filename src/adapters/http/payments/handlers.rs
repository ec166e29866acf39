//! HTTP handlers for payment endpoints.
//!
//! These handlers connect Axum routes to the billing command/query handlers.

use std::str::FromStr;
use std::sync::Arc;

use axum::extract::{Form, Json, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use rust_decimal::Decimal;

use crate::application::handlers::billing::{
    BillingNotifier, CalculateFeesHandler, CalculateFeesQuery, ConfirmManualPaymentCommand,
    ConfirmManualPaymentHandler, GetInvoiceHandler, GetInvoiceQuery, GetPaymentStatusHandler,
    GetPaymentStatusQuery, HandleGatewayWebhookCommand, HandleGatewayWebhookHandler,
    ListPaymentMethodsHandler, ListPaymentMethodsQuery, ListPaymentsHandler, ListPaymentsQuery,
    ManualConfirmation, ProcessCheckoutCommand, ProcessCheckoutHandler, RequestRefundCommand,
    RequestRefundHandler,
};
use crate::domain::billing::BillingError;
use crate::domain::foundation::{Currency, EventId, InvoiceId, Money, PaymentReference, UserId};
use crate::ports::{
    EventDirectory, GatewayRegistry, InvoiceRepository, PaymentMethodCatalog, PaymentRepository,
    RefundRepository, WebhookEventRepository,
};

use super::dto::{
    CalculateFeesRequest, CheckoutForm, CheckoutResponse, ConfirmPaymentForm,
    ConfirmPaymentResponse, ErrorResponse, FeeResponse, InvoiceResponse, PaymentListResponse,
    PaymentMethodView, PaymentMethodsResponse, PaymentStatusResponse, PaymentView, RefundForm,
    RefundResponse, WebhookAck,
};

const STAFF_ROLES: &[&str] = &["admin", "manager"];

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state containing all dependencies.
///
/// Cloned for each request; handlers are built on demand from the
/// Arc-wrapped ports.
#[derive(Clone)]
pub struct BillingAppState {
    pub directory: Arc<dyn EventDirectory>,
    pub catalog: Arc<dyn PaymentMethodCatalog>,
    pub invoices: Arc<dyn InvoiceRepository>,
    pub payments: Arc<dyn PaymentRepository>,
    pub refunds: Arc<dyn RefundRepository>,
    pub webhook_events: Arc<dyn WebhookEventRepository>,
    pub gateways: GatewayRegistry,
    pub notifier: BillingNotifier,
    /// Used when a request names no currency.
    pub default_currency: Currency,
    /// Complete checkouts without calling the gateway.
    pub dev_mode: bool,
    /// Include internal error text in 500 responses.
    pub verbose_errors: bool,
}

impl BillingAppState {
    pub fn checkout_handler(&self) -> ProcessCheckoutHandler {
        ProcessCheckoutHandler::new(
            self.directory.clone(),
            self.catalog.clone(),
            self.invoices.clone(),
            self.payments.clone(),
            self.gateways.clone(),
            self.notifier.clone(),
        )
        .with_dev_mode(self.dev_mode)
    }

    pub fn webhook_handler(&self) -> HandleGatewayWebhookHandler {
        HandleGatewayWebhookHandler::new(
            self.gateways.clone(),
            self.invoices.clone(),
            self.payments.clone(),
            self.refunds.clone(),
            self.webhook_events.clone(),
            self.notifier.clone(),
        )
    }

    pub fn refund_handler(&self) -> RequestRefundHandler {
        RequestRefundHandler::new(
            self.payments.clone(),
            self.refunds.clone(),
            self.catalog.clone(),
            self.gateways.clone(),
            self.notifier.clone(),
        )
    }

    pub fn confirm_handler(&self) -> ConfirmManualPaymentHandler {
        ConfirmManualPaymentHandler::new(
            self.payments.clone(),
            self.invoices.clone(),
            self.catalog.clone(),
            self.notifier.clone(),
        )
    }

    pub fn status_handler(&self) -> GetPaymentStatusHandler {
        GetPaymentStatusHandler::new(self.payments.clone(), self.refunds.clone())
    }

    pub fn list_handler(&self) -> ListPaymentsHandler {
        ListPaymentsHandler::new(self.payments.clone())
    }

    pub fn invoice_handler(&self) -> GetInvoiceHandler {
        GetInvoiceHandler::new(
            self.invoices.clone(),
            self.payments.clone(),
            self.refunds.clone(),
        )
    }

    pub fn methods_handler(&self) -> ListPaymentMethodsHandler {
        ListPaymentMethodsHandler::new(self.catalog.clone())
    }

    pub fn fees_handler(&self) -> CalculateFeesHandler {
        CalculateFeesHandler::new(self.catalog.clone())
    }

    /// Wraps a handler error with this deployment's verbosity.
    pub fn api_error(&self, error: BillingError) -> BillingApiError {
        BillingApiError {
            error,
            verbose: self.verbose_errors,
        }
    }

    fn currency(&self, requested: Option<&str>) -> Result<Currency, BillingError> {
        match requested.map(str::trim).filter(|c| !c.is_empty()) {
            Some(code) => Currency::new(code)
                .map_err(|e| BillingError::validation("currency", e.to_string())),
            None => Ok(self.default_currency.clone()),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// User Context
// ════════════════════════════════════════════════════════════════════════════════

/// Caller identity set by the upstream auth proxy.
///
/// `X-User-Id` names the user; `X-User-Role` of `admin` or `manager` marks staff.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
    pub is_staff: bool,
}

/// Rejection type for AuthenticatedUser extraction.
pub struct AuthenticationRequired;

impl IntoResponse for AuthenticationRequired {
    fn into_response(self) -> Response {
        let error = ErrorResponse::new("Authentication is required");
        (StatusCode::UNAUTHORIZED, Json(error)).into_response()
    }
}

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AuthenticationRequired;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get("X-User-Id")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| UserId::new(s).ok())
            .ok_or(AuthenticationRequired)?;

        let is_staff = parts
            .headers
            .get("X-User-Role")
            .and_then(|v| v.to_str().ok())
            .map(|role| STAFF_ROLES.contains(&role.trim().to_ascii_lowercase().as_str()))
            .unwrap_or(false);

        Ok(AuthenticatedUser { user_id, is_staff })
    }
}

fn payment_reference(raw: &str) -> Result<PaymentReference, BillingError> {
    PaymentReference::parse(raw).map_err(|_| BillingError::payment_not_found(raw))
}

// ════════════════════════════════════════════════════════════════════════════════
// Query Handlers (GET endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// GET /payments/ - The caller's payments with a status summary
pub async fn list_payments(
    State(state): State<BillingAppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, BillingApiError> {
    let result = state
        .list_handler()
        .handle(ListPaymentsQuery {
            user_id: user.user_id,
        })
        .await
        .map_err(|e| state.api_error(e))?;

    Ok(Json(PaymentListResponse::from(result)))
}

/// GET /payments/:payment_id/status/ - One payment and its refunds
pub async fn get_payment_status(
    State(state): State<BillingAppState>,
    user: AuthenticatedUser,
    Path(payment_id): Path<String>,
) -> Result<impl IntoResponse, BillingApiError> {
    let reference = payment_reference(&payment_id).map_err(|e| state.api_error(e))?;

    let result = state
        .status_handler()
        .handle(GetPaymentStatusQuery {
            user_id: user.user_id,
            payment_reference: reference,
        })
        .await
        .map_err(|e| state.api_error(e))?;

    Ok(Json(PaymentStatusResponse::from(result)))
}

/// GET /invoices/:invoice_id/ - Invoice with payments and refunds
pub async fn get_invoice(
    State(state): State<BillingAppState>,
    user: AuthenticatedUser,
    Path(invoice_id): Path<String>,
) -> Result<impl IntoResponse, BillingApiError> {
    let id = InvoiceId::from_str(&invoice_id)
        .map_err(|_| state.api_error(BillingError::invoice_not_found(&invoice_id)))?;

    let result = state
        .invoice_handler()
        .handle(GetInvoiceQuery {
            invoice_id: id,
            user_id: user.user_id,
            is_staff: user.is_staff,
        })
        .await
        .map_err(|e| state.api_error(e))?;

    Ok(Json(InvoiceResponse::from(result)))
}

/// GET /payment-methods/ - Active methods and their fees
pub async fn list_payment_methods(
    State(state): State<BillingAppState>,
) -> Result<impl IntoResponse, BillingApiError> {
    let methods = state
        .methods_handler()
        .handle(ListPaymentMethodsQuery)
        .await
        .map_err(|e| state.api_error(e))?;

    Ok(Json(PaymentMethodsResponse {
        success: true,
        payment_methods: methods.iter().map(PaymentMethodView::from).collect(),
    }))
}

/// POST /payment-methods/calculate-fees/ - Fee preview
pub async fn calculate_fees(
    State(state): State<BillingAppState>,
    Json(request): Json<CalculateFeesRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let currency = state
        .currency(request.currency.as_deref())
        .map_err(|e| state.api_error(e))?;
    let amount = Money::parse_major(&request.amount.as_text(), currency)
        .map_err(|_| state.api_error(BillingError::invalid_amount("Invalid amount")))?;

    let result = state
        .fees_handler()
        .handle(CalculateFeesQuery {
            payment_method: request.payment_method,
            amount: amount.clone(),
        })
        .await
        .map_err(|e| state.api_error(e))?;

    Ok(Json(FeeResponse::new(&result, &amount)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Command Handlers (POST endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// POST /payments/process/ - Checkout
pub async fn process_checkout(
    State(state): State<BillingAppState>,
    user: AuthenticatedUser,
    Form(form): Form<CheckoutForm>,
) -> Result<impl IntoResponse, BillingApiError> {
    let currency = state
        .currency(form.currency.as_deref())
        .map_err(|e| state.api_error(e))?;
    let amount = Money::parse_major(&form.amount, currency)
        .map_err(|_| state.api_error(BillingError::invalid_amount("Invalid amount")))?;
    let event_id = EventId::from_str(form.event_id.trim())
        .map_err(|_| state.api_error(BillingError::event_not_found(&form.event_id)))?;

    let result = state
        .checkout_handler()
        .handle(ProcessCheckoutCommand {
            user_id: user.user_id,
            event_id,
            amount,
            payment_method: form.payment_method,
        })
        .await
        .map_err(|e| state.api_error(e))?;

    Ok(Json(CheckoutResponse::from(result)))
}

/// POST /payments/:payment_id/refund/ - Refund request by the payer
pub async fn request_refund(
    State(state): State<BillingAppState>,
    user: AuthenticatedUser,
    Path(payment_id): Path<String>,
    Form(form): Form<RefundForm>,
) -> Result<impl IntoResponse, BillingApiError> {
    let reference = payment_reference(&payment_id).map_err(|e| state.api_error(e))?;

    let amount = match form.amount.as_deref().map(str::trim).filter(|a| !a.is_empty()) {
        Some(raw) => Some(
            Decimal::from_str(raw)
                .map_err(|_| state.api_error(BillingError::invalid_amount("Invalid amount")))?,
        ),
        None => None,
    };

    let result = state
        .refund_handler()
        .handle(RequestRefundCommand {
            user_id: user.user_id,
            payment_reference: reference.clone(),
            amount,
            reason: form.reason,
        })
        .await
        .map_err(|e| state.api_error(e))?;

    Ok((StatusCode::CREATED, Json(RefundResponse::new(&result, &reference))))
}

/// POST /payments/:payment_id/confirm/ - Staff settles a manual payment
pub async fn confirm_manual_payment(
    State(state): State<BillingAppState>,
    user: AuthenticatedUser,
    Path(payment_id): Path<String>,
    Form(form): Form<ConfirmPaymentForm>,
) -> Result<impl IntoResponse, BillingApiError> {
    let reference = payment_reference(&payment_id).map_err(|e| state.api_error(e))?;
    let confirmation = ManualConfirmation::parse(form.action.trim()).ok_or_else(|| {
        state.api_error(BillingError::validation(
            "action",
            "Expected 'received' or 'not_received'",
        ))
    })?;

    let result = state
        .confirm_handler()
        .handle(ConfirmManualPaymentCommand {
            payment_reference: reference,
            confirmation,
            is_staff: user.is_staff,
        })
        .await
        .map_err(|e| state.api_error(e))?;

    Ok(Json(ConfirmPaymentResponse {
        success: true,
        payment: PaymentView::from(&result.payment),
    }))
}

/// POST /webhooks/:provider/ - Gateway callback
///
/// 200 with `{"success": true}` once handled or deduplicated, 404 for an
/// unknown provider, 400 for a bad signature, 500 when storage failed.
pub async fn handle_webhook(
    State(state): State<BillingAppState>,
    Path(provider): Path<String>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Response {
    let Some(gateway) = state.gateways.get(&provider) else {
        tracing::warn!(provider = %provider, "Webhook for unknown provider");
        return StatusCode::NOT_FOUND.into_response();
    };

    let signature = headers
        .get(gateway.signature_header())
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let cmd = HandleGatewayWebhookCommand {
        provider,
        payload: body.to_vec(),
        signature,
    };

    match state.webhook_handler().handle(cmd).await {
        Ok(_) => (StatusCode::OK, Json(WebhookAck { success: true })).into_response(),
        Err(e) => e.status_code().into_response(),
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts billing errors to HTTP responses.
pub struct BillingApiError {
    error: BillingError,
    verbose: bool,
}

impl From<BillingError> for BillingApiError {
    fn from(error: BillingError) -> Self {
        Self {
            error,
            verbose: false,
        }
    }
}

impl BillingApiError {
    pub fn status(&self) -> StatusCode {
        match &self.error {
            BillingError::InvalidAmount(_)
            | BillingError::UnknownPaymentMethod(_)
            | BillingError::RefundExceedsPayment { .. }
            | BillingError::ValidationFailed { .. } => StatusCode::BAD_REQUEST,
            BillingError::EventNotFound(_)
            | BillingError::PaymentNotFound(_)
            | BillingError::InvoiceNotFound(_) => StatusCode::NOT_FOUND,
            BillingError::Forbidden(_) => StatusCode::FORBIDDEN,
            BillingError::InvalidState { .. } => StatusCode::CONFLICT,
            BillingError::GatewayFailed { .. } => StatusCode::PAYMENT_REQUIRED,
            BillingError::GatewayUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            BillingError::Infrastructure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for BillingApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = match &self.error {
            BillingError::Infrastructure(detail) => {
                tracing::error!(error = %detail, "Request failed");
                if self.verbose {
                    self.error.message()
                } else {
                    "An internal error occurred".to_string()
                }
            }
            other => other.message(),
        };

        let body = match &self.error {
            BillingError::GatewayFailed {
                payment_id: Some(payment_id),
                ..
            } => ErrorResponse::for_payment(message, payment_id),
            _ => ErrorResponse::new(message),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_of(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn maps_errors_to_statuses() {
        let cases = [
            (BillingError::invalid_amount("Invalid amount"), StatusCode::BAD_REQUEST),
            (BillingError::unknown_payment_method("bitcoin"), StatusCode::BAD_REQUEST),
            (BillingError::payment_not_found("PAY1"), StatusCode::NOT_FOUND),
            (BillingError::forbidden("Staff only"), StatusCode::FORBIDDEN),
            (BillingError::invalid_state("failed", "refund"), StatusCode::CONFLICT),
            (BillingError::gateway_failed("declined", None), StatusCode::PAYMENT_REQUIRED),
            (BillingError::gateway_unavailable("paypal"), StatusCode::SERVICE_UNAVAILABLE),
            (BillingError::infrastructure("pool timed out"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, status) in cases {
            assert_eq!(BillingApiError::from(error).status(), status);
        }
    }

    #[tokio::test]
    async fn internal_detail_hidden_unless_verbose() {
        let quiet = BillingApiError::from(BillingError::infrastructure("pool timed out"));
        assert_eq!(
            body_of(quiet.into_response()).await["error"],
            "An internal error occurred"
        );

        let verbose = BillingApiError {
            error: BillingError::infrastructure("pool timed out"),
            verbose: true,
        };
        assert_eq!(body_of(verbose.into_response()).await["error"], "Error: pool timed out");
    }

    #[tokio::test]
    async fn gateway_failure_carries_payment_id() {
        let reference = PaymentReference::generate();
        let error = BillingError::gateway_failed("Card declined", Some(reference.clone()));

        let body = body_of(BillingApiError::from(error).into_response()).await;

        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Payment failed: Card declined");
        assert_eq!(body["payment_id"], reference.as_str());
    }
}
