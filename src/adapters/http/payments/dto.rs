//! HTTP DTOs for the payment endpoints.
//!
//! Checkout, refund and confirmation take form bodies; fee preview takes JSON.
//! Every response carries a `success` flag.

use serde::{Deserialize, Serialize};

use crate::application::handlers::billing::{
    CalculateFeesResult, GetInvoiceResult, GetPaymentStatusResult, ListPaymentsResult,
    PaymentSummary, ProcessCheckoutResult, RequestRefundResult,
};
use crate::domain::billing::{Invoice, Payment, PaymentMethod, Refund};
use crate::domain::foundation::{Money, PaymentReference, Timestamp};
use crate::ports::PaymentHandle;

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Checkout form.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutForm {
    pub event_id: String,
    /// Major units, e.g. `1000.00`.
    pub amount: String,
    pub payment_method: String,
    /// Defaults to the configured currency.
    #[serde(default)]
    pub currency: Option<String>,
}

/// Refund form. An empty or missing amount refunds the whole payment.
#[derive(Debug, Clone, Deserialize)]
pub struct RefundForm {
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub reason: String,
}

/// Staff confirmation form: `received` or `not_received`.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmPaymentForm {
    pub action: String,
}

/// Amount as sent by clients: either `"1000.00"` or `1000`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    Text(String),
    Number(serde_json::Number),
}

impl AmountInput {
    pub fn as_text(&self) -> String {
        match self {
            AmountInput::Text(text) => text.clone(),
            AmountInput::Number(number) => number.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CalculateFeesRequest {
    pub amount: AmountInput,
    #[serde(default)]
    pub currency: Option<String>,
    pub payment_method: String,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Error body for every failed request.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    /// Set when a payment row was created before the failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            payment_id: None,
        }
    }

    pub fn for_payment(error: impl Into<String>, payment_id: &PaymentReference) -> Self {
        Self {
            payment_id: Some(payment_id.to_string()),
            ..Self::new(error)
        }
    }
}

/// Money rendered as a major-unit string plus its currency.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AmountResponse {
    pub amount: String,
    pub currency: String,
}

impl From<&Money> for AmountResponse {
    fn from(money: &Money) -> Self {
        Self {
            amount: money.to_major().to_string(),
            currency: money.currency().code().to_string(),
        }
    }
}

fn rfc3339(ts: &Timestamp) -> String {
    ts.as_datetime().to_rfc3339()
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutResponse {
    pub success: bool,
    pub payment_id: String,
    pub invoice_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<ProcessCheckoutResult> for CheckoutResponse {
    fn from(result: ProcessCheckoutResult) -> Self {
        let mut response = Self {
            success: true,
            payment_id: result.payment.reference.to_string(),
            invoice_number: result.invoice.invoice_number.to_string(),
            client_secret: None,
            order_id: None,
            message: None,
        };
        match result.handle {
            PaymentHandle::ClientSecret { client_secret, .. } => {
                response.client_secret = Some(client_secret)
            }
            PaymentHandle::Order { order_id } => response.order_id = Some(order_id),
            PaymentHandle::Instructions { message } => response.message = Some(message),
        }
        response
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentView {
    pub payment_id: String,
    pub invoice_id: String,
    pub amount: AmountResponse,
    pub processing_fee: AmountResponse,
    pub payment_method: String,
    pub status: String,
    pub transaction_id: Option<String>,
    pub failure_reason: Option<String>,
    pub payment_date: Option<String>,
    pub expires_at: Option<String>,
    pub created_at: String,
}

impl From<&Payment> for PaymentView {
    fn from(payment: &Payment) -> Self {
        Self {
            payment_id: payment.reference.to_string(),
            invoice_id: payment.invoice_id.to_string(),
            amount: AmountResponse::from(&payment.amount),
            processing_fee: AmountResponse::from(&payment.processing_fee),
            payment_method: payment.payment_method.clone(),
            status: payment.status.as_str().to_string(),
            transaction_id: payment.transaction_id.clone(),
            failure_reason: payment.failure_reason().map(str::to_string),
            payment_date: payment.payment_date.as_ref().map(rfc3339),
            expires_at: payment.expires_at.as_ref().map(rfc3339),
            created_at: rfc3339(&payment.created_at),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RefundView {
    pub refund_id: String,
    pub payment_id: String,
    pub amount: AmountResponse,
    pub reason: String,
    pub status: String,
    pub transaction_id: Option<String>,
    pub refund_date: Option<String>,
    pub created_at: String,
}

impl RefundView {
    /// `payment_reference` is the external id of the refunded payment.
    pub fn new(refund: &Refund, payment_reference: &PaymentReference) -> Self {
        Self {
            refund_id: refund.reference.to_string(),
            payment_id: payment_reference.to_string(),
            amount: AmountResponse::from(&refund.amount),
            reason: refund.reason.clone(),
            status: refund.status.as_str().to_string(),
            transaction_id: refund.transaction_id.clone(),
            refund_date: refund.refund_date.as_ref().map(rfc3339),
            created_at: rfc3339(&refund.created_at),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InvoiceView {
    pub invoice_id: String,
    pub invoice_number: String,
    pub event_id: String,
    pub status: String,
    pub issue_date: String,
    pub due_date: String,
    pub subtotal: AmountResponse,
    pub tax_amount: AmountResponse,
    pub discount_amount: AmountResponse,
    pub total_amount: AmountResponse,
    pub paid_amount: AmountResponse,
    pub balance_due: AmountResponse,
}

impl From<&Invoice> for InvoiceView {
    fn from(invoice: &Invoice) -> Self {
        Self {
            invoice_id: invoice.id.to_string(),
            invoice_number: invoice.invoice_number.to_string(),
            event_id: invoice.event_id.to_string(),
            status: invoice.status.as_str().to_string(),
            issue_date: invoice.issue_date.to_string(),
            due_date: invoice.due_date.to_string(),
            subtotal: AmountResponse::from(&invoice.subtotal),
            tax_amount: AmountResponse::from(&invoice.tax_amount),
            discount_amount: AmountResponse::from(&invoice.discount_amount),
            total_amount: AmountResponse::from(&invoice.total_amount),
            paid_amount: AmountResponse::from(&invoice.paid_amount),
            balance_due: AmountResponse::from(&invoice.balance_due()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentStatusResponse {
    pub success: bool,
    pub payment: PaymentView,
    pub refunds: Vec<RefundView>,
}

impl From<GetPaymentStatusResult> for PaymentStatusResponse {
    fn from(result: GetPaymentStatusResult) -> Self {
        let refunds = result
            .refunds
            .iter()
            .map(|r| RefundView::new(r, &result.payment.reference))
            .collect();
        Self {
            success: true,
            payment: PaymentView::from(&result.payment),
            refunds,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentSummaryView {
    pub total: usize,
    pub pending: usize,
    pub completed: usize,
    pub failed: usize,
    pub refunded: usize,
    pub total_paid: Vec<AmountResponse>,
}

impl From<&PaymentSummary> for PaymentSummaryView {
    fn from(summary: &PaymentSummary) -> Self {
        Self {
            total: summary.total,
            pending: summary.pending,
            completed: summary.completed,
            failed: summary.failed,
            refunded: summary.refunded,
            total_paid: summary.total_paid.iter().map(AmountResponse::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentListResponse {
    pub success: bool,
    pub payments: Vec<PaymentView>,
    pub summary: PaymentSummaryView,
}

impl From<ListPaymentsResult> for PaymentListResponse {
    fn from(result: ListPaymentsResult) -> Self {
        Self {
            success: true,
            payments: result.payments.iter().map(PaymentView::from).collect(),
            summary: PaymentSummaryView::from(&result.summary),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RefundResponse {
    pub success: bool,
    pub refund: RefundView,
    pub requires_manual_processing: bool,
    pub message: String,
}

impl RefundResponse {
    pub fn new(result: &RequestRefundResult, payment_reference: &PaymentReference) -> Self {
        let message = if result.requires_manual_processing {
            "Refund request received. Our team will process it manually."
        } else {
            "Refund request submitted to the payment provider."
        };
        Self {
            success: true,
            refund: RefundView::new(&result.refund, payment_reference),
            requires_manual_processing: result.requires_manual_processing,
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfirmPaymentResponse {
    pub success: bool,
    pub payment: PaymentView,
}

#[derive(Debug, Clone, Serialize)]
pub struct InvoiceResponse {
    pub success: bool,
    pub invoice: InvoiceView,
    pub payments: Vec<PaymentView>,
    pub refunds: Vec<RefundView>,
}

impl From<GetInvoiceResult> for InvoiceResponse {
    fn from(result: GetInvoiceResult) -> Self {
        let refunds = result
            .refunds
            .iter()
            .filter_map(|refund| {
                result
                    .payments
                    .iter()
                    .find(|p| p.id == refund.payment_id)
                    .map(|p| RefundView::new(refund, &p.reference))
            })
            .collect();
        Self {
            success: true,
            invoice: InvoiceView::from(&result.invoice),
            payments: result.payments.iter().map(PaymentView::from).collect(),
            refunds,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentMethodView {
    pub name: String,
    pub description: String,
    pub payment_type: String,
    /// Percentage fee, e.g. `2.90`.
    pub processing_fee_percentage: String,
    pub processing_fee_fixed_minor: i64,
    pub payment_window_secs: Option<i64>,
}

impl From<&PaymentMethod> for PaymentMethodView {
    fn from(method: &PaymentMethod) -> Self {
        Self {
            name: method.name.clone(),
            description: method.description.clone(),
            payment_type: method.payment_type.as_str().to_string(),
            processing_fee_percentage: rust_decimal::Decimal::new(method.processing_fee_bps, 2)
                .to_string(),
            processing_fee_fixed_minor: method.processing_fee_fixed_minor,
            payment_window_secs: method.payment_window_secs,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentMethodsResponse {
    pub success: bool,
    pub payment_methods: Vec<PaymentMethodView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeeResponse {
    pub success: bool,
    pub payment_method: String,
    pub amount: AmountResponse,
    pub percentage_fee: AmountResponse,
    pub fixed_fee: AmountResponse,
    pub total_fee: AmountResponse,
    pub total_amount: AmountResponse,
}

impl FeeResponse {
    pub fn new(result: &CalculateFeesResult, amount: &Money) -> Self {
        Self {
            success: true,
            payment_method: result.method.name.clone(),
            amount: AmountResponse::from(amount),
            percentage_fee: AmountResponse::from(&result.breakdown.percentage_fee),
            fixed_fee: AmountResponse::from(&result.breakdown.fixed_fee),
            total_fee: AmountResponse::from(&result.breakdown.total_fee),
            total_amount: AmountResponse::from(&result.breakdown.total_amount),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WebhookAck {
    pub success: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::Currency;

    #[test]
    fn amounts_keep_currency_scale() {
        let view = AmountResponse::from(&Money::from_minor(118_000, Currency::inr()));
        assert_eq!(view.amount, "1180.00");
        assert_eq!(view.currency, "INR");
    }

    #[test]
    fn error_body_omits_missing_payment_id() {
        let json = serde_json::to_value(ErrorResponse::new("Invalid amount")).unwrap();
        assert_eq!(json, serde_json::json!({"success": false, "error": "Invalid amount"}));
    }

    #[test]
    fn amount_accepts_text_and_numbers() {
        let text: CalculateFeesRequest =
            serde_json::from_str(r#"{"amount": "1000.50", "payment_method": "stripe"}"#).unwrap();
        let number: CalculateFeesRequest =
            serde_json::from_str(r#"{"amount": 1000, "payment_method": "stripe"}"#).unwrap();

        assert_eq!(text.amount.as_text(), "1000.50");
        assert_eq!(number.amount.as_text(), "1000");
        assert!(number.currency.is_none());
    }
}
