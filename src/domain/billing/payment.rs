//! Payment aggregate - a single payment attempt against an invoice.
//!
//! # Invariants
//!
//! - Exactly one invoice owns a payment (`invoice_id` never changes)
//! - `transaction_id` is assigned once, while the payment is still pending
//! - Every status write goes through [`PaymentStatus`]'s transition table

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::foundation::{
    DomainError, ErrorCode, InvoiceId, Money, PaymentId, PaymentReference, StateMachine,
    Timestamp, UserId,
};

use super::invoice::Invoice;
use super::payment_method::PaymentMethod;

/// Free-form provider payload kept with a payment or refund.
pub type GatewayResponse = serde_json::Map<String, Value>;

/// Payment lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Created at checkout, waiting for the gateway.
    Pending,
    /// Gateway confirmed the charge.
    Completed,
    /// Gateway rejected the charge, or the payment window elapsed.
    Failed,
    /// At least one refund has been issued against the charge.
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl StateMachine for PaymentStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, target),
            (Pending, Completed) | (Pending, Failed) | (Completed, Refunded) | (Refunded, Refunded)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use PaymentStatus::*;
        match self {
            Pending => vec![Completed, Failed],
            Completed => vec![Refunded],
            // a later partial refund keeps the payment refunded
            Refunded => vec![Refunded],
            Failed => vec![],
        }
    }
}

/// A payment attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct Payment {
    pub id: PaymentId,
    pub reference: PaymentReference,
    pub invoice_id: InvoiceId,
    pub user_id: UserId,
    pub amount: Money,
    /// Name of the payment method in the catalog.
    pub payment_method: String,
    pub processing_fee: Money,
    pub status: PaymentStatus,
    pub transaction_id: Option<String>,
    pub gateway_response: GatewayResponse,
    /// End of the payment window for methods that have one.
    pub expires_at: Option<Timestamp>,
    pub payment_date: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub version: i32,
}

impl Payment {
    /// Creates a pending payment for the full invoice total.
    pub fn initiate(invoice: &Invoice, method: &PaymentMethod, now: Timestamp) -> Self {
        let fees = method.calculate_fees(&invoice.total_amount);
        Self {
            id: PaymentId::new(),
            reference: PaymentReference::generate(),
            invoice_id: invoice.id,
            user_id: invoice.user_id.clone(),
            amount: invoice.total_amount.clone(),
            payment_method: method.name.clone(),
            processing_fee: fees.total_fee,
            status: PaymentStatus::Pending,
            transaction_id: None,
            gateway_response: GatewayResponse::new(),
            expires_at: method.payment_window_secs.map(|secs| now.plus_secs(secs)),
            payment_date: None,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    /// Records the provider handle returned when the remote intent/order was created.
    pub fn attach_gateway_handle(
        &mut self,
        transaction_id: Option<String>,
        response: GatewayResponse,
    ) -> Result<(), DomainError> {
        if self.status != PaymentStatus::Pending {
            return Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!(
                    "Cannot attach a gateway handle to a {} payment",
                    self.status.as_str()
                ),
            ));
        }
        if let Some(existing) = &self.transaction_id {
            if transaction_id.as_deref() != Some(existing.as_str()) {
                return Err(DomainError::new(
                    ErrorCode::DuplicateTransaction,
                    "Payment already has a gateway transaction",
                ));
            }
        }
        if transaction_id.is_some() {
            self.transaction_id = transaction_id;
        }
        self.gateway_response.extend(response);
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Marks the payment as paid at `at`.
    pub fn complete(&mut self, at: Timestamp) -> Result<(), DomainError> {
        self.transition_to(PaymentStatus::Completed)?;
        self.payment_date = Some(at);
        self.gateway_response
            .insert("success".to_string(), Value::Bool(true));
        self.updated_at = at;
        Ok(())
    }

    /// Marks the payment as failed, recording why.
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), DomainError> {
        self.transition_to(PaymentStatus::Failed)?;
        self.gateway_response
            .insert("failure_reason".to_string(), Value::String(reason.into()));
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Marks the payment as failed because the gateway call itself errored.
    pub fn fail_with_gateway_error(&mut self, error: impl Into<String>) -> Result<(), DomainError> {
        let error = error.into();
        self.gateway_response
            .insert("error".to_string(), Value::String(error.clone()));
        self.fail(error)
    }

    /// Moves a completed payment to refunded.
    pub fn mark_refunded(&mut self) -> Result<(), DomainError> {
        self.transition_to(PaymentStatus::Refunded)?;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Stores the provider's captured-charge id, needed to refund later.
    pub fn record_capture(&mut self, capture_id: impl Into<String>) {
        self.gateway_response
            .insert("capture_id".to_string(), Value::String(capture_id.into()));
    }

    pub fn capture_id(&self) -> Option<&str> {
        self.gateway_response.get("capture_id").and_then(Value::as_str)
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.gateway_response
            .get("failure_reason")
            .and_then(Value::as_str)
    }

    /// True once the payment window of a pending payment has elapsed.
    pub fn is_expired(&self, now: &Timestamp) -> bool {
        self.status == PaymentStatus::Pending
            && self.expires_at.map(|at| !now.is_before(&at)).unwrap_or(false)
    }

    pub fn is_refundable(&self) -> bool {
        self.status.can_transition_to(&PaymentStatus::Refunded)
    }

    fn transition_to(&mut self, target: PaymentStatus) -> Result<(), DomainError> {
        self.status = self.status.transition_to(target).map_err(|_| {
            DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!(
                    "Cannot move payment {} from {} to {}",
                    self.reference,
                    self.status.as_str(),
                    target.as_str()
                ),
            )
        })?;
        Ok(())
    }
}
