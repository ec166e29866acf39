//! Refund - money returned against a completed payment.
//!
//! Refunds come from two directions. A user request creates a pending refund
//! that is capped at the payment amount; a gateway refund notice records a
//! refund that has already happened, using whatever amount the provider
//! reports.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::foundation::{
    DomainError, ErrorCode, Money, PaymentId, RefundId, RefundReference, StateMachine, Timestamp,
    UserId,
};

use super::payment::{GatewayResponse, Payment};

/// Refund lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl RefundStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefundStatus::Pending => "pending",
            RefundStatus::Processing => "processing",
            RefundStatus::Completed => "completed",
            RefundStatus::Failed => "failed",
        }
    }

    /// Pending, processing and completed refunds all claim part of the payment.
    pub fn counts_against_payment(&self) -> bool {
        !matches!(self, RefundStatus::Failed)
    }
}

impl StateMachine for RefundStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use RefundStatus::*;
        matches!(
            (self, target),
            (Pending, Processing) | (Pending, Failed) | (Processing, Completed) | (Processing, Failed)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use RefundStatus::*;
        match self {
            Pending => vec![Processing, Failed],
            Processing => vec![Completed, Failed],
            Completed | Failed => vec![],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Refund {
    pub id: RefundId,
    pub reference: RefundReference,
    pub payment_id: PaymentId,
    pub user_id: UserId,
    pub amount: Money,
    pub reason: String,
    pub status: RefundStatus,
    /// Provider's refund id once the gateway accepted the refund.
    pub transaction_id: Option<String>,
    pub gateway_response: GatewayResponse,
    pub refund_date: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Refund {
    /// Creates a user-requested refund.
    ///
    /// `already_refunded` is the sum of refunds that still count against the
    /// payment; the new amount plus that sum may not exceed the payment.
    pub fn request(
        payment: &Payment,
        amount: Money,
        already_refunded: &Money,
        reason: impl Into<String>,
        now: Timestamp,
    ) -> Result<Self, DomainError> {
        payment
            .amount
            .ensure_same_currency(&amount)
            .map_err(|e| DomainError::new(ErrorCode::CurrencyMismatch, e.to_string()))?;
        if !amount.is_positive() {
            return Err(DomainError::new(
                ErrorCode::InvalidAmount,
                "Refund amount must be positive",
            ));
        }
        let claimed = amount.checked_add(already_refunded)?;
        if claimed.minor_units() > payment.amount.minor_units() {
            return Err(DomainError::new(
                ErrorCode::RefundExceedsPayment,
                format!(
                    "Refund amount cannot exceed payment amount ({} of {} already refunded)",
                    already_refunded, payment.amount
                ),
            )
            .with_detail("requested", amount.to_string())
            .with_detail("payment_amount", payment.amount.to_string()));
        }

        Ok(Self {
            id: RefundId::new(),
            reference: RefundReference::generate(),
            payment_id: payment.id,
            user_id: payment.user_id.clone(),
            amount,
            reason: normalize_reason(reason.into()),
            status: RefundStatus::Pending,
            transaction_id: None,
            gateway_response: GatewayResponse::new(),
            refund_date: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Records a refund the gateway reports as already issued.
    ///
    /// No amount cap applies here: the provider has moved the money.
    pub fn from_gateway_notice(
        payment: &Payment,
        amount: Money,
        transaction_id: Option<String>,
        reason: impl Into<String>,
        now: Timestamp,
    ) -> Self {
        Self {
            id: RefundId::new(),
            reference: RefundReference::generate(),
            payment_id: payment.id,
            user_id: payment.user_id.clone(),
            amount,
            reason: normalize_reason(reason.into()),
            status: RefundStatus::Completed,
            transaction_id,
            gateway_response: GatewayResponse::new(),
            refund_date: Some(now),
            created_at: now,
            updated_at: now,
        }
    }

    /// The gateway accepted the refund; it settles asynchronously.
    pub fn start_processing(
        &mut self,
        provider_refund_id: Option<String>,
        response: GatewayResponse,
    ) -> Result<(), DomainError> {
        self.transition_to(RefundStatus::Processing)?;
        self.transaction_id = provider_refund_id;
        self.gateway_response.extend(response);
        self.updated_at = Timestamp::now();
        Ok(())
    }

    pub fn complete(&mut self, at: Timestamp) -> Result<(), DomainError> {
        self.transition_to(RefundStatus::Completed)?;
        self.refund_date = Some(at);
        self.updated_at = at;
        Ok(())
    }

    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), DomainError> {
        self.transition_to(RefundStatus::Failed)?;
        self.gateway_response
            .insert("error".to_string(), Value::String(error.into()));
        self.updated_at = Timestamp::now();
        Ok(())
    }

    fn transition_to(&mut self, target: RefundStatus) -> Result<(), DomainError> {
        self.status = self.status.transition_to(target).map_err(|_| {
            DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!(
                    "Cannot move refund {} from {} to {}",
                    self.reference,
                    self.status.as_str(),
                    target.as_str()
                ),
            )
        })?;
        Ok(())
    }
}

fn normalize_reason(reason: String) -> String {
    let trimmed = reason.trim();
    if trimmed.is_empty() {
        "Customer request".to_string()
    } else {
        trimmed.to_string()
    }
}
