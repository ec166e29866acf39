//! Invoice aggregate - the billing document for one event registration.
//!
//! # Invariants
//!
//! - `total_amount == subtotal + tax_amount - discount_amount`
//! - `tax_amount` is 18% of the subtotal, rounded half-up to the minor unit
//! - `paid_amount <= total_amount`
//! - Status changes follow [`InvoiceStatus`]'s transition table

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    DomainError, ErrorCode, EventId, InvoiceId, InvoiceNumber, Money, StateMachine, Timestamp,
    UserId,
};

use super::payment::{Payment, PaymentStatus};

/// Flat tax surcharge applied to every invoice, in basis points.
pub const TAX_RATE_BPS: i64 = 1_800;

/// Days between issue date and due date.
pub const PAYMENT_TERMS_DAYS: i64 = 30;

/// Invoice lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Paid,
    Overdue,
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }
}

impl StateMachine for InvoiceStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use InvoiceStatus::*;
        matches!(
            (self, target),
            (Draft, Sent)
                | (Draft, Cancelled)
                | (Sent, Paid)
                | (Sent, Overdue)
                | (Sent, Cancelled)
                | (Overdue, Paid)
                | (Overdue, Cancelled)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use InvoiceStatus::*;
        match self {
            Draft => vec![Sent, Cancelled],
            Sent => vec![Paid, Overdue, Cancelled],
            Overdue => vec![Paid, Cancelled],
            Paid | Cancelled => vec![],
        }
    }
}

/// Billing document tied to one event and one user.
#[derive(Debug, Clone, PartialEq)]
pub struct Invoice {
    pub id: InvoiceId,
    pub invoice_number: InvoiceNumber,
    pub event_id: EventId,
    pub user_id: UserId,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub subtotal: Money,
    pub tax_amount: Money,
    pub discount_amount: Money,
    pub total_amount: Money,
    pub paid_amount: Money,
    pub status: InvoiceStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub version: i32,
}

impl Invoice {
    /// Issues an invoice for `subtotal`, adding the flat tax.
    ///
    /// The invoice is created as a draft and immediately sent.
    pub fn issue(
        event_id: EventId,
        user_id: UserId,
        subtotal: Money,
        now: Timestamp,
    ) -> Result<Self, DomainError> {
        if !subtotal.is_positive() {
            return Err(DomainError::new(
                ErrorCode::InvalidAmount,
                "Invoice subtotal must be positive",
            ));
        }

        let tax_amount = subtotal.percentage(TAX_RATE_BPS);
        let discount_amount = Money::zero(subtotal.currency().clone());
        let total_amount = subtotal
            .checked_add(&tax_amount)
            .and_then(|gross| gross.checked_sub(&discount_amount))?;
        let issue_date = now.date();

        let mut invoice = Self {
            id: InvoiceId::new(),
            invoice_number: InvoiceNumber::generate(),
            event_id,
            user_id,
            issue_date,
            due_date: now.add_days(PAYMENT_TERMS_DAYS).date(),
            paid_amount: Money::zero(subtotal.currency().clone()),
            subtotal,
            tax_amount,
            discount_amount,
            total_amount,
            status: InvoiceStatus::Draft,
            created_at: now,
            updated_at: now,
            version: 0,
        };
        invoice.transition_to(InvoiceStatus::Sent)?;
        Ok(invoice)
    }

    /// Applies a completed payment.
    ///
    /// One payment settles one invoice: `paid_amount` is set to the payment's
    /// amount, never accumulated.
    pub fn record_payment(&mut self, payment: &Payment) -> Result<(), DomainError> {
        if payment.invoice_id != self.id {
            return Err(DomainError::validation(
                "invoice_id",
                format!(
                    "Payment {} does not belong to invoice {}",
                    payment.reference, self.invoice_number
                ),
            ));
        }
        if payment.status != PaymentStatus::Completed {
            return Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!(
                    "Cannot settle invoice with a {} payment",
                    payment.status.as_str()
                ),
            ));
        }
        self.total_amount
            .ensure_same_currency(&payment.amount)
            .map_err(|e| DomainError::new(ErrorCode::CurrencyMismatch, e.to_string()))?;
        if payment.amount.minor_units() > self.total_amount.minor_units() {
            return Err(DomainError::new(
                ErrorCode::InvalidAmount,
                format!(
                    "Payment of {} exceeds invoice total {}",
                    payment.amount, self.total_amount
                ),
            ));
        }

        self.transition_to(InvoiceStatus::Paid)?;
        self.paid_amount = payment.amount.clone();
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Flags a sent invoice whose due date has passed.
    pub fn mark_overdue(&mut self, today: NaiveDate) -> Result<(), DomainError> {
        if today <= self.due_date {
            return Err(DomainError::validation(
                "due_date",
                format!("Invoice {} is not yet due", self.invoice_number),
            ));
        }
        self.transition_to(InvoiceStatus::Overdue)?;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<(), DomainError> {
        self.transition_to(InvoiceStatus::Cancelled)?;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    pub fn balance_due(&self) -> Money {
        let remaining = self.total_amount.minor_units() - self.paid_amount.minor_units();
        Money::from_minor(remaining.max(0), self.total_amount.currency().clone())
    }

    pub fn is_paid(&self) -> bool {
        self.status == InvoiceStatus::Paid
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        match self.status {
            InvoiceStatus::Overdue => true,
            InvoiceStatus::Sent => today > self.due_date,
            _ => false,
        }
    }

    fn transition_to(&mut self, target: InvoiceStatus) -> Result<(), DomainError> {
        self.status = self.status.transition_to(target).map_err(|_| {
            DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!(
                    "Cannot move invoice {} from {} to {}",
                    self.invoice_number,
                    self.status.as_str(),
                    target.as_str()
                ),
            )
        })?;
        Ok(())
    }
}
