//! ListPaymentsHandler - The user's payment history with a status summary.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::domain::billing::{BillingError, Payment, PaymentStatus};
use crate::domain::foundation::{Currency, Money, UserId};
use crate::ports::PaymentRepository;

#[derive(Debug, Clone)]
pub struct ListPaymentsQuery {
    pub user_id: UserId,
}

/// Counts per status and the settled total per currency.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentSummary {
    pub total: usize,
    pub pending: usize,
    pub completed: usize,
    pub failed: usize,
    pub refunded: usize,
    pub total_paid: Vec<Money>,
}

#[derive(Debug, Clone)]
pub struct ListPaymentsResult {
    /// Newest first.
    pub payments: Vec<Payment>,
    pub summary: PaymentSummary,
}

pub struct ListPaymentsHandler {
    payments: Arc<dyn PaymentRepository>,
}

impl ListPaymentsHandler {
    pub fn new(payments: Arc<dyn PaymentRepository>) -> Self {
        Self { payments }
    }

    pub async fn handle(&self, query: ListPaymentsQuery) -> Result<ListPaymentsResult, BillingError> {
        let mut payments = self.payments.find_by_user(&query.user_id).await?;
        payments.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let summary = summarize(&payments);
        Ok(ListPaymentsResult { payments, summary })
    }
}

fn summarize(payments: &[Payment]) -> PaymentSummary {
    let mut summary = PaymentSummary {
        total: payments.len(),
        ..PaymentSummary::default()
    };
    let mut paid: BTreeMap<&str, (Currency, i64)> = BTreeMap::new();

    for payment in payments {
        match payment.status {
            PaymentStatus::Pending => summary.pending += 1,
            PaymentStatus::Completed => summary.completed += 1,
            PaymentStatus::Failed => summary.failed += 1,
            PaymentStatus::Refunded => summary.refunded += 1,
        }
        if payment.status == PaymentStatus::Completed {
            let currency = payment.amount.currency();
            let entry = paid
                .entry(currency.code())
                .or_insert_with(|| (currency.clone(), 0));
            entry.1 = entry.1.saturating_add(payment.amount.minor_units());
        }
    }

    summary.total_paid = paid
        .into_values()
        .map(|(currency, minor)| Money::from_minor(minor, currency))
        .collect();
    summary
}
