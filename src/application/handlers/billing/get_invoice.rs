//! GetInvoiceHandler - An invoice with its payments and refunds.

use std::sync::Arc;

use crate::domain::billing::{BillingError, Invoice, Payment, Refund};
use crate::domain::foundation::{InvoiceId, UserId};
use crate::ports::{InvoiceRepository, PaymentRepository, RefundRepository};

#[derive(Debug, Clone)]
pub struct GetInvoiceQuery {
    pub invoice_id: InvoiceId,
    pub user_id: UserId,
    pub is_staff: bool,
}

#[derive(Debug, Clone)]
pub struct GetInvoiceResult {
    pub invoice: Invoice,
    pub payments: Vec<Payment>,
    pub refunds: Vec<Refund>,
}

pub struct GetInvoiceHandler {
    invoices: Arc<dyn InvoiceRepository>,
    payments: Arc<dyn PaymentRepository>,
    refunds: Arc<dyn RefundRepository>,
}

impl GetInvoiceHandler {
    pub fn new(
        invoices: Arc<dyn InvoiceRepository>,
        payments: Arc<dyn PaymentRepository>,
        refunds: Arc<dyn RefundRepository>,
    ) -> Self {
        Self {
            invoices,
            payments,
            refunds,
        }
    }

    pub async fn handle(&self, query: GetInvoiceQuery) -> Result<GetInvoiceResult, BillingError> {
        let invoice = self
            .invoices
            .find_by_id(&query.invoice_id)
            .await?
            .filter(|i| query.is_staff || i.user_id == query.user_id)
            .ok_or_else(|| BillingError::invoice_not_found(query.invoice_id.to_string()))?;

        let payments = self.payments.find_by_invoice(&invoice.id).await?;

        let mut refunds = Vec::new();
        for payment in &payments {
            refunds.extend(self.refunds.find_by_payment(&payment.id).await?);
        }

        Ok(GetInvoiceResult {
            invoice,
            payments,
            refunds,
        })
    }
}
