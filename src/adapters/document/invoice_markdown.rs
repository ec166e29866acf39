//! Markdown invoice generator.
//!
//! Renders an invoice with its event, customer and settling payment as a
//! fixed-layout markdown document.

use crate::domain::billing::Invoice;
use crate::ports::{DocumentError, InvoiceDocumentGenerator, InvoiceDocumentInput};

#[derive(Debug, Clone, Default)]
pub struct MarkdownInvoiceGenerator {
    /// Name printed in the document header.
    issuer: Option<String>,
}

impl MarkdownInvoiceGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_issuer(issuer: impl Into<String>) -> Self {
        Self {
            issuer: Some(issuer.into()),
        }
    }

    fn header(&self, invoice: &Invoice) -> String {
        let mut section = format!("# Invoice {}\n\n", invoice.invoice_number);
        if let Some(issuer) = &self.issuer {
            section.push_str(&format!("**{}**\n\n", issuer));
        }
        section.push_str(&format!(
            "| | |\n|---|---|\n| Status | {} |\n| Issue date | {} |\n| Due date | {} |\n\n",
            invoice.status.as_str(),
            invoice.issue_date,
            invoice.due_date
        ));
        section
    }

    fn totals(invoice: &Invoice) -> String {
        format!(
            "## Amount\n\n\
             | Item | Amount |\n|---|---:|\n\
             | Subtotal | {} |\n\
             | Tax (18%) | {} |\n\
             | Discount | {} |\n\
             | **Total** | **{}** |\n\
             | Paid | {} |\n\
             | Balance due | {} |\n\n",
            invoice.subtotal,
            invoice.tax_amount,
            invoice.discount_amount,
            invoice.total_amount,
            invoice.paid_amount,
            invoice.balance_due()
        )
    }
}

impl InvoiceDocumentGenerator for MarkdownInvoiceGenerator {
    fn generate(&self, input: InvoiceDocumentInput<'_>) -> Result<String, DocumentError> {
        let invoice = input.invoice;
        if invoice.event_id != input.event.id {
            return Err(DocumentError::InvalidData(format!(
                "Invoice {} is not for event {}",
                invoice.invoice_number, input.event.id
            )));
        }
        if let Some(payment) = input.payment {
            if payment.invoice_id != invoice.id {
                return Err(DocumentError::InvalidData(format!(
                    "Payment {} does not belong to invoice {}",
                    payment.reference, invoice.invoice_number
                )));
            }
        }

        let mut doc = self.header(invoice);

        doc.push_str(&format!("## Event\n\n{}\n\n", input.event.title));

        doc.push_str("## Billed To\n\n");
        match input.customer {
            Some(customer) => doc.push_str(&format!("{} <{}>\n\n", customer.name, customer.email)),
            None => doc.push_str(&format!("User {}\n\n", invoice.user_id)),
        }

        doc.push_str(&Self::totals(invoice));

        if let Some(payment) = input.payment {
            doc.push_str("## Payment\n\n");
            doc.push_str(&format!(
                "- Payment ID: {}\n- Method: {}\n- Status: {}\n",
                payment.reference,
                payment.payment_method,
                payment.status.as_str()
            ));
            if let Some(paid_at) = payment.payment_date {
                doc.push_str(&format!(
                    "- Paid on: {}\n",
                    paid_at.as_datetime().format("%Y-%m-%d %H:%M UTC")
                ));
            }
            if let Some(transaction_id) = &payment.transaction_id {
                doc.push_str(&format!("- Transaction: {}\n", transaction_id));
            }
            doc.push('\n');
        }

        Ok(doc)
    }
}
