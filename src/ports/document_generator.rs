//! Invoice document generator port.
//!
//! Renders an invoice as a self-contained document that can be attached to
//! the payment confirmation mail or downloaded.

use thiserror::Error;

use crate::domain::billing::{Invoice, Payment};

use super::event_directory::{EventSummary, UserContact};

/// Everything the document shows.
#[derive(Debug, Clone, Copy)]
pub struct InvoiceDocumentInput<'a> {
    pub invoice: &'a Invoice,
    pub event: &'a EventSummary,
    pub customer: Option<&'a UserContact>,
    /// The settling payment, when there is one.
    pub payment: Option<&'a Payment>,
}

/// Port for rendering invoices.
pub trait InvoiceDocumentGenerator: Send + Sync {
    fn generate(&self, input: InvoiceDocumentInput<'_>) -> Result<String, DocumentError>;
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DocumentError {
    #[error("Invalid invoice data: {0}")]
    InvalidData(String),

    #[error("Rendering failed: {0}")]
    Rendering(String),
}
