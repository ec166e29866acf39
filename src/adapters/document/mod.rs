//! Document adapters.
//!
//! - `MarkdownInvoiceGenerator` - Renders invoices for mail attachments and downloads

mod invoice_markdown;

pub use invoice_markdown::MarkdownInvoiceGenerator;
