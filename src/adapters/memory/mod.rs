//! In-memory adapters.
//!
//! Every repository and collaborator port has an implementation here backed by
//! a `tokio::sync::RwLock`. Used by the test suites and by local runs without a
//! database. Nothing persists across restarts.

mod event_directory;
mod invoice_repository;
mod notification_sender;
mod payment_method_catalog;
mod payment_repository;
mod refund_repository;
mod webhook_event_repository;

pub use event_directory::InMemoryEventDirectory;
pub use invoice_repository::InMemoryInvoiceRepository;
pub use notification_sender::RecordingNotificationSender;
pub use payment_method_catalog::InMemoryPaymentMethodCatalog;
pub use payment_repository::InMemoryPaymentRepository;
pub use refund_repository::InMemoryRefundRepository;
pub use webhook_event_repository::InMemoryWebhookEventRepository;

use crate::domain::foundation::{DomainError, ErrorCode};

fn version_conflict(entity: &str, id: impl std::fmt::Display) -> DomainError {
    DomainError::new(
        ErrorCode::ConcurrentModification,
        format!("{} {} was modified concurrently", entity, id),
    )
}
