//! Invoice repository port.
//!
//! Invoices are never deleted; they stay for audit once issued.

use async_trait::async_trait;

use crate::domain::billing::Invoice;
use crate::domain::foundation::{DomainError, InvoiceId, UserId};

/// Repository port for Invoice aggregate persistence.
///
/// Implementations must enforce optimistic locking: `update` succeeds only
/// when the stored version equals `invoice.version`, and bumps it.
#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    /// Save a new invoice.
    async fn save(&self, invoice: &Invoice) -> Result<(), DomainError>;

    /// Update an existing invoice.
    ///
    /// # Errors
    ///
    /// - `InvoiceNotFound` if the invoice doesn't exist
    /// - `ConcurrentModification` if another writer updated it first
    async fn update(&self, invoice: &Invoice) -> Result<(), DomainError>;

    async fn find_by_id(&self, id: &InvoiceId) -> Result<Option<Invoice>, DomainError>;

    /// Invoices of a user, newest first.
    async fn find_by_user(&self, user_id: &UserId) -> Result<Vec<Invoice>, DomainError>;
}
