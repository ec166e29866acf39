//! Payment repository port.

use async_trait::async_trait;

use crate::domain::billing::Payment;
use crate::domain::foundation::{
    DomainError, InvoiceId, PaymentId, PaymentReference, Timestamp, UserId,
};

/// Repository port for Payment aggregate persistence.
///
/// Implementations must ensure:
/// - Unique `reference`
/// - Unique `transaction_id` once assigned
/// - Optimistic locking on `update` (version check, then bump)
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Save a new payment.
    async fn save(&self, payment: &Payment) -> Result<(), DomainError>;

    /// Update an existing payment.
    ///
    /// # Errors
    ///
    /// - `PaymentNotFound` if the payment doesn't exist
    /// - `ConcurrentModification` if another writer updated it first
    /// - `DuplicateTransaction` if the transaction id belongs to another payment
    async fn update(&self, payment: &Payment) -> Result<(), DomainError>;

    async fn find_by_id(&self, id: &PaymentId) -> Result<Option<Payment>, DomainError>;

    /// Lookup by the external payment id shown to users.
    async fn find_by_reference(
        &self,
        reference: &PaymentReference,
    ) -> Result<Option<Payment>, DomainError>;

    /// Lookup by the provider's intent or order id. Webhooks use this.
    async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<Payment>, DomainError>;

    /// Payments of a user, newest first.
    async fn find_by_user(&self, user_id: &UserId) -> Result<Vec<Payment>, DomainError>;

    async fn find_by_invoice(&self, invoice_id: &InvoiceId) -> Result<Vec<Payment>, DomainError>;

    /// Pending payments whose window ended at or before `now`.
    async fn find_expired_pending(&self, now: &Timestamp) -> Result<Vec<Payment>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn PaymentRepository) {}
    }
}
