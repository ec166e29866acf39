//! Refund repository port.

use async_trait::async_trait;

use crate::domain::billing::Refund;
use crate::domain::foundation::{DomainError, PaymentId, RefundId};

#[async_trait]
pub trait RefundRepository: Send + Sync {
    async fn save(&self, refund: &Refund) -> Result<(), DomainError>;

    /// # Errors
    ///
    /// - `RefundNotFound` if the refund doesn't exist
    async fn update(&self, refund: &Refund) -> Result<(), DomainError>;

    async fn find_by_id(&self, id: &RefundId) -> Result<Option<Refund>, DomainError>;

    /// Lookup by the provider's refund id.
    async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<Refund>, DomainError>;

    /// Refunds against a payment, oldest first.
    async fn find_by_payment(&self, payment_id: &PaymentId) -> Result<Vec<Refund>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refund_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn RefundRepository) {}
    }
}
