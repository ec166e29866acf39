//! Payment method catalog port.
//!
//! Read-only view of the payment method registry. Methods are reference data
//! maintained out of band.

use async_trait::async_trait;

use crate::domain::billing::PaymentMethod;
use crate::domain::foundation::DomainError;

#[async_trait]
pub trait PaymentMethodCatalog: Send + Sync {
    /// Returns the method only when it is active.
    async fn find_active(&self, name: &str) -> Result<Option<PaymentMethod>, DomainError>;

    /// Returns the method whether or not it is active.
    ///
    /// Existing payments keep working after their method is retired.
    async fn find_by_name(&self, name: &str) -> Result<Option<PaymentMethod>, DomainError>;

    /// Active methods ordered by name.
    async fn list_active(&self) -> Result<Vec<PaymentMethod>, DomainError>;
}
