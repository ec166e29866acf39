use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::billing::Refund;
use crate::domain::foundation::{DomainError, ErrorCode, PaymentId, RefundId};
use crate::ports::RefundRepository;

#[derive(Default)]
pub struct InMemoryRefundRepository {
    refunds: RwLock<HashMap<RefundId, Refund>>,
}

impl InMemoryRefundRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.refunds.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.refunds.read().await.is_empty()
    }

    pub async fn all(&self) -> Vec<Refund> {
        self.refunds.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl RefundRepository for InMemoryRefundRepository {
    async fn save(&self, refund: &Refund) -> Result<(), DomainError> {
        let mut refunds = self.refunds.write().await;
        if refunds.contains_key(&refund.id) {
            return Err(DomainError::new(
                ErrorCode::DatabaseError,
                format!("Refund {} already exists", refund.reference),
            ));
        }
        refunds.insert(refund.id, refund.clone());
        Ok(())
    }

    async fn update(&self, refund: &Refund) -> Result<(), DomainError> {
        let mut refunds = self.refunds.write().await;
        let stored = refunds.get_mut(&refund.id).ok_or_else(|| {
            DomainError::new(
                ErrorCode::RefundNotFound,
                format!("Refund {} not found", refund.reference),
            )
        })?;
        *stored = refund.clone();
        Ok(())
    }

    async fn find_by_id(&self, id: &RefundId) -> Result<Option<Refund>, DomainError> {
        Ok(self.refunds.read().await.get(id).cloned())
    }

    async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<Refund>, DomainError> {
        Ok(self
            .refunds
            .read()
            .await
            .values()
            .find(|r| r.transaction_id.as_deref() == Some(transaction_id))
            .cloned())
    }

    async fn find_by_payment(&self, payment_id: &PaymentId) -> Result<Vec<Refund>, DomainError> {
        let mut found: Vec<Refund> = self
            .refunds
            .read()
            .await
            .values()
            .filter(|r| &r.payment_id == payment_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(found)
    }
}
