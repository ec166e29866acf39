use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::billing::{Payment, PaymentStatus};
use crate::domain::foundation::{
    DomainError, ErrorCode, InvoiceId, PaymentId, PaymentReference, Timestamp, UserId,
};
use crate::ports::PaymentRepository;

use super::version_conflict;

#[derive(Default)]
pub struct InMemoryPaymentRepository {
    payments: RwLock<HashMap<PaymentId, Payment>>,
}

impl InMemoryPaymentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.payments.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.payments.read().await.is_empty()
    }

    pub async fn all(&self) -> Vec<Payment> {
        self.payments.read().await.values().cloned().collect()
    }

    fn transaction_taken(
        payments: &HashMap<PaymentId, Payment>,
        payment: &Payment,
    ) -> Result<(), DomainError> {
        let Some(transaction_id) = payment.transaction_id.as_deref() else {
            return Ok(());
        };
        let taken = payments.values().any(|p| {
            p.id != payment.id && p.transaction_id.as_deref() == Some(transaction_id)
        });
        if taken {
            return Err(DomainError::new(
                ErrorCode::DuplicateTransaction,
                format!("Transaction {} is already assigned", transaction_id),
            ));
        }
        Ok(())
    }
}

fn newest_first(mut payments: Vec<Payment>) -> Vec<Payment> {
    payments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    payments
}

#[async_trait]
impl PaymentRepository for InMemoryPaymentRepository {
    async fn save(&self, payment: &Payment) -> Result<(), DomainError> {
        let mut payments = self.payments.write().await;
        if payments.contains_key(&payment.id) {
            return Err(DomainError::new(
                ErrorCode::DatabaseError,
                format!("Payment {} already exists", payment.reference),
            ));
        }
        Self::transaction_taken(&payments, payment)?;
        payments.insert(payment.id, payment.clone());
        Ok(())
    }

    async fn update(&self, payment: &Payment) -> Result<(), DomainError> {
        let mut payments = self.payments.write().await;
        Self::transaction_taken(&payments, payment)?;
        let stored = payments.get_mut(&payment.id).ok_or_else(|| {
            DomainError::new(
                ErrorCode::PaymentNotFound,
                format!("Payment {} not found", payment.reference),
            )
        })?;
        if stored.version != payment.version {
            return Err(version_conflict("Payment", &payment.reference));
        }
        *stored = Payment {
            version: payment.version + 1,
            ..payment.clone()
        };
        Ok(())
    }

    async fn find_by_id(&self, id: &PaymentId) -> Result<Option<Payment>, DomainError> {
        Ok(self.payments.read().await.get(id).cloned())
    }

    async fn find_by_reference(
        &self,
        reference: &PaymentReference,
    ) -> Result<Option<Payment>, DomainError> {
        Ok(self
            .payments
            .read()
            .await
            .values()
            .find(|p| &p.reference == reference)
            .cloned())
    }

    async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<Payment>, DomainError> {
        Ok(self
            .payments
            .read()
            .await
            .values()
            .find(|p| p.transaction_id.as_deref() == Some(transaction_id))
            .cloned())
    }

    async fn find_by_user(&self, user_id: &UserId) -> Result<Vec<Payment>, DomainError> {
        let payments = self.payments.read().await;
        Ok(newest_first(
            payments
                .values()
                .filter(|p| &p.user_id == user_id)
                .cloned()
                .collect(),
        ))
    }

    async fn find_by_invoice(&self, invoice_id: &InvoiceId) -> Result<Vec<Payment>, DomainError> {
        let payments = self.payments.read().await;
        Ok(newest_first(
            payments
                .values()
                .filter(|p| &p.invoice_id == invoice_id)
                .cloned()
                .collect(),
        ))
    }

    async fn find_expired_pending(&self, now: &Timestamp) -> Result<Vec<Payment>, DomainError> {
        let payments = self.payments.read().await;
        Ok(payments
            .values()
            .filter(|p| p.status == PaymentStatus::Pending && p.is_expired(now))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::test_support::{card_method, issued_invoice, qr_method};

    #[tokio::test]
    async fn finds_by_transaction_id_once_assigned() {
        let repo = InMemoryPaymentRepository::new();
        let invoice = issued_invoice(100_000);
        let mut payment = Payment::initiate(&invoice, &card_method(), Timestamp::now());
        repo.save(&payment).await.unwrap();

        assert!(repo.find_by_transaction_id("pi_1").await.unwrap().is_none());

        payment
            .attach_gateway_handle(Some("pi_1".into()), Default::default())
            .unwrap();
        repo.update(&payment).await.unwrap();

        let found = repo.find_by_transaction_id("pi_1").await.unwrap().unwrap();
        assert_eq!(found.id, payment.id);
        assert_eq!(found.version, 1);
    }

    #[tokio::test]
    async fn transaction_ids_are_unique() {
        let repo = InMemoryPaymentRepository::new();
        let invoice = issued_invoice(100_000);

        let mut first = Payment::initiate(&invoice, &card_method(), Timestamp::now());
        first
            .attach_gateway_handle(Some("pi_1".into()), Default::default())
            .unwrap();
        repo.save(&first).await.unwrap();

        let mut second = Payment::initiate(&invoice, &card_method(), Timestamp::now());
        second
            .attach_gateway_handle(Some("pi_1".into()), Default::default())
            .unwrap();
        let err = repo.save(&second).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::DuplicateTransaction);
    }

    #[tokio::test]
    async fn lists_only_elapsed_pending_payments() {
        let repo = InMemoryPaymentRepository::new();
        let invoice = issued_invoice(100_000);
        let created = Timestamp::now();

        let qr = Payment::initiate(&invoice, &qr_method(), created);
        let card = Payment::initiate(&invoice, &card_method(), created);
        repo.save(&qr).await.unwrap();
        repo.save(&card).await.unwrap();

        assert!(repo.find_expired_pending(&created).await.unwrap().is_empty());

        let later = created.plus_secs(121);
        let expired = repo.find_expired_pending(&later).await.unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].id, qr.id);
    }
}
