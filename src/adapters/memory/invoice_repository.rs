use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::billing::Invoice;
use crate::domain::foundation::{DomainError, ErrorCode, InvoiceId, UserId};
use crate::ports::InvoiceRepository;

use super::version_conflict;

#[derive(Default)]
pub struct InMemoryInvoiceRepository {
    invoices: RwLock<HashMap<InvoiceId, Invoice>>,
}

impl InMemoryInvoiceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.invoices.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.invoices.read().await.is_empty()
    }

    pub async fn all(&self) -> Vec<Invoice> {
        self.invoices.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl InvoiceRepository for InMemoryInvoiceRepository {
    async fn save(&self, invoice: &Invoice) -> Result<(), DomainError> {
        let mut invoices = self.invoices.write().await;
        if invoices.contains_key(&invoice.id) {
            return Err(DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invoice {} already exists", invoice.invoice_number),
            ));
        }
        invoices.insert(invoice.id, invoice.clone());
        Ok(())
    }

    async fn update(&self, invoice: &Invoice) -> Result<(), DomainError> {
        let mut invoices = self.invoices.write().await;
        let stored = invoices.get_mut(&invoice.id).ok_or_else(|| {
            DomainError::new(
                ErrorCode::InvoiceNotFound,
                format!("Invoice {} not found", invoice.invoice_number),
            )
        })?;
        if stored.version != invoice.version {
            return Err(version_conflict("Invoice", &invoice.invoice_number));
        }
        *stored = Invoice {
            version: invoice.version + 1,
            ..invoice.clone()
        };
        Ok(())
    }

    async fn find_by_id(&self, id: &InvoiceId) -> Result<Option<Invoice>, DomainError> {
        Ok(self.invoices.read().await.get(id).cloned())
    }

    async fn find_by_user(&self, user_id: &UserId) -> Result<Vec<Invoice>, DomainError> {
        let mut found: Vec<Invoice> = self
            .invoices
            .read()
            .await
            .values()
            .filter(|i| &i.user_id == user_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }
}
