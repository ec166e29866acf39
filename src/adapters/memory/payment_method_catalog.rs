use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::billing::PaymentMethod;
use crate::domain::foundation::DomainError;
use crate::ports::PaymentMethodCatalog;

/// Catalog held in memory, seeded with the default channels.
pub struct InMemoryPaymentMethodCatalog {
    methods: RwLock<Vec<PaymentMethod>>,
}

impl Default for InMemoryPaymentMethodCatalog {
    fn default() -> Self {
        Self::with_methods(PaymentMethod::default_channels())
    }
}

impl InMemoryPaymentMethodCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_methods(methods: Vec<PaymentMethod>) -> Self {
        Self {
            methods: RwLock::new(methods),
        }
    }

    /// Adds or replaces the method with the same name.
    pub async fn upsert(&self, method: PaymentMethod) {
        let mut methods = self.methods.write().await;
        methods.retain(|m| m.name != method.name);
        methods.push(method);
    }
}

#[async_trait]
impl PaymentMethodCatalog for InMemoryPaymentMethodCatalog {
    async fn find_active(&self, name: &str) -> Result<Option<PaymentMethod>, DomainError> {
        Ok(self
            .methods
            .read()
            .await
            .iter()
            .find(|m| m.name == name && m.is_active)
            .cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<PaymentMethod>, DomainError> {
        Ok(self
            .methods
            .read()
            .await
            .iter()
            .find(|m| m.name == name)
            .cloned())
    }

    async fn list_active(&self) -> Result<Vec<PaymentMethod>, DomainError> {
        let mut active: Vec<PaymentMethod> = self
            .methods
            .read()
            .await
            .iter()
            .filter(|m| m.is_active)
            .cloned()
            .collect();
        active.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(active)
    }
}
