//! In-memory implementation of every repository port.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{Payment, Property, PropertyRecord, TransferRequest, User};
use crate::ports::{
    PaymentRepository, PropertyRepository, RepositoryError, RepositoryResult,
    TransferRequestRepository, UserRepository,
};

#[derive(Default)]
struct Tables {
    payments: HashMap<Uuid, Payment>,
    transfer_requests: HashMap<Uuid, TransferRequest>,
    properties: HashMap<Uuid, Property>,
    property_records: Vec<PropertyRecord>,
    users: HashMap<Uuid, User>,
}

/// A thread-safe in-memory registry.
///
/// Shares one lock across all tables; good enough for tests and local runs
/// where persistence is not required.
#[derive(Default, Clone)]
pub struct InMemoryRegistry {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of property records across all properties.
    pub async fn property_record_count(&self) -> usize {
        self.tables.read().await.property_records.len()
    }
}

#[async_trait]
impl PaymentRepository for InMemoryRegistry {
    async fn insert_payment(&self, payment: &Payment) -> RepositoryResult<Payment> {
        let mut tables = self.tables.write().await;
        if tables
            .payments
            .values()
            .any(|p| p.session_id == payment.session_id)
        {
            return Err(RepositoryError::Conflict(format!(
                "payment for session {} already exists",
                payment.session_id
            )));
        }
        tables.payments.insert(payment.id, payment.clone());
        Ok(payment.clone())
    }

    async fn find_by_session_id(&self, session_id: &str) -> RepositoryResult<Option<Payment>> {
        let tables = self.tables.read().await;
        Ok(tables
            .payments
            .values()
            .find(|p| p.session_id == session_id)
            .cloned())
    }

    async fn update_payment(&self, payment: &Payment) -> RepositoryResult<()> {
        let mut tables = self.tables.write().await;
        match tables.payments.get_mut(&payment.id) {
            Some(existing) => {
                *existing = payment.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound(format!("payment {}", payment.id))),
        }
    }
}

#[async_trait]
impl TransferRequestRepository for InMemoryRegistry {
    async fn insert_transfer_request(
        &self,
        req: &TransferRequest,
    ) -> RepositoryResult<TransferRequest> {
        let mut tables = self.tables.write().await;
        tables.transfer_requests.insert(req.id, req.clone());
        Ok(req.clone())
    }

    async fn get_transfer_request(&self, id: Uuid) -> RepositoryResult<TransferRequest> {
        let tables = self.tables.read().await;
        tables
            .transfer_requests
            .get(&id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(format!("transfer request {}", id)))
    }

    async fn update_transfer_request(&self, req: &TransferRequest) -> RepositoryResult<()> {
        let mut tables = self.tables.write().await;
        match tables.transfer_requests.get_mut(&req.id) {
            Some(existing) => {
                *existing = req.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound(format!(
                "transfer request {}",
                req.id
            ))),
        }
    }
}

#[async_trait]
impl PropertyRepository for InMemoryRegistry {
    async fn insert_property(&self, property: &Property) -> RepositoryResult<Property> {
        let mut tables = self.tables.write().await;
        tables.properties.insert(property.id, property.clone());
        Ok(property.clone())
    }

    async fn get_property(&self, id: Uuid) -> RepositoryResult<Property> {
        let tables = self.tables.read().await;
        tables
            .properties
            .get(&id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(format!("property {}", id)))
    }

    async fn update_property(&self, property: &Property) -> RepositoryResult<()> {
        let mut tables = self.tables.write().await;
        match tables.properties.get_mut(&property.id) {
            Some(existing) => {
                *existing = property.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound(format!("property {}", property.id))),
        }
    }

    async fn create_property_record(
        &self,
        record: &PropertyRecord,
    ) -> RepositoryResult<PropertyRecord> {
        let mut tables = self.tables.write().await;
        tables.property_records.push(record.clone());
        Ok(record.clone())
    }

    async fn list_property_records(
        &self,
        property_id: Uuid,
    ) -> RepositoryResult<Vec<PropertyRecord>> {
        let tables = self.tables.read().await;
        Ok(tables
            .property_records
            .iter()
            .filter(|r| r.property_id == property_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl UserRepository for InMemoryRegistry {
    async fn insert_user(&self, user: &User) -> RepositoryResult<User> {
        let mut tables = self.tables.write().await;
        tables.users.insert(user.id, user.clone());
        Ok(user.clone())
    }

    async fn get_user(&self, id: Uuid) -> RepositoryResult<User> {
        let tables = self.tables.read().await;
        tables
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(format!("user {}", id)))
    }

    async fn set_stripe_customer_id(
        &self,
        user_id: Uuid,
        customer_id: &str,
    ) -> RepositoryResult<()> {
        let mut tables = self.tables.write().await;
        let user = tables
            .users
            .get_mut(&user_id)
            .ok_or_else(|| RepositoryError::NotFound(format!("user {}", user_id)))?;
        user.stripe_customer_id = Some(customer_id.to_string());
        Ok(())
    }
}
