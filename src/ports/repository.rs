//! Repository ports.
//! Relationships are resolved with explicit fetches by id, never by
//! traversing loaded objects.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{Payment, Property, PropertyRecord, TransferRequest, User};

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => RepositoryError::NotFound("row not found".to_string()),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepositoryError::Conflict(db.message().to_string())
            }
            other => RepositoryError::Database(other.to_string()),
        }
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn insert_payment(&self, payment: &Payment) -> RepositoryResult<Payment>;

    /// `None` when no payment was opened for this checkout session.
    async fn find_by_session_id(&self, session_id: &str) -> RepositoryResult<Option<Payment>>;

    async fn update_payment(&self, payment: &Payment) -> RepositoryResult<()>;
}

#[async_trait]
pub trait TransferRequestRepository: Send + Sync {
    async fn insert_transfer_request(&self, req: &TransferRequest)
        -> RepositoryResult<TransferRequest>;

    async fn get_transfer_request(&self, id: Uuid) -> RepositoryResult<TransferRequest>;

    async fn update_transfer_request(&self, req: &TransferRequest) -> RepositoryResult<()>;
}

#[async_trait]
pub trait PropertyRepository: Send + Sync {
    async fn insert_property(&self, property: &Property) -> RepositoryResult<Property>;

    async fn get_property(&self, id: Uuid) -> RepositoryResult<Property>;

    async fn update_property(&self, property: &Property) -> RepositoryResult<()>;

    async fn create_property_record(
        &self,
        record: &PropertyRecord,
    ) -> RepositoryResult<PropertyRecord>;

    async fn list_property_records(&self, property_id: Uuid)
        -> RepositoryResult<Vec<PropertyRecord>>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn insert_user(&self, user: &User) -> RepositoryResult<User>;

    async fn get_user(&self, id: Uuid) -> RepositoryResult<User>;

    async fn set_stripe_customer_id(&self, user_id: Uuid, customer_id: &str)
        -> RepositoryResult<()>;
}

/// The full set of repositories the service works against.
#[derive(Clone)]
pub struct Repositories {
    pub payments: Arc<dyn PaymentRepository>,
    pub transfers: Arc<dyn TransferRequestRepository>,
    pub properties: Arc<dyn PropertyRepository>,
    pub users: Arc<dyn UserRepository>,
}

impl Repositories {
    /// Wires every port to one store implementing all of them.
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: PaymentRepository
            + TransferRequestRepository
            + PropertyRepository
            + UserRepository
            + 'static,
    {
        Self {
            payments: store.clone(),
            transfers: store.clone(),
            properties: store.clone(),
            users: store,
        }
    }
}
