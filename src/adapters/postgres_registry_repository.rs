//! Postgres implementation of the registry repositories.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{
    Payment, PaymentStatus, Property, PropertyRecord, TransferRequest, TransferStatus, User,
};
use crate::ports::{
    PaymentRepository, PropertyRepository, RepositoryError, RepositoryResult,
    TransferRequestRepository, UserRepository,
};

/// Postgres-backed registry repository.
#[derive(Clone)]
pub struct PostgresRegistryRepository {
    pool: PgPool,
}

impl PostgresRegistryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentRepository for PostgresRegistryRepository {
    async fn insert_payment(&self, payment: &Payment) -> RepositoryResult<Payment> {
        let row = sqlx::query_as::<_, PaymentRow>(
            r#"
            INSERT INTO payments (
                id, session_id, payment_intent_id, card_brand, card_last4,
                status, transfer_request_id, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(payment.id)
        .bind(&payment.session_id)
        .bind(&payment.payment_intent_id)
        .bind(&payment.card_brand)
        .bind(&payment.card_last4)
        .bind(payment.status.as_str())
        .bind(payment.transfer_request_id)
        .bind(payment.created_at)
        .bind(payment.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        row.into_domain()
    }

    async fn find_by_session_id(&self, session_id: &str) -> RepositoryResult<Option<Payment>> {
        let row = sqlx::query_as::<_, PaymentRow>("SELECT * FROM payments WHERE session_id = $1")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(RepositoryError::from)?;

        row.map(|r| r.into_domain()).transpose()
    }

    async fn update_payment(&self, payment: &Payment) -> RepositoryResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE payments
            SET payment_intent_id = $2, card_brand = $3, card_last4 = $4,
                status = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(payment.id)
        .bind(&payment.payment_intent_id)
        .bind(&payment.card_brand)
        .bind(&payment.card_last4)
        .bind(payment.status.as_str())
        .bind(payment.updated_at)
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        expect_one_row(result.rows_affected(), "payment", payment.id)
    }
}

#[async_trait]
impl TransferRequestRepository for PostgresRegistryRepository {
    async fn insert_transfer_request(
        &self,
        req: &TransferRequest,
    ) -> RepositoryResult<TransferRequest> {
        let row = sqlx::query_as::<_, TransferRequestRow>(
            r#"
            INSERT INTO transfer_requests (
                id, property_id, requested_by, status, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(req.id)
        .bind(req.property_id)
        .bind(req.requested_by)
        .bind(req.status.as_str())
        .bind(req.created_at)
        .bind(req.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        row.into_domain()
    }

    async fn get_transfer_request(&self, id: Uuid) -> RepositoryResult<TransferRequest> {
        let row = sqlx::query_as::<_, TransferRequestRow>(
            "SELECT * FROM transfer_requests WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        row.ok_or_else(|| RepositoryError::NotFound(format!("transfer request {}", id)))?
            .into_domain()
    }

    async fn update_transfer_request(&self, req: &TransferRequest) -> RepositoryResult<()> {
        let result = sqlx::query(
            "UPDATE transfer_requests SET status = $2, updated_at = $3 WHERE id = $1",
        )
        .bind(req.id)
        .bind(req.status.as_str())
        .bind(req.updated_at)
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        expect_one_row(result.rows_affected(), "transfer request", req.id)
    }
}

#[async_trait]
impl PropertyRepository for PostgresRegistryRepository {
    async fn insert_property(&self, property: &Property) -> RepositoryResult<Property> {
        let row = sqlx::query_as::<_, PropertyRow>(
            "INSERT INTO properties (id, owner_id, updated_at) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(property.id)
        .bind(property.owner_id)
        .bind(property.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(row.into_domain())
    }

    async fn get_property(&self, id: Uuid) -> RepositoryResult<Property> {
        let row = sqlx::query_as::<_, PropertyRow>("SELECT * FROM properties WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(RepositoryError::from)?;

        row.map(|r| r.into_domain())
            .ok_or_else(|| RepositoryError::NotFound(format!("property {}", id)))
    }

    async fn update_property(&self, property: &Property) -> RepositoryResult<()> {
        let result =
            sqlx::query("UPDATE properties SET owner_id = $2, updated_at = $3 WHERE id = $1")
                .bind(property.id)
                .bind(property.owner_id)
                .bind(property.updated_at)
                .execute(&self.pool)
                .await
                .map_err(RepositoryError::from)?;

        expect_one_row(result.rows_affected(), "property", property.id)
    }

    async fn create_property_record(
        &self,
        record: &PropertyRecord,
    ) -> RepositoryResult<PropertyRecord> {
        let row = sqlx::query_as::<_, PropertyRecordRow>(
            r#"
            INSERT INTO property_records (id, property_id, user_id, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(record.id)
        .bind(record.property_id)
        .bind(record.user_id)
        .bind(record.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(row.into_domain())
    }

    async fn list_property_records(
        &self,
        property_id: Uuid,
    ) -> RepositoryResult<Vec<PropertyRecord>> {
        let rows = sqlx::query_as::<_, PropertyRecordRow>(
            "SELECT * FROM property_records WHERE property_id = $1 ORDER BY created_at ASC",
        )
        .bind(property_id)
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(rows.into_iter().map(|r| r.into_domain()).collect())
    }
}

#[async_trait]
impl UserRepository for PostgresRegistryRepository {
    async fn insert_user(&self, user: &User) -> RepositoryResult<User> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (id, username, email, first_name, last_name, stripe_customer_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.stripe_customer_id)
        .fetch_one(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(row.into_domain())
    }

    async fn get_user(&self, id: Uuid) -> RepositoryResult<User> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(RepositoryError::from)?;

        row.map(|r| r.into_domain())
            .ok_or_else(|| RepositoryError::NotFound(format!("user {}", id)))
    }

    async fn set_stripe_customer_id(
        &self,
        user_id: Uuid,
        customer_id: &str,
    ) -> RepositoryResult<()> {
        let result = sqlx::query("UPDATE users SET stripe_customer_id = $2 WHERE id = $1")
            .bind(user_id)
            .bind(customer_id)
            .execute(&self.pool)
            .await
            .map_err(RepositoryError::from)?;

        expect_one_row(result.rows_affected(), "user", user_id)
    }
}

fn expect_one_row(rows_affected: u64, entity: &str, id: Uuid) -> RepositoryResult<()> {
    if rows_affected == 0 {
        return Err(RepositoryError::NotFound(format!("{} {}", entity, id)));
    }
    Ok(())
}

// Internal row types for SQLx. Not exposed outside the adapter.

#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    session_id: String,
    payment_intent_id: Option<String>,
    card_brand: Option<String>,
    card_last4: Option<String>,
    status: String,
    transfer_request_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PaymentRow {
    fn into_domain(self) -> RepositoryResult<Payment> {
        let status = self
            .status
            .parse::<PaymentStatus>()
            .map_err(|e| RepositoryError::Corrupt(e.to_string()))?;

        Ok(Payment {
            id: self.id,
            session_id: self.session_id,
            payment_intent_id: self.payment_intent_id,
            card_brand: self.card_brand,
            card_last4: self.card_last4,
            status,
            transfer_request_id: self.transfer_request_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TransferRequestRow {
    id: Uuid,
    property_id: Uuid,
    requested_by: Uuid,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TransferRequestRow {
    fn into_domain(self) -> RepositoryResult<TransferRequest> {
        let status = self
            .status
            .parse::<TransferStatus>()
            .map_err(|e| RepositoryError::Corrupt(e.to_string()))?;

        Ok(TransferRequest {
            id: self.id,
            property_id: self.property_id,
            requested_by: self.requested_by,
            status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PropertyRow {
    id: Uuid,
    owner_id: Uuid,
    updated_at: DateTime<Utc>,
}

impl PropertyRow {
    fn into_domain(self) -> Property {
        Property {
            id: self.id,
            owner_id: self.owner_id,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PropertyRecordRow {
    id: Uuid,
    property_id: Uuid,
    user_id: Uuid,
    created_at: DateTime<Utc>,
}

impl PropertyRecordRow {
    fn into_domain(self) -> PropertyRecord {
        PropertyRecord {
            id: self.id,
            property_id: self.property_id,
            user_id: self.user_id,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    email: String,
    first_name: String,
    last_name: String,
    stripe_customer_id: Option<String>,
}

impl UserRow {
    fn into_domain(self) -> User {
        User {
            id: self.id,
            username: self.username,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            stripe_customer_id: self.stripe_customer_id,
        }
    }
}
