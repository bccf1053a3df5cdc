//! Stripe customer provisioning for registry users.

use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::UseCaseError;
use crate::domain::User;
use crate::ports::{Customer, NewCustomer, PaymentProcessor, UserRepository};

pub struct StripeCustomerService {
    users: Arc<dyn UserRepository>,
    processor: Arc<dyn PaymentProcessor>,
}

impl StripeCustomerService {
    pub fn new(users: Arc<dyn UserRepository>, processor: Arc<dyn PaymentProcessor>) -> Self {
        Self { users, processor }
    }

    /// Returns the user's Stripe customer, creating one when none is stored or
    /// the stored one can't be retrieved. Retrieval errors are swallowed; only
    /// creation errors reach the caller.
    pub async fn get_or_create_stripe_customer(&self, user: &User) -> Result<Customer, UseCaseError> {
        if let Some(customer_id) = user.stripe_customer_id.as_deref() {
            match self.processor.retrieve_customer(customer_id).await {
                Ok(customer) if !customer.deleted => return Ok(customer),
                Ok(_) => {
                    warn!(user_id = %user.id, customer_id, "Stored Stripe customer was deleted, creating a new one");
                }
                Err(e) => {
                    warn!(user_id = %user.id, customer_id, error = %e, "Stripe customer lookup failed, creating a new one");
                }
            }
        }

        let customer = self
            .processor
            .create_customer(&NewCustomer {
                email: user.email.clone(),
                name: user.display_name(),
            })
            .await?;

        self.users.set_stripe_customer_id(user.id, &customer.id).await?;
        info!(user_id = %user.id, customer_id = %customer.id, "Stripe customer created");

        Ok(customer)
    }

    pub async fn ensure_for_user(&self, user_id: Uuid) -> Result<Customer, UseCaseError> {
        let user = self.users.get_user(user_id).await?;
        self.get_or_create_stripe_customer(&user).await
    }
}
