pub mod reconcile_payment;
pub mod stripe_customer;

pub use reconcile_payment::{Outcome, PaymentWebhookReconciler};
pub use stripe_customer::StripeCustomerService;

use thiserror::Error;

use crate::ports::{ProcessorError, RepositoryError};

#[derive(Error, Debug)]
pub enum UseCaseError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Processor(#[from] ProcessorError),

    #[error("Checkout session {0} has no payment intent")]
    MissingPaymentIntent(String),

    #[error("Unexpected charge status: {0}")]
    UnexpectedChargeStatus(String),
}
