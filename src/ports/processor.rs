//! Payment processor port.
//!
//! Object shapes follow the Stripe API so the HTTP client can deserialize
//! straight into them; only the fields the reconciler reads are modelled.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("{resource} not found: {id}")]
    NotFound { resource: &'static str, id: String },

    #[error("Processor API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Processor request failed: {0}")]
    Transport(String),

    #[error("Invalid response from processor: {0}")]
    InvalidResponse(String),

    #[error("Circuit breaker open: {0}")]
    CircuitBreakerOpen(String),
}

pub type ProcessorResult<T> = Result<T, ProcessorError>;

/// Checkout session as delivered in a webhook's `data.object`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub payment_intent: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub latest_charge: Option<String>,
    #[serde(default)]
    pub last_payment_error: Option<PaymentError>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Charge {
    pub id: String,
    /// `succeeded`, `pending` or `failed`.
    pub status: String,
    #[serde(default)]
    pub payment_method_details: Option<PaymentMethodDetails>,
}

impl Charge {
    pub fn card(&self) -> Option<&CardDetails> {
        self.payment_method_details
            .as_ref()
            .and_then(|details| details.card.as_ref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentMethodDetails {
    #[serde(default)]
    pub card: Option<CardDetails>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CardDetails {
    pub brand: String,
    pub last4: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub deleted: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCustomer {
    pub email: String,
    pub name: String,
}

/// Capabilities the service needs from the payment processor.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    async fn retrieve_payment_intent(&self, id: &str) -> ProcessorResult<PaymentIntent>;

    async fn retrieve_charge(&self, id: &str) -> ProcessorResult<Charge>;

    async fn retrieve_customer(&self, id: &str) -> ProcessorResult<Customer>;

    async fn create_customer(&self, customer: &NewCustomer) -> ProcessorResult<Customer>;
}
