use async_trait::async_trait;
use failsafe::futures::CircuitBreaker as FuturesCircuitBreaker;
use failsafe::{backoff, failure_policy, Config, Error as FailsafeError, StateMachine};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use crate::ports::{
    Charge, Customer, NewCustomer, PaymentIntent, PaymentProcessor, ProcessorError,
    ProcessorResult,
};

pub const DEFAULT_API_BASE: &str = "https://api.stripe.com";

impl From<reqwest::Error> for ProcessorError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ProcessorError::InvalidResponse(e.to_string())
        } else {
            ProcessorError::Transport(e.to_string())
        }
    }
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    #[serde(default)]
    message: Option<String>,
}

/// HTTP client for the Stripe REST API
#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    base_url: String,
    secret_key: String,
    circuit_breaker: StateMachine<failure_policy::ConsecutiveFailures<backoff::EqualJittered>, ()>,
}

impl StripeClient {
    /// Creates a client with the default breaker: 3 consecutive outages open it
    /// for 60-120 seconds.
    pub fn new(secret_key: String, base_url: String) -> Self {
        Self::with_circuit_breaker(secret_key, base_url, 3, 60)
    }

    pub fn with_circuit_breaker(
        secret_key: String,
        base_url: String,
        failure_threshold: u32,
        reset_timeout_secs: u64,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        let backoff = backoff::equal_jittered(
            Duration::from_secs(reset_timeout_secs),
            Duration::from_secs(reset_timeout_secs * 2),
        );
        let policy = failure_policy::consecutive_failures(failure_threshold, backoff);
        let circuit_breaker = Config::new().failure_policy(policy).build();

        StripeClient {
            client,
            base_url,
            secret_key,
            circuit_breaker,
        }
    }

    /// Returns the current state of the circuit breaker
    pub fn circuit_state(&self) -> String {
        if self.circuit_breaker.is_call_permitted() {
            "closed".to_string()
        } else {
            "open".to_string()
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn send<T>(
        &self,
        request: RequestBuilder,
        resource: &'static str,
        id: String,
    ) -> ProcessorResult<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let request = request.basic_auth(&self.secret_key, None::<&str>);

        let result = self
            .circuit_breaker
            .call_with(is_outage, async move {
                let response = request.send().await?;
                read_json::<T>(response, resource, id).await
            })
            .await;

        match result {
            Ok(value) => Ok(value),
            Err(FailsafeError::Rejected) => Err(ProcessorError::CircuitBreakerOpen(
                "Stripe API circuit breaker is open".to_string(),
            )),
            Err(FailsafeError::Inner(e)) => Err(e),
        }
    }
}

#[async_trait]
impl PaymentProcessor for StripeClient {
    async fn retrieve_payment_intent(&self, id: &str) -> ProcessorResult<PaymentIntent> {
        let request = self.client.get(self.url(&format!("payment_intents/{}", id)));
        self.send(request, "payment_intent", id.to_string()).await
    }

    async fn retrieve_charge(&self, id: &str) -> ProcessorResult<Charge> {
        let request = self.client.get(self.url(&format!("charges/{}", id)));
        self.send(request, "charge", id.to_string()).await
    }

    async fn retrieve_customer(&self, id: &str) -> ProcessorResult<Customer> {
        let request = self.client.get(self.url(&format!("customers/{}", id)));
        self.send(request, "customer", id.to_string()).await
    }

    async fn create_customer(&self, customer: &NewCustomer) -> ProcessorResult<Customer> {
        let request = self.client.post(self.url("customers")).form(&[
            ("email", customer.email.as_str()),
            ("name", customer.name.as_str()),
        ]);
        self.send(request, "customer", customer.email.clone()).await
    }
}

async fn read_json<T: DeserializeOwned>(
    response: reqwest::Response,
    resource: &'static str,
    id: String,
) -> ProcessorResult<T> {
    let status = response.status();

    if status == StatusCode::NOT_FOUND {
        return Err(ProcessorError::NotFound { resource, id });
    }

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<StripeErrorBody>(&body)
            .ok()
            .and_then(|b| b.error.message)
            .unwrap_or(body);
        return Err(ProcessorError::Api {
            status: status.as_u16(),
            message,
        });
    }

    Ok(response.json::<T>().await?)
}

/// Only outages count against the breaker; a 4xx is the caller's problem.
fn is_outage(err: &ProcessorError) -> bool {
    match err {
        ProcessorError::Transport(_) | ProcessorError::InvalidResponse(_) => true,
        ProcessorError::Api { status, .. } => *status >= 500,
        ProcessorError::NotFound { .. } | ProcessorError::CircuitBreakerOpen(_) => false,
    }
}
