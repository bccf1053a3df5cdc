pub mod adapters;
pub mod cli;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod health;
pub mod middleware;
pub mod ports;
pub mod stripe;
pub mod use_cases;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::health::HealthMonitor;
use crate::stripe::WebhookVerifier;
use crate::use_cases::PaymentWebhookReconciler;

#[derive(Clone)]
pub struct AppState {
    pub reconciler: Arc<PaymentWebhookReconciler>,
    pub webhook_verifier: WebhookVerifier,
    pub health: HealthMonitor,
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/webhooks/stripe", post(handlers::webhook::stripe_webhook))
        .layer(axum::middleware::from_fn(
            middleware::request_logger_middleware,
        ))
        .with_state(state)
}
