use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;

use crate::stripe::StripeClient;

const CHECK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub dependencies: HashMap<String, DependencyStatus>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DependencyStatus {
    Healthy { status: String, latency_ms: u64 },
    Unhealthy { status: String, error: String },
}

impl DependencyStatus {
    fn healthy(start: Instant) -> Self {
        DependencyStatus::Healthy {
            status: "healthy".to_string(),
            latency_ms: start.elapsed().as_millis() as u64,
        }
    }

    fn unhealthy(error: impl Into<String>) -> Self {
        DependencyStatus::Unhealthy {
            status: "unhealthy".to_string(),
            error: error.into(),
        }
    }
}

#[async_trait]
pub trait DependencyChecker: Send + Sync {
    async fn check(&self) -> DependencyStatus;
}

pub struct PostgresChecker {
    pool: sqlx::PgPool,
}

impl PostgresChecker {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DependencyChecker for PostgresChecker {
    async fn check(&self) -> DependencyStatus {
        let start = Instant::now();
        match sqlx::query("SELECT 1").execute(&self.pool).await {
            Ok(_) => DependencyStatus::healthy(start),
            Err(e) => DependencyStatus::unhealthy(e.to_string()),
        }
    }
}

/// Reports the Stripe client's circuit breaker without calling Stripe.
pub struct StripeChecker {
    client: StripeClient,
}

impl StripeChecker {
    pub fn new(client: StripeClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DependencyChecker for StripeChecker {
    async fn check(&self) -> DependencyStatus {
        let start = Instant::now();
        match self.client.circuit_state().as_str() {
            "closed" => DependencyStatus::healthy(start),
            state => DependencyStatus::unhealthy(format!("circuit breaker {}", state)),
        }
    }
}

pub struct HealthCheck {
    name: String,
    critical: bool,
    checker: Arc<dyn DependencyChecker>,
}

impl HealthCheck {
    /// A failing critical dependency makes the whole service unhealthy.
    pub fn critical(name: impl Into<String>, checker: Arc<dyn DependencyChecker>) -> Self {
        Self {
            name: name.into(),
            critical: true,
            checker,
        }
    }

    /// A failing optional dependency only degrades the service.
    pub fn optional(name: impl Into<String>, checker: Arc<dyn DependencyChecker>) -> Self {
        Self {
            name: name.into(),
            critical: false,
            checker,
        }
    }
}

/// Set of dependency checks behind `GET /health`.
#[derive(Clone)]
pub struct HealthMonitor {
    checks: Arc<Vec<HealthCheck>>,
    started_at: Instant,
}

impl Default for HealthMonitor {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl HealthMonitor {
    pub fn new(checks: Vec<HealthCheck>) -> Self {
        Self {
            checks: Arc::new(checks),
            started_at: Instant::now(),
        }
    }

    pub async fn report(&self) -> HealthResponse {
        let results = join_all(self.checks.iter().map(|c| async move {
            let status = timeout(CHECK_TIMEOUT, c.checker.check())
                .await
                .unwrap_or_else(|_| DependencyStatus::unhealthy("timeout"));
            (c, status)
        }))
        .await;

        let mut has_critical_failure = false;
        let mut has_non_critical_failure = false;
        let mut dependencies = HashMap::new();

        for (check, status) in results {
            if matches!(status, DependencyStatus::Unhealthy { .. }) {
                if check.critical {
                    has_critical_failure = true;
                } else {
                    has_non_critical_failure = true;
                }
            }
            dependencies.insert(check.name.clone(), status);
        }

        let status = if has_critical_failure {
            "unhealthy"
        } else if has_non_critical_failure {
            "degraded"
        } else {
            "healthy"
        };

        HealthResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.started_at.elapsed().as_secs(),
            dependencies,
        }
    }
}
