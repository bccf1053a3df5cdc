use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use registry_payments::adapters::PostgresRegistryRepository;
use registry_payments::cli::{self, Cli, Commands, CustomerCommands, DbCommands};
use registry_payments::config::{Config, LogFormat};
use registry_payments::health::{HealthCheck, HealthMonitor, PostgresChecker, StripeChecker};
use registry_payments::ports::Repositories;
use registry_payments::stripe::{StripeClient, WebhookVerifier};
use registry_payments::use_cases::PaymentWebhookReconciler;
use registry_payments::{create_app, db, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::from_env()?;
    init_tracing(config.log_format);

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::Db(DbCommands::Migrate) => cli::handle_db_migrate(&config).await,
        Commands::Customer(CustomerCommands::Ensure { user_id }) => {
            cli::handle_customer_ensure(&config, user_id).await
        }
        Commands::Config => cli::handle_config_validate(&config),
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let secret_key = config.stripe_secret_key()?.to_string();
    let webhook_secret = config.stripe_webhook_secret()?.to_string();

    // Database pool
    let pool = db::create_pool(&config).await?;

    // Run migrations
    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    let stripe = StripeClient::new(
        secret_key,
        config.stripe_api_base.clone(),
    );
    tracing::info!("Stripe client initialized with API base: {}", config.stripe_api_base);

    let repos = Repositories::from_store(Arc::new(PostgresRegistryRepository::new(pool.clone())));
    let reconciler = PaymentWebhookReconciler::new(repos, Arc::new(stripe.clone()));

    let health = HealthMonitor::new(vec![
        HealthCheck::critical("postgres", Arc::new(PostgresChecker::new(pool))),
        HealthCheck::optional("stripe", Arc::new(StripeChecker::new(stripe))),
    ]);

    let app_state = AppState {
        reconciler: Arc::new(reconciler),
        webhook_verifier: WebhookVerifier::new(
            webhook_secret,
            config.stripe_webhook_tolerance_secs,
        ),
        health,
    };

    let app = create_app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    tracing::info!("listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
