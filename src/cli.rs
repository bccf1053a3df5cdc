use clap::{Parser, Subcommand};
use std::sync::Arc;
use uuid::Uuid;

use crate::adapters::PostgresRegistryRepository;
use crate::config::Config;
use crate::stripe::StripeClient;
use crate::use_cases::StripeCustomerService;

#[derive(Parser)]
#[command(name = "registry-payments")]
#[command(about = "Property registry payments - Stripe webhook reconciler", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Database management commands
    #[command(subcommand)]
    Db(DbCommands),

    /// Stripe customer commands
    #[command(subcommand)]
    Customer(CustomerCommands),

    /// Configuration validation
    Config,
}

#[derive(Subcommand)]
pub enum DbCommands {
    /// Run database migrations
    Migrate,
}

#[derive(Subcommand)]
pub enum CustomerCommands {
    /// Make sure a user has a Stripe customer, creating one if needed
    Ensure {
        /// User UUID
        #[arg(value_name = "USER_ID")]
        user_id: Uuid,
    },
}

pub async fn handle_db_migrate(config: &Config) -> anyhow::Result<()> {
    let pool = crate::db::create_pool(config).await?;

    tracing::info!("Running database migrations...");
    crate::db::run_migrations(&pool).await?;

    tracing::info!("Database migrations completed");
    println!("✓ Database migrations completed");

    Ok(())
}

pub async fn handle_customer_ensure(config: &Config, user_id: Uuid) -> anyhow::Result<()> {
    let pool = crate::db::create_pool(config).await?;
    let repo = Arc::new(PostgresRegistryRepository::new(pool));
    let stripe = Arc::new(StripeClient::new(
        config.stripe_secret_key()?.to_string(),
        config.stripe_api_base.clone(),
    ));

    let service = StripeCustomerService::new(repo, stripe);
    let customer = service.ensure_for_user(user_id).await?;

    println!("✓ User {} has Stripe customer {}", user_id, customer.id);
    Ok(())
}

pub fn handle_config_validate(config: &Config) -> anyhow::Result<()> {
    tracing::info!("Validating configuration...");

    println!("Configuration:");
    println!("  Server Port: {}", config.server_port);
    println!("  Database URL: {}", mask_password(&config.database_url));
    println!("  Database Max Connections: {}", config.database_max_connections);
    println!("  Stripe API Base: {}", config.stripe_api_base);
    let secret_key = config.stripe_secret_key()?;
    let webhook_secret = config.stripe_webhook_secret()?;
    println!("  Stripe Secret Key: {}", mask_secret(secret_key));
    println!("  Stripe Webhook Secret: {}", mask_secret(webhook_secret));
    println!(
        "  Webhook Tolerance: {}s",
        config.stripe_webhook_tolerance_secs
    );
    println!("  Log Format: {:?}", config.log_format);

    if !secret_key.starts_with("sk_") && !secret_key.starts_with("rk_") {
        anyhow::bail!("STRIPE_SECRET_KEY does not look like a Stripe secret or restricted key");
    }
    if !webhook_secret.starts_with("whsec_") {
        anyhow::bail!("STRIPE_WEBHOOK_SECRET does not look like a Stripe endpoint secret");
    }

    tracing::info!("Configuration is valid");
    println!("✓ Configuration is valid");

    Ok(())
}

fn mask_password(url: &str) -> String {
    if let Some(at_pos) = url.rfind('@') {
        if let Some(colon_pos) = url[..at_pos].rfind(':') {
            if let Some(slash_pos) = url[..colon_pos].rfind("//") {
                let prefix = &url[..slash_pos + 2];
                let user = &url[slash_pos + 2..colon_pos];
                let suffix = &url[at_pos..];
                return format!("{}{}:****{}", prefix, user, suffix);
            }
        }
    }
    url.to_string()
}

/// Keeps the key prefix (`sk_test_`, `whsec_`) and hides the rest.
fn mask_secret(secret: &str) -> String {
    match secret.rfind('_') {
        Some(pos) => format!("{}****", &secret[..=pos]),
        None => "****".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_password() {
        assert_eq!(
            mask_password("postgres://registry:hunter2@db:5432/registry"),
            "postgres://registry:****@db:5432/registry"
        );
        assert_eq!(
            mask_password("postgres://localhost/registry"),
            "postgres://localhost/registry"
        );
    }

    #[test]
    fn test_mask_secret_keeps_prefix() {
        assert_eq!(mask_secret("sk_test_abc123"), "sk_test_****");
        assert_eq!(mask_secret("whsec_abc"), "whsec_****");
        assert_eq!(mask_secret("plain"), "****");
    }

    #[test]
    fn test_parse_customer_ensure() {
        let id = Uuid::new_v4();
        let arg = id.to_string();
        let cli =
            Cli::try_parse_from(["registry-payments", "customer", "ensure", arg.as_str()]).unwrap();
        match cli.command {
            Some(Commands::Customer(CustomerCommands::Ensure { user_id })) => assert_eq!(user_id, id),
            _ => panic!("expected customer ensure"),
        }
    }

    #[test]
    fn test_parse_db_migrate() {
        let cli = Cli::try_parse_from(["registry-payments", "db", "migrate"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Db(DbCommands::Migrate))));
    }

    #[test]
    fn test_no_subcommand_defaults_to_none() {
        let cli = Cli::try_parse_from(["registry-payments"]).unwrap();
        assert!(cli.command.is_none());
    }
}
