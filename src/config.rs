use anyhow::Result;
use dotenvy::dotenv;
use serde::Deserialize;
use std::env;

use crate::stripe::{signature::DEFAULT_TOLERANCE_SECS, DEFAULT_API_BASE};

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server_port: u16,
    pub database_url: String,
    pub database_max_connections: u32,
    stripe_secret_key: Option<String>,
    stripe_webhook_secret: Option<String>,
    pub stripe_api_base: String,
    pub stripe_webhook_tolerance_secs: i64,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok(); // Load .env file if present
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup, so tests don't touch the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let present = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required =
            |key: &str| present(key).ok_or_else(|| anyhow::anyhow!("{} must be set", key));

        Ok(Config {
            server_port: lookup("SERVER_PORT")
                .unwrap_or_else(|| "3000".to_string())
                .parse()?,
            database_url: required("DATABASE_URL")?,
            database_max_connections: lookup("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|| "5".to_string())
                .parse()?,
            stripe_secret_key: present("STRIPE_SECRET_KEY"),
            stripe_webhook_secret: present("STRIPE_WEBHOOK_SECRET"),
            stripe_api_base: lookup("STRIPE_API_BASE")
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            stripe_webhook_tolerance_secs: match lookup("STRIPE_WEBHOOK_TOLERANCE_SECS") {
                Some(raw) => raw.parse()?,
                None => DEFAULT_TOLERANCE_SECS,
            },
            log_format: parse_log_format(lookup("LOG_FORMAT").as_deref().unwrap_or("text"))?,
        })
    }

    /// Checked on use; only the commands that talk to Stripe need it.
    pub fn stripe_secret_key(&self) -> Result<&str> {
        self.stripe_secret_key
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("STRIPE_SECRET_KEY must be set"))
    }

    pub fn stripe_webhook_secret(&self) -> Result<&str> {
        self.stripe_webhook_secret
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("STRIPE_WEBHOOK_SECRET must be set"))
    }
}

fn parse_log_format(raw: &str) -> Result<LogFormat> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "text" | "" => Ok(LogFormat::Text),
        "json" => Ok(LogFormat::Json),
        other => anyhow::bail!("LOG_FORMAT must be 'text' or 'json', got '{}'", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: &[(&str, &str)] = &[
        ("DATABASE_URL", "postgres://localhost/registry"),
        ("STRIPE_SECRET_KEY", "sk_test_1"),
        ("STRIPE_WEBHOOK_SECRET", "whsec_1"),
    ];

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_lookup(lookup_from(REQUIRED)).unwrap();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.database_max_connections, 5);
        assert_eq!(config.stripe_api_base, "https://api.stripe.com");
        assert_eq!(config.stripe_webhook_tolerance_secs, 300);
        assert_eq!(config.log_format, LogFormat::Text);
    }

    #[test]
    fn test_missing_webhook_secret_fails_on_use() {
        let config = Config::from_lookup(lookup_from(&REQUIRED[..2])).unwrap();
        assert_eq!(config.stripe_secret_key().unwrap(), "sk_test_1");
        let err = config.stripe_webhook_secret().unwrap_err();
        assert!(err.to_string().contains("STRIPE_WEBHOOK_SECRET"));
    }

    #[test]
    fn test_database_only_config_loads() {
        let config =
            Config::from_lookup(lookup_from(&[("DATABASE_URL", "postgres://localhost/registry")]))
                .unwrap();
        assert_eq!(config.database_url, "postgres://localhost/registry");
        assert!(config.stripe_secret_key().is_err());
    }

    #[test]
    fn test_missing_database_url_fails() {
        let err = Config::from_lookup(lookup_from(&REQUIRED[1..])).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn test_blank_secret_counts_as_missing() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("STRIPE_SECRET_KEY", "  "));
        let config = Config::from_lookup(lookup_from(&pairs)).unwrap();
        assert!(config.stripe_secret_key().is_err());
    }

    #[test]
    fn test_overrides() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend_from_slice(&[
            ("SERVER_PORT", "8080"),
            ("STRIPE_API_BASE", "http://localhost:12111"),
            ("STRIPE_WEBHOOK_TOLERANCE_SECS", "60"),
            ("LOG_FORMAT", "JSON"),
        ]);
        let config = Config::from_lookup(lookup_from(&pairs)).unwrap();
        assert_eq!(config.server_port, 8080);
        assert_eq!(config.stripe_api_base, "http://localhost:12111");
        assert_eq!(config.stripe_webhook_tolerance_secs, 60);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_invalid_log_format() {
        assert!(parse_log_format("yaml").is_err());
    }
}
