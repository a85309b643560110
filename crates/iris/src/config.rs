use common::postgres::PostgresConfig;
use config::{Config, ConfigError, Environment};
use datalogger_ingester::FetchTimeouts;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServiceConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    // PostgreSQL configuration
    /// PostgreSQL host
    #[serde(default = "default_postgres_host")]
    pub postgres_host: String,

    /// PostgreSQL port
    #[serde(default = "default_postgres_port")]
    pub postgres_port: u16,

    /// PostgreSQL database name
    #[serde(default = "default_postgres_database")]
    pub postgres_database: String,

    /// PostgreSQL username
    #[serde(default = "default_postgres_username")]
    pub postgres_username: String,

    /// PostgreSQL password
    #[serde(default = "default_postgres_password")]
    pub postgres_password: String,

    /// Maximum pooled PostgreSQL connections
    #[serde(default = "default_postgres_max_pool_size")]
    pub postgres_max_pool_size: usize,

    // Datalogger configuration
    /// Timeout for the date-range query in seconds
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Timeout for the since-record fallback query in seconds
    #[serde(default = "default_fallback_timeout_secs")]
    pub fallback_timeout_secs: u64,

    /// Clients fetched and written at the same time
    #[serde(default = "default_max_concurrent_clients")]
    pub max_concurrent_clients: usize,

    // OpenTelemetry configuration
    /// Export traces and logs over OTLP
    #[serde(default = "default_otel_enabled")]
    pub otel_enabled: bool,

    /// OTLP collector endpoint
    #[serde(default = "default_otel_endpoint")]
    pub otel_endpoint: String,

    /// Service name reported to the collector
    #[serde(default = "default_otel_service_name")]
    pub otel_service_name: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

// PostgreSQL defaults
fn default_postgres_host() -> String {
    "localhost".to_string()
}

fn default_postgres_port() -> u16 {
    5432
}

fn default_postgres_database() -> String {
    "iris".to_string()
}

fn default_postgres_username() -> String {
    "iris".to_string()
}

fn default_postgres_password() -> String {
    "iris".to_string()
}

fn default_postgres_max_pool_size() -> usize {
    4
}

// Datalogger defaults
fn default_fetch_timeout_secs() -> u64 {
    10
}

fn default_fallback_timeout_secs() -> u64 {
    20
}

fn default_max_concurrent_clients() -> usize {
    4
}

// OpenTelemetry defaults
fn default_otel_enabled() -> bool {
    false
}

fn default_otel_endpoint() -> String {
    "http://localhost:4317".to_string()
}

fn default_otel_service_name() -> String {
    "iris".to_string()
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(Environment::with_prefix("IRIS"))
            .build()?
            .try_deserialize()
    }

    /// Apply an env file, whose values win over variables already set, then
    /// read the environment. A missing file is not an error.
    pub fn load(env_file: &Path) -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::from_path_override(env_file) {
            if !e.not_found() {
                return Err(ConfigError::Foreign(Box::new(e)));
            }
        }
        Self::from_env()
    }

    pub fn postgres_config(&self) -> PostgresConfig {
        PostgresConfig {
            host: self.postgres_host.clone(),
            port: self.postgres_port,
            database: self.postgres_database.clone(),
            username: self.postgres_username.clone(),
            password: self.postgres_password.clone(),
            max_pool_size: self.postgres_max_pool_size,
            ..PostgresConfig::default()
        }
    }

    pub fn fetch_timeouts(&self) -> FetchTimeouts {
        FetchTimeouts {
            primary: Duration::from_secs(self.fetch_timeout_secs),
            fallback: Duration::from_secs(self.fallback_timeout_secs),
        }
    }
}
