mod config;
mod telemetry;

use clap::Parser;
use common::postgres::{PostgresBatchRepository, PostgresClient};
use common::registry::RegistryFile;
use config::ServiceConfig;
use datalogger_ingester::{HttpDataloggerClient, IngestPipeline};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use telemetry::{init_telemetry, shutdown_telemetry};
use tracing::{debug, error, info, warn};

/// Concentrator, broker, and appender of Campbell datalogger data to Postgres
#[derive(Debug, Parser)]
#[command(name = "iris", version, about)]
struct Cli {
    /// JSON client registry, rewritten with advanced `last_fetch` values
    client_file: PathBuf,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match ServiceConfig::load(Path::new(".env")) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let telemetry_providers = match init_telemetry(&config) {
        Ok(providers) => providers,
        Err(e) => {
            eprintln!("Failed to initialize telemetry: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        client_file = %cli.client_file.display(),
        otel_enabled = config.otel_enabled,
        "Starting iris datalogger run"
    );
    debug!(
        postgres_host = %config.postgres_host,
        postgres_database = %config.postgres_database,
        max_concurrent_clients = config.max_concurrent_clients,
        "Configuration loaded"
    );

    let exit_code = match run(&cli, &config).await {
        Ok(()) => 0,
        Err(e) => {
            error!(error = %format!("{:#}", e), "iris run failed");
            1
        }
    };

    shutdown_telemetry(telemetry_providers);
    std::process::exit(exit_code);
}

async fn run(cli: &Cli, config: &ServiceConfig) -> anyhow::Result<()> {
    let postgres_client = PostgresClient::new(&config.postgres_config())?;
    if let Err(e) = postgres_client.ping().await {
        // Every batch will fail the same way and be logged; watermarks stay put
        warn!(error = %e, "cannot connect to postgres, check connection credentials");
    }

    let sink = Arc::new(PostgresBatchRepository::new(postgres_client));
    let datalogger_client = Arc::new(HttpDataloggerClient::new(config.fetch_timeouts())?);

    let pipeline = IngestPipeline::new(datalogger_client, sink, config.max_concurrent_clients);
    let summary = pipeline
        .run(RegistryFile::new(cli.client_file.clone()))
        .await?;

    info!(
        rows_inserted = summary.rows_inserted,
        checkpoints_advanced = summary.checkpoints_advanced,
        "iris run finished"
    );
    Ok(())
}
