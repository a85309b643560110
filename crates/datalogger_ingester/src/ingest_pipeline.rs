use crate::domain::{normalize_all, CheckpointUpdater, DataloggerClient, FetchService, PersistenceWriter};
use chrono::{Local, NaiveDateTime};
use common::domain::{BatchSink, FetchStatus};
use common::registry::RegistryFile;
use std::sync::Arc;
use tracing::{info, instrument};

/// Counters for one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub clients: usize,
    /// Registry entries that could not be read as a client
    pub skipped_clients: usize,
    pub fetched: usize,
    pub unreachable: usize,
    pub batches: usize,
    pub rows_inserted: u64,
    pub failed_writes: usize,
    pub checkpoints_advanced: usize,
}

/// One fetch → normalize → append → checkpoint pass over the client registry
///
/// Stages run one after another. Inside the fetch and append stages clients
/// are processed concurrently, at most `max_concurrent_clients` at a time, and
/// share nothing but the window end captured at the start of the run.
pub struct IngestPipeline {
    fetch_service: FetchService,
    writer: PersistenceWriter,
}

impl IngestPipeline {
    pub fn new(
        datalogger_client: Arc<dyn DataloggerClient>,
        sink: Arc<dyn BatchSink>,
        max_concurrent_clients: usize,
    ) -> Self {
        Self {
            fetch_service: FetchService::new(datalogger_client, max_concurrent_clients),
            writer: PersistenceWriter::new(sink, max_concurrent_clients),
        }
    }

    /// Run with the window ending now, local time
    pub async fn run(&self, registry_file: RegistryFile) -> anyhow::Result<RunSummary> {
        self.run_until(registry_file, Local::now().naive_local()).await
    }

    /// Run with an explicit window end
    ///
    /// Only loading or rewriting the registry can fail; every per-client
    /// failure, including an unreadable registry entry, is logged and leaves
    /// that client's watermark where it was.
    #[instrument(skip_all, fields(registry = %registry_file.path().display(), until = %until))]
    pub async fn run_until(
        &self,
        registry_file: RegistryFile,
        until: NaiveDateTime,
    ) -> anyhow::Result<RunSummary> {
        let mut registry = registry_file.load()?;
        let skipped_clients = registry.unparsed().count();
        info!(clients = registry.len(), skipped_clients, "starting datalogger run");

        let responses = self.fetch_service.fetch_all(&registry, until).await;
        let batches = normalize_all(&responses, &registry);
        let report = self.writer.write_all(&batches).await;

        let advanced =
            CheckpointUpdater::new(registry_file).commit(&mut registry, &report.checkpoints)?;

        let summary = RunSummary {
            clients: registry.len(),
            skipped_clients,
            fetched: responses
                .values()
                .filter(|response| response.fetch_status.is_success())
                .count(),
            unreachable: responses
                .values()
                .filter(|response| response.fetch_status == FetchStatus::Unreachable)
                .count(),
            batches: batches.len(),
            rows_inserted: report.rows_inserted,
            failed_writes: report.failed.len(),
            checkpoints_advanced: advanced.len(),
        };

        info!(
            clients = summary.clients,
            skipped_clients = summary.skipped_clients,
            fetched = summary.fetched,
            unreachable = summary.unreachable,
            batches = summary.batches,
            rows_inserted = summary.rows_inserted,
            failed_writes = summary.failed_writes,
            checkpoints_advanced = summary.checkpoints_advanced,
            "datalogger run complete"
        );

        Ok(summary)
    }
}
