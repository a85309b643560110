use crate::domain::RecentRecord;
use chrono::NaiveDateTime;
use common::domain::{BatchSink, CheckpointMap, DomainError, FormattedBatch};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// What the persistence stage achieved in one run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteReport {
    /// Newest committed timestamp per client address
    pub checkpoints: CheckpointMap,
    pub rows_inserted: u64,
    /// Addresses whose batch could not be committed
    pub failed: Vec<String>,
}

/// Writes normalized batches and collects checkpoint candidates
pub struct PersistenceWriter {
    sink: Arc<dyn BatchSink>,
    max_concurrent_clients: usize,
}

enum BatchOutcome {
    Committed {
        address: String,
        timestamp: Option<NaiveDateTime>,
        inserted: u64,
    },
    Failed {
        address: String,
    },
}

impl PersistenceWriter {
    pub fn new(sink: Arc<dyn BatchSink>, max_concurrent_clients: usize) -> Self {
        Self {
            sink,
            max_concurrent_clients: max_concurrent_clients.max(1),
        }
    }

    /// Insert every batch, each in its own transaction
    ///
    /// A client only gets a checkpoint candidate when its transaction committed
    /// and its newest row carries a timestamp.
    #[instrument(skip_all, fields(batches = batches.len()))]
    pub async fn write_all(&self, batches: &[FormattedBatch]) -> WriteReport {
        let outcomes: Vec<BatchOutcome> = stream::iter(batches)
            .map(|batch| self.write_batch(batch))
            .buffered(self.max_concurrent_clients)
            .collect()
            .await;

        let mut report = WriteReport::default();
        for outcome in outcomes {
            match outcome {
                BatchOutcome::Committed {
                    address,
                    timestamp,
                    inserted,
                } => {
                    report.rows_inserted += inserted;
                    match timestamp {
                        Some(timestamp) => {
                            report.checkpoints.insert(address, timestamp);
                        }
                        None => {
                            warn!(%address, "committed batch has no record timestamp, checkpoint not advanced");
                        }
                    }
                }
                BatchOutcome::Failed { address } => report.failed.push(address),
            }
        }

        report
    }

    async fn write_batch(&self, batch: &FormattedBatch) -> BatchOutcome {
        let recent = RecentRecord::from_rows(&batch.data);
        let address = recent.address.unwrap_or_else(|| batch.address.clone());

        match self.sink.insert_batch(batch).await {
            Ok(inserted) => {
                info!(
                    %address,
                    table = %batch.db_table,
                    inserted,
                    received = batch.row_count(),
                    "appended datalogger records"
                );
                BatchOutcome::Committed {
                    address,
                    timestamp: recent.timestamp,
                    inserted,
                }
            }
            Err(DomainError::ConnectionError(e)) => {
                error!(
                    %address,
                    table = %batch.db_table,
                    error = %e,
                    "cannot connect to postgres, check connection credentials"
                );
                BatchOutcome::Failed { address }
            }
            Err(e) => {
                error!(%address, table = %batch.db_table, error = %e, "failed to append batch");
                BatchOutcome::Failed { address }
            }
        }
    }
}
