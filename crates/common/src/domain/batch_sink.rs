use crate::domain::{DomainResult, FormattedBatch};
use async_trait::async_trait;

/// Transactional destination for normalized batches
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait BatchSink: Send + Sync {
    /// Insert every row of the batch in a single transaction
    ///
    /// Rows that collide with an existing (timestamp, site, record) are skipped.
    /// Returns the number of rows actually inserted.
    async fn insert_batch(&self, batch: &FormattedBatch) -> DomainResult<u64>;
}
