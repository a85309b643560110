use crate::domain::{BatchSink, DomainError, DomainResult, FormattedBatch};
use crate::postgres::PostgresClient;
use async_trait::async_trait;
use tokio_postgres::error::SqlState;
use tokio_postgres::types::ToSql;
use tracing::{debug, instrument};

/// Columns of the per-client unique constraint that makes inserts idempotent
pub const CONFLICT_COLUMNS: [&str; 3] = ["timestamp", "site", "record"];

/// Quote an SQL identifier, doubling any embedded quotes
pub fn quote_identifier(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

/// Build the parameterized insert for one client table
///
/// Each row gets a generated uuid; rows that already exist for the same
/// (timestamp, site, record) are skipped.
pub fn build_insert_statement(table: &str, columns: &[String]) -> String {
    let column_list = columns
        .iter()
        .map(|column| quote_identifier(column))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = (1..=columns.len())
        .map(|index| format!("${}", index))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "INSERT INTO {} (uuid, {}) VALUES (uuid_generate_v4(), {}) ON CONFLICT ({}) DO NOTHING",
        quote_identifier(table),
        column_list,
        placeholders,
        CONFLICT_COLUMNS.join(", "),
    )
}

/// Connection-level failures (lost connection, rejected credentials) versus
/// everything else the database can report
fn classify_postgres_error(error: tokio_postgres::Error) -> DomainError {
    let connection_failure = error.is_closed()
        || error.code().is_some_and(|code| {
            code == &SqlState::INVALID_PASSWORD
                || code == &SqlState::INVALID_AUTHORIZATION_SPECIFICATION
                || code.code().starts_with("08")
        });

    if connection_failure {
        DomainError::ConnectionError(error.into())
    } else {
        DomainError::RepositoryError(error.into())
    }
}

/// PostgreSQL implementation of BatchSink
#[derive(Clone)]
pub struct PostgresBatchRepository {
    client: PostgresClient,
}

impl PostgresBatchRepository {
    pub fn new(client: PostgresClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BatchSink for PostgresBatchRepository {
    #[instrument(skip(self, batch), fields(address = %batch.address, table = %batch.db_table, rows = batch.row_count()))]
    async fn insert_batch(&self, batch: &FormattedBatch) -> DomainResult<u64> {
        if !batch.is_consistent() {
            return Err(DomainError::InconsistentBatch {
                table: batch.db_table.clone(),
                reason: format!("rows do not all have {} values", batch.col_names.len()),
            });
        }

        let mut conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::ConnectionError)?;

        let transaction = conn.transaction().await.map_err(classify_postgres_error)?;

        let query = build_insert_statement(&batch.db_table, &batch.col_names);
        let statement = transaction
            .prepare(&query)
            .await
            .map_err(classify_postgres_error)?;

        let mut inserted = 0;
        for row in &batch.data {
            let params: Vec<&(dyn ToSql + Sync)> =
                row.iter().map(|cell| cell as &(dyn ToSql + Sync)).collect();
            inserted += transaction
                .execute(&statement, &params)
                .await
                .map_err(classify_postgres_error)?;
        }

        transaction.commit().await.map_err(classify_postgres_error)?;

        debug!(inserted, skipped = batch.data.len() as u64 - inserted, "committed batch");

        Ok(inserted)
    }
}
