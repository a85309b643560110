use async_trait::async_trait;
use chrono::NaiveDateTime;
use common::domain::{ClientConfig, RawResponse};

/// Everything needed to query one datalogger for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub address: String,
    pub table_name: String,
    pub username: String,
    pub password: String,
    /// Start of the window, the client's `last_fetch`
    pub since: NaiveDateTime,
    /// End of the window, captured once per run and shared by every client
    pub until: NaiveDateTime,
}

impl FetchRequest {
    pub fn for_client(address: &str, client: &ClientConfig, until: NaiveDateTime) -> Self {
        Self {
            address: address.to_string(),
            table_name: client.table_name.clone(),
            username: client.username.clone(),
            password: client.password.clone(),
            since: client.last_fetch,
            until,
        }
    }
}

/// Transport to a datalogger's data query API
///
/// Implementations never fail: transport problems are reported through the
/// status of the returned `RawResponse`.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait DataloggerClient: Send + Sync {
    /// Query the records between `since` and `until`
    async fn query_date_range(&self, request: &FetchRequest) -> RawResponse;

    /// Query every record the logger still holds
    async fn query_since_record(&self, request: &FetchRequest) -> RawResponse;
}
