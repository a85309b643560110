use crate::domain::{DataloggerClient, FetchRequest};
use chrono::NaiveDateTime;
use common::domain::{ClientRegistry, FetchStatus, RawResponse, RawResponses};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Line count of a date-range response that carries only the TOA5 header.
///
/// Some CR6 firmware answers a date-range query with the four header lines and
/// no data even though records exist in the window. The only dependable way to
/// get the data on those loggers is a since-record query for the full history.
/// Whether every firmware version behaves this way is unconfirmed.
pub const EMPTY_WINDOW_LINE_COUNT: usize = 4;

/// Polls every registered datalogger once per run
pub struct FetchService {
    client: Arc<dyn DataloggerClient>,
    max_concurrent_clients: usize,
}

impl FetchService {
    pub fn new(client: Arc<dyn DataloggerClient>, max_concurrent_clients: usize) -> Self {
        Self {
            client,
            max_concurrent_clients: max_concurrent_clients.max(1),
        }
    }

    /// Fetch every client in the registry, keyed by address in registry order
    #[instrument(skip_all, fields(clients = registry.len(), until = %until))]
    pub async fn fetch_all(&self, registry: &ClientRegistry, until: NaiveDateTime) -> RawResponses {
        let requests: Vec<FetchRequest> = registry
            .iter()
            .map(|(address, client)| FetchRequest::for_client(address, client, until))
            .collect();

        stream::iter(requests)
            .map(|request| async move {
                let response = self.fetch_client(&request).await;
                (request.address, response)
            })
            .buffered(self.max_concurrent_clients)
            .collect()
            .await
    }

    /// Primary date-range query, with the since-record fallback for header-only answers
    pub async fn fetch_client(&self, request: &FetchRequest) -> RawResponse {
        let primary = self.client.query_date_range(request).await;

        let response = if primary.line_count() == EMPTY_WINDOW_LINE_COUNT {
            debug!(
                address = %request.address,
                "date-range query returned headers only, falling back to since-record"
            );
            self.client.query_since_record(request).await
        } else {
            primary
        };

        match response.fetch_status {
            FetchStatus::Http(200) => {
                info!(
                    address = %request.address,
                    lines = response.line_count(),
                    "fetched datalogger data"
                );
            }
            status => {
                warn!(address = %request.address, %status, "datalogger fetch failed");
            }
        }

        response.without_error_body()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MockDataloggerClient;
    use common::domain::{CellValue, ClientConfig};
    use indexmap::IndexMap;

    const HEADER_ONLY: &str = "\"TOA5\",\"CR6Lake\"\r\n\
                               \"TIMESTAMP\",\"RECORD\"\r\n\
                               \"TS\",\"RN\"\r\n\
                               \"\",\"\"\r\n";

    const WITH_DATA: &str = "\"TOA5\",\"CR6Lake\"\r\n\
                             \"TIMESTAMP\",\"RECORD\"\r\n\
                             \"TS\",\"RN\"\r\n\
                             \"\",\"\"\r\n\
                             \"2024-01-02 00:00:00\",7\r\n";

    fn timestamp(value: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S").unwrap()
    }

    fn request() -> FetchRequest {
        FetchRequest {
            address: "10.0.0.5".to_string(),
            table_name: "Profile".to_string(),
            username: "admin".to_string(),
            password: "secret".to_string(),
            since: timestamp("2024-01-01T00:00:00"),
            until: timestamp("2024-01-03T00:00:00"),
        }
    }

    fn client_config(last_fetch: &str) -> ClientConfig {
        ClientConfig {
            table_name: "Profile".to_string(),
            db_table: "lake_profiler".to_string(),
            username: "admin".to_string(),
            password: "secret".to_string(),
            site: "Lake Mendota".to_string(),
            latitude: CellValue::Float(43.0999),
            longitude: CellValue::Float(-89.4045),
            last_fetch: timestamp(last_fetch),
            extra: IndexMap::new(),
        }
    }

    #[tokio::test]
    async fn test_header_only_response_triggers_fallback() {
        let mut mock_client = MockDataloggerClient::new();
        mock_client
            .expect_query_date_range()
            .times(1)
            .returning(|_| RawResponse::new(FetchStatus::Http(200), HEADER_ONLY));
        mock_client
            .expect_query_since_record()
            .times(1)
            .returning(|_| RawResponse::new(FetchStatus::Http(200), WITH_DATA));

        let service = FetchService::new(Arc::new(mock_client), 1);
        let response = service.fetch_client(&request()).await;

        assert_eq!(response.payload, WITH_DATA);
    }

    #[tokio::test]
    async fn test_response_with_data_skips_fallback() {
        let mut mock_client = MockDataloggerClient::new();
        mock_client
            .expect_query_date_range()
            .times(1)
            .returning(|_| RawResponse::new(FetchStatus::Http(200), WITH_DATA));
        mock_client.expect_query_since_record().times(0);

        let service = FetchService::new(Arc::new(mock_client), 1);
        let response = service.fetch_client(&request()).await;

        assert_eq!(response.fetch_status, FetchStatus::Http(200));
        assert_eq!(response.payload, WITH_DATA);
    }

    #[tokio::test]
    async fn test_fallback_failure_is_reported() {
        let mut mock_client = MockDataloggerClient::new();
        mock_client
            .expect_query_date_range()
            .returning(|_| RawResponse::new(FetchStatus::Http(200), HEADER_ONLY));
        mock_client
            .expect_query_since_record()
            .returning(|_| RawResponse::unreachable());

        let service = FetchService::new(Arc::new(mock_client), 1);
        let response = service.fetch_client(&request()).await;

        assert_eq!(response.fetch_status, FetchStatus::Unreachable);
        assert!(response.payload.is_empty());
    }

    #[tokio::test]
    async fn test_error_status_drops_body() {
        let mut mock_client = MockDataloggerClient::new();
        mock_client
            .expect_query_date_range()
            .returning(|_| RawResponse::new(FetchStatus::Http(401), "Unauthorized\r\n"));

        let service = FetchService::new(Arc::new(mock_client), 1);
        let response = service.fetch_client(&request()).await;

        assert_eq!(response.fetch_status, FetchStatus::Http(401));
        assert!(response.payload.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_all_uses_each_watermark_and_shared_window_end() {
        let until = timestamp("2024-01-03T00:00:00");
        let mut clients = IndexMap::new();
        clients.insert("10.0.0.5".to_string(), client_config("2024-01-01T00:00:00"));
        clients.insert("10.0.0.2".to_string(), client_config("2023-06-01T00:00:00"));
        let registry = ClientRegistry::new(clients);

        let mut mock_client = MockDataloggerClient::new();
        mock_client
            .expect_query_date_range()
            .times(2)
            .withf(move |request| {
                request.until == until
                    && match request.address.as_str() {
                        "10.0.0.5" => request.since == timestamp("2024-01-01T00:00:00"),
                        "10.0.0.2" => request.since == timestamp("2023-06-01T00:00:00"),
                        _ => false,
                    }
            })
            .returning(|request| match request.address.as_str() {
                "10.0.0.5" => RawResponse::new(FetchStatus::Http(200), WITH_DATA),
                _ => RawResponse::unreachable(),
            });

        let service = FetchService::new(Arc::new(mock_client), 4);
        let responses = service.fetch_all(&registry, until).await;

        let addresses: Vec<&String> = responses.keys().collect();
        assert_eq!(addresses, vec!["10.0.0.5", "10.0.0.2"]);
        assert_eq!(responses["10.0.0.5"].payload, WITH_DATA);
        assert_eq!(responses["10.0.0.2"].fetch_status, FetchStatus::Unreachable);
    }
}
