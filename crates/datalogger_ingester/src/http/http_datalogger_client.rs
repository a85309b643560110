use crate::domain::{DataloggerClient, FetchRequest};
use crate::http::{data_query_url, QueryMode};
use async_trait::async_trait;
use common::domain::{FetchStatus, RawResponse};
use std::time::Duration;
use tracing::{debug, instrument};

/// Request timeouts for the two query kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTimeouts {
    /// Date-range query
    pub primary: Duration,
    /// Full-history since-record query, which returns much more data
    pub fallback: Duration,
}

impl Default for FetchTimeouts {
    fn default() -> Self {
        Self {
            primary: Duration::from_secs(10),
            fallback: Duration::from_secs(20),
        }
    }
}

/// Map a reqwest failure onto the fetch status taxonomy
pub fn classify_transport_error(error: &reqwest::Error) -> FetchStatus {
    if error.is_connect() || error.is_timeout() || error.is_request() {
        FetchStatus::Unreachable
    } else {
        FetchStatus::Unknown
    }
}

/// Datalogger client over the Campbell csapi web API, HTTP basic auth
#[derive(Clone)]
pub struct HttpDataloggerClient {
    http: reqwest::Client,
    timeouts: FetchTimeouts,
}

impl HttpDataloggerClient {
    pub fn new(timeouts: FetchTimeouts) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self { http, timeouts })
    }

    async fn get(&self, url: &str, request: &FetchRequest, timeout: Duration) -> RawResponse {
        let result = async {
            let response = self
                .http
                .get(url)
                .basic_auth(&request.username, Some(&request.password))
                .timeout(timeout)
                .send()
                .await?;
            let status = response.status().as_u16();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>((status, body))
        }
        .await;

        match result {
            Ok((status, body)) => RawResponse::new(FetchStatus::Http(status), body),
            Err(e) => {
                let status = classify_transport_error(&e);
                debug!(address = %request.address, %status, error = %e, "datalogger request failed");
                RawResponse::new(status, String::new())
            }
        }
    }
}

#[async_trait]
impl DataloggerClient for HttpDataloggerClient {
    #[instrument(skip(self, request), fields(address = %request.address, table = %request.table_name))]
    async fn query_date_range(&self, request: &FetchRequest) -> RawResponse {
        let url = data_query_url(
            &request.address,
            &request.table_name,
            QueryMode::DateRange {
                start: request.since,
                end: request.until,
            },
        );
        self.get(&url, request, self.timeouts.primary).await
    }

    #[instrument(skip(self, request), fields(address = %request.address, table = %request.table_name))]
    async fn query_since_record(&self, request: &FetchRequest) -> RawResponse {
        let url = data_query_url(
            &request.address,
            &request.table_name,
            QueryMode::SinceRecord { record: 0 },
        );
        self.get(&url, request, self.timeouts.fallback).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use std::net::TcpListener;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn timestamp(value: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S").unwrap()
    }

    fn request(address: String) -> FetchRequest {
        FetchRequest {
            address,
            table_name: "Profile".to_string(),
            username: "user".to_string(),
            password: "pass".to_string(),
            since: timestamp("2024-01-01T00:00:00"),
            until: timestamp("2024-01-03T00:00:00"),
        }
    }

    fn client() -> HttpDataloggerClient {
        HttpDataloggerClient::new(FetchTimeouts {
            primary: Duration::from_millis(500),
            fallback: Duration::from_millis(500),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_date_range_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/csapi/"))
            .and(query_param("command", "DataQuery"))
            .and(query_param("mode", "date-range"))
            .and(query_param("format", "toa5"))
            .and(query_param("uri", "dl:Profile"))
            .and(query_param("p1", "2024-01-01T00:00:00"))
            .and(query_param("p2", "2024-01-03T00:00:00"))
            .and(header("authorization", "Basic dXNlcjpwYXNz"))
            .respond_with(ResponseTemplate::new(200).set_body_string("line1\r\nline2\r\n"))
            .expect(1)
            .mount(&server)
            .await;

        let response = client()
            .query_date_range(&request(server.address().to_string()))
            .await;

        assert_eq!(response.fetch_status, FetchStatus::Http(200));
        assert_eq!(response.payload, "line1\r\nline2\r\n");
    }

    #[tokio::test]
    async fn test_since_record_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/csapi/"))
            .and(query_param("mode", "since-record"))
            .and(query_param("p1", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_string("all data"))
            .expect(1)
            .mount(&server)
            .await;

        let response = client()
            .query_since_record(&request(server.address().to_string()))
            .await;

        assert_eq!(response.payload, "all data");
    }

    #[tokio::test]
    async fn test_http_error_status_is_kept() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("denied"))
            .mount(&server)
            .await;

        let response = client()
            .query_date_range(&request(server.address().to_string()))
            .await;

        assert_eq!(response.fetch_status, FetchStatus::Http(401));
    }

    #[tokio::test]
    async fn test_connection_refused_is_unreachable() {
        // Bind then drop to get a local port nothing listens on
        let address = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .to_string();

        let response = client().query_date_range(&request(address)).await;

        assert_eq!(response.fetch_status, FetchStatus::Unreachable);
        assert!(response.payload.is_empty());
    }

    #[tokio::test]
    async fn test_slow_logger_times_out_as_unreachable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let response = client()
            .query_date_range(&request(server.address().to_string()))
            .await;

        assert_eq!(response.fetch_status, FetchStatus::Unreachable);
    }

    #[tokio::test]
    async fn test_invalid_address_is_unknown() {
        let response = client()
            .query_date_range(&request("not a host".to_string()))
            .await;

        assert_eq!(response.fetch_status, FetchStatus::Unknown);
        assert!(response.payload.is_empty());
    }
}
