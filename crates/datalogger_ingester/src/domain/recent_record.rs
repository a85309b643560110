use chrono::NaiveDateTime;
use common::domain::Row;

/// Timestamp format of TOA5 record timestamps
pub const ROW_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Timestamp and address of the newest row in a batch
///
/// Logger payloads are ordered oldest to newest, so only the last row is
/// scanned. Both fields are the first matching value in that row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecentRecord {
    pub timestamp: Option<NaiveDateTime>,
    pub address: Option<String>,
}

impl RecentRecord {
    pub fn from_rows(rows: &[Row]) -> Self {
        let Some(last) = rows.last() else {
            return Self::default();
        };

        let timestamp = last
            .iter()
            .filter_map(|cell| cell.as_text())
            .find_map(|text| NaiveDateTime::parse_from_str(text, ROW_TIMESTAMP_FORMAT).ok());

        let address = last
            .iter()
            .filter_map(|cell| cell.as_text())
            .find(|text| text.matches('.').count() == 3)
            .map(str::to_string);

        Self { timestamp, address }
    }
}
