use chrono::NaiveDateTime;

/// Timestamp format the csapi DataQuery command expects for `p1`/`p2`
pub const QUERY_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// DataQuery modes used against the datalogger web API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    /// Records stamped between `start` and `end`
    DateRange {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
    /// Every record from the given record number onwards
    SinceRecord { record: u64 },
}

/// Build the TOA5 DataQuery URL for a table on a datalogger
pub fn data_query_url(address: &str, table_name: &str, mode: QueryMode) -> String {
    let base = format!(
        "http://{}/csapi/?command=DataQuery&mode={}&format=toa5&uri=dl:{}",
        address,
        match mode {
            QueryMode::DateRange { .. } => "date-range",
            QueryMode::SinceRecord { .. } => "since-record",
        },
        table_name,
    );

    match mode {
        QueryMode::DateRange { start, end } => format!(
            "{}&p1={}&p2={}",
            base,
            start.format(QUERY_TIMESTAMP_FORMAT),
            end.format(QUERY_TIMESTAMP_FORMAT),
        ),
        QueryMode::SinceRecord { record } => format!("{}&p1={}", base, record),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timestamp(value: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(value, QUERY_TIMESTAMP_FORMAT).unwrap()
    }

    #[test]
    fn test_date_range_url() {
        let url = data_query_url(
            "10.0.0.5",
            "Profile",
            QueryMode::DateRange {
                start: timestamp("2024-01-01T00:00:00"),
                end: timestamp("2024-01-03T12:30:05"),
            },
        );

        assert_eq!(
            url,
            "http://10.0.0.5/csapi/?command=DataQuery&mode=date-range&format=toa5\
             &uri=dl:Profile&p1=2024-01-01T00:00:00&p2=2024-01-03T12:30:05"
        );
    }

    #[test]
    fn test_since_record_url() {
        let url = data_query_url("10.0.0.5", "Profile", QueryMode::SinceRecord { record: 0 });

        assert_eq!(
            url,
            "http://10.0.0.5/csapi/?command=DataQuery&mode=since-record&format=toa5\
             &uri=dl:Profile&p1=0"
        );
    }

    #[test]
    fn test_window_end_is_truncated_to_seconds() {
        let end = timestamp("2024-01-03T12:30:05") + chrono::Duration::milliseconds(750);
        let url = data_query_url(
            "10.0.0.5",
            "Profile",
            QueryMode::DateRange {
                start: timestamp("2024-01-01T00:00:00"),
                end,
            },
        );

        assert!(url.ends_with("&p2=2024-01-03T12:30:05"));
    }
}
