use indexmap::IndexMap;
use std::fmt;

/// Outcome of polling one datalogger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    /// The logger answered with this HTTP status
    Http(u16),
    /// Connection could not be established or timed out
    Unreachable,
    /// Anything else that went wrong while fetching
    Unknown,
}

impl FetchStatus {
    /// Numeric status, with the legacy sentinel codes for transport failures
    pub fn code(&self) -> u16 {
        match self {
            FetchStatus::Http(status) => *status,
            FetchStatus::Unreachable => 504,
            FetchStatus::Unknown => 404,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FetchStatus::Http(200))
    }
}

impl fmt::Display for FetchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchStatus::Http(status) => write!(f, "http {}", status),
            FetchStatus::Unreachable => write!(f, "unreachable ({})", self.code()),
            FetchStatus::Unknown => write!(f, "unknown ({})", self.code()),
        }
    }
}

/// Raw text returned by a datalogger for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub fetch_status: FetchStatus,
    pub payload: String,
}

impl RawResponse {
    pub fn new(fetch_status: FetchStatus, payload: impl Into<String>) -> Self {
        Self {
            fetch_status,
            payload: payload.into(),
        }
    }

    pub fn unreachable() -> Self {
        Self::new(FetchStatus::Unreachable, String::new())
    }

    pub fn unknown() -> Self {
        Self::new(FetchStatus::Unknown, String::new())
    }

    /// Number of lines in the payload, not counting a trailing line break
    pub fn line_count(&self) -> usize {
        self.payload.lines().count()
    }

    /// Drop the body of a non-success response so it is never parsed as data
    pub fn without_error_body(mut self) -> Self {
        if !self.fetch_status.is_success() {
            self.payload.clear();
        }
        self
    }
}

/// Raw responses of one run, keyed by client address in registry order
pub type RawResponses = IndexMap<String, RawResponse>;
