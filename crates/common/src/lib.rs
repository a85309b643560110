pub mod domain;
pub mod postgres;
pub mod registry;

pub use domain::*;
pub use postgres::*;
pub use registry::*;

// Re-export mocks when testing feature is enabled
#[cfg(any(test, feature = "testing"))]
pub use domain::MockBatchSink;
