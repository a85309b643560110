pub mod domain;
pub mod http;
pub mod ingest_pipeline;

pub use domain::*;
pub use http::*;
pub use ingest_pipeline::*;
