mod checkpoint_updater;
mod datalogger_client;
mod fetch_service;
mod persistence_writer;
mod recent_record;
mod response_normalizer;

pub use checkpoint_updater::*;
pub use datalogger_client::*;
pub use fetch_service::*;
pub use persistence_writer::*;
pub use recent_record::*;
pub use response_normalizer::*;
