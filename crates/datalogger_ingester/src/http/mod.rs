mod csapi_query;
mod http_datalogger_client;

pub use csapi_query::*;
pub use http_datalogger_client::*;
