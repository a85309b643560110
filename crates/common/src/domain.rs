mod batch_sink;
mod cell_value;
mod client;
mod formatted_batch;
mod raw_response;
mod result;

pub use batch_sink::*;
pub use cell_value::*;
pub use client::*;
pub use formatted_batch::*;
pub use raw_response::*;
pub use result::*;
