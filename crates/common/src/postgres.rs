mod batch_repository;
mod cell_value_sql;
mod client;
mod config;

pub use batch_repository::*;
pub use client::*;
pub use config::*;
