//! BigQuery implementation of the table source.

mod client;
mod decode;

pub use client::{BigQueryConfig, BigQuerySource, DEFAULT_BIGQUERY_URL};
pub use decode::decode_row;
