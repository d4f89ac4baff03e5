//! Table source error types.

use thiserror::Error;

/// Errors that can occur while reading schemas and rows.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    /// The table name is not `project.dataset.table`.
    #[error("Invalid table name: {0}")]
    InvalidTableName(String),

    /// The table does not exist.
    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// Failed to reach the source.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The source answered with an error.
    #[error("Request error: {0}")]
    RequestError(String),

    /// The query job failed.
    #[error("Query error: {0}")]
    QueryError(String),

    /// Failed to decode a response.
    #[error("Decode error: {0}")]
    DecodeError(String),
}

impl SourceError {
    pub fn invalid_table_name(name: impl Into<String>) -> Self {
        Self::InvalidTableName(name.into())
    }

    pub fn table_not_found(name: impl Into<String>) -> Self {
        Self::TableNotFound(name.into())
    }

    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    pub fn request(msg: impl Into<String>) -> Self {
        Self::RequestError(msg.into())
    }

    pub fn query(msg: impl Into<String>) -> Self {
        Self::QueryError(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::DecodeError(msg.into())
    }
}
