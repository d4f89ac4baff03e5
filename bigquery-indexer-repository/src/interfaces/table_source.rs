//! Table source trait definition.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::errors::SourceError;
use bigquery_indexer_shared::{Row, TableSchema};

/// A lazily fetched, single-pass stream of table rows.
pub type RowStream<'a> = BoxStream<'a, Result<Row, SourceError>>;

/// Supplies table schemas and rows.
#[async_trait]
pub trait TableSource: Send + Sync {
    /// Look up a table's standard name and schema.
    ///
    /// # Arguments
    ///
    /// * `table_name` - Fully-qualified `project.dataset.table`
    async fn get_table(&self, table_name: &str) -> Result<TableSchema, SourceError>;

    /// Stream all rows of a table.
    ///
    /// Rows are decoded against `table`'s schema; missing values are JSON
    /// `null`.
    fn read_rows<'a>(&'a self, table: &'a TableSchema) -> RowStream<'a>;
}
