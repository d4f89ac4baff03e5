//! In-process table source.

use std::collections::BTreeMap;

use async_trait::async_trait;
use futures::{stream, StreamExt};

use crate::errors::SourceError;
use crate::interfaces::{RowStream, TableSource};
use bigquery_indexer_shared::{Row, TableSchema};

/// Tables held in memory, keyed by standard name.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    tables: BTreeMap<String, (TableSchema, Vec<Row>)>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table. Replaces any table with the same name.
    pub fn with_table(mut self, schema: TableSchema, rows: Vec<Row>) -> Self {
        self.tables.insert(schema.full_name.clone(), (schema, rows));
        self
    }
}

#[async_trait]
impl TableSource for InMemorySource {
    async fn get_table(&self, table_name: &str) -> Result<TableSchema, SourceError> {
        self.tables
            .get(table_name)
            .map(|(schema, _)| schema.clone())
            .ok_or_else(|| SourceError::table_not_found(table_name))
    }

    fn read_rows<'a>(&'a self, table: &'a TableSchema) -> RowStream<'a> {
        match self.tables.get(&table.full_name) {
            Some((_, rows)) => stream::iter(rows.iter().cloned().map(Ok)).boxed(),
            None => stream::iter([Err(SourceError::table_not_found(&table.full_name))]).boxed(),
        }
    }
}
