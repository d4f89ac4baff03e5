//! Row processor implementation.
//!
//! Turns table rows into entity updates: partial documents for entity tables,
//! sample merges for tables that carry the sample ID column.

use futures::{future, StreamExt, TryStreamExt};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ColumnConfig;
use crate::errors::PipelineError;
use bigquery_indexer_repository::RowStream;
use bigquery_indexer_shared::{Document, EntityUpdate, Row, TableSchema};

/// Lazy sequence of updates produced from a row stream.
pub type UpdateStream<'a> = futures::stream::BoxStream<'a, Result<EntityUpdate, PipelineError>>;

/// How rows of a table are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowStrategy {
    /// Partial update of the entity document with table-scoped fields.
    Flat,
    /// Find-or-append merge into the entity's `samples` array.
    Samples { sample_id_column: String },
}

/// A `_has_<file type>` flag owned by the table being processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFlag {
    /// Flag field name, e.g. `_has_vcf_file`.
    pub field: String,
    /// Scoped column the flag is derived from.
    pub column: String,
}

impl FileFlag {
    /// Flags for the configured file columns that belong to `table`.
    pub fn for_table<'a>(
        table: &str,
        sample_file_columns: impl IntoIterator<Item = (&'a String, &'a String)>,
    ) -> Vec<FileFlag> {
        let scope = format!("{}.", table);
        sample_file_columns
            .into_iter()
            .filter(|(_, column)| column.starts_with(&scope))
            .map(|(file_type, column)| FileFlag {
                field: flag_name(file_type),
                column: column.clone(),
            })
            .collect()
    }
}

/// `"VCF File"` -> `"_has_vcf_file"`.
pub fn flag_name(file_type: &str) -> String {
    format!("_has_{}", file_type.to_lowercase().replace(' ', "_"))
}

/// Converts rows of one table into entity updates.
#[derive(Debug, Clone)]
pub struct RowProcessor {
    table: String,
    entity_id_column: String,
    strategy: RowStrategy,
    file_flags: Vec<FileFlag>,
}

impl RowProcessor {
    /// Pick the strategy for a table from its schema: tables with the sample
    /// ID column are merged into `samples`, everything else is flat.
    pub fn for_table(table: &TableSchema, columns: &ColumnConfig) -> Self {
        let strategy = match columns.sample_id_column {
            Some(ref column) if table.has_column(column) => RowStrategy::Samples {
                sample_id_column: column.clone(),
            },
            _ => RowStrategy::Flat,
        };

        let file_flags = match strategy {
            RowStrategy::Samples { .. } => {
                FileFlag::for_table(&table.full_name, &columns.sample_file_columns)
            }
            RowStrategy::Flat => Vec::new(),
        };

        Self {
            table: table.full_name.clone(),
            entity_id_column: columns.entity_id_column.clone(),
            strategy,
            file_flags,
        }
    }

    pub fn strategy(&self) -> &RowStrategy {
        &self.strategy
    }

    pub fn file_flags(&self) -> &[FileFlag] {
        &self.file_flags
    }

    /// Process one row. Rows without a usable entity ID (or, for sample
    /// tables, without a sample ID) are skipped.
    pub fn process(&self, row: Row) -> Option<EntityUpdate> {
        match self.strategy {
            RowStrategy::Flat => build_document(row, &self.table, &self.entity_id_column)
                .map(|(entity_id, document)| EntityUpdate::partial(entity_id, document)),
            RowStrategy::Samples {
                ref sample_id_column,
            } => build_sample_merge(
                row,
                &self.table,
                &self.entity_id_column,
                sample_id_column,
                &self.file_flags,
            ),
        }
    }

    /// Map a row stream to an update stream without buffering it.
    pub fn process_rows<'a>(&'a self, rows: RowStream<'a>) -> UpdateStream<'a> {
        rows.map_err(PipelineError::from)
            .try_filter_map(move |row| future::ready(Ok(self.process(row))))
            .boxed()
    }
}

/// Document ID for an entity ID cell. Strings are used as is; numbers and
/// booleans by their JSON text. Anything else has no usable ID.
pub fn entity_id(value: &Value) -> Option<String> {
    match value {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        Value::Bool(id) => Some(id.to_string()),
        _ => None,
    }
}

/// Build a flat, table-scoped partial document from a row.
///
/// Missing values are dropped and the entity ID column becomes the document
/// ID. Returns `None` if the row has no usable entity ID.
pub fn build_document(row: Row, table: &str, entity_id_column: &str) -> Option<(String, Document)> {
    let Some(id) = row.get(entity_id_column).and_then(entity_id) else {
        warn!(table = %table, column = %entity_id_column, "Skipping row without an entity ID");
        return None;
    };

    let document = row
        .into_present()
        .filter(|(column, _)| column != entity_id_column)
        .map(|(column, value)| (format!("{}.{}", table, column), value))
        .collect();

    Some((id, document))
}

/// Build a sample merge from a row of a sample table.
///
/// Like [`build_document`], except the sample ID column keeps its bare name
/// so it can be matched against existing samples, and the table's file flags
/// are set from the scoped file columns.
pub fn build_sample_merge(
    row: Row,
    table: &str,
    entity_id_column: &str,
    sample_id_column: &str,
    file_flags: &[FileFlag],
) -> Option<EntityUpdate> {
    let Some(id) = row.get(entity_id_column).and_then(entity_id) else {
        warn!(table = %table, column = %entity_id_column, "Skipping row without an entity ID");
        return None;
    };
    if row.get(sample_id_column).is_none() {
        warn!(
            table = %table,
            entity_id = %id,
            column = %sample_id_column,
            "Skipping row without a sample ID"
        );
        return None;
    }

    let mut sample: Document = row
        .into_present()
        .filter(|(column, _)| column != entity_id_column)
        .map(|(column, value)| {
            if column == sample_id_column {
                (column, value)
            } else {
                (format!("{}.{}", table, column), value)
            }
        })
        .collect();

    for flag in file_flags {
        let present = sample.get(&flag.column).is_some_and(is_truthy);
        sample.insert(flag.field.clone(), Value::Bool(present));
    }

    debug!(entity_id = %id, fields = sample.len(), "Built sample merge");
    Some(EntityUpdate::merge_sample(id, sample_id_column, sample))
}

/// Empty strings, zero, `false`, empty arrays and objects are false.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigquery_indexer_shared::{EntityOperation, FieldType, SchemaField};
    use futures::stream;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    fn sample_table() -> TableSchema {
        TableSchema::new(
            "proj.ds.samples",
            vec![
                SchemaField::scalar("pid", FieldType::String),
                SchemaField::scalar("sid", FieldType::String),
                SchemaField::scalar("vcf", FieldType::String),
                SchemaField::scalar("center", FieldType::String),
            ],
        )
    }

    fn sample_columns() -> ColumnConfig {
        ColumnConfig::new("pid")
            .with_sample_id_column("sid")
            .with_sample_file_column("VCF File", "proj.ds.samples.vcf")
            .with_sample_file_column("BAM File", "proj.ds.reads.bam")
    }

    #[test]
    fn test_build_document_scopes_and_drops_nulls() {
        let row = Row::new()
            .with("pid", "P1")
            .with("value", 70)
            .with("unit", Value::Null)
            .with("note", "");

        let (id, document) = build_document(row, "proj.ds.weight", "pid").unwrap();

        assert_eq!(id, "P1");
        assert_eq!(
            document,
            doc(json!({"proj.ds.weight.value": 70, "proj.ds.weight.note": ""}))
        );
    }

    #[test]
    fn test_build_document_numeric_entity_id() {
        let row = Row::new().with("pid", 17).with("value", 1);

        let (id, _) = build_document(row, "proj.ds.weight", "pid").unwrap();

        assert_eq!(id, "17");
    }

    #[test]
    fn test_build_document_skips_missing_entity_id() {
        let row = Row::new().with("pid", Value::Null).with("value", 1);

        assert!(build_document(row, "proj.ds.weight", "pid").is_none());
    }

    #[test]
    fn test_sample_merge_keeps_sample_id_unscoped() {
        let processor = RowProcessor::for_table(&sample_table(), &sample_columns());
        let row = Row::new()
            .with("pid", "P1")
            .with("sid", "S1")
            .with("center", "A")
            .with("vcf", "gs://bucket/S1.vcf");

        let update = processor.process(row).unwrap();

        assert_eq!(update.entity_id, "P1");
        assert_eq!(
            update.operation,
            EntityOperation::MergeSample {
                key: "sid".to_string(),
                sample: doc(json!({
                    "sid": "S1",
                    "proj.ds.samples.center": "A",
                    "proj.ds.samples.vcf": "gs://bucket/S1.vcf",
                    "_has_vcf_file": true
                })),
            }
        );
    }

    #[test]
    fn test_file_flag_false_for_missing_or_empty_column() {
        let processor = RowProcessor::for_table(&sample_table(), &sample_columns());

        for vcf in [Value::Null, json!("")] {
            let row = Row::new().with("pid", "P1").with("sid", "S1").with("vcf", vcf);
            let update = processor.process(row).unwrap();

            let EntityOperation::MergeSample { sample, .. } = update.operation else {
                panic!("expected a sample merge");
            };
            assert_eq!(sample.get("_has_vcf_file"), Some(&json!(false)));
            assert!(sample.get("_has_bam_file").is_none());
        }
    }

    #[test]
    fn test_file_flags_only_for_owned_columns() {
        let flags = FileFlag::for_table("proj.ds.samples", &sample_columns().sample_file_columns);

        assert_eq!(
            flags,
            vec![FileFlag {
                field: "_has_vcf_file".to_string(),
                column: "proj.ds.samples.vcf".to_string(),
            }]
        );
    }

    #[test]
    fn test_file_flag_scope_needs_full_table_name() {
        let columns = ColumnConfig::new("pid")
            .with_sample_id_column("sid")
            .with_sample_file_column("VCF", "proj.ds.samples_extra.vcf");

        assert!(FileFlag::for_table("proj.ds.samples", &columns.sample_file_columns).is_empty());
    }

    #[test]
    fn test_sample_row_without_sample_id_is_skipped() {
        let processor = RowProcessor::for_table(&sample_table(), &sample_columns());
        let row = Row::new().with("pid", "P1").with("center", "A");

        assert!(processor.process(row).is_none());
    }

    #[test]
    fn test_table_without_sample_column_is_flat() {
        let table = TableSchema::new(
            "proj.ds.weight",
            vec![
                SchemaField::scalar("pid", FieldType::String),
                SchemaField::scalar("value", FieldType::Integer),
            ],
        );

        let processor = RowProcessor::for_table(&table, &sample_columns());

        assert_eq!(processor.strategy(), &RowStrategy::Flat);
        assert!(processor.file_flags().is_empty());
    }

    #[test]
    fn test_flag_name() {
        assert_eq!(flag_name("Chr 18 VCF"), "_has_chr_18_vcf");
    }

    #[test]
    fn test_truthiness() {
        assert!(is_truthy(&json!("x")));
        assert!(is_truthy(&json!(1)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!(0.0)));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&json!([])));
    }

    #[tokio::test]
    async fn test_process_rows_filters_skipped_rows() {
        let table = TableSchema::new(
            "proj.ds.weight",
            vec![
                SchemaField::scalar("pid", FieldType::String),
                SchemaField::scalar("value", FieldType::Integer),
            ],
        );
        let processor = RowProcessor::for_table(&table, &ColumnConfig::new("pid"));
        let rows = stream::iter(vec![
            Ok(Row::new().with("pid", "P1").with("value", 1)),
            Ok(Row::new().with("value", 2)),
            Ok(Row::new().with("pid", "P3").with("value", 3)),
        ])
        .boxed();

        let updates: Vec<EntityUpdate> = processor.process_rows(rows).try_collect().await.unwrap();

        let ids: Vec<&str> = updates.iter().map(|u| u.entity_id.as_str()).collect();
        assert_eq!(ids, vec!["P1", "P3"]);
    }
}
