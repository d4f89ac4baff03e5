//! Table schema types.
//!
//! A BigQuery table schema is an ordered tree of fields. `RECORD` fields carry
//! children; `REPEATED` fields hold arrays. The tree deserializes directly from
//! the `schema.fields` array returned by the BigQuery REST API.

use serde::{Deserialize, Serialize};

/// Column type tag.
///
/// Only the distinction between structured (`RECORD`) and scalar types matters
/// for index mappings; the scalar variants drive value decoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    String,
    Bytes,
    Integer,
    Float,
    Numeric,
    Boolean,
    Timestamp,
    Date,
    Time,
    Datetime,
    Geography,
    Json,
    Record,
    /// Any type tag this crate does not interpret. Values are kept as strings.
    Other(String),
}

impl FieldType {
    /// Whether fields of this type carry nested children.
    pub fn is_record(&self) -> bool {
        matches!(self, FieldType::Record)
    }
}

impl From<String> for FieldType {
    fn from(tag: String) -> Self {
        match tag.to_ascii_uppercase().as_str() {
            "STRING" => FieldType::String,
            "BYTES" => FieldType::Bytes,
            "INTEGER" | "INT64" => FieldType::Integer,
            "FLOAT" | "FLOAT64" => FieldType::Float,
            "NUMERIC" | "BIGNUMERIC" => FieldType::Numeric,
            "BOOLEAN" | "BOOL" => FieldType::Boolean,
            "TIMESTAMP" => FieldType::Timestamp,
            "DATE" => FieldType::Date,
            "TIME" => FieldType::Time,
            "DATETIME" => FieldType::Datetime,
            "GEOGRAPHY" => FieldType::Geography,
            "JSON" => FieldType::Json,
            "RECORD" | "STRUCT" => FieldType::Record,
            _ => FieldType::Other(tag),
        }
    }
}

impl From<FieldType> for String {
    fn from(field_type: FieldType) -> Self {
        match field_type {
            FieldType::String => "STRING".to_string(),
            FieldType::Bytes => "BYTES".to_string(),
            FieldType::Integer => "INTEGER".to_string(),
            FieldType::Float => "FLOAT".to_string(),
            FieldType::Numeric => "NUMERIC".to_string(),
            FieldType::Boolean => "BOOLEAN".to_string(),
            FieldType::Timestamp => "TIMESTAMP".to_string(),
            FieldType::Date => "DATE".to_string(),
            FieldType::Time => "TIME".to_string(),
            FieldType::Datetime => "DATETIME".to_string(),
            FieldType::Geography => "GEOGRAPHY".to_string(),
            FieldType::Json => "JSON".to_string(),
            FieldType::Record => "RECORD".to_string(),
            FieldType::Other(tag) => tag,
        }
    }
}

/// Column repetition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldMode {
    #[default]
    Nullable,
    Required,
    Repeated,
}

/// A node in a table's schema tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub mode: FieldMode,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<SchemaField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl SchemaField {
    /// Create a nullable scalar field.
    pub fn scalar(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            mode: FieldMode::Nullable,
            fields: Vec::new(),
            description: None,
        }
    }

    /// Create a record field with the given children.
    pub fn record(name: impl Into<String>, fields: Vec<SchemaField>) -> Self {
        Self {
            name: name.into(),
            field_type: FieldType::Record,
            mode: FieldMode::Nullable,
            fields,
            description: None,
        }
    }

    /// Set the repetition mode.
    pub fn with_mode(mut self, mode: FieldMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Whether this field is an array of records, which the index must
    /// declare as `nested`.
    pub fn is_repeated_record(&self) -> bool {
        self.mode == FieldMode::Repeated && self.field_type.is_record()
    }
}

/// A table's standard SQL name and its top-level fields.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    /// Fully-qualified standard SQL name: `project.dataset.table`.
    pub full_name: String,
    pub fields: Vec<SchemaField>,
}

impl TableSchema {
    pub fn new(full_name: impl Into<String>, fields: Vec<SchemaField>) -> Self {
        Self {
            full_name: full_name.into(),
            fields,
        }
    }

    /// Whether the table has a top-level column with the given name.
    pub fn has_column(&self, column: &str) -> bool {
        self.fields.iter().any(|field| field.name == column)
    }
}

/// Convert a legacy `project:dataset.table` id to the standard
/// `project.dataset.table` form.
///
/// Splits on the last `:` because project ids may themselves contain one
/// (`google.com:api-project-123`). Ids without a `:` are returned unchanged.
pub fn standard_table_name(full_table_id: &str) -> String {
    match full_table_id.rsplit_once(':') {
        Some((project, dataset_table)) => format!("{}.{}", project, dataset_table),
        None => full_table_id.to_string(),
    }
}

/// A table reference split into its project, dataset and table ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableReference {
    pub project_id: String,
    pub dataset_id: String,
    pub table_id: String,
}

impl TableReference {
    /// Parse `project.dataset.table`, splitting on the last two dots so that
    /// project ids containing `.` are preserved.
    pub fn parse(table_name: &str) -> Option<Self> {
        let mut parts = table_name.rsplitn(3, '.');
        let table_id = parts.next()?;
        let dataset_id = parts.next()?;
        let project_id = parts.next()?;

        if project_id.is_empty() || dataset_id.is_empty() || table_id.is_empty() {
            return None;
        }

        Some(Self {
            project_id: project_id.to_string(),
            dataset_id: dataset_id.to_string(),
            table_id: table_id.to_string(),
        })
    }

    /// The standard SQL name.
    pub fn full_name(&self) -> String {
        format!("{}.{}.{}", self.project_id, self.dataset_id, self.table_id)
    }
}
