//! Job configuration for the indexing pipeline.

use std::collections::BTreeMap;

use serde::Deserialize;

/// Which columns identify entities and samples.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ColumnConfig {
    /// Column holding the entity (participant) ID. Becomes the document ID.
    #[serde(rename = "participant_id_column")]
    pub entity_id_column: String,
    /// Column holding the sub-entity (sample) ID, present only on sample tables.
    #[serde(rename = "sample_id_column", default)]
    pub sample_id_column: Option<String>,
    /// File type label to the scoped column holding that file, e.g.
    /// `"VCF File" -> "proj.ds.samples.vcf_path"`.
    #[serde(rename = "sample_file_columns", default)]
    pub sample_file_columns: BTreeMap<String, String>,
}

impl ColumnConfig {
    pub fn new(entity_id_column: impl Into<String>) -> Self {
        Self {
            entity_id_column: entity_id_column.into(),
            sample_id_column: None,
            sample_file_columns: BTreeMap::new(),
        }
    }

    pub fn with_sample_id_column(mut self, column: impl Into<String>) -> Self {
        self.sample_id_column = Some(column.into());
        self
    }

    pub fn with_sample_file_column(
        mut self,
        file_type: impl Into<String>,
        column: impl Into<String>,
    ) -> Self {
        self.sample_file_columns.insert(file_type.into(), column.into());
        self
    }
}

/// Where the sample export is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportTarget {
    /// Project that owns the bucket.
    pub project_id: String,
    /// Bucket (or directory) name.
    pub container: String,
    /// Blob name inside the container.
    pub blob_name: String,
}

impl ExportTarget {
    /// The target for a deploy project: bucket `<project>-export-samples`,
    /// blob `samples`.
    pub fn for_project(project_id: &str) -> Self {
        Self {
            project_id: project_id.to_string(),
            container: format!("{}-export-samples", project_id),
            blob_name: "samples".to_string(),
        }
    }
}

/// Everything one indexing run needs to know about its dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobConfig {
    /// Entity index name.
    pub index_name: String,
    pub columns: ColumnConfig,
    /// Tables to index, in order.
    pub table_names: Vec<String>,
    pub export: Option<ExportTarget>,
}
