//! Sample export.
//!
//! Scans the merged entity index and writes every sample as an export record
//! to a blob store. The written payload is a JSON array with the closing `]`
//! left off, so several exports can be composed into one array server side;
//! the consumer closes it. It is not valid JSON on its own.

use std::sync::Arc;

use futures::TryStreamExt;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};
use tracing::{debug, info, instrument};

use crate::config::ExportTarget;
use crate::errors::PipelineError;
use bigquery_indexer_repository::{BlobStore, DocumentHit, DocumentStore};
use bigquery_indexer_shared::{ExportRecord, SAMPLES_FIELD};

/// `entityType` of every export record.
pub const SAMPLE_ENTITY_TYPE: &str = "sample";

/// Attribute holding the owning entity's ID.
pub const PARTICIPANT_ATTRIBUTE: &str = "participant";

/// Scoped field names of this many segments (`project.dataset.table.column`)
/// are exported; flags and the bare sample ID are not.
const EXPORTED_SEGMENTS: usize = 4;

/// Project one sample onto an export record.
///
/// Returns `None` for samples without the sample ID field.
pub fn project_sample(
    entity_id: &str,
    sample: &Map<String, Value>,
    sample_id_column: &str,
) -> Option<ExportRecord> {
    let name = sample.get(sample_id_column)?.clone();

    let mut attributes = Map::new();
    attributes.insert(PARTICIPANT_ATTRIBUTE.to_string(), Value::String(entity_id.to_string()));
    for (field, value) in sample {
        let segments: Vec<&str> = field.split('.').collect();
        if segments.len() != EXPORTED_SEGMENTS {
            continue;
        }
        attributes.insert(segments[EXPORTED_SEGMENTS - 1].to_string(), value.clone());
    }

    Some(ExportRecord {
        entity_type: SAMPLE_ENTITY_TYPE.to_string(),
        name,
        attributes,
    })
}

/// Export records for every sample of one entity document.
pub fn entity_records(hit: &DocumentHit, sample_id_column: &str) -> Vec<ExportRecord> {
    let Some(Value::Array(samples)) = hit.source.get(SAMPLES_FIELD) else {
        return Vec::new();
    };

    samples
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|sample| project_sample(&hit.id, sample, sample_id_column))
        .collect()
}

/// Serialize records as a 4-space indented JSON array without its closing `]`.
pub fn render_export(records: &[ExportRecord]) -> Result<Vec<u8>, PipelineError> {
    let mut buffer = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut buffer, PrettyFormatter::with_indent(b"    "));
    records.serialize(&mut serializer)?;

    if buffer.last() == Some(&b']') {
        buffer.pop();
    }
    Ok(buffer)
}

/// Writes the sample export for an index.
pub struct SampleExporter {
    store: Arc<dyn DocumentStore>,
    blob_store: Arc<dyn BlobStore>,
}

impl SampleExporter {
    pub fn new(store: Arc<dyn DocumentStore>, blob_store: Arc<dyn BlobStore>) -> Self {
        Self { store, blob_store }
    }

    /// Scan `index`, build the export and write it to `target`.
    ///
    /// Returns the number of exported samples.
    #[instrument(skip(self, target), fields(container = %target.container, blob = %target.blob_name))]
    pub async fn export(
        &self,
        index: &str,
        sample_id_column: &str,
        target: &ExportTarget,
    ) -> Result<usize, PipelineError> {
        let mut records = Vec::new();
        let mut documents = 0usize;
        let mut hits = self.store.scan_documents(index);

        while let Some(hit) = hits.try_next().await? {
            documents += 1;
            records.extend(entity_records(&hit, sample_id_column));
        }
        debug!(documents = documents, samples = records.len(), "Scanned index for export");

        let payload = render_export(&records)?;

        self.blob_store.ensure_container(&target.container).await?;
        self.blob_store
            .write_blob(&target.container, &target.blob_name, payload)
            .await?;

        info!(
            samples = records.len(),
            "Wrote {}/{}", target.container, target.blob_name
        );
        Ok(records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigquery_indexer_repository::{InMemoryStore, LocalBlobStore};
    use bigquery_indexer_shared::{Document, EntityUpdate};
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn test_project_sample_keeps_four_segment_fields() {
        let sample = doc(json!({
            "sid": "S1",
            "_has_vcf": true,
            "table.col": "two",
            "ds.table.col": "three",
            "proj.ds.samples.center": "A",
            "proj.ds.samples.extra.deep": "five"
        }));

        let record = project_sample("P1", &sample, "sid").unwrap();

        assert_eq!(record.name, json!("S1"));
        assert_eq!(
            Value::Object(record.attributes),
            json!({"participant": "P1", "center": "A"})
        );
    }

    #[test]
    fn test_project_sample_without_id() {
        let sample = doc(json!({"proj.ds.samples.center": "A"}));

        assert!(project_sample("P1", &sample, "sid").is_none());
    }

    #[test]
    fn test_entity_records() {
        let hit = DocumentHit {
            id: "P1".to_string(),
            source: doc(json!({
                "proj.ds.weight.value": 70,
                "samples": [
                    {"sid": "S1", "proj.ds.samples.center": "A"},
                    {"sid": "S2", "proj.ds.samples.center": "B"}
                ]
            })),
        };

        let records = entity_records(&hit, "sid");

        assert_eq!(records.len(), 2);
        assert_eq!(records[1].name, json!("S2"));
        assert_eq!(records[1].attributes.get("participant"), Some(&json!("P1")));
    }

    #[test]
    fn test_entity_without_samples() {
        let hit = DocumentHit {
            id: "P1".to_string(),
            source: doc(json!({"proj.ds.weight.value": 70})),
        };

        assert!(entity_records(&hit, "sid").is_empty());
    }

    #[test]
    fn test_render_export_leaves_array_open() {
        let record = ExportRecord {
            entity_type: "sample".to_string(),
            name: json!("S1"),
            attributes: doc(json!({"participant": "P1"})),
        };

        let rendered = String::from_utf8(render_export(&[record]).unwrap()).unwrap();

        assert_eq!(
            rendered,
            "[\n    {\n        \"entityType\": \"sample\",\n        \"name\": \"S1\",\n        \"attributes\": {\n            \"participant\": \"P1\"\n        }\n    }\n"
        );
    }

    #[test]
    fn test_render_empty_export() {
        assert_eq!(render_export(&[]).unwrap(), b"[".to_vec());
    }

    #[tokio::test]
    async fn test_export_writes_blob() {
        let store = Arc::new(InMemoryStore::new());
        store.ensure_index("idx").await.unwrap();
        store
            .bulk_apply(
                "idx",
                &[
                    EntityUpdate::merge_sample(
                        "P1",
                        "sid",
                        doc(json!({"sid": "S1", "proj.ds.samples.center": "A"})),
                    ),
                    EntityUpdate::partial("P2", doc(json!({"proj.ds.weight.value": 1}))),
                ],
            )
            .await
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let blobs = Arc::new(LocalBlobStore::new(dir.path()));
        let exporter = SampleExporter::new(store, blobs.clone());
        let target = ExportTarget::for_project("proj");

        let exported = exporter.export("idx", "sid", &target).await.unwrap();

        assert_eq!(exported, 1);
        let written = std::fs::read_to_string(blobs.blob_path("proj-export-samples", "samples")).unwrap();
        assert!(written.starts_with('['));
        assert!(!written.trim_end().ends_with(']'));
        let closed: Value = serde_json::from_str(&format!("{}]", written)).unwrap();
        assert_eq!(
            closed,
            json!([{
                "entityType": "sample",
                "name": "S1",
                "attributes": {"participant": "P1", "center": "A"}
            }])
        );
    }
}
