//! A dataset configuration directory driving a full run.

use std::fs;
use std::sync::Arc;

use serde_json::{json, Value};

use bigquery_indexer::config::load_job_config;
use bigquery_indexer_pipeline::{BulkLoader, Orchestrator};
use bigquery_indexer_repository::{InMemorySource, InMemoryStore, LocalBlobStore};
use bigquery_indexer_shared::{FieldType, Row, SchemaField, TableSchema};

#[tokio::test]
async fn test_dataset_directory_run() {
    let config_dir = tempfile::tempdir().unwrap();
    fs::write(config_dir.path().join("dataset.json"), r#"{"name": "Test Dataset"}"#).unwrap();
    fs::write(
        config_dir.path().join("bigquery.json"),
        r#"{
            "participant_id_column": "participant_id",
            "sample_id_column": "sample_id",
            "sample_file_columns": {"BAM File": "proj.ds.samples.bam"},
            "table_names": ["proj.ds.participants", "proj.ds.samples"]
        }"#,
    )
    .unwrap();
    fs::write(config_dir.path().join("deploy.json"), r#"{"project_id": "deploy"}"#).unwrap();

    let job = load_job_config(config_dir.path()).unwrap();

    let participants = TableSchema::new(
        "proj.ds.participants",
        vec![
            SchemaField::scalar("participant_id", FieldType::String),
            SchemaField::scalar("age", FieldType::Integer),
        ],
    );
    let samples = TableSchema::new(
        "proj.ds.samples",
        vec![
            SchemaField::scalar("participant_id", FieldType::String),
            SchemaField::scalar("sample_id", FieldType::String),
            SchemaField::scalar("bam", FieldType::String),
        ],
    );
    let source = InMemorySource::new()
        .with_table(
            participants,
            vec![Row::new().with("participant_id", "P1").with("age", 40)],
        )
        .with_table(
            samples,
            vec![Row::new()
                .with("participant_id", "P1")
                .with("sample_id", "S1")
                .with("bam", "gs://b/S1.bam")],
        );

    let store = Arc::new(InMemoryStore::new());
    let export_dir = tempfile::tempdir().unwrap();
    let blobs = Arc::new(LocalBlobStore::new(export_dir.path()));
    let orchestrator = Orchestrator::new(store.clone(), Arc::new(source), BulkLoader::new(store.clone()))
        .with_blob_store(blobs.clone());

    let summary = orchestrator.run(&job).await.unwrap();

    assert_eq!(summary.exported_samples, Some(1));
    assert_eq!(
        store.document("test_dataset", "P1").map(Value::Object),
        Some(json!({
            "proj.ds.participants.age": 40,
            "samples": [{
                "sample_id": "S1",
                "proj.ds.samples.bam": "gs://b/S1.bam",
                "_has_bam_file": true
            }]
        }))
    );
    assert!(store
        .document("test_dataset_fields", "samples.proj.ds.samples.bam")
        .is_some());

    let written = fs::read_to_string(blobs.blob_path("deploy-export-samples", "samples")).unwrap();
    let exported: Value = serde_json::from_str(&format!("{}]", written)).unwrap();
    assert_eq!(
        exported,
        json!([{
            "entityType": "sample",
            "name": "S1",
            "attributes": {"participant": "P1", "bam": "gs://b/S1.bam"}
        }])
    );
}
