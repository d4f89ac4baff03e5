//! In-process document store.
//!
//! Applies partial updates and sample merges with the same semantics the
//! OpenSearch store gets from `doc_as_upsert` and `MERGE_SAMPLE_SCRIPT`, and
//! rejects a nested declaration for a path that was already written with a
//! flat mapping, like a real index does. Every call is recorded so callers can
//! check the order of mapping updates and writes.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use futures::{stream, StreamExt};
use tracing::debug;

use crate::errors::StoreError;
use crate::interfaces::{DocumentStore, DocumentStream};
use crate::types::{BatchOperationResult, BatchOperationSummary, DocumentHit};
use bigquery_indexer_shared::{Document, EntityUpdate, MappingTree};

/// A call made against the store.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    EnsureIndex { index: String },
    PutMapping { index: String, mapping: MappingTree },
    Bulk { index: String, entity_ids: Vec<String> },
    Refresh { index: String },
}

#[derive(Debug, Default)]
struct IndexState {
    documents: BTreeMap<String, Document>,
    /// Top-level paths and whether they are mapped `nested`.
    mapped_paths: HashMap<String, bool>,
}

#[derive(Debug, Default)]
struct StoreState {
    indices: BTreeMap<String, IndexState>,
    events: Vec<StoreEvent>,
}

/// Document store held in memory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
    rejected_entities: HashSet<String>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every bulk item addressed to this entity id.
    pub fn with_rejected_entity(mut self, entity_id: impl Into<String>) -> Self {
        self.rejected_entities.insert(entity_id.into());
        self
    }

    /// A copy of a stored document.
    pub fn document(&self, index: &str, entity_id: &str) -> Option<Document> {
        self.lock()
            .indices
            .get(index)
            .and_then(|state| state.documents.get(entity_id))
            .cloned()
    }

    /// Number of documents in an index.
    pub fn document_count(&self, index: &str) -> usize {
        self.lock()
            .indices
            .get(index)
            .map(|state| state.documents.len())
            .unwrap_or(0)
    }

    /// Whether the index exists.
    pub fn has_index(&self, index: &str) -> bool {
        self.lock().indices.contains_key(index)
    }

    /// Every call made so far, in order.
    pub fn events(&self) -> Vec<StoreEvent> {
        self.lock().events.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StoreState> {
        // A panic while holding the lock cannot leave the maps half-updated in
        // a way later readers care about.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn missing_index(index: &str) -> StoreError {
    StoreError::validation(format!("no such index [{}]", index))
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn ensure_index(&self, index: &str) -> Result<(), StoreError> {
        let mut state = self.lock();
        state.events.push(StoreEvent::EnsureIndex {
            index: index.to_string(),
        });
        state.indices.entry(index.to_string()).or_default();
        Ok(())
    }

    async fn put_mapping(&self, index: &str, mapping: &MappingTree) -> Result<(), StoreError> {
        let mut state = self.lock();
        state.events.push(StoreEvent::PutMapping {
            index: index.to_string(),
            mapping: mapping.clone(),
        });

        let index_state = state.indices.get_mut(index).ok_or_else(|| missing_index(index))?;

        for (path, entry) in mapping.iter() {
            if entry.nested && index_state.mapped_paths.get(path) == Some(&false) {
                return Err(StoreError::mapping(format!(
                    "can't merge a non object mapping [{}] with an object mapping of type [nested]",
                    path
                )));
            }
        }

        for (path, entry) in mapping.iter() {
            let nested = index_state.mapped_paths.entry(path.clone()).or_insert(false);
            *nested |= entry.nested;
        }
        Ok(())
    }

    async fn bulk_apply(
        &self,
        index: &str,
        updates: &[EntityUpdate],
    ) -> Result<BatchOperationSummary, StoreError> {
        let mut state = self.lock();
        state.events.push(StoreEvent::Bulk {
            index: index.to_string(),
            entity_ids: updates.iter().map(|u| u.entity_id.clone()).collect(),
        });

        let index_state = state.indices.get_mut(index).ok_or_else(|| missing_index(index))?;

        let results = updates
            .iter()
            .map(|update| {
                if self.rejected_entities.contains(&update.entity_id) {
                    return BatchOperationResult::failed(&update.entity_id, "rejected by store");
                }

                let document = index_state
                    .documents
                    .entry(update.entity_id.clone())
                    .or_default();
                let outcome = update.operation.clone().apply(document);
                for path in document.keys() {
                    index_state.mapped_paths.entry(path.clone()).or_insert(false);
                }

                debug!(entity_id = %update.entity_id, ?outcome, "Applied operation");
                BatchOperationResult::succeeded(&update.entity_id)
            })
            .collect();

        Ok(BatchOperationSummary::from_results(results))
    }

    async fn refresh(&self, index: &str) -> Result<(), StoreError> {
        let mut state = self.lock();
        state.events.push(StoreEvent::Refresh {
            index: index.to_string(),
        });
        if !state.indices.contains_key(index) {
            return Err(missing_index(index));
        }
        Ok(())
    }

    fn scan_documents<'a>(&'a self, index: &'a str) -> DocumentStream<'a> {
        let hits: Vec<Result<DocumentHit, StoreError>> = match self.lock().indices.get(index) {
            Some(state) => state
                .documents
                .iter()
                .map(|(id, source)| {
                    Ok(DocumentHit {
                        id: id.clone(),
                        source: source.clone(),
                    })
                })
                .collect(),
            None => vec![Err(missing_index(index))],
        };
        stream::iter(hits).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigquery_indexer_shared::MappingEntry;
    use futures::TryStreamExt;
    use serde_json::{json, Value};

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    fn samples_mapping() -> MappingTree {
        let mut mapping = MappingTree::new();
        mapping.insert("samples", MappingEntry::nested());
        mapping
    }

    #[tokio::test]
    async fn test_partial_updates_merge_at_top_level() {
        let store = InMemoryStore::new();
        store.ensure_index("idx").await.unwrap();

        store
            .bulk_apply("idx", &[EntityUpdate::partial("P1", doc(json!({"a.b.c.x": 1})))])
            .await
            .unwrap();
        store
            .bulk_apply("idx", &[EntityUpdate::partial("P1", doc(json!({"a.b.d.y": 2})))])
            .await
            .unwrap();

        assert_eq!(
            store.document("idx", "P1"),
            Some(doc(json!({"a.b.c.x": 1, "a.b.d.y": 2})))
        );
    }

    #[tokio::test]
    async fn test_nested_mapping_after_flat_write_is_rejected() {
        let store = InMemoryStore::new();
        store.ensure_index("idx").await.unwrap();
        store
            .bulk_apply(
                "idx",
                &[EntityUpdate::merge_sample("P1", "sid", doc(json!({"sid": "S1"})))],
            )
            .await
            .unwrap();

        let result = store.put_mapping("idx", &samples_mapping()).await;

        assert!(matches!(result, Err(StoreError::MappingError(_))));
    }

    #[tokio::test]
    async fn test_nested_mapping_before_write_is_accepted() {
        let store = InMemoryStore::new();
        store.ensure_index("idx").await.unwrap();

        store.put_mapping("idx", &samples_mapping()).await.unwrap();
        store
            .bulk_apply(
                "idx",
                &[EntityUpdate::merge_sample("P1", "sid", doc(json!({"sid": "S1"})))],
            )
            .await
            .unwrap();
        store.put_mapping("idx", &samples_mapping()).await.unwrap();
    }

    #[tokio::test]
    async fn test_rejected_entity_is_reported() {
        let store = InMemoryStore::new().with_rejected_entity("P2");
        store.ensure_index("idx").await.unwrap();

        let summary = store
            .bulk_apply(
                "idx",
                &[
                    EntityUpdate::partial("P1", doc(json!({"x": 1}))),
                    EntityUpdate::partial("P2", doc(json!({"x": 2}))),
                ],
            )
            .await
            .unwrap();

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.failures().next().unwrap().entity_id, "P2");
        assert!(store.document("idx", "P2").is_none());
    }

    #[tokio::test]
    async fn test_scan_documents() {
        let store = InMemoryStore::new();
        store.ensure_index("idx").await.unwrap();
        store
            .bulk_apply(
                "idx",
                &[
                    EntityUpdate::partial("P1", doc(json!({"x": 1}))),
                    EntityUpdate::partial("P2", doc(json!({"x": 2}))),
                ],
            )
            .await
            .unwrap();

        let hits: Vec<DocumentHit> = store.scan_documents("idx").try_collect().await.unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "P1");
    }

    #[tokio::test]
    async fn test_unknown_index_errors() {
        let store = InMemoryStore::new();

        assert!(store.bulk_apply("missing", &[]).await.is_err());
        assert!(store.refresh("missing").await.is_err());
        assert!(store.put_mapping("missing", &MappingTree::new()).await.is_err());
    }
}
