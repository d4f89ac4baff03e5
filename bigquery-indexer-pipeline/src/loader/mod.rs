//! Loader module for the indexing pipeline.
//!
//! Submits entity updates to the document store in bulk batches.

use std::sync::Arc;
use std::time::Duration;

use futures::TryStreamExt;
use tracing::{debug, info, instrument, warn};

use crate::errors::PipelineError;
use crate::processor::UpdateStream;
use bigquery_indexer_repository::{BatchOperationResult, BatchOperationSummary, DocumentStore, StoreError};
use bigquery_indexer_shared::EntityUpdate;

/// Configuration for the bulk loader.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Number of updates sent per bulk request.
    pub batch_size: usize,
    /// Maximum number of retry attempts for a failed bulk request.
    pub max_retries: u32,
    /// Initial retry delay in milliseconds.
    pub initial_retry_delay_ms: u64,
    /// Maximum retry delay in milliseconds.
    pub max_retry_delay_ms: u64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            batch_size: 500,
            max_retries: 3,
            initial_retry_delay_ms: 100,
            max_retry_delay_ms: 5000,
        }
    }
}

/// Outcome of loading one update stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    /// Updates submitted.
    pub total: usize,
    pub succeeded: usize,
    /// Bulk requests sent.
    pub batches: usize,
    /// Items the store rejected, with the reason.
    pub failures: Vec<BatchOperationResult>,
}

impl LoadReport {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    fn absorb(&mut self, summary: BatchOperationSummary) {
        self.total += summary.total;
        self.succeeded += summary.succeeded;
        self.batches += 1;
        self.failures
            .extend(summary.results.into_iter().filter(|result| !result.success));
    }
}

/// Loader that streams entity updates into the document store.
///
/// Updates are pulled from the stream one batch at a time, so a table is never
/// held in memory. Every batch is submitted even if earlier items failed;
/// rejected items are collected in the report for the caller to act on.
pub struct BulkLoader {
    store: Arc<dyn DocumentStore>,
    config: LoaderConfig,
}

impl BulkLoader {
    /// Create a new bulk loader with the given store.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self::with_config(store, LoaderConfig::default())
    }

    /// Create a new bulk loader with custom configuration.
    pub fn with_config(store: Arc<dyn DocumentStore>, config: LoaderConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Submit every update of the stream to `index`.
    ///
    /// Stream errors and store errors that survive the retries abort the load;
    /// per-item rejections do not.
    #[instrument(skip(self, updates), fields(index = %index))]
    pub async fn load(
        &self,
        index: &str,
        mut updates: UpdateStream<'_>,
    ) -> Result<LoadReport, PipelineError> {
        let batch_size = self.config.batch_size.max(1);
        let mut pending: Vec<EntityUpdate> = Vec::with_capacity(batch_size);
        let mut report = LoadReport::default();

        while let Some(update) = updates.try_next().await? {
            pending.push(update);
            if pending.len() >= batch_size {
                self.flush(index, &mut pending, &mut report).await?;
            }
        }
        self.flush(index, &mut pending, &mut report).await?;

        info!(
            total = report.total,
            failed = report.failed(),
            batches = report.batches,
            "Loaded updates"
        );
        Ok(report)
    }

    async fn flush(
        &self,
        index: &str,
        pending: &mut Vec<EntityUpdate>,
        report: &mut LoadReport,
    ) -> Result<(), PipelineError> {
        if pending.is_empty() {
            return Ok(());
        }

        let summary = self.bulk_apply_with_retry(index, pending).await?;
        debug!(
            count = pending.len(),
            failed = summary.failed,
            "Flushed batch to document store"
        );
        for failure in summary.failures() {
            warn!(
                entity_id = %failure.entity_id,
                error = failure.error.as_deref().unwrap_or("unknown"),
                "Store rejected update"
            );
        }

        report.absorb(summary);
        pending.clear();
        Ok(())
    }

    /// Submit a batch with exponential backoff retry logic.
    async fn bulk_apply_with_retry(
        &self,
        index: &str,
        batch: &[EntityUpdate],
    ) -> Result<BatchOperationSummary, StoreError> {
        let mut delay_ms = self.config.initial_retry_delay_ms;
        let mut attempt = 0;

        loop {
            match self.store.bulk_apply(index, batch).await {
                Ok(summary) => {
                    if attempt > 0 {
                        info!(attempt = attempt, count = batch.len(), "Bulk request succeeded after retry");
                    }
                    return Ok(summary);
                }
                Err(e) if Self::is_retryable_error(&e) && attempt < self.config.max_retries => {
                    attempt += 1;
                    warn!(
                        attempt = attempt,
                        max_retries = self.config.max_retries,
                        delay_ms = delay_ms,
                        error = %e,
                        "Bulk request failed, retrying"
                    );

                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    delay_ms = std::cmp::min(delay_ms * 2, self.config.max_retry_delay_ms);
                }
                Err(e) => {
                    debug!(attempt = attempt, error = %e, "Giving up on bulk request");
                    return Err(e);
                }
            }
        }
    }

    /// Determine if an error is retryable (transient failures).
    fn is_retryable_error(error: &StoreError) -> bool {
        match error {
            StoreError::ConnectionError(_) | StoreError::ParseError(_) => true,
            StoreError::BulkOperationError(msg) => {
                let msg_lower = msg.to_lowercase();
                msg_lower.contains("rate limit")
                    || msg_lower.contains("timeout")
                    || msg_lower.contains("timed out")
                    || msg_lower.contains("503")
                    || msg_lower.contains("429")
            }
            StoreError::ValidationError(_)
            | StoreError::IndexCreationError(_)
            | StoreError::MappingError(_)
            | StoreError::RefreshError(_)
            | StoreError::ScanError(_)
            | StoreError::BatchSizeExceeded { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bigquery_indexer_repository::DocumentStream;
    use bigquery_indexer_shared::{Document, MappingTree};
    use futures::{stream, StreamExt};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Mock store that fails the first `failures` bulk calls.
    struct MockStore {
        bulk_calls: AtomicUsize,
        failures: usize,
        error: StoreError,
        batch_sizes: Mutex<Vec<usize>>,
        rejected: Option<String>,
    }

    impl MockStore {
        fn new() -> Self {
            Self::failing(0, StoreError::connection("refused"))
        }

        fn failing(failures: usize, error: StoreError) -> Self {
            Self {
                bulk_calls: AtomicUsize::new(0),
                failures,
                error,
                batch_sizes: Mutex::new(Vec::new()),
                rejected: None,
            }
        }
    }

    #[async_trait]
    impl DocumentStore for MockStore {
        async fn ensure_index(&self, _index: &str) -> Result<(), StoreError> {
            Ok(())
        }

        async fn put_mapping(&self, _index: &str, _mapping: &MappingTree) -> Result<(), StoreError> {
            Ok(())
        }

        async fn bulk_apply(
            &self,
            _index: &str,
            updates: &[EntityUpdate],
        ) -> Result<BatchOperationSummary, StoreError> {
            let call = self.bulk_calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(self.error.clone());
            }
            self.batch_sizes.lock().unwrap().push(updates.len());

            let results = updates
                .iter()
                .map(|u| match self.rejected {
                    Some(ref id) if *id == u.entity_id => {
                        BatchOperationResult::failed(&u.entity_id, "mapper_parsing_exception")
                    }
                    _ => BatchOperationResult::succeeded(&u.entity_id),
                })
                .collect();
            Ok(BatchOperationSummary::from_results(results))
        }

        async fn refresh(&self, _index: &str) -> Result<(), StoreError> {
            Ok(())
        }

        fn scan_documents<'a>(&'a self, _index: &'a str) -> DocumentStream<'a> {
            stream::empty().boxed()
        }
    }

    fn updates(count: usize) -> UpdateStream<'static> {
        let items: Vec<Result<EntityUpdate, PipelineError>> = (0..count)
            .map(|i| Ok(EntityUpdate::partial(format!("P{}", i), Document::new())))
            .collect();
        stream::iter(items).boxed()
    }

    fn config(batch_size: usize) -> LoaderConfig {
        LoaderConfig {
            batch_size,
            ..LoaderConfig::default()
        }
    }

    #[tokio::test]
    async fn test_load_in_batches() {
        let store = Arc::new(MockStore::new());
        let loader = BulkLoader::with_config(store.clone(), config(2));

        let report = loader.load("idx", updates(5)).await.unwrap();

        assert_eq!(report.total, 5);
        assert_eq!(report.succeeded, 5);
        assert_eq!(report.batches, 3);
        assert!(report.is_complete());
        assert_eq!(*store.batch_sizes.lock().unwrap(), vec![2, 2, 1]);
    }

    #[tokio::test]
    async fn test_empty_stream_sends_nothing() {
        let store = Arc::new(MockStore::new());
        let loader = BulkLoader::new(store.clone());

        let report = loader.load("idx", updates(0)).await.unwrap();

        assert_eq!(report, LoadReport::default());
        assert_eq!(store.bulk_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_transient_errors() {
        let store = Arc::new(MockStore::failing(2, StoreError::bulk("status 429: Too Many Requests")));
        let loader = BulkLoader::new(store.clone());

        let report = loader.load("idx", updates(3)).await.unwrap();

        assert_eq!(report.succeeded, 3);
        assert_eq!(store.bulk_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_retries() {
        let store = Arc::new(MockStore::failing(10, StoreError::connection("refused")));
        let loader = BulkLoader::new(store.clone());

        let result = loader.load("idx", updates(1)).await;

        assert!(matches!(
            result,
            Err(PipelineError::StoreError(StoreError::ConnectionError(_)))
        ));
        assert_eq!(store.bulk_calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_does_not_retry_permanent_errors() {
        let store = Arc::new(MockStore::failing(1, StoreError::bulk("status 400: bad request")));
        let loader = BulkLoader::new(store.clone());

        assert!(loader.load("idx", updates(1)).await.is_err());
        assert_eq!(store.bulk_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_item_failures_are_reported_and_loading_continues() {
        let mut store = MockStore::new();
        store.rejected = Some("P1".to_string());
        let store = Arc::new(store);
        let loader = BulkLoader::with_config(store.clone(), config(2));

        let report = loader.load("idx", updates(4)).await.unwrap();

        assert_eq!(report.total, 4);
        assert_eq!(report.succeeded, 3);
        assert_eq!(report.batches, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].entity_id, "P1");
        assert_eq!(
            report.failures[0].error.as_deref(),
            Some("mapper_parsing_exception")
        );
    }

    #[tokio::test]
    async fn test_stream_error_aborts_load() {
        let store = Arc::new(MockStore::new());
        let loader = BulkLoader::new(store.clone());
        let items: Vec<Result<EntityUpdate, PipelineError>> = vec![
            Ok(EntityUpdate::partial("P1", Document::new())),
            Err(PipelineError::config("boom")),
        ];

        let result = loader.load("idx", stream::iter(items).boxed()).await;

        assert!(matches!(result, Err(PipelineError::ConfigError(_))));
        assert_eq!(store.bulk_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_is_retryable_error() {
        assert!(BulkLoader::is_retryable_error(&StoreError::connection("reset")));
        assert!(BulkLoader::is_retryable_error(&StoreError::bulk("status 503: unavailable")));
        assert!(!BulkLoader::is_retryable_error(&StoreError::bulk("status 400: bad")));
        assert!(!BulkLoader::is_retryable_error(&StoreError::mapping("conflict")));
    }
}
