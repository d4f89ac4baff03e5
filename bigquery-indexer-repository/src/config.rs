//! Configuration types for the document store.

/// Configuration for the OpenSearch document store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Maximum number of operations allowed in a single bulk request.
    /// Set to None to disable the limit (not recommended for production).
    pub max_batch_size: Option<usize>,
    /// Documents fetched per scroll page during a full-index scan.
    pub scroll_size: i64,
    /// How long the store keeps a scroll context alive between pages.
    pub scroll_keep_alive: String,
    /// Primary shards for newly created indices.
    pub number_of_shards: u32,
    /// Replicas for newly created indices.
    pub number_of_replicas: u32,
    /// Times the store retries an update that hit a version conflict.
    pub retry_on_conflict: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_batch_size: Some(1000),
            scroll_size: 500,
            scroll_keep_alive: "1m".to_string(),
            number_of_shards: 1,
            number_of_replicas: 1,
            retry_on_conflict: 3,
        }
    }
}

impl StoreConfig {
    /// Create a config with no batch size limit (use with caution).
    pub fn unlimited() -> Self {
        Self {
            max_batch_size: None,
            ..Self::default()
        }
    }

    /// Create a config with a custom batch size limit.
    pub fn with_max_batch_size(max_batch_size: usize) -> Self {
        Self {
            max_batch_size: Some(max_batch_size),
            ..Self::default()
        }
    }

    /// Check a batch against the configured limit.
    pub fn validate_batch_size(&self, size: usize) -> Result<(), crate::errors::StoreError> {
        if let Some(max) = self.max_batch_size {
            if size > max {
                return Err(crate::errors::StoreError::batch_size_exceeded(size, max));
            }
        }
        Ok(())
    }
}
