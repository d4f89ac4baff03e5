//! Request and response types for document store operations.

use bigquery_indexer_shared::Document;

/// Result of a bulk operation for a single entity.
///
/// Indicates whether the item succeeded and carries the store's reason if it
/// failed.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOperationResult {
    /// The document id the operation targeted.
    pub entity_id: String,
    /// Whether the operation succeeded.
    pub success: bool,
    /// Error reported by the store if the operation failed.
    pub error: Option<String>,
}

impl BatchOperationResult {
    pub fn succeeded(entity_id: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            success: true,
            error: None,
        }
    }

    pub fn failed(entity_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Summary of a bulk operation containing aggregate statistics and individual results.
///
/// A bulk request can partially fail; callers inspect `failed` and `results`
/// rather than relying on the request-level `Ok`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOperationSummary {
    /// Total number of items in the batch.
    pub total: usize,
    /// Number of successful operations.
    pub succeeded: usize,
    /// Number of failed operations.
    pub failed: usize,
    /// Individual results for each item, in request order.
    pub results: Vec<BatchOperationResult>,
}

impl BatchOperationSummary {
    /// Build a summary from per-item results.
    pub fn from_results(results: Vec<BatchOperationResult>) -> Self {
        let succeeded = results.iter().filter(|result| result.success).count();
        Self {
            total: results.len(),
            succeeded,
            failed: results.len() - succeeded,
            results,
        }
    }

    /// Fold another batch's results into this one.
    pub fn absorb(&mut self, other: BatchOperationSummary) {
        self.total += other.total;
        self.succeeded += other.succeeded;
        self.failed += other.failed;
        self.results.extend(other.results);
    }

    /// The results of failed items.
    pub fn failures(&self) -> impl Iterator<Item = &BatchOperationResult> {
        self.results.iter().filter(|result| !result.success)
    }
}

/// One document returned by a full-index scan.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentHit {
    /// The document id.
    pub id: String,
    /// The document source.
    pub source: Document,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_from_results() {
        let summary = BatchOperationSummary::from_results(vec![
            BatchOperationResult::succeeded("P1"),
            BatchOperationResult::failed("P2", "mapper_parsing_exception"),
            BatchOperationResult::succeeded("P3"),
        ]);

        assert_eq!(summary.total, 3);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 1);

        let failures: Vec<&str> = summary.failures().map(|r| r.entity_id.as_str()).collect();
        assert_eq!(failures, vec!["P2"]);
    }

    #[test]
    fn test_summary_absorb() {
        let mut summary = BatchOperationSummary::from_results(vec![BatchOperationResult::succeeded("P1")]);
        summary.absorb(BatchOperationSummary::from_results(vec![BatchOperationResult::failed(
            "P2", "boom",
        )]));

        assert_eq!(summary.total, 2);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.results.len(), 2);
    }
}
