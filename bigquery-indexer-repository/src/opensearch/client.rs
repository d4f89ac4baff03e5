//! OpenSearch document store implementation.
//!
//! This module provides the concrete implementation of `DocumentStore` using
//! the OpenSearch Rust client.

use async_trait::async_trait;
use futures::{stream, StreamExt, TryStreamExt};
use opensearch::{
    http::{
        request::JsonBody,
        response::Response,
        transport::{SingleNodeConnectionPool, TransportBuilder},
    },
    indices::{IndicesCreateParts, IndicesExistsParts, IndicesPutMappingParts, IndicesRefreshParts},
    BulkParts, ClearScrollParts, OpenSearch, ScrollParts, SearchParts,
};
use serde_json::{json, Value};
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use crate::config::StoreConfig;
use crate::errors::StoreError;
use crate::interfaces::{DocumentStore, DocumentStream};
use crate::opensearch::bulk::{bulk_body, parse_bulk_response};
use crate::opensearch::index_config::get_index_settings;
use crate::types::{BatchOperationSummary, DocumentHit};
use bigquery_indexer_shared::{Document, EntityUpdate, MappingTree};

/// OpenSearch document store.
///
/// # Example
///
/// ```ignore
/// let store = OpenSearchStore::new("http://localhost:9200", StoreConfig::default()).await?;
///
/// store.ensure_index("1000_genomes").await?;
/// let summary = store.bulk_apply("1000_genomes", &updates).await?;
/// println!("{} of {} operations failed", summary.failed, summary.total);
/// ```
pub struct OpenSearchStore {
    client: OpenSearch,
    config: StoreConfig,
}

/// Position in a full-index scroll.
enum ScrollState {
    Start,
    Continue(String),
    Done,
}

impl OpenSearchStore {
    /// Create a new store connected to the specified URL.
    ///
    /// # Arguments
    ///
    /// * `url` - The server URL (e.g., "http://localhost:9200")
    /// * `config` - Batch, scroll and index creation settings
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchStore)` - A new store instance
    /// * `Err(StoreError)` - If connection setup fails
    pub async fn new(url: &str, config: StoreConfig) -> Result<Self, StoreError> {
        let parsed_url = Url::parse(url).map_err(|e| StoreError::validation(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .build()
            .map_err(|e| StoreError::connection(e.to_string()))?;

        let client = OpenSearch::new(transport);

        info!(url = %url, "Created OpenSearch client");

        Ok(Self { client, config })
    }

    /// Read a failed response's body for error reporting.
    async fn error_body(response: Response) -> String {
        let status = response.status_code();
        let body = response.text().await.unwrap_or_default();
        format!("status {}: {}", status, body)
    }

    async fn create_index(&self, index: &str) -> Result<(), StoreError> {
        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(index))
            .body(get_index_settings(&self.config))
            .send()
            .await
            .map_err(|e| StoreError::connection(e.to_string()))?;

        if response.status_code().is_success() {
            info!(index = %index, "Created index");
            return Ok(());
        }

        let body = Self::error_body(response).await;
        // Another writer may have created it between the existence check and now.
        if body.contains("resource_already_exists_exception") {
            debug!(index = %index, "Index was created concurrently");
            return Ok(());
        }

        error!(index = %index, body = %body, "Index creation failed");
        Err(StoreError::index_creation(format!(
            "Failed to create index {}: {}",
            index, body
        )))
    }

    /// Fetch one scroll page and the state that follows it.
    async fn fetch_page(
        &self,
        index: &str,
        state: ScrollState,
    ) -> Result<Option<(Vec<DocumentHit>, ScrollState)>, StoreError> {
        let response = match state {
            ScrollState::Done => return Ok(None),
            ScrollState::Start => self
                .client
                .search(SearchParts::Index(&[index]))
                .scroll(&self.config.scroll_keep_alive)
                .size(self.config.scroll_size)
                .body(json!({
                    "query": { "match_all": {} },
                    "sort": ["_doc"]
                }))
                .send()
                .await,
            ScrollState::Continue(ref scroll_id) => self
                .client
                .scroll(ScrollParts::None)
                .body(json!({
                    "scroll": self.config.scroll_keep_alive,
                    "scroll_id": scroll_id
                }))
                .send()
                .await,
        }
        .map_err(|e| StoreError::connection(e.to_string()))?;

        if !response.status_code().is_success() {
            let body = Self::error_body(response).await;
            error!(index = %index, body = %body, "Scroll request failed");
            return Err(StoreError::scan(body));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| StoreError::parse(e.to_string()))?;
        let (scroll_id, hits) = parse_scroll_page(&body)?;

        if hits.is_empty() {
            if let Some(scroll_id) = scroll_id {
                self.clear_scroll(&scroll_id).await;
            }
            return Ok(None);
        }

        debug!(index = %index, count = hits.len(), "Fetched scroll page");
        let next = match scroll_id {
            Some(scroll_id) => ScrollState::Continue(scroll_id),
            None => ScrollState::Done,
        };
        Ok(Some((hits, next)))
    }

    /// Release a scroll context. Failures are logged and ignored; the context
    /// expires with its keep-alive.
    async fn clear_scroll(&self, scroll_id: &str) {
        let result = self
            .client
            .clear_scroll(ClearScrollParts::None)
            .body(json!({ "scroll_id": [scroll_id] }))
            .send()
            .await;

        if let Err(e) = result {
            warn!(error = %e, "Failed to clear scroll context");
        }
    }
}

/// Extract the scroll id and hits from a search or scroll response.
fn parse_scroll_page(body: &Value) -> Result<(Option<String>, Vec<DocumentHit>), StoreError> {
    let scroll_id = body
        .get("_scroll_id")
        .and_then(Value::as_str)
        .map(str::to_string);

    let hits = body
        .get("hits")
        .and_then(|hits| hits.get("hits"))
        .and_then(Value::as_array)
        .ok_or_else(|| StoreError::parse("Scroll response has no hits"))?;

    let documents = hits
        .iter()
        .map(|hit| {
            let id = hit
                .get("_id")
                .and_then(Value::as_str)
                .ok_or_else(|| StoreError::parse("Hit has no _id"))?;
            let source = match hit.get("_source") {
                Some(Value::Object(source)) => source.clone(),
                _ => Document::new(),
            };
            Ok(DocumentHit {
                id: id.to_string(),
                source,
            })
        })
        .collect::<Result<Vec<_>, StoreError>>()?;

    Ok((scroll_id, documents))
}

#[async_trait]
impl DocumentStore for OpenSearchStore {
    #[instrument(skip(self))]
    async fn ensure_index(&self, index: &str) -> Result<(), StoreError> {
        let response = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| StoreError::connection(e.to_string()))?;

        match response.status_code().as_u16() {
            200 => {
                debug!(index = %index, "Index already exists");
                Ok(())
            }
            404 => self.create_index(index).await,
            _ => {
                let body = Self::error_body(response).await;
                Err(StoreError::index_creation(format!(
                    "Failed to check index {}: {}",
                    index, body
                )))
            }
        }
    }

    #[instrument(skip(self, mapping), fields(paths = mapping.len()))]
    async fn put_mapping(&self, index: &str, mapping: &MappingTree) -> Result<(), StoreError> {
        let response = self
            .client
            .indices()
            .put_mapping(IndicesPutMappingParts::Index(&[index]))
            .body(mapping.to_mapping_body())
            .send()
            .await
            .map_err(|e| StoreError::connection(e.to_string()))?;

        if !response.status_code().is_success() {
            let body = Self::error_body(response).await;
            error!(index = %index, body = %body, "Mapping update rejected");
            return Err(StoreError::mapping(body));
        }

        debug!(index = %index, "Mapping updated");
        Ok(())
    }

    /// Submit updates as one bulk request.
    ///
    /// A non-success status for the request itself is an error; item-level
    /// failures are returned in the summary.
    async fn bulk_apply(
        &self,
        index: &str,
        updates: &[EntityUpdate],
    ) -> Result<BatchOperationSummary, StoreError> {
        if updates.is_empty() {
            return Ok(BatchOperationSummary::default());
        }

        self.config.validate_batch_size(updates.len())?;

        let body: Vec<JsonBody<Value>> = bulk_body(updates, self.config.retry_on_conflict)
            .into_iter()
            .map(JsonBody::from)
            .collect();

        let response = self
            .client
            .bulk(BulkParts::Index(index))
            .body(body)
            .send()
            .await
            .map_err(|e| StoreError::connection(e.to_string()))?;

        if !response.status_code().is_success() {
            let body = Self::error_body(response).await;
            error!(index = %index, body = %body, "Bulk request failed");
            return Err(StoreError::bulk(body));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| StoreError::parse(e.to_string()))?;

        let summary = parse_bulk_response(updates, &body)?;
        debug!(
            index = %index,
            total = summary.total,
            failed = summary.failed,
            "Bulk request completed"
        );
        Ok(summary)
    }

    async fn refresh(&self, index: &str) -> Result<(), StoreError> {
        let response = self
            .client
            .indices()
            .refresh(IndicesRefreshParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| StoreError::connection(e.to_string()))?;

        if !response.status_code().is_success() {
            let body = Self::error_body(response).await;
            return Err(StoreError::refresh(body));
        }

        debug!(index = %index, "Index refreshed");
        Ok(())
    }

    fn scan_documents<'a>(&'a self, index: &'a str) -> DocumentStream<'a> {
        stream::try_unfold(ScrollState::Start, move |state| self.fetch_page(index, state))
            .map_ok(|hits| stream::iter(hits.into_iter().map(Ok)))
            .try_flatten()
            .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scroll_page() {
        let body = json!({
            "_scroll_id": "abc",
            "hits": {
                "hits": [
                    {"_id": "P1", "_source": {"samples": [{"sid": "S1"}]}},
                    {"_id": "P2", "_source": {}}
                ]
            }
        });

        let (scroll_id, hits) = parse_scroll_page(&body).unwrap();

        assert_eq!(scroll_id.as_deref(), Some("abc"));
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "P1");
        assert_eq!(hits[0].source["samples"][0]["sid"], "S1");
        assert!(hits[1].source.is_empty());
    }

    #[test]
    fn test_parse_scroll_page_without_hits() {
        let body = json!({"_scroll_id": "abc"});

        assert!(matches!(
            parse_scroll_page(&body),
            Err(StoreError::ParseError(_))
        ));
    }

    #[tokio::test]
    async fn test_new_rejects_invalid_url() {
        let result = OpenSearchStore::new("not a url", StoreConfig::default()).await;

        assert!(matches!(result, Err(StoreError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_bulk_apply_empty_is_noop() {
        let store = OpenSearchStore::new("http://localhost:9200", StoreConfig::default())
            .await
            .unwrap();

        let summary = store.bulk_apply("entities", &[]).await.unwrap();

        assert_eq!(summary.total, 0);
    }

    #[tokio::test]
    async fn test_bulk_apply_rejects_oversized_batch() {
        let store = OpenSearchStore::new("http://localhost:9200", StoreConfig::with_max_batch_size(1))
            .await
            .unwrap();
        let updates = vec![
            EntityUpdate::partial("P1", Document::new()),
            EntityUpdate::partial("P2", Document::new()),
        ];

        let result = store.bulk_apply("entities", &updates).await;

        assert!(matches!(
            result,
            Err(StoreError::BatchSizeExceeded { provided: 2, max: 1 })
        ));
    }
}
