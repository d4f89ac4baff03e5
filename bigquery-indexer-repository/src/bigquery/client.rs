//! BigQuery REST table source.
//!
//! Schemas come from `tables.get`. Rows come from a `SELECT *` query job
//! billed to the configured project, read page by page through
//! `getQueryResults`, so a table is never held in memory at once.

use std::time::Duration;

use async_trait::async_trait;
use futures::{stream, StreamExt, TryStreamExt};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, instrument};

use crate::bigquery::decode::decode_row;
use crate::errors::SourceError;
use crate::interfaces::{RowStream, TableSource};
use bigquery_indexer_shared::{
    standard_table_name, Row, SchemaField, TableReference, TableSchema,
};

/// Default BigQuery REST endpoint.
pub const DEFAULT_BIGQUERY_URL: &str = "https://bigquery.googleapis.com/bigquery/v2";

/// Configuration for the BigQuery source.
#[derive(Debug, Clone)]
pub struct BigQueryConfig {
    /// Project billed for query jobs.
    pub billing_project_id: String,
    /// OAuth bearer token sent with every request, if any.
    pub access_token: Option<String>,
    /// REST endpoint.
    pub base_url: String,
    /// Rows requested per result page.
    pub page_size: u32,
    /// How long each `getQueryResults` call waits for the job to finish.
    pub poll_timeout: Duration,
}

impl BigQueryConfig {
    pub fn new(billing_project_id: impl Into<String>) -> Self {
        Self {
            billing_project_id: billing_project_id.into(),
            access_token: None,
            base_url: DEFAULT_BIGQUERY_URL.to_string(),
            page_size: 10_000,
            poll_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_access_token(mut self, access_token: Option<String>) -> Self {
        self.access_token = access_token;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct TableResource {
    id: Option<String>,
    schema: Option<SchemaResource>,
}

#[derive(Debug, Deserialize)]
struct SchemaResource {
    #[serde(default)]
    fields: Vec<SchemaField>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    job_reference: Option<JobReference>,
    #[serde(default)]
    job_complete: bool,
    #[serde(default)]
    rows: Vec<Value>,
    page_token: Option<String>,
    #[serde(default)]
    errors: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobReference {
    job_id: String,
    location: Option<String>,
}

/// Position in a query result set.
enum QueryState {
    Start,
    Page {
        job: JobReference,
        page_token: Option<String>,
    },
    Done,
}

/// Table source backed by the BigQuery REST API.
pub struct BigQuerySource {
    client: Client,
    config: BigQueryConfig,
}

impl BigQuerySource {
    pub fn new(config: BigQueryConfig) -> Result<Self, SourceError> {
        let client = Client::builder()
            .build()
            .map_err(|e| SourceError::connection(e.to_string()))?;

        info!(
            billing_project_id = %config.billing_project_id,
            base_url = %config.base_url,
            "Created BigQuery client"
        );

        Ok(Self { client, config })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.config.access_token {
            Some(ref token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn table_url(&self, reference: &TableReference) -> String {
        format!(
            "{}/projects/{}/datasets/{}/tables/{}",
            self.config.base_url,
            urlencoding::encode(&reference.project_id),
            urlencoding::encode(&reference.dataset_id),
            urlencoding::encode(&reference.table_id)
        )
    }

    fn queries_url(&self) -> String {
        format!(
            "{}/projects/{}/queries",
            self.config.base_url,
            urlencoding::encode(&self.config.billing_project_id)
        )
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, SourceError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| SourceError::connection(e.to_string()))?;
        Self::check_status(response).await
    }

    async fn check_status(response: Response) -> Result<Response, SourceError> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(SourceError::request(format!("status {}: {}", status, body)))
    }

    async fn run_query(&self, table: &TableSchema) -> Result<QueryResponse, SourceError> {
        let request = self.client.post(self.queries_url()).json(&json!({
            "query": format!("SELECT * FROM `{}`", table.full_name),
            "useLegacySql": false,
            "maxResults": self.config.page_size,
            "timeoutMs": self.config.poll_timeout.as_millis() as u64
        }));

        parse_query_response(self.send(request).await?).await
    }

    async fn query_results(
        &self,
        job: &JobReference,
        page_token: Option<&str>,
    ) -> Result<QueryResponse, SourceError> {
        let mut request = self
            .client
            .get(format!(
                "{}/{}",
                self.queries_url(),
                urlencoding::encode(&job.job_id)
            ))
            .query(&[
                ("maxResults", self.config.page_size.to_string()),
                (
                    "timeoutMs",
                    (self.config.poll_timeout.as_millis() as u64).to_string(),
                ),
            ]);
        if let Some(ref location) = job.location {
            request = request.query(&[("location", location)]);
        }
        if let Some(page_token) = page_token {
            request = request.query(&[("pageToken", page_token)]);
        }

        parse_query_response(self.send(request).await?).await
    }

    /// Fetch the next page of decoded rows and the state that follows it.
    async fn fetch_page(
        &self,
        table: &TableSchema,
        state: QueryState,
    ) -> Result<Option<(Vec<Row>, QueryState)>, SourceError> {
        let (job, mut response) = match state {
            QueryState::Done => return Ok(None),
            QueryState::Start => {
                let response = self.run_query(table).await?;
                let job = response
                    .job_reference
                    .clone()
                    .ok_or_else(|| SourceError::query("query response has no job reference"))?;
                debug!(table = %table.full_name, job_id = %job.job_id, "Started query job");
                (job, response)
            }
            QueryState::Page { job, page_token } => {
                let response = self.query_results(&job, page_token.as_deref()).await?;
                (job, response)
            }
        };

        while !response.job_complete {
            debug!(job_id = %job.job_id, "Waiting for query job");
            response = self.query_results(&job, None).await?;
        }

        let rows = response
            .rows
            .iter()
            .map(|row| decode_row(&table.fields, row))
            .collect::<Result<Vec<_>, _>>()?;

        let next = match response.page_token {
            Some(page_token) => QueryState::Page {
                job,
                page_token: Some(page_token),
            },
            None => QueryState::Done,
        };

        Ok(Some((rows, next)))
    }
}

async fn parse_query_response(response: Response) -> Result<QueryResponse, SourceError> {
    let body: QueryResponse = response
        .json()
        .await
        .map_err(|e| SourceError::decode(e.to_string()))?;

    if !body.errors.is_empty() {
        return Err(SourceError::query(Value::Array(body.errors).to_string()));
    }
    Ok(body)
}

#[async_trait]
impl TableSource for BigQuerySource {
    #[instrument(skip(self))]
    async fn get_table(&self, table_name: &str) -> Result<TableSchema, SourceError> {
        let reference = TableReference::parse(table_name)
            .ok_or_else(|| SourceError::invalid_table_name(table_name))?;

        let response = self
            .authorize(self.client.get(self.table_url(&reference)))
            .send()
            .await
            .map_err(|e| SourceError::connection(e.to_string()))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(SourceError::table_not_found(table_name));
        }
        let response = Self::check_status(response).await?;

        let resource: TableResource = response
            .json()
            .await
            .map_err(|e| SourceError::decode(e.to_string()))?;

        let full_name = resource
            .id
            .as_deref()
            .map(standard_table_name)
            .unwrap_or_else(|| reference.full_name());
        let fields = resource.schema.map(|schema| schema.fields).unwrap_or_default();

        Ok(TableSchema::new(full_name, fields))
    }

    fn read_rows<'a>(&'a self, table: &'a TableSchema) -> RowStream<'a> {
        stream::try_unfold(QueryState::Start, move |state| self.fetch_page(table, state))
            .map_ok(|rows| stream::iter(rows.into_iter().map(Ok)))
            .try_flatten()
            .boxed()
    }
}
