use crate::{
    bigquery::{
        auth::{ServiceAccountKey, TokenProvider},
        convert,
        models::{
            ErrorProto, ErrorResponse, FormatOptions, JobReference, QueryRequest, QueryResponse,
            TableList,
        },
        stream::BigQueryRowStream,
    },
    error::WarehouseError,
    warehouse::{RowStream, Warehouse},
};
use async_trait::async_trait;
use planner::query::{ast::select::Select, dialect::BigQuery, renderer::to_sql};
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use std::{
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};
use tracing::{debug, info};

pub const DEFAULT_BASE_URL: &str = "https://bigquery.googleapis.com/bigquery/v2";

/// Server-side wait per `getQueryResults` long poll.
const POLL_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone)]
pub struct BigQueryOptions {
    pub project_id: String,
    /// Processing location of the dataset (`US`, `EU`, a region). `None` lets
    /// the service infer it.
    pub location: Option<String>,
    pub base_url: String,
}

impl BigQueryOptions {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            location: None,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_location(mut self, location: Option<String>) -> Self {
        self.location = location.filter(|l| !l.trim().is_empty());
        self
    }
}

/// Warehouse client over the BigQuery REST API, cheap to clone.
#[derive(Clone)]
pub struct BigQueryClient {
    inner: Arc<ClientInner>,
}

pub(crate) struct ClientInner {
    http: reqwest::Client,
    auth: TokenProvider,
    options: BigQueryOptions,
    closed: AtomicBool,
}

impl BigQueryClient {
    pub fn new(key: ServiceAccountKey, options: BigQueryOptions) -> Result<Self, WarehouseError> {
        let http = reqwest::Client::new();
        let auth = TokenProvider::new(http.clone(), key)?;
        info!(
            project = %options.project_id,
            location = options.location.as_deref().unwrap_or("auto"),
            "Created BigQuery client"
        );
        Ok(Self {
            inner: Arc::new(ClientInner {
                http,
                auth,
                options,
                closed: AtomicBool::new(false),
            }),
        })
    }

    pub async fn from_service_account_file(
        path: impl AsRef<Path>,
        options: BigQueryOptions,
    ) -> Result<Self, WarehouseError> {
        let key = ServiceAccountKey::from_file(path).await?;
        Self::new(key, options)
    }
}

impl ClientInner {
    fn ensure_open(&self) -> Result<(), WarehouseError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(WarehouseError::Closed);
        }
        Ok(())
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/projects/{}/{path}",
            self.options.base_url.trim_end_matches('/'),
            self.options.project_id
        )
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, WarehouseError> {
        self.ensure_open()?;
        let token = self.auth.token().await?;
        let response = request.bearer_auth(token).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status.as_u16(), &body));
        }

        Ok(response.json::<T>().await?)
    }

    async fn submit(&self, sql: String, max_results: Option<u64>) -> Result<QueryResponse, WarehouseError> {
        let request = QueryRequest {
            query: sql,
            use_legacy_sql: false,
            location: self.options.location.clone(),
            max_results,
            timeout_ms: POLL_TIMEOUT_MS,
            format_options: FormatOptions {
                use_int64_timestamp: true,
            },
        };

        let mut response: QueryResponse = self
            .send(self.http.post(self.url("queries")).json(&request))
            .await?;

        while !response.job_complete {
            let job = response
                .job_reference
                .clone()
                .ok_or_else(|| WarehouseError::Decode("query response without job reference".into()))?;
            debug!(job_id = %job.job_id, "Waiting for query job");
            let mut next = self.get_query_results(&job, None).await?;
            if next.job_reference.is_none() {
                next.job_reference = Some(job);
            }
            response = next;
        }

        if let Some(err) = response.errors.first() {
            return Err(job_error(err));
        }
        Ok(response)
    }

    pub(crate) async fn get_query_results(
        &self,
        job: &JobReference,
        page_token: Option<&str>,
    ) -> Result<QueryResponse, WarehouseError> {
        let mut query: Vec<(&str, String)> = vec![
            ("timeoutMs", POLL_TIMEOUT_MS.to_string()),
            ("formatOptions.useInt64Timestamp", "true".to_string()),
        ];
        if let Some(location) = job.location.as_ref().or(self.options.location.as_ref()) {
            query.push(("location", location.clone()));
        }
        if let Some(token) = page_token {
            query.push(("pageToken", token.to_string()));
        }

        let url = self.url(&format!("queries/{}", job.job_id));
        self.send(self.http.get(url).query(&query)).await
    }
}

#[async_trait]
impl Warehouse for BigQueryClient {
    async fn query(&self, query: &Select) -> Result<Box<dyn RowStream>, WarehouseError> {
        let sql = to_sql(query, &BigQuery);
        debug!(sql = %sql, "Running query");

        let response = self.inner.submit(sql, query.limit).await?;
        let job = response
            .job_reference
            .clone()
            .ok_or_else(|| WarehouseError::Decode("query response without job reference".into()))?;
        let schema = response
            .schema
            .as_ref()
            .map(convert::schema_from)
            .unwrap_or_default();

        Ok(Box::new(BigQueryRowStream::new(
            Arc::clone(&self.inner),
            &query.from.name,
            job,
            schema,
            response.rows,
            response.page_token,
        )))
    }

    async fn list_tables(&self, dataset: &str) -> Result<Vec<String>, WarehouseError> {
        let url = self.inner.url(&format!("datasets/{dataset}/tables"));
        let mut tables = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self.inner.http.get(&url);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token)]);
            }
            let page: TableList = self.inner.send(request).await?;
            tables.extend(page.tables.into_iter().map(|t| t.table_reference.table_id));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        debug!(dataset, count = tables.len(), "Listed tables");
        Ok(tables)
    }

    async fn close(&self) -> Result<(), WarehouseError> {
        if !self.inner.closed.swap(true, Ordering::SeqCst) {
            info!("Closed BigQuery client");
        }
        Ok(())
    }
}

/// Maps an error response body to a [`WarehouseError`].
pub(crate) fn api_error(status: u16, body: &str) -> WarehouseError {
    let parsed = serde_json::from_str::<ErrorResponse>(body).ok();
    let reason = parsed
        .as_ref()
        .and_then(|r| r.error.errors.first())
        .and_then(|e| e.reason.clone());
    let message = parsed
        .map(|r| r.error.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.to_string());

    if status == 404 || reason.as_deref() == Some("notFound") {
        return WarehouseError::NotFound(message);
    }
    WarehouseError::Api {
        status,
        reason,
        message,
    }
}

fn job_error(err: &ErrorProto) -> WarehouseError {
    if err.reason.as_deref() == Some("notFound") {
        return WarehouseError::NotFound(err.message.clone());
    }
    WarehouseError::Api {
        status: 400,
        reason: err.reason.clone(),
        message: err.message.clone(),
    }
}
