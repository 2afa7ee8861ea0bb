//! OpenSearch provider implementation.
//!
//! This module provides the concrete implementation of `SearchIndexProvider`
//! using the OpenSearch Rust crate.

use std::time::Duration;

use async_trait::async_trait;
use movies_etl_shared::Collection;
use opensearch::{
    http::request::JsonBody,
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    indices::{IndicesCreateParts, IndicesExistsParts},
    BulkParts, OpenSearch,
};
use serde_json::{json, Value};
use tracing::{debug, error, info};
use url::Url;

use crate::errors::search_index_error::is_transient_status;
use crate::errors::SearchIndexError;
use crate::interfaces::SearchIndexProvider;
use crate::opensearch::index_config::get_index_settings;
use crate::types::{BatchOperationResult, BatchOperationSummary, UpsertDocumentRequest};

/// OpenSearch provider implementation.
///
/// # Example
///
/// ```ignore
/// let provider = OpenSearchProvider::new("http://localhost:9200")?;
/// provider.ensure_index_exists(Collection::Movies).await?;
/// let summary = provider.bulk_upsert_documents(Collection::Movies, &requests).await?;
/// ```
pub struct OpenSearchProvider {
    client: OpenSearch,
}

/// Upper bound on a single request when the caller does not pick one.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

impl OpenSearchProvider {
    /// Create a new OpenSearch provider connected to the specified URL.
    ///
    /// # Arguments
    ///
    /// * `url` - The OpenSearch server URL (e.g., "http://localhost:9200")
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchProvider)` - A new provider instance
    /// * `Err(SearchIndexError)` - If the URL is invalid or transport setup fails
    pub fn new(url: &str) -> Result<Self, SearchIndexError> {
        Self::with_timeout(url, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Like [`OpenSearchProvider::new`], failing any request that takes longer
    /// than `timeout` with a transient connection error.
    pub fn with_timeout(url: &str, timeout: Duration) -> Result<Self, SearchIndexError> {
        let parsed_url =
            Url::parse(url).map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .timeout(timeout)
            .build()
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let client = OpenSearch::new(transport);

        info!(url = %url, timeout_ms = timeout.as_millis() as u64, "Created OpenSearch provider");

        Ok(Self { client })
    }

    /// Check the cluster answers at all.
    pub async fn ping(&self) -> Result<(), SearchIndexError> {
        let response = self
            .client
            .ping()
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            return Err(SearchIndexError::from_status(
                status.as_u16(),
                "Ping failed",
            ));
        }
        Ok(())
    }

    /// Interleave action and source lines for the `_bulk` API.
    fn bulk_body(requests: &[UpsertDocumentRequest]) -> Vec<JsonBody<Value>> {
        let mut body: Vec<JsonBody<Value>> = Vec::with_capacity(requests.len() * 2);
        for request in requests {
            body.push(json!({ "index": { "_id": request.document_id } }).into());
            body.push(request.source.clone().into());
        }
        body
    }

    /// Map a `_bulk` response onto the requests it answers.
    ///
    /// Items come back in request order. Items with a 429/5xx status are
    /// recorded as transient failures, other failed items as rejections.
    fn summarize_bulk_response(
        requests: &[UpsertDocumentRequest],
        response: &Value,
    ) -> BatchOperationSummary {
        let items = response["items"].as_array().map(Vec::as_slice).unwrap_or(&[]);

        let results = requests
            .iter()
            .enumerate()
            .map(|(position, request)| {
                let Some(item) = items.get(position).and_then(|item| item.get("index")) else {
                    return BatchOperationResult {
                        document_id: request.document_id.clone(),
                        success: false,
                        error: Some(SearchIndexError::parse(format!(
                            "Missing bulk response item for document {}",
                            request.document_id
                        ))),
                    };
                };

                let status = item["status"].as_u64().unwrap_or(0) as u16;
                if (200..300).contains(&status) && item.get("error").is_none() {
                    return BatchOperationResult {
                        document_id: request.document_id.clone(),
                        success: true,
                        error: None,
                    };
                }

                let reason = format!(
                    "{}: {}",
                    item["error"]["type"].as_str().unwrap_or("unknown_error"),
                    item["error"]["reason"].as_str().unwrap_or("no reason given")
                );
                let error = if is_transient_status(status) {
                    SearchIndexError::ServerError {
                        status,
                        message: reason,
                    }
                } else {
                    SearchIndexError::RequestRejected {
                        status,
                        message: reason,
                    }
                };

                BatchOperationResult {
                    document_id: request.document_id.clone(),
                    success: false,
                    error: Some(error),
                }
            })
            .collect();

        BatchOperationSummary::from_results(results)
    }
}

#[async_trait]
impl SearchIndexProvider for OpenSearchProvider {
    async fn ensure_index_exists(&self, collection: Collection) -> Result<(), SearchIndexError> {
        let index = collection.index_name();

        let response = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        match response.status_code().as_u16() {
            200 => {
                debug!(index = %index, "Index already exists");
                return Ok(());
            }
            404 => {}
            status => {
                return Err(SearchIndexError::from_status(
                    status,
                    format!("Unexpected status checking index {}", index),
                ));
            }
        }

        info!(index = %index, "Index does not exist, creating");

        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(index))
            .body(get_index_settings(collection))
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let status = response.status_code();
        if status.is_success() {
            info!(index = %index, "Index created");
            return Ok(());
        }

        let error_body = response.text().await.unwrap_or_default();

        // Another writer created it between our check and our create.
        if error_body.contains("resource_already_exists_exception") {
            debug!(index = %index, "Index created concurrently");
            return Ok(());
        }

        error!(index = %index, status = %status, body = %error_body, "Index creation failed");
        if is_transient_status(status.as_u16()) {
            Err(SearchIndexError::from_status(status.as_u16(), error_body))
        } else {
            Err(SearchIndexError::index_creation(format!(
                "Creating index {} failed with status {}: {}",
                index, status, error_body
            )))
        }
    }

    async fn bulk_upsert_documents(
        &self,
        collection: Collection,
        requests: &[UpsertDocumentRequest],
    ) -> Result<BatchOperationSummary, SearchIndexError> {
        if requests.is_empty() {
            return Ok(BatchOperationSummary::from_results(Vec::new()));
        }

        let index = collection.index_name();
        let response = self
            .client
            .bulk(BulkParts::Index(index))
            .body(Self::bulk_body(requests))
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(index = %index, status = %status, body = %error_body, "Bulk request failed");
            return Err(SearchIndexError::from_status(status.as_u16(), error_body));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| SearchIndexError::parse(e.to_string()))?;

        let summary = Self::summarize_bulk_response(requests, &payload);
        debug!(
            index = %index,
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Bulk request completed"
        );
        Ok(summary)
    }
}
