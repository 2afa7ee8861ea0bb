//! Loader module for the movies ETL pipeline.
//!
//! Loads processed documents into the search index with bulk upserts.

use std::sync::Arc;

use movies_etl_repository::{
    BatchOperationSummary, SearchIndexError, SearchIndexProvider, UpsertDocumentRequest,
};
use movies_etl_shared::{Collection, IndexDocument};
use tracing::{debug, error, info, instrument, warn};

use crate::errors::LoaderError;
use crate::retry::{retry, RetryPolicy};

/// Configuration for the search loader.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Maximum number of documents per bulk request.
    pub batch_size: usize,
    /// Backoff for calls to the index.
    pub retry: RetryPolicy,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            batch_size: 500,
            retry: RetryPolicy::default(),
        }
    }
}

/// Loader that indexes documents into the search engine.
///
/// The loader is responsible for:
/// - Making sure every collection exists before anything is written
/// - Splitting documents into bulk requests of at most `batch_size`
/// - Retrying requests that failed transiently, in whole or in part
pub struct SearchLoader {
    provider: Arc<dyn SearchIndexProvider>,
    config: LoaderConfig,
}

impl SearchLoader {
    /// Create a new search loader with the given provider.
    pub fn new(provider: Arc<dyn SearchIndexProvider>) -> Self {
        Self::with_config(provider, LoaderConfig::default())
    }

    /// Create a new search loader with custom configuration.
    pub fn with_config(provider: Arc<dyn SearchIndexProvider>, config: LoaderConfig) -> Self {
        Self { provider, config }
    }

    /// Create every collection that does not exist yet.
    #[instrument(skip(self))]
    pub async fn ensure_collections(&self) -> Result<(), LoaderError> {
        let provider = self.provider.as_ref();
        for collection in Collection::ALL {
            retry(&self.config.retry, "ensure_index_exists", move || {
                provider.ensure_index_exists(collection)
            })
            .await?;
        }
        Ok(())
    }

    /// Upsert `documents` into `collection` and return how many were written.
    ///
    /// Nothing is sent for an empty slice. A request whose items all failed
    /// transiently is retried whole, which is safe because upserts are keyed
    /// by document id.
    #[instrument(skip_all, fields(collection = %collection, count = documents.len()))]
    pub async fn load<D: IndexDocument>(
        &self,
        collection: Collection,
        documents: &[D],
    ) -> Result<usize, LoaderError> {
        if documents.is_empty() {
            return Ok(0);
        }

        let requests = documents
            .iter()
            .map(UpsertDocumentRequest::from_document)
            .collect::<Result<Vec<_>, _>>()?;

        let provider = self.provider.as_ref();
        let mut loaded = 0;
        for chunk in requests.chunks(self.config.batch_size.max(1)) {
            loaded += retry(&self.config.retry, "bulk_upsert_documents", move || async move {
                let summary = provider.bulk_upsert_documents(collection, chunk).await?;
                check_summary(collection, &summary)
            })
            .await?;
        }

        info!(loaded = loaded, "Loaded documents");
        Ok(loaded)
    }
}

/// Turn item-level failures of an accepted bulk request into an error.
///
/// The error is transient only when every failed item is.
fn check_summary(
    collection: Collection,
    summary: &BatchOperationSummary,
) -> Result<usize, SearchIndexError> {
    if summary.failed == 0 {
        debug!(count = summary.succeeded, "Bulk request fully applied");
        return Ok(summary.succeeded);
    }

    let mut transient = true;
    let mut first_error = None;
    for result in summary.failures() {
        let item_transient = result.error.as_ref().is_some_and(|e| e.is_transient());
        transient &= item_transient;
        if let Some(ref err) = result.error {
            if item_transient {
                warn!(
                    collection = %collection,
                    document_id = %result.document_id,
                    error = %err,
                    "Document not indexed"
                );
            } else {
                error!(
                    collection = %collection,
                    document_id = %result.document_id,
                    error = %err,
                    "Document rejected"
                );
            }
            first_error.get_or_insert_with(|| err.to_string());
        }
    }

    Err(SearchIndexError::BulkIndexError {
        failed: summary.failed,
        total: summary.total,
        message: first_error.unwrap_or_else(|| "unknown item failure".to_string()),
        transient,
    })
}
