//! Search index provider trait definition.
//!
//! This module defines the abstract interface for search index operations,
//! allowing for different backend implementations (OpenSearch, Elasticsearch, etc.).

use async_trait::async_trait;
use movies_etl_shared::Collection;

use crate::errors::SearchIndexError;
use crate::types::{BatchOperationSummary, UpsertDocumentRequest};

/// Abstracts the underlying search index implementation (OpenSearch, Elasticsearch, etc.).
///
/// All methods return `Result<T, SearchIndexError>`; callers decide whether to
/// retry with [`SearchIndexError::is_transient`].
///
/// # Note on Document Writes
///
/// There is no separate create or update call. Documents are always written
/// whole with `bulk_upsert_documents`, keyed by their own id, so delivering the
/// same document twice leaves exactly one copy in the collection.
#[async_trait]
pub trait SearchIndexProvider: Send + Sync {
    /// Ensure the collection exists with its settings and mappings, creating it if necessary.
    ///
    /// An existing collection is left untouched, even if its mapping differs.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the collection is ready for use
    /// * `Err(SearchIndexError)` - If the check or the creation fails
    async fn ensure_index_exists(&self, collection: Collection) -> Result<(), SearchIndexError>;

    /// Insert or replace documents in bulk and return a per-document summary.
    ///
    /// # Arguments
    ///
    /// * `collection` - Target collection
    /// * `requests` - Documents keyed by id
    ///
    /// # Returns
    ///
    /// * `Ok(BatchOperationSummary)` - The request was accepted; inspect it for item failures
    /// * `Err(SearchIndexError)` - If the bulk request failed entirely
    async fn bulk_upsert_documents(
        &self,
        collection: Collection,
        requests: &[UpsertDocumentRequest],
    ) -> Result<BatchOperationSummary, SearchIndexError>;
}
