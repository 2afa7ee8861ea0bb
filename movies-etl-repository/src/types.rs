//! Request and response types for search index operations.

use movies_etl_shared::IndexDocument;
use serde_json::Value;

use crate::errors::SearchIndexError;

/// Request to insert or replace one document in a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertDocumentRequest {
    /// The `_id` the document is stored under.
    pub document_id: String,
    /// Full document source.
    pub source: Value,
}

impl UpsertDocumentRequest {
    /// Serialize a document into an upsert request keyed by its own id.
    pub fn from_document<D: IndexDocument>(document: &D) -> Result<Self, SearchIndexError> {
        let source = serde_json::to_value(document)
            .map_err(|e| SearchIndexError::serialization(e.to_string()))?;
        Ok(Self {
            document_id: document.document_id().to_string(),
            source,
        })
    }
}

/// Result of a batch operation for a single document.
#[derive(Debug, Clone)]
pub struct BatchOperationResult {
    /// The document's `_id`.
    pub document_id: String,
    /// Whether the operation succeeded.
    pub success: bool,
    /// Error if the operation failed.
    pub error: Option<SearchIndexError>,
}

/// Summary of a batch operation containing aggregate statistics and individual results.
///
/// This allows callers to tell a fully successful bulk request apart from one
/// where the backend accepted the request but rejected some documents.
#[derive(Debug, Clone)]
pub struct BatchOperationSummary {
    /// Total number of items in the batch.
    pub total: usize,
    /// Number of successful operations.
    pub succeeded: usize,
    /// Number of failed operations.
    pub failed: usize,
    /// Individual results for each item.
    pub results: Vec<BatchOperationResult>,
}

impl BatchOperationSummary {
    /// Build a summary from per-document results.
    pub fn from_results(results: Vec<BatchOperationResult>) -> Self {
        let succeeded = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            succeeded,
            failed: results.len() - succeeded,
            results,
        }
    }

    /// Iterate over failed results.
    pub fn failures(&self) -> impl Iterator<Item = &BatchOperationResult> {
        self.results.iter().filter(|r| !r.success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use movies_etl_shared::PersonDocument;

    #[test]
    fn test_request_is_keyed_by_document_id() {
        let doc = PersonDocument {
            id: "b5d2b63a-ed1f-4e46-8320-cf52a32be358".to_string(),
            full_name: "Carrie Fisher".to_string(),
        };

        let request = UpsertDocumentRequest::from_document(&doc).unwrap();
        assert_eq!(request.document_id, doc.id);
        assert_eq!(request.source["full_name"], "Carrie Fisher");
    }

    #[test]
    fn test_summary_counts() {
        let summary = BatchOperationSummary::from_results(vec![
            BatchOperationResult {
                document_id: "a".to_string(),
                success: true,
                error: None,
            },
            BatchOperationResult {
                document_id: "b".to_string(),
                success: false,
                error: Some(SearchIndexError::from_status(400, "mapper_parsing_exception")),
            },
        ]);

        assert_eq!(summary.total, 2);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.failures().next().unwrap().document_id, "b");
    }
}
