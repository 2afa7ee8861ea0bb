//! # Movies ETL Repository
//!
//! This crate provides traits and implementations for the three external
//! collaborators of the ETL pipeline:
//!
//! - [`SourceRepository`]: read-only queries against the relational source (PostgreSQL)
//! - [`CheckpointRepository`]: durable per-stream watermarks (JSON file)
//! - [`SearchIndexProvider`]: collection bootstrap and bulk upserts (OpenSearch)

pub mod checkpoint;
pub mod errors;
pub mod interfaces;
pub mod opensearch;
pub mod postgres;
pub mod types;

pub use checkpoint::JsonFileCheckpointRepository;
pub use errors::{CheckpointError, SearchIndexError, SourceRepositoryError};
pub use interfaces::{CheckpointRepository, SearchIndexProvider, SourceRepository};
pub use opensearch::OpenSearchProvider;
pub use postgres::PostgresSourceRepository;
pub use types::{BatchOperationResult, BatchOperationSummary, UpsertDocumentRequest};
