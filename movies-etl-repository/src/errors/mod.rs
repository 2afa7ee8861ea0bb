//! Error types for the movies ETL repository.

mod checkpoint;
pub(crate) mod search_index_error;
mod source_repository;

pub use checkpoint::CheckpointError;
pub use search_index_error::SearchIndexError;
pub use source_repository::SourceRepositoryError;
