//! Error types for the extractor module of the movies ETL pipeline.
use movies_etl_repository::{CheckpointError, SourceRepositoryError};
use thiserror::Error;

/// Represents errors that can occur while extracting a stream's change-set.
#[derive(Debug, Error)]
pub enum ExtractorError {
    #[error("Source error: {0}")]
    Source(#[from] SourceRepositoryError),

    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),
}
