//! Error types for the orchestrator module of the movies ETL pipeline.
//! Any of these abandons the unit of work of a single stream for the pass.
use movies_etl_repository::CheckpointError;
use thiserror::Error;

use crate::errors::extractor::ExtractorError;
use crate::errors::loader::LoaderError;

/// Represents errors that can occur while syncing one stream.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Extractor error: {0}")]
    Extractor(#[from] ExtractorError),

    #[error("Loader error: {0}")]
    Loader(#[from] LoaderError),

    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),
}
