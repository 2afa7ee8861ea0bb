//! Error types for the loader module of the movies ETL pipeline.
use movies_etl_repository::SearchIndexError;
use thiserror::Error;

/// Represents errors that can occur while loading documents into the index.
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("Search index error: {0}")]
    Index(#[from] SearchIndexError),
}

impl LoaderError {
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Index(error) => error.is_transient(),
        }
    }
}
