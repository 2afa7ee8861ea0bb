//! Interface definitions for the pipeline's external collaborators.
//!
//! The traits here allow for dependency injection and swappable backends, so
//! the pipeline can be exercised against in-memory implementations in tests.

mod checkpoint_repository;
mod search_index_provider;
mod source_repository;

pub use checkpoint_repository::CheckpointRepository;
pub use search_index_provider::SearchIndexProvider;
pub use source_repository::SourceRepository;
