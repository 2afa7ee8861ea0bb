//! # Movies ETL
//!
//! Keeps the `movies`, `genre` and `person` search collections in sync with
//! the relational catalogue by polling it for changes.
//!
//! ## Architecture
//!
//! The service follows the Extractor-Processor-Loader pattern:
//!
//! 1. **Extractor**: Finds rows changed since each stream's watermark
//! 2. **Processor**: Shapes relational rows into search documents
//! 3. **Loader**: Bulk upserts documents into OpenSearch
//! 4. **Orchestrator**: Runs passes on an interval and advances watermarks
//!
//! ## Modules
//!
//! - [`config`]: Settings and dependency initialization
//! - [`errors`]: Error types for the service

pub mod config;
pub mod errors;

pub use config::{ConnectionMode, Dependencies, Settings};
pub use errors::IndexingError;
