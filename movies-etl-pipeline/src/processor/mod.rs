//! Processor module for the movies ETL pipeline.
//!
//! Transforms extracted relational rows into search documents.

mod document_processor;

pub use document_processor::{DocumentProcessor, ProcessedBatch, RelatedDocuments};
