//! # Movies ETL Pipeline
//! This crate implements the stages of one synchronization pass from the
//! relational source into the search index.
//! It includes modules for extracting change-sets, shaping documents, loading
//! them into the index and orchestrating passes, along with retry and error
//! handling.
pub mod extractor;
pub mod loader;
pub mod orchestrator;
pub mod processor;
pub mod retry;

pub mod errors;
