//! PostgreSQL implementation of the source repository.

mod source_repository;

pub use source_repository::PostgresSourceRepository;
