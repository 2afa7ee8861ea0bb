//! Source repository trait definition.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use movies_etl_shared::{EntityStream, FilmWork, Genre, ModifiedRow, Person};
use uuid::Uuid;

use crate::errors::SourceRepositoryError;

/// Read-only access to the relational system of record.
///
/// Every id-list method expects a non-empty slice; callers are responsible for
/// short-circuiting empty sets and for bounding the slice length.
#[async_trait]
pub trait SourceRepository: Send + Sync {
    /// Rows of `stream`'s entity table modified strictly after `since`,
    /// ordered ascending by modification time.
    async fn modified_since(
        &self,
        stream: EntityStream,
        since: DateTime<Utc>,
    ) -> Result<Vec<ModifiedRow>, SourceRepositoryError>;

    /// Distinct film work ids linked through `stream`'s junction table to any of `ids`.
    async fn film_work_ids_by_related(
        &self,
        stream: EntityStream,
        ids: &[Uuid],
    ) -> Result<Vec<Uuid>, SourceRepositoryError>;

    /// Film works joined with all of their current genres and people.
    async fn film_works(&self, ids: &[Uuid]) -> Result<Vec<FilmWork>, SourceRepositoryError>;

    async fn genres(&self, ids: &[Uuid]) -> Result<Vec<Genre>, SourceRepositoryError>;

    async fn persons(&self, ids: &[Uuid]) -> Result<Vec<Person>, SourceRepositoryError>;
}
