//! Extractor module for the movies ETL pipeline.
//!
//! Detects the rows of each entity stream modified since its watermark and
//! resolves the film works whose documents must be rebuilt because of them.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use async_stream::stream;
use futures::Stream;
use movies_etl_repository::{CheckpointRepository, SourceRepository, SourceRepositoryError};
use movies_etl_shared::{min_watermark, ChangeSet, EntityStream, FilmWork, Genre, Person};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::errors::ExtractorError;
use crate::retry::{retry, RetryPolicy};

/// Configuration for the change extractor.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Maximum number of ids bound into a single relational query.
    pub id_batch_size: usize,
    /// Backoff for relational calls.
    pub retry: RetryPolicy,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            id_batch_size: 1000,
            retry: RetryPolicy::default(),
        }
    }
}

/// Rows of a secondary stream that changed themselves.
#[derive(Debug, Clone, PartialEq)]
pub enum RelatedRows {
    None,
    Genres(Vec<Genre>),
    Persons(Vec<Person>),
}

/// Everything one stream needs reloaded in this pass.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub stream: EntityStream,
    /// Changed ids and the candidate next watermark.
    pub change_set: ChangeSet,
    /// Film works to rebuild: the changed ones, or the ones a change cascades into.
    pub film_works: Vec<FilmWork>,
    pub related: RelatedRows,
}

/// Extractor that turns watermarks into change-sets and reload sets.
pub struct ChangeExtractor {
    source: Arc<dyn SourceRepository>,
    checkpoints: Arc<dyn CheckpointRepository>,
    config: ExtractorConfig,
}

impl ChangeExtractor {
    pub fn new(
        source: Arc<dyn SourceRepository>,
        checkpoints: Arc<dyn CheckpointRepository>,
    ) -> Self {
        Self::with_config(source, checkpoints, ExtractorConfig::default())
    }

    pub fn with_config(
        source: Arc<dyn SourceRepository>,
        checkpoints: Arc<dyn CheckpointRepository>,
        config: ExtractorConfig,
    ) -> Self {
        Self {
            source,
            checkpoints,
            config,
        }
    }

    /// Extract every stream in processing order.
    ///
    /// Streams are extracted lazily, one per poll, so a stream is only read
    /// after the previous one has been fully handled by the caller. `Ok(None)`
    /// means the stream has no changes this pass.
    pub fn extract(
        &self,
    ) -> impl Stream<Item = (EntityStream, Result<Option<Extraction>, ExtractorError>)> + '_ {
        stream! {
            for entity_stream in EntityStream::ALL {
                let result = self.extract_stream(entity_stream).await;
                yield (entity_stream, result);
            }
        }
    }

    /// Extract a single stream.
    #[instrument(skip_all, fields(stream = %stream))]
    pub async fn extract_stream(
        &self,
        stream: EntityStream,
    ) -> Result<Option<Extraction>, ExtractorError> {
        let since = self
            .checkpoints
            .get_watermark(stream.checkpoint_key())
            .await?
            .unwrap_or_else(min_watermark);

        let source = self.source.as_ref();
        let rows = retry(&self.config.retry, "modified_since", move || {
            source.modified_since(stream, since)
        })
        .await?;

        let Some(change_set) = ChangeSet::from_rows(rows) else {
            debug!(since = %since, "No changes");
            return Ok(None);
        };

        info!(
            count = change_set.len(),
            since = %since,
            last_modified = %change_set.last_modified,
            "Detected changes"
        );

        let (film_works, related) = match stream {
            EntityStream::FilmWork => {
                let film_works = self
                    .fetch_chunked(&change_set.ids, "film_works", move |chunk| {
                        source.film_works(chunk)
                    })
                    .await?;
                (film_works, RelatedRows::None)
            }
            EntityStream::Genre => {
                let (genres, film_works) = tokio::try_join!(
                    self.fetch_chunked(&change_set.ids, "genres", move |chunk| {
                        source.genres(chunk)
                    }),
                    self.cascade(stream, &change_set.ids),
                )?;
                (film_works, RelatedRows::Genres(genres))
            }
            EntityStream::Person => {
                let (persons, film_works) = tokio::try_join!(
                    self.fetch_chunked(&change_set.ids, "persons", move |chunk| {
                        source.persons(chunk)
                    }),
                    self.cascade(stream, &change_set.ids),
                )?;
                (film_works, RelatedRows::Persons(persons))
            }
        };

        Ok(Some(Extraction {
            stream,
            change_set,
            film_works,
            related,
        }))
    }

    /// Film works embedding any of `ids`, fetched in full.
    async fn cascade(
        &self,
        stream: EntityStream,
        ids: &[Uuid],
    ) -> Result<Vec<FilmWork>, SourceRepositoryError> {
        let source = self.source.as_ref();
        let linked = self
            .fetch_chunked(ids, "film_work_ids_by_related", move |chunk| {
                source.film_work_ids_by_related(stream, chunk)
            })
            .await?;

        // Chunks are distinct on their own but may overlap each other.
        let mut seen = HashSet::with_capacity(linked.len());
        let film_work_ids: Vec<Uuid> = linked.into_iter().filter(|id| seen.insert(*id)).collect();

        debug!(
            stream = %stream,
            changed = ids.len(),
            film_works = film_work_ids.len(),
            "Resolved cascade"
        );

        self.fetch_chunked(&film_work_ids, "film_works", move |chunk| {
            source.film_works(chunk)
        })
        .await
    }

    /// Run `fetch` once per chunk of at most `id_batch_size` ids and concatenate the results.
    ///
    /// An empty id list issues no query at all.
    async fn fetch_chunked<'a, T, F, Fut>(
        &self,
        ids: &'a [Uuid],
        operation: &'static str,
        mut fetch: F,
    ) -> Result<Vec<T>, SourceRepositoryError>
    where
        F: FnMut(&'a [Uuid]) -> Fut,
        Fut: Future<Output = Result<Vec<T>, SourceRepositoryError>>,
    {
        let mut rows = Vec::new();
        for chunk in ids.chunks(self.config.id_batch_size.max(1)) {
            let fetched = retry(&self.config.retry, operation, || fetch(chunk)).await?;
            rows.extend(fetched);
        }
        Ok(rows)
    }
}
