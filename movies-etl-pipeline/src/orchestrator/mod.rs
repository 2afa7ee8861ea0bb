//! Orchestrator module for the movies ETL pipeline.
//!
//! Coordinates the extractor, processor, and loader components, one pass at a
//! time.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::{pin_mut, StreamExt};
use movies_etl_repository::CheckpointRepository;
use movies_etl_shared::{Collection, EntityStream};
use tracing::{error, info, instrument};

use crate::errors::OrchestratorError;
use crate::extractor::{ChangeExtractor, Extraction};
use crate::loader::SearchLoader;
use crate::processor::{DocumentProcessor, RelatedDocuments};

/// Configuration for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Sleep between the end of a pass and the start of the next one.
    pub iteration_delay: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            iteration_delay: Duration::from_secs(60),
        }
    }
}

/// What happened to one stream during a pass.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamOutcome {
    /// No rows past the watermark.
    Unchanged,
    /// Documents loaded and watermark advanced.
    Synced {
        movies: usize,
        documents: usize,
        watermark: DateTime<Utc>,
    },
    /// Unit abandoned, watermark left where it was.
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct StreamReport {
    pub stream: EntityStream,
    pub outcome: StreamOutcome,
}

/// Result of one pass over every stream.
#[derive(Debug, Clone, PartialEq)]
pub struct PassSummary {
    pub pass: u64,
    /// Set when the collections could not be bootstrapped and the pass was skipped.
    pub bootstrap_error: Option<String>,
    pub streams: Vec<StreamReport>,
}

impl PassSummary {
    pub fn outcome(&self, stream: EntityStream) -> Option<&StreamOutcome> {
        self.streams
            .iter()
            .find(|report| report.stream == stream)
            .map(|report| &report.outcome)
    }

    pub fn is_success(&self) -> bool {
        self.bootstrap_error.is_none()
            && self
                .streams
                .iter()
                .all(|report| !matches!(report.outcome, StreamOutcome::Failed { .. }))
    }

    fn count(&self, predicate: impl Fn(&StreamOutcome) -> bool) -> usize {
        self.streams.iter().filter(|r| predicate(&r.outcome)).count()
    }
}

/// Orchestrator that coordinates the pipeline components.
///
/// The orchestrator:
/// - Runs the streams of a pass strictly in order, each as its own unit of work
/// - Advances a stream's watermark only after its documents are loaded
/// - Sleeps between passes and stops on the shutdown signal
pub struct Orchestrator {
    extractor: ChangeExtractor,
    processor: DocumentProcessor,
    loader: SearchLoader,
    checkpoints: Arc<dyn CheckpointRepository>,
    config: OrchestratorConfig,
    /// Number of passes started since startup.
    passes: AtomicU64,
    /// Total number of documents indexed since startup.
    total_documents_indexed: AtomicU64,
}

impl Orchestrator {
    /// Create a new orchestrator with the given components.
    pub fn new(
        extractor: ChangeExtractor,
        processor: DocumentProcessor,
        loader: SearchLoader,
        checkpoints: Arc<dyn CheckpointRepository>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            extractor,
            processor,
            loader,
            checkpoints,
            config,
            passes: AtomicU64::new(0),
            total_documents_indexed: AtomicU64::new(0),
        }
    }

    pub fn passes(&self) -> u64 {
        self.passes.load(Ordering::Relaxed)
    }

    pub fn total_documents_indexed(&self) -> u64 {
        self.total_documents_indexed.load(Ordering::Relaxed)
    }

    /// Run passes until the process receives Ctrl-C.
    pub async fn run(&self) {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Run passes until `shutdown` resolves.
    ///
    /// Shutdown drops any in-flight pass. Nothing is lost by that: a stream's
    /// watermark only moves after its documents are in the index.
    pub async fn run_until<S>(&self, shutdown: S)
    where
        S: Future<Output = ()>,
    {
        pin_mut!(shutdown);
        info!(
            iteration_delay_secs = self.config.iteration_delay.as_secs(),
            "Starting movies ETL orchestrator"
        );

        loop {
            tokio::select! {
                _ = self.run_pass() => {}
                _ = &mut shutdown => {
                    info!("Received shutdown signal during pass");
                    break;
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.iteration_delay) => {}
                _ = &mut shutdown => {
                    info!("Received shutdown signal");
                    break;
                }
            }
        }

        info!(
            passes = self.passes(),
            total_documents_indexed = self.total_documents_indexed(),
            "Orchestrator shutdown complete"
        );
    }

    /// Run one pass over every stream.
    ///
    /// Never fails as a whole: a failing stream is reported and the pass
    /// moves on to the next one.
    #[instrument(skip(self), fields(pass = tracing::field::Empty))]
    pub async fn run_pass(&self) -> PassSummary {
        let pass = self.passes.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::Span::current().record("pass", pass);
        let started = Instant::now();
        info!("Starting pass");

        if let Err(e) = self.loader.ensure_collections().await {
            error!(error = %e, "Failed to bootstrap collections, skipping pass");
            return PassSummary {
                pass,
                bootstrap_error: Some(e.to_string()),
                streams: Vec::new(),
            };
        }

        let mut streams = Vec::with_capacity(EntityStream::ALL.len());
        let extractions = self.extractor.extract();
        pin_mut!(extractions);

        while let Some((stream, extracted)) = extractions.next().await {
            let result = match extracted {
                Ok(Some(extraction)) => self.sync_stream(extraction).await,
                Ok(None) => Ok(StreamOutcome::Unchanged),
                Err(e) => Err(OrchestratorError::from(e)),
            };

            let outcome = match result {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(stream = %stream, error = %e, "Abandoning stream for this pass");
                    StreamOutcome::Failed {
                        error: e.to_string(),
                    }
                }
            };
            streams.push(StreamReport { stream, outcome });
        }

        let summary = PassSummary {
            pass,
            bootstrap_error: None,
            streams,
        };
        info!(
            synced = summary.count(|o| matches!(o, StreamOutcome::Synced { .. })),
            unchanged = summary.count(|o| matches!(o, StreamOutcome::Unchanged)),
            failed = summary.count(|o| matches!(o, StreamOutcome::Failed { .. })),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Pass complete"
        );
        summary
    }

    /// Transform and load one stream's extraction, then advance its watermark.
    #[instrument(skip_all, fields(stream = %extraction.stream))]
    async fn sync_stream(
        &self,
        extraction: Extraction,
    ) -> Result<StreamOutcome, OrchestratorError> {
        let batch = self.processor.process(&extraction);

        let documents = match &batch.related {
            RelatedDocuments::None => 0,
            RelatedDocuments::Genres(genres) => {
                self.loader.load(Collection::Genres, genres).await?
            }
            RelatedDocuments::Persons(persons) => {
                self.loader.load(Collection::Persons, persons).await?
            }
        };
        let movies = self.loader.load(Collection::Movies, &batch.movies).await?;

        let watermark = extraction.change_set.last_modified;
        self.checkpoints
            .save_watermark(extraction.stream.checkpoint_key(), watermark)
            .await?;

        self.total_documents_indexed
            .fetch_add((movies + documents) as u64, Ordering::Relaxed);
        info!(
            changed = extraction.change_set.len(),
            movies = movies,
            documents = documents,
            watermark = %watermark,
            "Stream synced"
        );

        Ok(StreamOutcome::Synced {
            movies,
            documents,
            watermark,
        })
    }
}
