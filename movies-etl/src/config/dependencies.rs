//! Dependency initialization and wiring for the movies ETL.

use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use movies_etl_pipeline::extractor::{ChangeExtractor, ExtractorConfig};
use movies_etl_pipeline::loader::{LoaderConfig, SearchLoader};
use movies_etl_pipeline::orchestrator::{Orchestrator, OrchestratorConfig};
use movies_etl_pipeline::processor::DocumentProcessor;
use movies_etl_repository::{
    CheckpointRepository, JsonFileCheckpointRepository, OpenSearchProvider,
    PostgresSourceRepository,
};
use movies_etl_shared::EntityStream;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::{ConnectionMode, Settings};
use crate::IndexingError;

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The configured orchestrator ready to run.
    pub orchestrator: Orchestrator,
}

impl Dependencies {
    /// Connect to every backend and wire the pipeline together.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(IndexingError)` - If initialization fails (backends only fail in fail-fast mode)
    pub async fn new(settings: &Settings) -> Result<Self, IndexingError> {
        info!(
            database = %settings.database_target(),
            opensearch_url = %settings.opensearch_url,
            state_file = %settings.state_file_path.display(),
            connection_mode = ?settings.connection_mode,
            retry_interval_secs = settings.connection_retry_interval.as_secs(),
            "Initializing dependencies"
        );

        let pool = connect_with_mode(
            "PostgreSQL",
            settings.connection_mode,
            settings.connection_retry_interval,
            || Self::try_connect_postgres(settings),
        )
        .await?;
        info!("PostgreSQL connection established");

        let search_provider = connect_with_mode(
            "OpenSearch",
            settings.connection_mode,
            settings.connection_retry_interval,
            || Self::try_connect_opensearch(&settings.opensearch_url, settings.opensearch_timeout),
        )
        .await?;
        info!("OpenSearch connection established");

        let checkpoint_keys: Vec<&str> = EntityStream::ALL
            .iter()
            .map(|stream| stream.checkpoint_key())
            .collect();
        let checkpoints: Arc<dyn CheckpointRepository> = Arc::new(
            JsonFileCheckpointRepository::open(&settings.state_file_path, &checkpoint_keys).await?,
        );

        let extractor = ChangeExtractor::with_config(
            Arc::new(PostgresSourceRepository::new(pool)),
            checkpoints.clone(),
            ExtractorConfig {
                id_batch_size: settings.id_batch_size,
                retry: settings.retry,
            },
        );

        let loader = SearchLoader::with_config(
            Arc::new(search_provider),
            LoaderConfig {
                batch_size: settings.loader_batch_size,
                retry: settings.retry,
            },
        );

        let orchestrator = Orchestrator::new(
            extractor,
            DocumentProcessor::new(),
            loader,
            checkpoints,
            OrchestratorConfig {
                iteration_delay: settings.iteration_delay,
            },
        );

        Ok(Self { orchestrator })
    }

    async fn try_connect_postgres(settings: &Settings) -> Result<PgPool, IndexingError> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(connect_options(settings)?)
            .await?;
        Ok(pool)
    }

    async fn try_connect_opensearch(
        url: &str,
        timeout: Duration,
    ) -> Result<OpenSearchProvider, IndexingError> {
        let provider = OpenSearchProvider::with_timeout(url, timeout)?;
        provider.ping().await?;
        Ok(provider)
    }
}

/// Connection options for the source, with every statement bounded server-side.
fn connect_options(settings: &Settings) -> Result<PgConnectOptions, IndexingError> {
    let options = PgConnectOptions::from_str(&settings.database_url)?.options([(
        "statement_timeout",
        settings.statement_timeout.as_millis().to_string(),
    )]);
    Ok(options)
}

/// Run `connect` until it succeeds, or once in fail-fast mode.
async fn connect_with_mode<T, F, Fut>(
    backend: &'static str,
    mode: ConnectionMode,
    retry_interval: Duration,
    mut connect: F,
) -> Result<T, IndexingError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, IndexingError>>,
{
    loop {
        match connect().await {
            Ok(connection) => return Ok(connection),
            Err(e) => match mode {
                ConnectionMode::FailFast => {
                    return Err(IndexingError::config(format!(
                        "Failed to connect to {}: {}",
                        backend, e
                    )));
                }
                ConnectionMode::Retry => {
                    warn!(
                        backend = backend,
                        error = %e,
                        retry_interval_secs = retry_interval.as_secs(),
                        "Failed to connect, retrying..."
                    );
                    sleep(retry_interval).await;
                }
            },
        }
    }
}
