//! Service settings read from the environment.

use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use movies_etl_pipeline::retry::RetryPolicy;
use tracing::warn;
use url::Url;

use crate::IndexingError;

/// Default OpenSearch host when neither `OPENSEARCH_URL` nor `ELASTIC_HOST` is set.
const DEFAULT_ELASTIC_HOST: &str = "localhost";
const DEFAULT_ELASTIC_PORT: u16 = 9200;

const DEFAULT_POSTGRES_HOST: &str = "localhost";
const DEFAULT_POSTGRES_PORT: u16 = 5432;
const DEFAULT_POSTGRES_USER: &str = "postgres";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Default connection retry interval in seconds.
const DEFAULT_RETRY_INTERVAL_SECS: u64 = 15;

const DEFAULT_STATE_FILE_PATH: &str = "state.json";
const DEFAULT_ITERATION_DELAY_SECS: u64 = 60;
const DEFAULT_ID_BATCH_SIZE: usize = 1000;
const DEFAULT_LOADER_BATCH_SIZE: usize = 500;
const DEFAULT_STATEMENT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_OPENSEARCH_TIMEOUT_SECS: u64 = 30;

/// How to react when a backend is unreachable at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionMode {
    /// Fail immediately if connection fails.
    FailFast,
    /// Retry connection on a fixed interval until successful.
    Retry,
}

impl ConnectionMode {
    /// Valid values: "fail-fast" or "retry" (case-insensitive).
    /// Defaults to "retry" if not set or invalid.
    fn parse(value: Option<&str>) -> Self {
        match value.map(str::to_lowercase).as_deref() {
            None | Some("retry") => Self::Retry,
            Some("fail-fast" | "failfast" | "fail_fast") => Self::FailFast,
            Some(other) => {
                warn!(value = %other, "Invalid CONNECTION_MODE, defaulting to 'retry'");
                Self::Retry
            }
        }
    }
}

/// Everything the service reads from its environment.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub database_url: String,
    pub max_connections: u32,
    pub statement_timeout: Duration,
    pub opensearch_url: String,
    pub opensearch_timeout: Duration,
    pub connection_mode: ConnectionMode,
    pub connection_retry_interval: Duration,
    pub state_file_path: PathBuf,
    pub iteration_delay: Duration,
    pub id_batch_size: usize,
    pub loader_batch_size: usize,
    pub retry: RetryPolicy,
}

impl Settings {
    /// Read settings from process environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `DATABASE_URL`: PostgreSQL URL, or composed from `POSTGRES_USER`,
    ///   `POSTGRES_PASSWORD`, `POSTGRES_HOST`, `POSTGRES_PORT` and `POSTGRES_DB`
    /// - `POSTGRES_MAX_CONNECTIONS`: Pool size (default: 5)
    /// - `OPENSEARCH_URL`: OpenSearch URL, or composed from `ELASTIC_HOST` and
    ///   `ELASTIC_PORT` (default: http://localhost:9200)
    /// - `CONNECTION_MODE`: "fail-fast" or "retry" (default: retry)
    /// - `CONNECTION_RETRY_INTERVAL_SECS`: Startup retry interval (default: 15)
    /// - `STATE_FILE_PATH`: Checkpoint file (default: state.json)
    /// - `ITERATION_DELAY`: Seconds between passes (default: 60)
    /// - `ID_BATCH_SIZE`: Max ids per relational query (default: 1000)
    /// - `LOADER_BATCH_SIZE`: Max documents per bulk request (default: 500)
    /// - `STATEMENT_TIMEOUT_SECS`: Server-side limit per SQL statement (default: 30)
    /// - `OPENSEARCH_TIMEOUT_SECS`: Limit per OpenSearch request (default: 30)
    /// - `RETRY_MAX_RETRIES`, `RETRY_INITIAL_DELAY_MS`, `RETRY_MAX_DELAY_SECS`:
    ///   Backoff bounds (default: 8, 200, 10)
    pub fn from_env() -> Result<Self, IndexingError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read settings through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, IndexingError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = match non_empty(&lookup, "DATABASE_URL") {
            Some(url) => url,
            None => compose_database_url(&lookup)?,
        };

        let opensearch_url = non_empty(&lookup, "OPENSEARCH_URL").unwrap_or_else(|| {
            let host = non_empty(&lookup, "ELASTIC_HOST")
                .unwrap_or_else(|| DEFAULT_ELASTIC_HOST.to_string());
            let port = parse_or(&lookup, "ELASTIC_PORT", DEFAULT_ELASTIC_PORT);
            format!("http://{}:{}", host, port)
        });

        let defaults = RetryPolicy::default();
        let retry = RetryPolicy {
            initial_delay: Duration::from_millis(parse_or(
                &lookup,
                "RETRY_INITIAL_DELAY_MS",
                defaults.initial_delay.as_millis() as u64,
            )),
            max_delay: Duration::from_secs(parse_or(
                &lookup,
                "RETRY_MAX_DELAY_SECS",
                defaults.max_delay.as_secs(),
            )),
            max_retries: parse_or(&lookup, "RETRY_MAX_RETRIES", defaults.max_retries),
        };

        Ok(Self {
            database_url,
            max_connections: positive_or(
                &lookup,
                "POSTGRES_MAX_CONNECTIONS",
                DEFAULT_MAX_CONNECTIONS,
            ),
            statement_timeout: Duration::from_secs(positive_or(
                &lookup,
                "STATEMENT_TIMEOUT_SECS",
                DEFAULT_STATEMENT_TIMEOUT_SECS,
            )),
            opensearch_url,
            opensearch_timeout: Duration::from_secs(positive_or(
                &lookup,
                "OPENSEARCH_TIMEOUT_SECS",
                DEFAULT_OPENSEARCH_TIMEOUT_SECS,
            )),
            connection_mode: ConnectionMode::parse(lookup("CONNECTION_MODE").as_deref()),
            connection_retry_interval: Duration::from_secs(parse_or(
                &lookup,
                "CONNECTION_RETRY_INTERVAL_SECS",
                DEFAULT_RETRY_INTERVAL_SECS,
            )),
            state_file_path: non_empty(&lookup, "STATE_FILE_PATH")
                .unwrap_or_else(|| DEFAULT_STATE_FILE_PATH.to_string())
                .into(),
            iteration_delay: Duration::from_secs(parse_or(
                &lookup,
                "ITERATION_DELAY",
                DEFAULT_ITERATION_DELAY_SECS,
            )),
            id_batch_size: positive_or(&lookup, "ID_BATCH_SIZE", DEFAULT_ID_BATCH_SIZE),
            loader_batch_size: positive_or(
                &lookup,
                "LOADER_BATCH_SIZE",
                DEFAULT_LOADER_BATCH_SIZE,
            ),
            retry,
        })
    }

    /// Host and database of the source, without credentials, for logging.
    pub fn database_target(&self) -> &str {
        self.database_url
            .rsplit_once('@')
            .map_or(self.database_url.as_str(), |(_, target)| target)
    }
}

fn compose_database_url<F>(lookup: &F) -> Result<String, IndexingError>
where
    F: Fn(&str) -> Option<String>,
{
    let database = non_empty(lookup, "POSTGRES_DB")
        .ok_or_else(|| IndexingError::config("DATABASE_URL or POSTGRES_DB must be set"))?;
    let user =
        non_empty(lookup, "POSTGRES_USER").unwrap_or_else(|| DEFAULT_POSTGRES_USER.to_string());
    let host =
        non_empty(lookup, "POSTGRES_HOST").unwrap_or_else(|| DEFAULT_POSTGRES_HOST.to_string());
    let port = parse_or(lookup, "POSTGRES_PORT", DEFAULT_POSTGRES_PORT);

    let invalid = |reason: &str| {
        IndexingError::config(format!("Invalid PostgreSQL connection settings: {reason}"))
    };

    // Credentials and database name are percent-encoded by the setters.
    let mut url = Url::parse(&format!("postgres://{host}:{port}/"))
        .map_err(|e| invalid(&e.to_string()))?;
    url.set_username(&user)
        .map_err(|_| invalid("POSTGRES_USER cannot be used"))?;
    if let Some(password) = non_empty(lookup, "POSTGRES_PASSWORD") {
        url.set_password(Some(&password))
            .map_err(|_| invalid("POSTGRES_PASSWORD cannot be used"))?;
    }
    url.path_segments_mut()
        .map_err(|_| invalid("POSTGRES_HOST cannot be used"))?
        .push(&database);

    Ok(url.into())
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Parse `key`, falling back to `default` (with a warning) when it does not parse.
fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Display,
{
    match non_empty(lookup, key) {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(key = key, value = %raw, default = %default, "Invalid value, using default");
            default
        }),
    }
}

fn positive_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Display + PartialOrd + Default + Copy,
{
    let value = parse_or(lookup, key, default);
    if value > T::default() {
        value
    } else {
        warn!(key = key, value = %value, "Value must be positive, using default");
        default
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use sqlx::postgres::PgConnectOptions;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings =
            Settings::from_lookup(lookup(&[("POSTGRES_DB", "movies_database")])).unwrap();

        assert_eq!(
            settings.database_url,
            "postgres://postgres@localhost:5432/movies_database"
        );
        assert_eq!(settings.max_connections, 5);
        assert_eq!(settings.statement_timeout, Duration::from_secs(30));
        assert_eq!(settings.opensearch_url, "http://localhost:9200");
        assert_eq!(settings.opensearch_timeout, Duration::from_secs(30));
        assert_eq!(settings.connection_mode, ConnectionMode::Retry);
        assert_eq!(settings.connection_retry_interval, Duration::from_secs(15));
        assert_eq!(settings.state_file_path, PathBuf::from("state.json"));
        assert_eq!(settings.iteration_delay, Duration::from_secs(60));
        assert_eq!(settings.id_batch_size, 1000);
        assert_eq!(settings.loader_batch_size, 500);
        assert_eq!(settings.retry, RetryPolicy::default());
    }

    #[test]
    fn test_database_url_is_composed_from_parts() {
        let settings = Settings::from_lookup(lookup(&[
            ("POSTGRES_USER", "app"),
            ("POSTGRES_PASSWORD", "123qwe"),
            ("POSTGRES_HOST", "db"),
            ("POSTGRES_PORT", "6432"),
            ("POSTGRES_DB", "movies_database"),
        ]))
        .unwrap();

        assert_eq!(
            settings.database_url,
            "postgres://app:123qwe@db:6432/movies_database"
        );
        assert_eq!(settings.database_target(), "db:6432/movies_database");
    }

    #[test]
    fn test_database_url_encodes_reserved_characters() {
        let settings = Settings::from_lookup(lookup(&[
            ("POSTGRES_USER", "app:admin"),
            ("POSTGRES_PASSWORD", "p@ss/w#rd"),
            ("POSTGRES_HOST", "db"),
            ("POSTGRES_PORT", "5432"),
            ("POSTGRES_DB", "movies"),
        ]))
        .unwrap();

        assert_eq!(
            settings.database_url,
            "postgres://app%3Aadmin:p%40ss%2Fw%23rd@db:5432/movies"
        );
        assert_eq!(settings.database_target(), "db:5432/movies");

        let options = PgConnectOptions::from_str(&settings.database_url).unwrap();
        assert_eq!(options.get_host(), "db");
        assert_eq!(options.get_port(), 5432);
        assert_eq!(options.get_username(), "app:admin");
        assert_eq!(options.get_database(), Some("movies"));
    }

    #[test]
    fn test_timeouts_are_configurable() {
        let settings = Settings::from_lookup(lookup(&[
            ("POSTGRES_DB", "movies_database"),
            ("STATEMENT_TIMEOUT_SECS", "5"),
            ("OPENSEARCH_TIMEOUT_SECS", "0"),
        ]))
        .unwrap();

        assert_eq!(settings.statement_timeout, Duration::from_secs(5));
        assert_eq!(settings.opensearch_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_database_url_takes_precedence() {
        let settings = Settings::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://u:p@pg:5432/catalog"),
            ("POSTGRES_DB", "ignored"),
        ]))
        .unwrap();

        assert_eq!(settings.database_url, "postgres://u:p@pg:5432/catalog");
    }

    #[test]
    fn test_missing_database_is_a_config_error() {
        let result = Settings::from_lookup(lookup(&[("POSTGRES_USER", "app")]));

        assert!(matches!(result, Err(IndexingError::ConfigError(_))));
    }

    #[test]
    fn test_opensearch_url_from_elastic_host() {
        let settings = Settings::from_lookup(lookup(&[
            ("POSTGRES_DB", "movies_database"),
            ("ELASTIC_HOST", "es"),
            ("ELASTIC_PORT", "9201"),
        ]))
        .unwrap();

        assert_eq!(settings.opensearch_url, "http://es:9201");
    }

    #[test]
    fn test_invalid_numbers_fall_back_to_defaults() {
        let settings = Settings::from_lookup(lookup(&[
            ("POSTGRES_DB", "movies_database"),
            ("ITERATION_DELAY", "soon"),
            ("ID_BATCH_SIZE", "0"),
            ("LOADER_BATCH_SIZE", "-3"),
            ("RETRY_MAX_RETRIES", "3"),
        ]))
        .unwrap();

        assert_eq!(settings.iteration_delay, Duration::from_secs(60));
        assert_eq!(settings.id_batch_size, 1000);
        assert_eq!(settings.loader_batch_size, 500);
        assert_eq!(settings.retry.max_retries, 3);
    }

    #[test]
    fn test_connection_mode_parsing() {
        assert_eq!(ConnectionMode::parse(Some("FAIL-FAST")), ConnectionMode::FailFast);
        assert_eq!(ConnectionMode::parse(Some("fail_fast")), ConnectionMode::FailFast);
        assert_eq!(ConnectionMode::parse(Some("retry")), ConnectionMode::Retry);
        assert_eq!(ConnectionMode::parse(Some("sometimes")), ConnectionMode::Retry);
        assert_eq!(ConnectionMode::parse(None), ConnectionMode::Retry);
    }

    #[test]
    #[serial]
    fn test_from_env_reads_process_environment() {
        env::remove_var("DATABASE_URL");
        env::set_var("POSTGRES_DB", "from_env_db");
        env::set_var("ITERATION_DELAY", "5");

        let settings = Settings::from_env().unwrap();

        env::remove_var("POSTGRES_DB");
        env::remove_var("ITERATION_DELAY");

        assert!(settings.database_url.ends_with("/from_env_db"));
        assert_eq!(settings.iteration_delay, Duration::from_secs(5));
    }

    #[test]
    #[serial]
    fn test_from_env_without_database_fails() {
        env::remove_var("DATABASE_URL");
        env::remove_var("POSTGRES_DB");

        assert!(Settings::from_env().is_err());
    }
}
