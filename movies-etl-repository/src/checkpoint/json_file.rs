//! JSON-file implementation of the checkpoint repository.
//!
//! The file is a single JSON object mapping checkpoint keys to RFC 3339
//! timestamps:
//!
//! ```json
//! {"film_work_modified": "2021-06-16T20:14:09.221838Z", "genre_modified": "0001-01-01T00:00:00.000000Z"}
//! ```

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use movies_etl_shared::min_watermark;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::errors::CheckpointError;
use crate::interfaces::CheckpointRepository;

type State = BTreeMap<String, String>;

/// Checkpoint repository persisted as a JSON file.
///
/// Saves are read-merge-write under a mutex and land through a temporary
/// sibling file that is fsynced and renamed over the original, so a crash
/// leaves either the old or the new state on disk.
pub struct JsonFileCheckpointRepository {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileCheckpointRepository {
    /// Open the checkpoint file, creating it if it does not exist.
    ///
    /// A newly created file holds the minimum watermark for every key in
    /// `keys`, so the first pass processes the whole dataset.
    pub async fn open(path: impl Into<PathBuf>, keys: &[&str]) -> Result<Self, CheckpointError> {
        let repository = Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        };

        if !fs::try_exists(&repository.path).await? {
            let initial: State = keys
                .iter()
                .map(|key| (key.to_string(), format_watermark(min_watermark())))
                .collect();
            repository.write_state(&initial).await?;
            info!(path = %repository.path.display(), "Created checkpoint file");
        }

        Ok(repository)
    }

    async fn read_state(&self) -> Result<State, CheckpointError> {
        let raw = fs::read(&self.path).await?;
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(State::new());
        }
        Ok(serde_json::from_slice(&raw)?)
    }

    async fn write_state(&self, state: &State) -> Result<(), CheckpointError> {
        let payload = serde_json::to_vec_pretty(state)?;
        let tmp_path = self.tmp_path();

        let mut file = fs::File::create(&tmp_path).await?;
        file.write_all(&payload).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&tmp_path, &self.path).await?;

        // The rename itself is only durable once the directory entry is synced.
        fs::File::open(parent_dir(&self.path))
            .await?
            .sync_all()
            .await?;
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

/// Directory holding `path`; a bare file name lives in the working directory.
fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

fn format_watermark(watermark: DateTime<Utc>) -> String {
    watermark.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_watermark(key: &str, value: &str) -> Result<DateTime<Utc>, CheckpointError> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| CheckpointError::InvalidWatermark {
            key: key.to_string(),
            value: value.to_string(),
        })
}

#[async_trait]
impl CheckpointRepository for JsonFileCheckpointRepository {
    async fn get_watermark(&self, key: &str) -> Result<Option<DateTime<Utc>>, CheckpointError> {
        let state = self.read_state().await?;
        state
            .get(key)
            .map(|value| parse_watermark(key, value))
            .transpose()
    }

    async fn save_watermark(
        &self,
        key: &str,
        watermark: DateTime<Utc>,
    ) -> Result<(), CheckpointError> {
        let _guard = self.write_lock.lock().await;

        let mut state = self.read_state().await?;
        let next = match state.get(key) {
            Some(stored) => parse_watermark(key, stored)?.max(watermark),
            None => watermark,
        };
        state.insert(key.to_string(), format_watermark(next));
        self.write_state(&state).await?;

        debug!(key = %key, watermark = %next, "Saved watermark");
        Ok(())
    }
}
