use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::CheckpointError;

/// Trait for interacting with the checkpoint store.
///
/// Holds one watermark per entity stream. Saving one key never requires
/// knowing the others, and a save is durable once it returns.
#[async_trait]
pub trait CheckpointRepository: Send + Sync {
    async fn get_watermark(&self, key: &str) -> Result<Option<DateTime<Utc>>, CheckpointError>;
    async fn save_watermark(
        &self,
        key: &str,
        watermark: DateTime<Utc>,
    ) -> Result<(), CheckpointError>;
}
