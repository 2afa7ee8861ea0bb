use thiserror::Error;

/// Represents errors that can occur within the checkpoint repository.
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("Checkpoint I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Checkpoint serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid watermark for {key}: {value}")]
    InvalidWatermark { key: String, value: String },
}
