use thiserror::Error;

use crate::types::SourceKind;

#[derive(Error, Debug)]
pub enum TenderWatchError {
    #[error("Invalid task: {0}")]
    InvalidTask(String),

    #[error("Source unreachable after retries: {0}")]
    SourceUnavailable(SourceKind),

    #[error("All selected sources unreachable")]
    AllSourcesUnavailable,

    #[error("Digest composition error: {0}")]
    Compose(String),

    #[error("Delivery failed: {0}")]
    Delivery(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Run exceeded the {0}s wall-clock budget")]
    DeadlineExceeded(u64),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
