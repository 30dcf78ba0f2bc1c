use thiserror::Error;

pub type Result<T> = std::result::Result<T, BrevoError>;

#[derive(Debug, Error)]
pub enum BrevoError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Send accepted but no message id returned")]
    MissingMessageId,
}

impl BrevoError {
    /// Transient failures are worth another attempt; 4xx rejections are not.
    pub fn is_transient(&self) -> bool {
        match self {
            BrevoError::Network(_) => true,
            BrevoError::Api { status, .. } => *status == 429 || *status >= 500,
            BrevoError::MissingMessageId => false,
        }
    }
}

impl From<reqwest::Error> for BrevoError {
    fn from(err: reqwest::Error) -> Self {
        BrevoError::Network(err.to_string())
    }
}
