//! Error types for the conversation subsystem.

use thiserror::Error;

/// Conversation subsystem error type.
///
/// Running without configuration is not an error: the disabled state is
/// carried by [`crate::history::ConversationHistory`] and never surfaces here.
#[derive(Debug, Error)]
pub enum ConversationError {
    /// Transport-level failure, no response was received.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    /// The backend answered with a non-2xx status.
    #[error("api error (status {status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body text, possibly empty.
        message: String,
    },
    /// A wire payload could not be interpreted.
    #[error("decode error: {0}")]
    Decode(String),
    /// Invalid configuration or unsupported values.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// URL parse error.
    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
}

impl ConversationError {
    /// HTTP status carried by an API error.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Check if the backend reported the resource as missing.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { status: 404, .. })
    }

    /// Check if retrying the same call could succeed.
    ///
    /// The client never retries on its own; hosts use this to decide whether
    /// to offer a retry affordance.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Convenience result alias for conversation operations.
pub type ConversationResult<T> = Result<T, ConversationError>;
