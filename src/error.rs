use std::time::Duration;

use thiserror::Error;

/// A single call to the Spotify or YouTube API failed.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("{service} API error: {message}")]
    Api {
        service: &'static str,
        message: String,
    },

    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

impl ProviderError {
    pub fn spotify(message: impl Into<String>) -> Self {
        ProviderError::Api {
            service: "Spotify",
            message: message.into(),
        }
    }

    pub fn youtube(message: impl Into<String>) -> Self {
        ProviderError::Api {
            service: "YouTube",
            message: message.into(),
        }
    }
}

/// Errors that stop a sync pair before reconciliation starts.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("source playlist unavailable: {0}")]
    SourceUnavailable(#[source] ProviderError),

    #[error("destination playlist unavailable: {0}")]
    DestinationUnavailable(#[source] ProviderError),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Recoverable failure of one track during reconciliation.
#[derive(Debug, Error)]
pub enum ItemError {
    #[error("search failed: {0}")]
    SearchFailed(#[source] ProviderError),

    #[error("adding {video_id} failed: {source}")]
    AddFailed {
        video_id: String,
        #[source]
        source: ProviderError,
    },
}
