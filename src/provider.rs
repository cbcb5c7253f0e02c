use std::future::Future;
use std::time::Duration;

use crate::error::ProviderError;

/// Raw source playlist entry. Either field may be missing for local files,
/// podcast episodes or tracks removed from the catalogue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceItem {
    pub name: Option<String>,
    pub artists: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SourcePage {
    pub items: Vec<SourceItem>,
    pub has_more: bool,
}

#[derive(Debug, Clone, Default)]
pub struct DestinationPage {
    /// Video ids referenced by the playlist items on this page.
    pub video_ids: Vec<String>,
    pub next_cursor: Option<String>,
}

/// Read access to the music service playlist.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SourceProvider: Send + Sync {
    async fn get_page(
        &self,
        playlist_id: &str,
        page_size: u32,
        offset: u32,
    ) -> Result<SourcePage, ProviderError>;
}

/// Query and mutate access to the video service playlist.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait DestinationProvider: Send + Sync {
    async fn list_page(
        &self,
        playlist_id: &str,
        page_size: u32,
        cursor: Option<String>,
    ) -> Result<DestinationPage, ProviderError>;

    /// Top-ranked video for `query`, if the service returns any.
    async fn search(&self, query: &str) -> Result<Option<String>, ProviderError>;

    async fn append(&self, playlist_id: &str, video_id: &str) -> Result<(), ProviderError>;
}

/// Run a provider call, turning an elapsed deadline into `ProviderError::Timeout`.
pub async fn with_timeout<T, F>(limit: Duration, call: F) -> Result<T, ProviderError>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::Timeout(limit)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn elapsed_call_becomes_timeout() {
        let limit = Duration::from_millis(10);
        let result: Result<(), _> = with_timeout(limit, async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(ProviderError::Timeout(d)) if d == limit));
    }

    #[tokio::test]
    async fn inner_error_is_passed_through() {
        let result: Result<(), _> = with_timeout(Duration::from_secs(1), async {
            Err(ProviderError::Auth("expired".to_string()))
        })
        .await;

        assert!(matches!(result, Err(ProviderError::Auth(_))));
    }
}
