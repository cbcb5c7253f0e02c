use std::collections::HashSet;
use std::time::Duration;

use crate::error::{ProviderError, SyncError};
use crate::provider::{DestinationPage, DestinationProvider, with_timeout};

pub const DESTINATION_PAGE_SIZE: u32 = 50;

/// Video ids known to be in the destination playlist.
///
/// Ids are only ever inserted, so once an id is known it stays known for the
/// rest of the run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DestinationIndex {
    ids: HashSet<String>,
}

impl DestinationIndex {
    pub fn contains(&self, video_id: &str) -> bool {
        self.ids.contains(video_id)
    }

    /// Returns `false` if the id was already present.
    pub fn insert(&mut self, video_id: impl Into<String>) -> bool {
        self.ids.insert(video_id.into())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }
}

impl<S: Into<String>> FromIterator<S> for DestinationIndex {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Read every page of the destination playlist into a `DestinationIndex`.
pub async fn fetch_destination_ids<D>(
    provider: &D,
    playlist_id: &str,
    call_timeout: Duration,
) -> Result<DestinationIndex, SyncError>
where
    D: DestinationProvider + ?Sized,
{
    let mut index = DestinationIndex::default();
    let mut cursor: Option<String> = None;

    loop {
        let page = with_timeout(
            call_timeout,
            provider.list_page(playlist_id, DESTINATION_PAGE_SIZE, cursor.take()),
        )
        .await
        .map_err(SyncError::DestinationUnavailable)?;

        tracing::debug!(playlist_id, items = page.video_ids.len(), "fetched destination page");
        for video_id in page.video_ids {
            index.insert(video_id);
        }

        cursor = page.next_cursor.filter(|c| !c.is_empty());
        if cursor.is_none() {
            break;
        }
    }

    tracing::info!(playlist_id, videos = index.len(), "indexed destination playlist");

    Ok(index)
}

/// Destination that searches for real but never mutates the playlist.
pub struct DryRun<'a, D: ?Sized> {
    inner: &'a D,
}

impl<'a, D: ?Sized> DryRun<'a, D> {
    pub fn new(inner: &'a D) -> Self {
        Self { inner }
    }
}

#[async_trait::async_trait]
impl<'a, D> DestinationProvider for DryRun<'a, D>
where
    D: DestinationProvider + ?Sized,
{
    async fn list_page(
        &self,
        playlist_id: &str,
        page_size: u32,
        cursor: Option<String>,
    ) -> Result<DestinationPage, ProviderError> {
        self.inner.list_page(playlist_id, page_size, cursor).await
    }

    async fn search(&self, query: &str) -> Result<Option<String>, ProviderError> {
        self.inner.search(query).await
    }

    async fn append(&self, playlist_id: &str, video_id: &str) -> Result<(), ProviderError> {
        tracing::debug!(playlist_id, video_id, "dry run, not appending");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockDestinationProvider;

    fn page(ids: &[&str], next: Option<&str>) -> DestinationPage {
        DestinationPage {
            video_ids: ids.iter().map(|id| id.to_string()).collect(),
            next_cursor: next.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn collects_ids_across_pages() {
        let mut provider = MockDestinationProvider::new();
        provider
            .expect_list_page()
            .times(3)
            .returning(|_, page_size, cursor| {
                assert_eq!(page_size, DESTINATION_PAGE_SIZE);
                Ok(match cursor.as_deref() {
                    None => page(&["a", "b"], Some("p2")),
                    Some("p2") => page(&["b", "c"], Some("p3")),
                    _ => page(&["d"], None),
                })
            });

        let index = fetch_destination_ids(&provider, "dst", Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(index.len(), 4);
        for id in ["a", "b", "c", "d"] {
            assert!(index.contains(id));
        }
    }

    #[tokio::test]
    async fn empty_cursor_ends_paging() {
        let mut provider = MockDestinationProvider::new();
        provider
            .expect_list_page()
            .times(1)
            .returning(|_, _, _| Ok(page(&["a"], Some(""))));

        let index = fetch_destination_ids(&provider, "dst", Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(index.len(), 1);
    }

    #[tokio::test]
    async fn provider_failure_is_destination_unavailable() {
        let mut provider = MockDestinationProvider::new();
        provider
            .expect_list_page()
            .returning(|_, _, _| Err(ProviderError::youtube("playlistNotFound")));

        let err = fetch_destination_ids(&provider, "dst", Duration::from_secs(1))
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::DestinationUnavailable(_)));
    }

    #[tokio::test]
    async fn dry_run_never_appends() {
        let mut provider = MockDestinationProvider::new();
        provider.expect_append().never();
        provider
            .expect_search()
            .returning(|_| Ok(Some("vid".to_string())));

        let dry = DryRun::new(&provider);

        assert_eq!(dry.search("q").await.unwrap().as_deref(), Some("vid"));
        assert!(dry.append("dst", "vid").await.is_ok());
    }

    #[test]
    fn insert_reports_new_ids() {
        let mut index: DestinationIndex = ["abc123"].into_iter().collect();

        assert!(!index.insert("abc123"));
        assert!(index.insert("xyz999"));
        assert!(index.contains("abc123"));
    }
}
