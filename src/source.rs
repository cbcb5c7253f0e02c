use std::time::Duration;

use crate::error::SyncError;
use crate::provider::{SourceItem, SourceProvider, with_timeout};
use crate::track::{Track, TrackList};

pub const SOURCE_PAGE_SIZE: u32 = 100;

/// Read every page of the source playlist and return its deduplicated tracks.
///
/// Items without a name or without any named artist are dropped. When several
/// artists are credited only the first one is kept.
pub async fn fetch_source_tracks<S>(
    provider: &S,
    playlist_id: &str,
    call_timeout: Duration,
) -> Result<TrackList, SyncError>
where
    S: SourceProvider + ?Sized,
{
    let mut tracks = Vec::new();
    let mut offset = 0;

    loop {
        let page = with_timeout(
            call_timeout,
            provider.get_page(playlist_id, SOURCE_PAGE_SIZE, offset),
        )
        .await
        .map_err(SyncError::SourceUnavailable)?;

        tracing::debug!(playlist_id, offset, items = page.items.len(), "fetched source page");
        tracks.extend(page.items.iter().filter_map(track_from_item));

        if !page.has_more {
            break;
        }
        offset += SOURCE_PAGE_SIZE;
    }

    let list = TrackList::dedup(tracks);
    tracing::info!(playlist_id, tracks = list.len(), "read source playlist");

    Ok(list)
}

fn track_from_item(item: &SourceItem) -> Option<Track> {
    let name = item.name.as_deref().map(str::trim).filter(|n| !n.is_empty())?;
    let artist = item
        .artists
        .iter()
        .map(|a| a.trim())
        .find(|a| !a.is_empty())?;

    Some(Track::new(artist, name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::provider::{MockSourceProvider, SourcePage};

    fn item(name: Option<&str>, artists: &[&str]) -> SourceItem {
        SourceItem {
            name: name.map(str::to_string),
            artists: artists.iter().map(|a| a.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn follows_pages_until_exhausted() {
        let mut provider = MockSourceProvider::new();
        provider
            .expect_get_page()
            .times(2)
            .returning(|_, page_size, offset| {
                assert_eq!(page_size, SOURCE_PAGE_SIZE);
                Ok(match offset {
                    0 => SourcePage {
                        items: vec![item(Some("Under Pressure"), &["Queen", "David Bowie"])],
                        has_more: true,
                    },
                    _ => SourcePage {
                        items: vec![item(Some("Heroes"), &["David Bowie"])],
                        has_more: false,
                    },
                })
            });

        let tracks = fetch_source_tracks(&provider, "src", Duration::from_secs(1))
            .await
            .unwrap();

        let got: Vec<Track> = tracks.iter().cloned().collect();
        assert_eq!(
            got,
            vec![
                Track::new("Queen", "Under Pressure"),
                Track::new("David Bowie", "Heroes"),
            ]
        );
    }

    #[tokio::test]
    async fn drops_unusable_items_and_duplicates() {
        let mut provider = MockSourceProvider::new();
        provider.expect_get_page().returning(|_, _, _| {
            Ok(SourcePage {
                items: vec![
                    item(Some("Bohemian Rhapsody"), &["Queen"]),
                    item(None, &["Queen"]),
                    item(Some("Episode 12"), &[]),
                    item(Some("  "), &["Queen"]),
                    item(Some("Untitled"), &["", "Guest"]),
                    item(Some("bohemian rhapsody"), &["Queen"]),
                ],
                has_more: false,
            })
        });

        let tracks = fetch_source_tracks(&provider, "src", Duration::from_secs(1))
            .await
            .unwrap();

        let got: Vec<Track> = tracks.iter().cloned().collect();
        assert_eq!(
            got,
            vec![
                Track::new("Queen", "Bohemian Rhapsody"),
                Track::new("Guest", "Untitled"),
            ]
        );
    }

    #[tokio::test]
    async fn empty_playlist_is_not_an_error() {
        let mut provider = MockSourceProvider::new();
        provider
            .expect_get_page()
            .returning(|_, _, _| Ok(SourcePage::default()));

        let tracks = fetch_source_tracks(&provider, "src", Duration::from_secs(1))
            .await
            .unwrap();

        assert!(tracks.is_empty());
    }

    #[tokio::test]
    async fn provider_failure_is_source_unavailable() {
        let mut provider = MockSourceProvider::new();
        provider
            .expect_get_page()
            .returning(|_, _, _| Err(ProviderError::Auth("invalid_grant".to_string())));

        let err = fetch_source_tracks(&provider, "src", Duration::from_secs(1))
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::SourceUnavailable(_)));
    }
}
