use google_youtube3::{
    YouTube,
    api::{PlaylistItem, PlaylistItemListResponse, PlaylistItemSnippet, ResourceId, SearchListResponse},
    hyper_rustls, hyper_util, yup_oauth2,
};

use crate::error::ProviderError;
use crate::provider::{DestinationPage, DestinationProvider};

const YOUTUBE_SCOPES: &[&str] = &["https://www.googleapis.com/auth/youtube"];

/// How the YouTube client obtains its OAuth2 token.
#[derive(Debug, Clone)]
pub enum YouTubeAuth {
    /// Interactive installed-app flow, tokens cached next to the config file.
    InstalledFlow { oauth2_json: String },
    /// Non-interactive refresh of a previously granted token.
    RefreshToken {
        client_id: String,
        client_secret: String,
        refresh_token: String,
    },
}

pub struct YouTubeClient {
    hub: YouTube<hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>>,
}

impl YouTubeClient {
    pub async fn new(auth: &YouTubeAuth) -> Result<Self, ProviderError> {
        let authenticator = match auth {
            YouTubeAuth::InstalledFlow { oauth2_json } => {
                let secret = yup_oauth2::read_application_secret(oauth2_json)
                    .await
                    .map_err(|e| ProviderError::Auth(format!("reading {oauth2_json}: {e}")))?;

                let cache_dir = confy::get_configuration_file_path(crate::config::APP_NAME, None)
                    .map_err(|e| ProviderError::Auth(e.to_string()))?
                    .parent()
                    .ok_or_else(|| ProviderError::Auth("failed to get config directory".to_string()))?
                    .to_path_buf();

                std::fs::create_dir_all(&cache_dir)
                    .map_err(|e| ProviderError::Auth(e.to_string()))?;
                let token_cache_path = cache_dir.join("token_cache.json");

                yup_oauth2::InstalledFlowAuthenticator::builder(
                    secret,
                    yup_oauth2::InstalledFlowReturnMethod::HTTPRedirect,
                )
                .persist_tokens_to_disk(token_cache_path)
                .build()
                .await
                .map_err(|e| ProviderError::Auth(e.to_string()))?
            }
            YouTubeAuth::RefreshToken {
                client_id,
                client_secret,
                refresh_token,
            } => {
                let secret = yup_oauth2::authorized_user::AuthorizedUserSecret {
                    client_id: client_id.clone(),
                    client_secret: client_secret.clone(),
                    refresh_token: refresh_token.clone(),
                    key_type: "authorized_user".to_string(),
                };

                yup_oauth2::AuthorizedUserAuthenticator::builder(secret)
                    .build()
                    .await
                    .map_err(|e| ProviderError::Auth(e.to_string()))?
            }
        };

        // Fail now rather than on the first playlist call
        authenticator
            .token(YOUTUBE_SCOPES)
            .await
            .map_err(|e| ProviderError::Auth(e.to_string()))?;

        let connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()
            .map_err(|e| ProviderError::youtube(format!("loading TLS roots: {e}")))?
            .https_or_http()
            .enable_http1()
            .build();

        let hub = YouTube::new(
            hyper_util::client::legacy::Client::builder(hyper_util::rt::TokioExecutor::new())
                .build(connector),
            authenticator,
        );

        Ok(Self { hub })
    }

    pub async fn get_playlist_title(&self, playlist_id: &str) -> Result<String, ProviderError> {
        let result = self
            .hub
            .playlists()
            .list(&vec!["snippet".to_string()])
            .add_id(playlist_id)
            .doit()
            .await
            .map_err(|e| ProviderError::youtube(e.to_string()))?;

        result
            .1
            .items
            .and_then(|items| items.into_iter().next())
            .and_then(|playlist| playlist.snippet)
            .map(|snippet| snippet.title.unwrap_or_default())
            .ok_or_else(|| ProviderError::youtube(format!("playlist {playlist_id} not found")))
    }
}

#[async_trait::async_trait]
impl DestinationProvider for YouTubeClient {
    async fn list_page(
        &self,
        playlist_id: &str,
        page_size: u32,
        cursor: Option<String>,
    ) -> Result<DestinationPage, ProviderError> {
        let mut request = self
            .hub
            .playlist_items()
            .list(&vec!["snippet".to_string(), "contentDetails".to_string()])
            .playlist_id(playlist_id)
            .max_results(page_size);

        if let Some(token) = &cursor {
            request = request.page_token(token);
        }

        let (_, response) = request
            .doit()
            .await
            .map_err(|e| ProviderError::youtube(e.to_string()))?;

        Ok(destination_page(response))
    }

    async fn search(&self, query: &str) -> Result<Option<String>, ProviderError> {
        let (_, response) = self
            .hub
            .search()
            .list(&vec!["snippet".to_string()])
            .q(query)
            .max_results(1)
            .add_type("video")
            .safe_search("none")
            .doit()
            .await
            .map_err(|e| ProviderError::youtube(e.to_string()))?;

        Ok(top_video_id(response))
    }

    async fn append(&self, playlist_id: &str, video_id: &str) -> Result<(), ProviderError> {
        let playlist_item = PlaylistItem {
            snippet: Some(PlaylistItemSnippet {
                playlist_id: Some(playlist_id.to_string()),
                resource_id: Some(ResourceId {
                    kind: Some("youtube#video".to_string()),
                    video_id: Some(video_id.to_string()),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        };

        self.hub
            .playlist_items()
            .insert(playlist_item)
            .add_part("snippet")
            .doit()
            .await
            .map_err(|e| ProviderError::youtube(e.to_string()))?;

        Ok(())
    }
}

/// Video ids of a playlist page. `contentDetails` is preferred; items that
/// only carry a snippet fall back to its resource id.
fn destination_page(response: PlaylistItemListResponse) -> DestinationPage {
    let video_ids = response
        .items
        .unwrap_or_default()
        .into_iter()
        .filter_map(|item| {
            item.content_details
                .and_then(|details| details.video_id)
                .or_else(|| {
                    item.snippet
                        .and_then(|snippet| snippet.resource_id)
                        .and_then(|resource| resource.video_id)
                })
        })
        .collect();

    DestinationPage {
        video_ids,
        next_cursor: response.next_page_token,
    }
}

fn top_video_id(response: SearchListResponse) -> Option<String> {
    response
        .items
        .and_then(|items| items.into_iter().next())
        .and_then(|result| result.id)
        .and_then(|id| id.video_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn playlist_page_falls_back_to_snippet_resource_id() {
        let json = r#"{
            "items": [
                {"contentDetails": {"videoId": "fromDetails"}, "snippet": {"resourceId": {"videoId": "ignored"}}},
                {"snippet": {"resourceId": {"kind": "youtube#video", "videoId": "fromSnippet"}}},
                {"snippet": {"title": "Deleted video"}}
            ],
            "nextPageToken": "CDIQAA"
        }"#;

        let response: PlaylistItemListResponse = serde_json::from_str(json).unwrap();
        let page = destination_page(response);

        assert_eq!(page.video_ids, vec!["fromDetails", "fromSnippet"]);
        assert_eq!(page.next_cursor.as_deref(), Some("CDIQAA"));
    }

    #[test]
    fn last_playlist_page_has_no_cursor() {
        let response: PlaylistItemListResponse = serde_json::from_str(r#"{"items": []}"#).unwrap();
        let page = destination_page(response);

        assert!(page.video_ids.is_empty());
        assert!(page.next_cursor.is_none());
    }

    #[test]
    fn search_takes_first_result() {
        let json = r#"{
            "items": [
                {"id": {"kind": "youtube#video", "videoId": "fJ9rUzIMcZQ"}},
                {"id": {"kind": "youtube#video", "videoId": "second"}}
            ]
        }"#;

        let response: SearchListResponse = serde_json::from_str(json).unwrap();

        assert_eq!(top_video_id(response).as_deref(), Some("fJ9rUzIMcZQ"));
    }

    #[test]
    fn empty_search_has_no_candidate() {
        let response: SearchListResponse = serde_json::from_str(r#"{"items": []}"#).unwrap();
        assert_eq!(top_video_id(response), None);

        let response: SearchListResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(top_video_id(response), None);
    }
}
