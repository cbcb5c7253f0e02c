use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio::time::{Instant, sleep};

use crate::error::{ProviderError, SyncError};
use crate::provider::{SourceItem, SourcePage, SourceProvider};

const SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const SPOTIFY_API_URL: &str = "https://api.spotify.com/v1";
const PLAYLIST_ITEM_FIELDS: &str = "items(track(name,artists(name))),next";

const MAX_ATTEMPTS: u32 = 3;
const RETRY_PAUSE: Duration = Duration::from_secs(2);
const MAX_RETRY_AFTER: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
pub struct SpotifyCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct PlaylistTracksPage {
    #[serde(default)]
    items: Vec<PlaylistEntry>,
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistEntry {
    track: Option<PlaylistTrack>,
}

#[derive(Debug, Deserialize)]
struct PlaylistTrack {
    name: Option<String>,
    artists: Option<Vec<PlaylistArtist>>,
}

#[derive(Debug, Deserialize)]
struct PlaylistArtist {
    name: Option<String>,
}

impl From<PlaylistTracksPage> for SourcePage {
    fn from(page: PlaylistTracksPage) -> Self {
        let items = page
            .items
            .into_iter()
            .map(|entry| {
                let track = entry.track;
                SourceItem {
                    name: track.as_ref().and_then(|t| t.name.clone()),
                    artists: track
                        .and_then(|t| t.artists)
                        .unwrap_or_default()
                        .into_iter()
                        .filter_map(|a| a.name)
                        .collect(),
                }
            })
            .collect();

        SourcePage {
            items,
            has_more: page.next.is_some(),
        }
    }
}

/// Spotify Web API client authenticated through a refresh token.
pub struct SpotifyClient {
    http: Client,
    access_token: String,
    call_timeout: Duration,
}

impl SpotifyClient {
    /// Exchange the refresh token for an access token.
    pub async fn connect(
        credentials: &SpotifyCredentials,
        call_timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let http = Client::builder().timeout(call_timeout).build()?;

        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", credentials.refresh_token.as_str()),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
        ];
        let response = http.post(SPOTIFY_TOKEN_URL).form(&params).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Auth(format!("Spotify token refresh returned {status}: {body}")));
        }

        let token = response.json::<TokenResponse>().await?;

        Ok(Self {
            http,
            access_token: token.access_token,
            call_timeout,
        })
    }
}

#[async_trait::async_trait]
impl SourceProvider for SpotifyClient {
    async fn get_page(
        &self,
        playlist_id: &str,
        page_size: u32,
        offset: u32,
    ) -> Result<SourcePage, ProviderError> {
        let url = format!("{SPOTIFY_API_URL}/playlists/{playlist_id}/tracks");
        // Retries share one call budget with the first attempt
        let deadline = Instant::now() + self.call_timeout;
        let mut attempt = 1;

        loop {
            let response = self
                .http
                .get(&url)
                .bearer_auth(&self.access_token)
                .query(&[
                    ("limit", page_size.to_string()),
                    ("offset", offset.to_string()),
                    ("fields", PLAYLIST_ITEM_FIELDS.to_string()),
                ])
                .send()
                .await?;

            let status = response.status();
            if attempt < MAX_ATTEMPTS {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if let Some(wait) = retry_wait(status, response.headers(), remaining) {
                    tracing::warn!(%status, attempt, ?wait, "Spotify request failed, retrying");
                    sleep(wait).await;
                    attempt += 1;
                    continue;
                }
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(ProviderError::spotify(format!("{status}: {body}")));
            }

            let page = response.json::<PlaylistTracksPage>().await?;
            return Ok(page.into());
        }
    }
}

/// Pause before retrying a failed request, or `None` when the request should
/// not be retried. Rate limits honour `Retry-After`, and a wait that would not
/// leave time for another attempt within `remaining` is not taken.
fn retry_wait(status: StatusCode, headers: &HeaderMap, remaining: Duration) -> Option<Duration> {
    if !is_transient(status) {
        return None;
    }

    let wait = if status == StatusCode::TOO_MANY_REQUESTS {
        match headers
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
        {
            Some(secs) => Duration::from_secs(secs),
            None => RETRY_PAUSE,
        }
    } else {
        RETRY_PAUSE
    };

    if wait > MAX_RETRY_AFTER || wait >= remaining {
        tracing::warn!(%status, ?wait, ?remaining, "Spotify asked to wait longer than the request budget");
        return None;
    }

    Some(wait)
}

/// Accept a bare playlist id, a `spotify:playlist:` URI or an
/// `open.spotify.com/playlist/` link, and return the bare id.
pub fn parse_playlist_id(input: &str) -> Result<String, SyncError> {
    let input = input.trim();
    let id = if let Some(rest) = input.strip_prefix("spotify:playlist:") {
        rest
    } else if let Some((_, rest)) = input.split_once("open.spotify.com/") {
        let path = rest.split(['?', '#']).next().unwrap_or_default();
        path.split('/')
            .skip_while(|segment| *segment != "playlist")
            .nth(1)
            .unwrap_or_default()
    } else {
        input
    };

    if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(SyncError::Config(format!(
            "'{input}' is not a Spotify playlist id or link"
        )));
    }

    Ok(id.to_string())
}

fn is_transient(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS | StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE
    )
}
