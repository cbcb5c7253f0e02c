use std::time::Duration;

use clap::Args;
use serde::{Deserialize, Serialize};

use crate::error::SyncError;
use crate::reconcile::DelayPolicy;
use crate::spotify::SpotifyCredentials;
use crate::youtube::YouTubeAuth;

pub const APP_NAME: &str = "spotsync";

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Add a Spotify playlist to sync (requires --to)
    #[clap(
        short = 'a',
        long,
        alias = "add-playlist",
        value_name = "SPOTIFY_PLAYLIST_ID",
        default_value = ""
    )]
    pub add: String,

    /// YouTube playlist receiving the tracks of --add
    #[clap(long, value_name = "YOUTUBE_PLAYLIST_ID")]
    pub to: Option<String>,

    /// Remove a sync pair by its Spotify playlist ID
    #[clap(
        short = 'r',
        long,
        alias = "remove-playlist",
        value_name = "SPOTIFY_PLAYLIST_ID",
        default_value = ""
    )]
    pub remove: String,

    /// List all sync pairs in the configuration
    #[clap(short = 'l', long, alias = "list-playlists")]
    pub list: bool,

    /// Reset the configuration to default values
    #[clap(long)]
    pub reset: bool,

    /// Use an OAuth2 installed-app JSON file for YouTube instead of a refresh token
    #[clap(long, value_name = "PATH")]
    pub oauth2_json: Option<String>,

    /// Pause after every YouTube search, in milliseconds
    #[clap(long, value_name = "MS")]
    pub search_delay_ms: Option<u64>,

    /// Pause after every playlist insert, in milliseconds
    #[clap(long, value_name = "MS")]
    pub append_delay_ms: Option<u64>,

    /// Per-request timeout, in seconds
    #[clap(long, value_name = "SECS")]
    pub timeout_secs: Option<u64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Path to the Google OAuth2 installed-app JSON, if that flow is used
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oauth2_json: Option<String>,

    pub search_delay_ms: u64,
    pub append_delay_ms: u64,
    pub timeout_secs: u64,

    /// Names of the environment variables holding credentials
    pub env: CredentialVars,

    /// Playlists to sync
    pub pairs: Vec<SyncPair>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CredentialVars {
    pub spotify_client_id: String,
    pub spotify_client_secret: String,
    pub spotify_refresh_token: String,
    pub google_client_id: String,
    pub google_client_secret: String,
    pub google_refresh_token: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SyncPair {
    /// Spotify playlist to read
    pub source: String,

    /// YouTube playlist to append to
    pub destination: String,

    /// Title of the YouTube playlist, for display
    pub title: String,
}

impl Default for CredentialVars {
    fn default() -> Self {
        CredentialVars {
            spotify_client_id: "SPOTIFY_CLIENT_ID".to_string(),
            spotify_client_secret: "SPOTIFY_CLIENT_SECRET".to_string(),
            spotify_refresh_token: "SPOTIFY_REFRESH_TOKEN".to_string(),
            google_client_id: "GOOGLE_CLIENT_ID".to_string(),
            google_client_secret: "GOOGLE_CLIENT_SECRET".to_string(),
            google_refresh_token: "GOOGLE_REFRESH_TOKEN".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let delays = DelayPolicy::default();
        Config {
            oauth2_json: None,
            search_delay_ms: delays.after_search.as_millis() as u64,
            append_delay_ms: delays.after_append.as_millis() as u64,
            timeout_secs: 30,
            env: CredentialVars::default(),
            pairs: Vec::new(),
        }
    }
}

impl Config {
    /// Add a sync pair, replacing any existing pair for the same source
    pub fn add_pair(&mut self, pair: SyncPair) -> &Self {
        self.pairs.retain(|p| p.source != pair.source);
        self.pairs.push(pair);

        self
    }

    /// Remove a sync pair by its source playlist ID
    pub fn remove_pair(&mut self, source: &str) -> &Self {
        self.pairs.retain(|p| p.source != source);

        self
    }

    pub fn set_oauth_path(&mut self, path: Option<String>) {
        self.oauth2_json = path;
    }

    pub fn delays(&self) -> DelayPolicy {
        DelayPolicy {
            after_search: Duration::from_millis(self.search_delay_ms),
            after_append: Duration::from_millis(self.append_delay_ms),
        }
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub fn spotify_credentials(&self) -> Result<SpotifyCredentials, SyncError> {
        Ok(SpotifyCredentials {
            client_id: env_var(&self.env.spotify_client_id)?,
            client_secret: env_var(&self.env.spotify_client_secret)?,
            refresh_token: env_var(&self.env.spotify_refresh_token)?,
        })
    }

    pub fn youtube_auth(&self) -> Result<YouTubeAuth, SyncError> {
        if let Some(oauth2_json) = &self.oauth2_json {
            return Ok(YouTubeAuth::InstalledFlow {
                oauth2_json: oauth2_json.clone(),
            });
        }

        Ok(YouTubeAuth::RefreshToken {
            client_id: env_var(&self.env.google_client_id)?,
            client_secret: env_var(&self.env.google_client_secret)?,
            refresh_token: env_var(&self.env.google_refresh_token)?,
        })
    }

    /// Read the configuration from the file
    pub fn read() -> Result<Self, Box<dyn std::error::Error>> {
        let cfg: Config = confy::load(APP_NAME, None)?;

        Ok(cfg)
    }

    /// Write the configuration to the file
    pub fn write(&self) -> Result<(), Box<dyn std::error::Error>> {
        confy::store(APP_NAME, None, self)?;

        Ok(())
    }
}

fn env_var(name: &str) -> Result<String, SyncError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(SyncError::Config(format!(
            "environment variable {name} is not set"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(source: &str, destination: &str) -> SyncPair {
        SyncPair {
            source: source.to_string(),
            destination: destination.to_string(),
            title: format!("{destination} title"),
        }
    }

    #[test]
    fn defaults_throttle_appends_only() {
        let cfg = Config::default();

        assert_eq!(cfg.delays(), DelayPolicy::default());
        assert_eq!(cfg.call_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn adding_same_source_replaces_pair() {
        let mut cfg = Config::default();
        cfg.add_pair(pair("sp1", "yt1"));
        cfg.add_pair(pair("sp2", "yt2"));
        cfg.add_pair(pair("sp1", "yt3"));

        assert_eq!(cfg.pairs, vec![pair("sp2", "yt2"), pair("sp1", "yt3")]);

        cfg.remove_pair("sp2");
        assert_eq!(cfg.pairs, vec![pair("sp1", "yt3")]);
    }

    #[test]
    fn zero_timeout_is_clamped() {
        let cfg = Config {
            timeout_secs: 0,
            ..Config::default()
        };

        assert_eq!(cfg.call_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn oauth_json_takes_precedence_over_env() {
        let mut cfg = Config::default();
        cfg.set_oauth_path(Some("/tmp/client_secret.json".to_string()));

        let auth = cfg.youtube_auth().unwrap();
        assert!(matches!(auth, YouTubeAuth::InstalledFlow { .. }));
    }

    #[test]
    fn missing_env_var_names_the_variable() {
        let mut cfg = Config::default();
        cfg.env.spotify_client_id = "SPOTSYNC_TEST_UNSET_VARIABLE".to_string();

        let err = cfg.spotify_credentials().unwrap_err();
        assert!(err.to_string().contains("SPOTSYNC_TEST_UNSET_VARIABLE"));
    }

    #[test]
    fn round_trips_through_serde() {
        let cfg = Config::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();

        assert_eq!(back, cfg);
    }
}
