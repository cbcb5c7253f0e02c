use clap::{Parser, Subcommand};
use cliclack::{confirm, intro, log, note, outro};
use tokio_util::sync::CancellationToken;

mod config;
mod destination;
mod error;
mod logging;
mod provider;
mod reconcile;
mod source;
mod spotify;
mod sync;
mod track;
mod youtube;

use error::SyncError;
use spotify::SpotifyClient;
use youtube::YouTubeClient;

#[derive(Parser, Debug)]
#[command(version, about = "Mirror Spotify playlists into YouTube playlists")]
struct Cli {
    /// Tracing filter for diagnostics on stderr (defaults to RUST_LOG, then "warn")
    #[clap(long, global = true, value_name = "FILTER")]
    log_level: Option<String>,

    /// The command to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage sync configuration
    Config(config::ConfigArgs),
    /// Sync playlists based on configuration
    Sync {
        /// Spotify playlist to sync instead of the configured pairs
        #[clap(long, env = "SPOTIFY_PLAYLIST_ID", value_name = "SPOTIFY_PLAYLIST_ID")]
        source: Option<String>,
        /// YouTube playlist receiving --source
        #[clap(long, env = "YOUTUBE_PLAYLIST_ID", value_name = "YOUTUBE_PLAYLIST_ID")]
        destination: Option<String>,
        /// Search for matches without adding anything
        #[clap(short = 'd', long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| "Failed to install rustls crypto provider")?;

    let cli = Cli::parse();
    logging::init_tracing(cli.log_level.as_deref())?;

    match cli.command {
        Commands::Config(args) => handle_config(args).await?,
        Commands::Sync {
            source,
            destination,
            dry_run,
        } => handle_sync(source, destination, dry_run).await?,
    }

    Ok(())
}

async fn handle_config(args: config::ConfigArgs) -> Result<(), Box<dyn std::error::Error>> {
    intro("📝 Sync Configuration")?;

    let mut cfg = config::Config::read().unwrap_or_default();

    if args.reset {
        let confirmed = confirm("Are you sure you want to reset the configuration?").interact()?;

        if confirmed {
            cfg = config::Config::default();
            cfg.write()?;
            outro("✅ Configuration reset successfully")?;
        }
        return Ok(());
    }

    if args.oauth2_json.is_some() {
        cfg.set_oauth_path(args.oauth2_json.clone());
        cfg.write()?;
        log::success("OAuth2 JSON path set")?;
    }

    if args.search_delay_ms.is_some()
        || args.append_delay_ms.is_some()
        || args.timeout_secs.is_some()
    {
        cfg.search_delay_ms = args.search_delay_ms.unwrap_or(cfg.search_delay_ms);
        cfg.append_delay_ms = args.append_delay_ms.unwrap_or(cfg.append_delay_ms);
        cfg.timeout_secs = args.timeout_secs.unwrap_or(cfg.timeout_secs);
        cfg.write()?;
        log::success("Pacing updated")?;
    }

    if !args.add.is_empty() {
        let Some(destination) = args.to.clone() else {
            outro("❌ --add needs the YouTube playlist given with --to")?;
            return Err("missing --to".into());
        };

        let source = spotify::parse_playlist_id(&args.add)?;

        let client = match YouTubeClient::new(&cfg.youtube_auth()?).await {
            Ok(client) => client,
            Err(e) => {
                outro(format!("❌ Could not connect to YouTube: {}", e))?;
                return Err(SyncError::DestinationUnavailable(e).into());
            }
        };

        match client.get_playlist_title(&destination).await {
            Ok(title) => {
                cfg.add_pair(config::SyncPair {
                    source,
                    destination,
                    title,
                });
                cfg.write()?;
                outro("✅ Playlist pair added successfully")?;
            }
            Err(e) => {
                outro(format!("❌ Failed to fetch playlist info: {}", e))?;
                return Err(e.into());
            }
        }
    }

    if !args.remove.is_empty() {
        cfg.remove_pair(&args.remove);
        cfg.write()?;
        outro("✅ Playlist pair removed successfully")?;
    }

    if args.list {
        match &cfg.oauth2_json {
            Some(oauth2_json) => note("YouTube auth", format!("OAuth2 JSON: {oauth2_json}"))?,
            None => note(
                "YouTube auth",
                format!("Refresh token from ${}", cfg.env.google_refresh_token),
            )?,
        }
        note(
            "Pacing",
            format!(
                "search delay {} ms, append delay {} ms, timeout {} s",
                cfg.search_delay_ms, cfg.append_delay_ms, cfg.timeout_secs
            ),
        )?;

        intro("📜 Listing all playlist pairs:")?;

        if cfg.pairs.is_empty() {
            note("No playlist pairs", "Add one with --add <SPOTIFY_ID> --to <YOUTUBE_ID>")?;
        }
        for pair in &cfg.pairs {
            note(
                format!("{} (ID: {})", pair.title, pair.destination),
                format!("from Spotify playlist {}", pair.source),
            )?;
        }

        outro("✅ Configuration listing completed")?;
    }

    Ok(())
}

async fn handle_sync(
    source: Option<String>,
    destination: Option<String>,
    dry_run: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    intro(if dry_run {
        "🔍 Playlist Sync (Dry Run)"
    } else {
        "🔄 Playlist Sync"
    })?;

    let cfg = config::Config::read().unwrap_or_default();

    let pairs = match (source, destination) {
        (Some(source), Some(destination)) => vec![config::SyncPair {
            source: spotify::parse_playlist_id(&source)?,
            title: destination.clone(),
            destination,
        }],
        (None, None) => cfg.pairs.clone(),
        _ => {
            outro("❌ --source and --destination must be given together")?;
            return Err(SyncError::Config("incomplete playlist pair".to_string()).into());
        }
    };

    if pairs.is_empty() {
        outro("❌ No playlists found to sync")?;
        return Ok(());
    }

    let youtube = match YouTubeClient::new(&cfg.youtube_auth()?).await {
        Ok(client) => client,
        Err(e) => {
            outro(format!("❌ Could not connect to YouTube: {}", e))?;
            return Err(SyncError::DestinationUnavailable(e).into());
        }
    };

    let spotify = match SpotifyClient::connect(&cfg.spotify_credentials()?, cfg.call_timeout()).await
    {
        Ok(client) => client,
        Err(e) => {
            outro(format!("❌ Could not connect to Spotify: {}", e))?;
            return Err(SyncError::SourceUnavailable(e).into());
        }
    };

    let cancel = CancellationToken::new();
    let watcher = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, stopping after the current track");
            watcher.cancel();
        }
    });

    let options = sync::SyncOptions {
        dry_run,
        delays: cfg.delays(),
        call_timeout: cfg.call_timeout(),
        cancel,
    };

    let mut added = 0;
    let mut failed_pairs = 0;
    for pair in &pairs {
        if options.cancel.is_cancelled() {
            log::warning(format!("Cancelled, not syncing '{}'", pair.title))?;
            break;
        }
        match sync::sync_pair(&spotify, &youtube, pair, &options).await {
            Ok(result) => {
                added += result.added_count;
                if result.cancelled {
                    break;
                }
            }
            Err(e) => {
                tracing::error!(source = %pair.source, destination = %pair.destination, error = %e, "sync failed");
                log::error(format!("Skipping '{}': {}", pair.title, e))?;
                failed_pairs += 1;
            }
        }
    }

    let verb = if dry_run { "would be added" } else { "added" };
    outro(format!("✅ Done. {added} new items {verb}."))?;

    if failed_pairs > 0 {
        return Err(format!("{failed_pairs} playlist pair(s) could not be synced").into());
    }

    Ok(())
}
