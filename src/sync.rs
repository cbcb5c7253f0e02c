use std::time::Duration;

use cliclack::{log, note, spinner};
use tokio_util::sync::CancellationToken;

use crate::config::SyncPair;
use crate::destination::{DestinationIndex, DryRun, fetch_destination_ids};
use crate::error::SyncError;
use crate::provider::{DestinationProvider, SourceProvider};
use crate::reconcile::{DelayPolicy, Reconciler, RunResult, TrackOutcome};
use crate::source::fetch_source_tracks;
use crate::track::{MatchQuery, TrackList};

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub dry_run: bool,
    pub delays: DelayPolicy,
    pub call_timeout: Duration,
    pub cancel: CancellationToken,
}

/// Sync one Spotify playlist into its YouTube playlist.
///
/// The destination is indexed before the source is read; failing either
/// aborts the pair before anything is searched or added.
pub async fn sync_pair<S, D>(
    source: &S,
    destination: &D,
    pair: &SyncPair,
    options: &SyncOptions,
) -> Result<RunResult, SyncError>
where
    S: SourceProvider + ?Sized,
    D: DestinationProvider + ?Sized,
{
    if options.cancel.is_cancelled() {
        tracing::warn!(source = %pair.source, "cancelled before reading playlists");
        return Ok(cancelled());
    }

    let sp = spinner();
    sp.start(format!("Reading YouTube playlist: {}", pair.title));

    let index = match fetch_destination_ids(destination, &pair.destination, options.call_timeout).await
    {
        Ok(index) => index,
        Err(e) => {
            sp.error(format!("Could not read '{}': {}", pair.title, e));
            return Err(e);
        }
    };

    if options.cancel.is_cancelled() {
        sp.stop(format!("Cancelled before reading Spotify playlist {}", pair.source));
        return Ok(cancelled());
    }

    sp.set_message(format!("Reading Spotify playlist: {}", pair.source));
    let tracks = match fetch_source_tracks(source, &pair.source, options.call_timeout).await {
        Ok(tracks) => tracks,
        Err(e) => {
            sp.error(format!("Could not read Spotify playlist {}: {}", pair.source, e));
            return Err(e);
        }
    };

    sp.stop(format!(
        "Found {} tracks, {} videos already in '{}'",
        tracks.len(),
        index.len(),
        pair.title
    ));
    if tracks.is_empty() {
        let _ = log::remark("Nothing to sync");
    }

    let result = if options.dry_run {
        reconcile(&DryRun::new(destination), pair, index, &tracks, options).await
    } else {
        reconcile(destination, pair, index, &tracks, options).await
    };

    let _ = note(
        format!("{} -> {}", pair.source, pair.title),
        summary(&result, options.dry_run),
    );
    if !result.unmatched.is_empty() {
        let _ = note("Unmatched", result.unmatched.join("\n"));
    }
    if !result.failures.is_empty() {
        let failures: Vec<String> = result
            .failures
            .iter()
            .map(|f| format!("{}: {}", f.query, f.message))
            .collect();
        let _ = note("Failed", failures.join("\n"));
    }

    Ok(result)
}

fn cancelled() -> RunResult {
    RunResult {
        cancelled: true,
        ..RunResult::default()
    }
}

async fn reconcile<D>(
    destination: &D,
    pair: &SyncPair,
    index: DestinationIndex,
    tracks: &TrackList,
    options: &SyncOptions,
) -> RunResult
where
    D: DestinationProvider + ?Sized,
{
    Reconciler::new(destination, &pair.destination, index)
        .with_delays(options.delays)
        .with_timeout(options.call_timeout)
        .with_cancellation(options.cancel.clone())
        .run(tracks, |query, outcome| report(query, outcome, options.dry_run))
        .await
}

fn report(query: &MatchQuery, outcome: &TrackOutcome, dry_run: bool) {
    let _ = match outcome {
        TrackOutcome::Added { video_id } if dry_run => {
            log::info(format!("WOULD ADD: {query} -> {video_id}"))
        }
        TrackOutcome::Added { video_id } => log::success(format!("ADDED: {query} -> {video_id}")),
        TrackOutcome::AlreadyPresent { .. } => log::remark(format!("ALREADY PRESENT: {query}")),
        TrackOutcome::NoMatch => log::warning(format!("NO MATCH: {query}")),
        TrackOutcome::Failed(e) => log::error(format!("FAILED: {query}: {e}")),
    };
}

fn summary(result: &RunResult, dry_run: bool) -> String {
    let mut lines = vec![
        if dry_run {
            format!("Would add {} new items", result.added_count)
        } else {
            format!("Added {} new items", result.added_count)
        },
        format!("{} already present", result.skipped_count),
        match result.search_failures() {
            0 => format!("{} unmatched", result.unmatched.len()),
            n => format!("{} unmatched ({n} failed searches)", result.unmatched.len()),
        },
    ];

    let append_failures = result.append_failures();
    if append_failures > 0 {
        lines.push(format!("{append_failures} failed to add"));
    }
    if result.cancelled {
        lines.push("Cancelled before the end of the playlist".to_string());
    }

    lines.join("\n")
}
