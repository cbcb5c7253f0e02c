use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::destination::DestinationIndex;
use crate::error::ItemError;
use crate::provider::{DestinationProvider, with_timeout};
use crate::track::{MatchQuery, TrackList};

/// Pauses inserted between provider calls, per call type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayPolicy {
    /// Applied after every search, whether or not it matched.
    pub after_search: Duration,
    /// Applied after every append attempt.
    pub after_append: Duration,
}

impl Default for DelayPolicy {
    fn default() -> Self {
        DelayPolicy {
            after_search: Duration::ZERO,
            after_append: Duration::from_millis(200),
        }
    }
}

impl DelayPolicy {
    #[cfg(test)]
    pub fn none() -> Self {
        DelayPolicy {
            after_search: Duration::ZERO,
            after_append: Duration::ZERO,
        }
    }
}

/// What happened to one track.
#[derive(Debug)]
pub enum TrackOutcome {
    Added { video_id: String },
    AlreadyPresent { video_id: String },
    NoMatch,
    Failed(ItemError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    Search,
    Append,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    pub query: String,
    pub stage: FailureStage,
    pub message: String,
}

/// Summary of one reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunResult {
    pub added_count: usize,
    pub skipped_count: usize,
    /// Queries with no usable candidate, in track order. Includes searches
    /// that failed.
    pub unmatched: Vec<String>,
    pub failures: Vec<ItemFailure>,
    /// The run stopped early because it was cancelled.
    pub cancelled: bool,
}

impl RunResult {
    pub fn append_failures(&self) -> usize {
        self.failures
            .iter()
            .filter(|f| f.stage == FailureStage::Append)
            .count()
    }

    pub fn search_failures(&self) -> usize {
        self.failures
            .iter()
            .filter(|f| f.stage == FailureStage::Search)
            .count()
    }

    /// Number of tracks that were fully processed.
    pub fn processed(&self) -> usize {
        self.added_count + self.skipped_count + self.unmatched.len() + self.append_failures()
    }

    fn record(&mut self, query: MatchQuery, outcome: &TrackOutcome) {
        match outcome {
            TrackOutcome::Added { .. } => self.added_count += 1,
            TrackOutcome::AlreadyPresent { .. } => self.skipped_count += 1,
            TrackOutcome::NoMatch => self.unmatched.push(query.into_string()),
            TrackOutcome::Failed(err) => {
                let stage = match err {
                    ItemError::SearchFailed(_) => FailureStage::Search,
                    ItemError::AddFailed { .. } => FailureStage::Append,
                };
                if stage == FailureStage::Search {
                    self.unmatched.push(query.as_str().to_string());
                }
                self.failures.push(ItemFailure {
                    query: query.into_string(),
                    stage,
                    message: err.to_string(),
                });
            }
        }
    }
}

/// Walks a track list in order, resolving each track to a video and adding it
/// to the destination playlist unless the index already holds it.
///
/// Tracks are handled strictly one after the other: every dedup decision sees
/// the index as left by the previous track.
pub struct Reconciler<'a, D: ?Sized> {
    destination: &'a D,
    playlist_id: &'a str,
    index: DestinationIndex,
    delays: DelayPolicy,
    call_timeout: Duration,
    cancel: CancellationToken,
}

impl<'a, D> Reconciler<'a, D>
where
    D: DestinationProvider + ?Sized,
{
    pub fn new(destination: &'a D, playlist_id: &'a str, index: DestinationIndex) -> Self {
        Self {
            destination,
            playlist_id,
            index,
            delays: DelayPolicy::default(),
            call_timeout: Duration::from_secs(30),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_delays(mut self, delays: DelayPolicy) -> Self {
        self.delays = delays;
        self
    }

    pub fn with_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Reconcile every track, reporting each outcome to `on_outcome` as it
    /// happens.
    pub async fn run<F>(mut self, tracks: &TrackList, mut on_outcome: F) -> RunResult
    where
        F: FnMut(&MatchQuery, &TrackOutcome),
    {
        let mut result = RunResult::default();

        for track in tracks {
            if self.cancel.is_cancelled() {
                tracing::warn!(
                    remaining = tracks.len() - result.processed(),
                    "reconciliation cancelled"
                );
                result.cancelled = true;
                break;
            }

            let query = track.query();
            let outcome = self.reconcile_one(&query).await;

            match &outcome {
                TrackOutcome::Added { video_id } => {
                    tracing::info!(query = %query, video_id, "added")
                }
                TrackOutcome::AlreadyPresent { video_id } => {
                    tracing::info!(query = %query, video_id, "already present")
                }
                TrackOutcome::NoMatch => tracing::info!(query = %query, "no match"),
                TrackOutcome::Failed(err) => tracing::warn!(query = %query, error = %err, "failed"),
            }

            on_outcome(&query, &outcome);
            result.record(query, &outcome);
        }

        result
    }

    async fn reconcile_one(&mut self, query: &MatchQuery) -> TrackOutcome {
        let searched = with_timeout(self.call_timeout, self.destination.search(query.as_str())).await;
        self.pause(self.delays.after_search).await;

        let video_id = match searched {
            Ok(Some(video_id)) => video_id,
            Ok(None) => return TrackOutcome::NoMatch,
            Err(err) => return TrackOutcome::Failed(ItemError::SearchFailed(err)),
        };

        if self.index.contains(&video_id) {
            return TrackOutcome::AlreadyPresent { video_id };
        }

        let appended = with_timeout(
            self.call_timeout,
            self.destination.append(self.playlist_id, &video_id),
        )
        .await;
        self.pause(self.delays.after_append).await;

        match appended {
            Ok(()) => {
                self.index.insert(video_id.clone());
                TrackOutcome::Added { video_id }
            }
            Err(source) => TrackOutcome::Failed(ItemError::AddFailed { video_id, source }),
        }
    }

    async fn pause(&self, delay: Duration) {
        if delay.is_zero() {
            return;
        }
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = self.cancel.cancelled() => {}
        }
    }
}
