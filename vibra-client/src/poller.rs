//! Generation Poller
//!
//! After a successful submission the client polls the task status until the
//! task finishes, fails, or a ceiling is hit:
//!
//! ```text
//! IDLE → POLLING → COMPLETED | FAILED | TIMED_OUT | ABORTED | CANCELLED
//! ```
//!
//! - One status call per interval; the first call happens one interval after
//!   start.
//! - Every tick counts as an attempt. The tick after `max_attempts` ends the
//!   session as TIMED_OUT without calling the status source.
//! - A successful call resets the consecutive error count; `max_consecutive_errors`
//!   failed calls in a row end the session as ABORTED.
//! - Finished tracks are added to the library, then navigation to the library
//!   happens after `navigation_delay`.
//!
//! Each session runs on its own task and is owned by a [`PollingSession`].
//! Cancelling or dropping the session stops it: no further status calls and
//! no library changes.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use vibra_common::config::env_non_empty;
use vibra_common::models::{ApiEnvelope, RecordInfo};
use vibra_common::{ModelVersion, TaskHandle, TaskStatus, Track};

use crate::error::Result;
use crate::library::LibraryStore;
use crate::notify::{Navigator, Notice, Notifier, Route};

/// Environment variable with the fallback cover image URL
pub const IMAGE_URL_ENV: &str = "VITE_IMAGE_URL";

/// Source of task status documents
#[async_trait]
pub trait TaskStatusSource: Send + Sync {
    async fn fetch_status(&self, task_id: &str) -> Result<ApiEnvelope<RecordInfo>>;
}

/// Poller tuning
#[derive(Debug, Clone, PartialEq)]
pub struct PollerConfig {
    pub interval: Duration,
    pub max_attempts: u32,
    pub max_consecutive_errors: u32,
    /// Wait between completion and navigating to the library
    pub navigation_delay: Duration,
    /// Cover image for tracks that come back without one
    pub fallback_image: String,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_attempts: 60,
            max_consecutive_errors: 5,
            navigation_delay: Duration::from_secs(2),
            fallback_image: String::new(),
        }
    }
}

impl PollerConfig {
    /// Defaults with the fallback image from `VITE_IMAGE_URL`
    pub fn from_env() -> Self {
        Self {
            fallback_image: env_non_empty(IMAGE_URL_ENV).unwrap_or_default(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Polling,
    Completed,
    Failed,
    TimedOut,
    Aborted,
    Cancelled,
}

impl PollState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PollState::Idle | PollState::Polling)
    }
}

/// How a session ended
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// Tracks were produced and added to the library
    Completed { tracks: Vec<Track> },
    /// Task succeeded but returned no tracks
    NoAudio,
    /// Upstream reported a failed task
    Failed { status: TaskStatus },
    /// Attempt ceiling reached; `attempts` status calls were issued
    TimedOut { attempts: u32 },
    /// Too many failed status calls in a row
    Aborted { consecutive_errors: u32 },
    Cancelled,
}

impl PollOutcome {
    pub fn state(&self) -> PollState {
        match self {
            PollOutcome::Completed { .. } | PollOutcome::NoAudio => PollState::Completed,
            PollOutcome::Failed { .. } => PollState::Failed,
            PollOutcome::TimedOut { .. } => PollState::TimedOut,
            PollOutcome::Aborted { .. } => PollState::Aborted,
            PollOutcome::Cancelled => PollState::Cancelled,
        }
    }
}

/// Starts polling sessions that share a library, notifier and navigator
#[derive(Clone)]
pub struct GenerationPoller {
    source: Arc<dyn TaskStatusSource>,
    library: LibraryStore,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
    config: PollerConfig,
}

impl GenerationPoller {
    pub fn new(
        source: Arc<dyn TaskStatusSource>,
        library: LibraryStore,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
        config: PollerConfig,
    ) -> Self {
        Self {
            source,
            library,
            notifier,
            navigator,
            config,
        }
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// Start polling `task`.
    ///
    /// `title` and `model` describe the submission; tracks without a title of
    /// their own take `title`.
    pub fn start(&self, task: TaskHandle, title: Option<String>, model: ModelVersion) -> PollingSession {
        let cancel = CancellationToken::new();
        let (state_tx, state_rx) = watch::channel(PollState::Idle);

        let run = PollRun {
            task_id: task.task_id.clone(),
            title,
            model,
            source: self.source.clone(),
            library: self.library.clone(),
            notifier: self.notifier.clone(),
            navigator: self.navigator.clone(),
            config: self.config.clone(),
            cancel: cancel.clone(),
            state: state_tx,
        };

        info!(task_id = %task.task_id, "Polling started");
        let handle = tokio::spawn(run.run());

        PollingSession {
            task_id: task.task_id,
            cancel,
            state: state_rx,
            handle: Some(handle),
        }
    }
}

/// Handle to one running poll. Dropping it cancels the poll.
pub struct PollingSession {
    task_id: String,
    cancel: CancellationToken,
    state: watch::Receiver<PollState>,
    handle: Option<JoinHandle<PollOutcome>>,
}

impl PollingSession {
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Current state
    pub fn state(&self) -> PollState {
        *self.state.borrow()
    }

    /// Wait for the next state change; returns `None` once the session task
    /// has ended
    pub async fn changed(&mut self) -> Option<PollState> {
        self.state.changed().await.ok()?;
        Some(*self.state.borrow_and_update())
    }

    /// Stop polling; takes effect before the next status call
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Wait for the session to end
    pub async fn wait(mut self) -> PollOutcome {
        match self.handle.take() {
            Some(handle) => handle.await.unwrap_or_else(|e| {
                warn!(task_id = %self.task_id, "Polling task ended abnormally: {}", e);
                PollOutcome::Cancelled
            }),
            None => PollOutcome::Cancelled,
        }
    }
}

impl Drop for PollingSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// State owned by one session task
struct PollRun {
    task_id: String,
    title: Option<String>,
    model: ModelVersion,
    source: Arc<dyn TaskStatusSource>,
    library: LibraryStore,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
    config: PollerConfig,
    cancel: CancellationToken,
    state: watch::Sender<PollState>,
}

impl PollRun {
    async fn run(self) -> PollOutcome {
        let outcome = self.poll().await;
        self.state.send_replace(outcome.state());
        debug!(task_id = %self.task_id, outcome = ?outcome.state(), "Polling finished");
        outcome
    }

    async fn poll(&self) -> PollOutcome {
        let interval = self.config.interval;
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut attempts: u32 = 0;
        let mut consecutive_errors: u32 = 0;
        self.state.send_replace(PollState::Polling);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => return PollOutcome::Cancelled,
                _ = ticker.tick() => {}
            }

            attempts += 1;
            if attempts > self.config.max_attempts {
                warn!(task_id = %self.task_id, attempts = self.config.max_attempts, "Polling timed out");
                self.notifier.notify(Notice::TimedOut);
                return PollOutcome::TimedOut {
                    attempts: self.config.max_attempts,
                };
            }

            let result = tokio::select! {
                _ = self.cancel.cancelled() => return PollOutcome::Cancelled,
                result = self.source.fetch_status(&self.task_id) => result,
            };

            match result {
                Ok(envelope) => {
                    consecutive_errors = 0;
                    let info = envelope.data.unwrap_or_default();
                    debug!(task_id = %self.task_id, attempt = attempts, status = ?info.status, "Polling status");

                    match &info.status {
                        Some(status) if status.is_success() => {
                            return self.complete(&info).await;
                        }
                        Some(status) if status.is_failure() => {
                            warn!(task_id = %self.task_id, status = %status, "Generation failed");
                            self.notifier.notify(Notice::Failed {
                                status: status.clone(),
                            });
                            return PollOutcome::Failed {
                                status: status.clone(),
                            };
                        }
                        _ => {}
                    }
                }
                Err(e) => {
                    consecutive_errors += 1;
                    warn!(
                        task_id = %self.task_id,
                        consecutive_errors,
                        "Polling error: {}",
                        e
                    );
                    if consecutive_errors >= self.config.max_consecutive_errors {
                        self.notifier.notify(Notice::ConnectionLost);
                        return PollOutcome::Aborted { consecutive_errors };
                    }
                }
            }
        }
    }

    async fn complete(&self, info: &RecordInfo) -> PollOutcome {
        let clips = info.clips();
        if clips.is_empty() {
            self.notifier.notify(Notice::NoAudio);
            return PollOutcome::NoAudio;
        }

        if self.cancel.is_cancelled() {
            return PollOutcome::Cancelled;
        }

        let created_at = Utc::now();
        let tracks: Vec<Track> = clips
            .iter()
            .map(|clip| {
                Track::from_clip(
                    clip,
                    self.title.as_deref(),
                    &self.config.fallback_image,
                    self.model,
                    created_at,
                )
            })
            .collect();

        for track in &tracks {
            self.library.add(track.clone()).await;
        }
        info!(task_id = %self.task_id, tracks = tracks.len(), "Generation complete");

        self.state.send_replace(PollState::Completed);
        self.notifier.notify(Notice::Completed {
            track_count: tracks.len(),
        });

        tokio::select! {
            _ = self.cancel.cancelled() => {}
            _ = tokio::time::sleep(self.config.navigation_delay) => {
                self.navigator.navigate(Route::Library);
            }
        }

        PollOutcome::Completed { tracks }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PollerConfig::default();
        assert_eq!(config.interval, Duration::from_secs(5));
        assert_eq!(config.max_attempts, 60);
        assert_eq!(config.max_consecutive_errors, 5);
        assert_eq!(config.navigation_delay, Duration::from_secs(2));
    }

    #[test]
    fn test_outcome_states() {
        assert_eq!(PollOutcome::NoAudio.state(), PollState::Completed);
        assert_eq!(
            PollOutcome::TimedOut { attempts: 60 }.state(),
            PollState::TimedOut
        );
        assert!(PollState::Cancelled.is_terminal());
        assert!(!PollState::Polling.is_terminal());
    }
}
