//! Reading-position tracking for one chapter-viewing session.
//!
//! A [`ProgressTracker`] is created when a chapter view opens and dropped (or
//! [`closed`](ProgressTracker::close)) when it goes away. It reads any saved
//! position once, decides whether to offer a resume prompt, and persists the
//! viewer's scroll position after each quiet period of scrolling.

pub mod backend;
pub mod sample;
pub mod timer;

use std::{sync::Arc, time::Duration};

use tokio::{
    runtime::Handle,
    sync::{broadcast, watch},
};

use crate::{config::Config, domain::models::ReadingProgress};
use backend::ProgressBackend;
use sample::ScrollSample;
use timer::{Debouncer, TimerHandle};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);
pub const DEFAULT_RESUME_THRESHOLD: f64 = 5.0;
pub const DEFAULT_RESUME_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_RECORD_THRESHOLD: f64 = 1.0;

const NOTICE_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackerSettings {
    /// Quiet period after the last sample before it is written.
    pub debounce: Duration,
    /// A saved position must be strictly past this percentage to offer resuming.
    pub resume_threshold: f64,
    /// How long the resume prompt stays up without an answer.
    pub resume_timeout: Duration,
    /// Samples at or below this percentage do not create a record for a
    /// chapter that has none yet.
    pub record_threshold: f64,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            resume_threshold: DEFAULT_RESUME_THRESHOLD,
            resume_timeout: DEFAULT_RESUME_TIMEOUT,
            record_threshold: DEFAULT_RECORD_THRESHOLD,
        }
    }
}

impl From<&Config> for TrackerSettings {
    fn from(config: &Config) -> Self {
        Self {
            debounce: Duration::from_millis(config.debounce_ms),
            resume_threshold: config.resume_threshold,
            resume_timeout: Duration::from_millis(config.resume_timeout_ms),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    /// Saved progress not loaded yet.
    Idle,
    LoadedNoResume,
    /// A resume prompt should be showing.
    Resuming,
    Resumed,
}

/// Non-fatal problems the host may want to surface.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressNotice {
    WriteFailed { chapter_id: String, message: String },
}

pub struct ProgressTracker {
    chapter_id: String,
    backend: ProgressBackend,
    settings: TrackerSettings,
    state: Arc<watch::Sender<TrackerState>>,
    saved: Option<ReadingProgress>,
    has_record: bool,
    runtime: Option<Handle>,
    debounce: Debouncer,
    resume_expiry: Option<TimerHandle>,
    notices: broadcast::Sender<ProgressNotice>,
}

impl ProgressTracker {
    /// Timers run on the tokio runtime current at construction, so samples
    /// may be recorded from threads outside it. Without any runtime, samples
    /// are dropped with a warning instead of being saved.
    pub fn new(
        chapter_id: impl Into<String>,
        backend: ProgressBackend,
        settings: TrackerSettings,
    ) -> Self {
        let (state, _) = watch::channel(TrackerState::Idle);
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        let runtime = Handle::try_current().ok();
        Self {
            chapter_id: chapter_id.into(),
            backend,
            settings,
            state: Arc::new(state),
            saved: None,
            has_record: false,
            debounce: Debouncer::new(settings.debounce, runtime.clone()),
            runtime,
            resume_expiry: None,
            notices,
        }
    }

    pub fn chapter_id(&self) -> &str {
        &self.chapter_id
    }

    pub fn state(&self) -> TrackerState {
        *self.state.borrow()
    }

    pub fn is_resuming(&self) -> bool {
        self.state() == TrackerState::Resuming
    }

    /// Progress found on load, if any.
    pub fn saved_progress(&self) -> Option<ReadingProgress> {
        self.saved
    }

    /// Follow state changes, including the resume prompt expiring on its own.
    pub fn watch_state(&self) -> watch::Receiver<TrackerState> {
        self.state.subscribe()
    }

    pub fn subscribe_notices(&self) -> broadcast::Receiver<ProgressNotice> {
        self.notices.subscribe()
    }

    /// Read saved progress once for this session. Later calls do nothing.
    /// A failed read counts as no saved progress.
    #[tracing::instrument(level = "debug", skip(self), fields(chapter = %self.chapter_id, backend = self.backend.kind()))]
    pub async fn load_initial_progress(&mut self) {
        if self.chapter_id.is_empty() {
            tracing::debug!("no chapter id yet, skipping progress load");
            return;
        }
        if self.state() != TrackerState::Idle {
            return;
        }

        let prior = match self.backend.load(&self.chapter_id).await {
            Ok(prior) => prior,
            Err(e) => {
                tracing::warn!(error = %e, "could not load saved progress, starting fresh");
                None
            }
        };
        self.saved = prior;
        self.has_record = self.has_record || prior.is_some();

        match prior {
            Some(p) if p.scroll_fraction > self.settings.resume_threshold => {
                tracing::debug!(fraction = p.scroll_fraction, "offering to resume");
                self.state.send_replace(TrackerState::Resuming);
                self.arm_resume_expiry();
            }
            _ => {
                self.state.send_replace(TrackerState::LoadedNoResume);
            }
        }
    }

    fn arm_resume_expiry(&mut self) {
        let Some(runtime) = timer::runtime_handle(self.runtime.as_ref()) else {
            tracing::warn!(chapter = %self.chapter_id, "no tokio runtime, resume prompt will not expire");
            return;
        };
        let state = Arc::clone(&self.state);
        let chapter_id = self.chapter_id.clone();
        self.resume_expiry = Some(timer::schedule(&runtime, self.settings.resume_timeout, async move {
            let expired = state.send_if_modified(|s| {
                if *s == TrackerState::Resuming {
                    *s = TrackerState::LoadedNoResume;
                    true
                } else {
                    false
                }
            });
            if expired {
                tracing::debug!(%chapter_id, "resume prompt expired");
            }
        }));
    }

    /// Accept the resume prompt. Returns the saved percentage to scroll to;
    /// `None` when no prompt is showing.
    pub fn resume(&mut self) -> Option<f64> {
        let accepted = self.state.send_if_modified(|s| {
            if *s == TrackerState::Resuming {
                *s = TrackerState::Resumed;
                true
            } else {
                false
            }
        });
        if !accepted {
            return None;
        }
        self.resume_expiry = None;
        self.saved.map(|p| p.scroll_fraction)
    }

    /// Close the resume prompt without scrolling. Safe to call at any time.
    pub fn dismiss_resume(&mut self) {
        let dismissed = self.state.send_if_modified(|s| {
            if *s == TrackerState::Resuming {
                *s = TrackerState::LoadedNoResume;
                true
            } else {
                false
            }
        });
        if dismissed {
            self.resume_expiry = None;
        }
    }

    /// Report the viewer's current position. Nothing is written until no
    /// further sample arrives for the debounce period; then only the latest
    /// sample is saved.
    pub fn record_sample(&mut self, scroll_fraction: f64, last_visible_index: u32) {
        if self.chapter_id.is_empty() {
            return;
        }
        let progress = ReadingProgress::new(scroll_fraction, last_visible_index);
        if !self.has_record && progress.scroll_fraction <= self.settings.record_threshold {
            return;
        }
        let armed = self.debounce.arm(persist(
            self.backend.clone(),
            self.chapter_id.clone(),
            progress,
            self.notices.clone(),
        ));
        if armed {
            self.has_record = true;
        } else {
            tracing::warn!(chapter = %self.chapter_id, "no tokio runtime, progress sample dropped");
        }
    }

    pub fn record(&mut self, sample: ScrollSample) {
        self.record_sample(sample.scroll_fraction, sample.last_visible_index);
    }

    /// Stop tracking: any write still waiting for its quiet period is dropped.
    pub fn close(&mut self) {
        self.debounce.cancel();
        self.resume_expiry = None;
    }
}

impl Drop for ProgressTracker {
    fn drop(&mut self) {
        self.close();
    }
}

async fn persist(
    backend: ProgressBackend,
    chapter_id: String,
    progress: ReadingProgress,
    notices: broadcast::Sender<ProgressNotice>,
) {
    tracing::debug!(
        %chapter_id,
        backend = backend.kind(),
        fraction = progress.scroll_fraction,
        index = progress.last_visible_index,
        "saving reading progress"
    );
    if let Err(e) = backend.save(&chapter_id, progress).await {
        tracing::warn!(%chapter_id, error = %e, "failed to save reading progress");
        // Nobody listening is fine.
        let _ = notices.send(ProgressNotice::WriteFailed {
            chapter_id,
            message: format!("{e:#}"),
        });
    }
}
