//! Decides when the preview re-renders.
//!
//! The scheduler is a plain state machine driven by edit notifications and
//! an explicit clock, so the session's event loop (and tests) control time.
//!
//! ```text
//! Idle --edit--> PendingRender --deadline--> Rendering --complete--> Idle
//!                  ^  |  edit resets timer       | edit
//!                  |  +--------------------------+ (one more render queued)
//! ```

mod worker;

use std::sync::Arc;
use std::time::{Duration, Instant};

pub use worker::{RenderBackend, RenderOutcome, RenderWorker};

/// Default quiet period between the last edit and the render.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    PendingRender,
    Rendering,
}

/// A snapshot of the text to render, tagged with its edit version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderJob {
    pub version: u64,
    pub text: Arc<str>,
}

impl RenderJob {
    pub fn new(version: u64, text: impl Into<Arc<str>>) -> Self {
        Self {
            version,
            text: text.into(),
        }
    }
}

/// A restartable one-shot deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceTimer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl DebounceTimer {
    pub const fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Arm (or re-arm) the timer to fire `delay` after `now`.
    pub fn reset(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    /// Arm the timer to fire at exactly `at`.
    pub const fn fire_at(&mut self, at: Instant) {
        self.deadline = Some(at);
    }

    pub const fn cancel(&mut self) {
        self.deadline = None;
    }

    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub const fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }
}

/// Debounced render scheduling with at most one render in flight.
#[derive(Debug)]
pub struct RenderScheduler {
    state: SchedulerState,
    timer: DebounceTimer,
    /// Newest snapshot that has not been handed out yet.
    latest: Option<RenderJob>,
    in_flight: Option<u64>,
    last_edit_at: Option<Instant>,
    /// Render the queued snapshot immediately once the current one lands.
    force_next: bool,
    suspended: bool,
}

impl Default for RenderScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl RenderScheduler {
    pub const fn new(debounce: Duration) -> Self {
        Self {
            state: SchedulerState::Idle,
            timer: DebounceTimer::new(debounce),
            latest: None,
            in_flight: None,
            last_edit_at: None,
            force_next: false,
            suspended: false,
        }
    }

    pub const fn state(&self) -> SchedulerState {
        self.state
    }

    pub const fn is_suspended(&self) -> bool {
        self.suspended
    }

    pub const fn debounce(&self) -> Duration {
        self.timer.delay()
    }

    /// Version currently being rendered.
    pub const fn in_flight(&self) -> Option<u64> {
        self.in_flight
    }

    /// Whether a snapshot is waiting to be rendered.
    pub const fn has_queued(&self) -> bool {
        self.latest.is_some()
    }

    /// Record that the text changed.
    pub fn note_edit(&mut self, job: RenderJob, now: Instant) {
        let version = job.version;
        self.latest = Some(job);
        self.last_edit_at = Some(now);
        if self.suspended {
            crate::perf::log_event("scheduler.edit_suspended", format!("version={version}"));
            return;
        }
        match self.state {
            SchedulerState::Idle => {
                self.state = SchedulerState::PendingRender;
                self.timer.reset(now);
                crate::perf::log_event("scheduler.pending", format!("version={version}"));
            }
            SchedulerState::PendingRender => {
                self.timer.reset(now);
                crate::perf::log_event("scheduler.timer_reset", format!("version={version}"));
            }
            SchedulerState::Rendering => {
                crate::perf::log_event("scheduler.edit_during_render", format!("version={version}"));
            }
        }
    }

    /// Request a render of `job` without waiting for the debounce period.
    pub fn request_immediate(&mut self, job: RenderJob, now: Instant) {
        let version = job.version;
        self.latest = Some(job);
        if self.suspended {
            return;
        }
        match self.state {
            SchedulerState::Idle | SchedulerState::PendingRender => {
                self.state = SchedulerState::PendingRender;
                self.timer.fire_at(now);
            }
            SchedulerState::Rendering => self.force_next = true,
        }
        crate::perf::log_event("scheduler.immediate", format!("version={version}"));
    }

    /// Hand out the next job once its deadline has passed.
    pub fn poll(&mut self, now: Instant) -> Option<RenderJob> {
        if self.state != SchedulerState::PendingRender || !self.timer.is_expired(now) {
            return None;
        }
        let job = self.latest.take()?;
        self.timer.cancel();
        self.state = SchedulerState::Rendering;
        self.in_flight = Some(job.version);
        crate::perf::log_event("scheduler.render_started", format!("version={}", job.version));
        Some(job)
    }

    /// Mark the in-flight render of `version` finished.
    ///
    /// An edit that arrived while rendering arms the timer from the time of
    /// that edit, so exactly one more render follows.
    pub fn complete(&mut self, version: u64, now: Instant) {
        if self.in_flight != Some(version) {
            crate::perf::log_event("scheduler.stale_completion", format!("version={version}"));
            return;
        }
        self.in_flight = None;
        let force = std::mem::take(&mut self.force_next);
        if self.latest.is_none() || self.suspended {
            self.state = SchedulerState::Idle;
            crate::perf::log_event("scheduler.idle", format!("version={version}"));
            return;
        }
        self.state = SchedulerState::PendingRender;
        match self.last_edit_at {
            Some(edit_at) if !force => self.timer.reset(edit_at),
            _ => self.timer.fire_at(now),
        }
        crate::perf::log_event("scheduler.rerender_queued", format!("after={version}"));
    }

    /// Stop scheduling renders; edits are still remembered.
    pub fn suspend(&mut self) {
        if self.suspended {
            return;
        }
        self.suspended = true;
        if self.state == SchedulerState::PendingRender {
            self.timer.cancel();
            self.state = SchedulerState::Idle;
        }
        crate::perf::log_event("scheduler.suspended", "");
    }

    /// Resume scheduling and render `job` right away.
    pub fn resume(&mut self, job: RenderJob, now: Instant) {
        self.suspended = false;
        crate::perf::log_event("scheduler.resumed", format!("version={}", job.version));
        self.request_immediate(job, now);
    }

    /// When the event loop must next call [`Self::poll`].
    pub const fn next_deadline(&self) -> Option<Instant> {
        match self.state {
            SchedulerState::PendingRender => self.timer.deadline(),
            _ => None,
        }
    }

    /// Drop queued work, e.g. when a new document is loaded.
    pub fn reset(&mut self) {
        self.latest = None;
        self.timer.cancel();
        self.force_next = false;
        self.last_edit_at = None;
        self.state = if self.in_flight.is_some() {
            SchedulerState::Rendering
        } else {
            SchedulerState::Idle
        };
    }
}
