//! Drift-corrected countdown and phase cycling.
//!
//! The engine never counts ticks. While running it keeps an absolute end
//! time and derives the remaining seconds from the clock on every
//! re-evaluation, so missed or late ticks (a suspended host, a throttled
//! thread) cannot make it drift.
//!
//! ```text
//! Idle --start--> Running --pause--> Paused --start--> Running
//!   ^                |
//!   +---complete-----+   (reset/skip from any state -> Idle)
//! ```
//!
//! The engine holds no clock and no storage: callers pass the settings and
//! the current time in, and receive a [`CompletedPhase`] to log when a
//! countdown runs out.

use crate::models::{next_phase, progress_fraction, Phase, SessionRecord, TimerState};
use crate::settings::Settings;
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, trace};

/// A phase that ran down to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletedPhase {
    pub phase: Phase,
    /// Configured length of the phase in seconds.
    pub duration_secs: u32,
    pub completed_at: DateTime<Utc>,
}

impl CompletedPhase {
    pub fn to_record(self) -> SessionRecord {
        SessionRecord::new(self.phase, self.duration_secs, self.completed_at)
    }
}

/// Timer state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerEngine {
    phase: Phase,
    state: TimerState,
    /// Length of the current countdown.
    total_secs: u32,
    /// Last published remaining time.
    remaining_secs: u32,
    /// Remaining time to resume from; meaningful while Idle or Paused.
    paused_remaining: u32,
    /// Absolute end of the countdown; only set while Running.
    target_end: Option<DateTime<Utc>>,
    completed_cycles: u32,
}

impl TimerEngine {
    /// Creates an idle engine at the start of a work phase.
    pub fn new(settings: &Settings) -> Self {
        let total = settings.total_duration(Phase::Work);
        Self {
            phase: Phase::Work,
            state: TimerState::Idle,
            total_secs: total,
            remaining_secs: total,
            paused_remaining: total,
            target_end: None,
            completed_cycles: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    /// Length of the current countdown. Fixed while running or paused.
    pub fn total_secs(&self) -> u32 {
        self.total_secs
    }

    pub fn target_end(&self) -> Option<DateTime<Utc>> {
        self.target_end
    }

    pub fn completed_cycles(&self) -> u32 {
        self.completed_cycles
    }

    /// Periodic re-evaluation is wanted exactly while the countdown runs.
    pub fn is_ticking(&self) -> bool {
        self.state.is_running()
    }

    /// Elapsed fraction of the current countdown.
    pub fn progress(&self) -> f64 {
        progress_fraction(self.remaining_secs, self.total_secs)
    }

    /// Starts or resumes the countdown. Returns false if already running.
    pub fn start(&mut self, settings: &Settings, now: DateTime<Utc>) -> bool {
        match self.state {
            TimerState::Running => {
                trace!("start ignored, already running");
                return false;
            }
            TimerState::Idle => self.restart_countdown(settings),
            TimerState::Paused => {}
        }

        self.target_end = Some(now + Duration::seconds(i64::from(self.paused_remaining)));
        self.remaining_secs = self.paused_remaining;
        self.state = TimerState::Running;
        debug!(phase = ?self.phase, remaining = self.remaining_secs, "timer started");
        true
    }

    /// Freezes the countdown. Returns false unless it was running.
    pub fn pause(&mut self, now: DateTime<Utc>) -> bool {
        if self.state != TimerState::Running {
            trace!(state = ?self.state, "pause ignored, not running");
            return false;
        }

        let remaining = self
            .target_end
            .map_or(self.paused_remaining, |end| remaining_until(end, now));
        self.paused_remaining = remaining;
        self.remaining_secs = remaining;
        self.state = TimerState::Paused;
        self.target_end = None;
        debug!(remaining, "timer paused");
        true
    }

    /// Returns to idle with the full duration of the current phase.
    pub fn reset(&mut self, settings: &Settings) {
        self.state = TimerState::Idle;
        self.target_end = None;
        self.restart_countdown(settings);
    }

    /// Moves to the next phase without logging or counting a cycle.
    pub fn skip(&mut self, settings: &Settings) {
        let from = self.phase;
        self.phase = next_phase(
            from,
            self.completed_cycles,
            settings.cycles_before_long_break,
        );
        self.reset(settings);
        debug!(?from, to = ?self.phase, "phase skipped");
    }

    /// Jumps straight to `phase`, idle, with its full duration.
    pub fn set_phase(&mut self, phase: Phase, settings: &Settings) {
        self.phase = phase;
        self.reset(settings);
    }

    /// Re-evaluates the countdown against `now`.
    ///
    /// Returns whether the published remaining time changed, and the
    /// completed phase if the countdown ran out.
    pub fn tick(
        &mut self,
        settings: &Settings,
        now: DateTime<Utc>,
    ) -> (bool, Option<CompletedPhase>) {
        let Some(end) = self.target_end else {
            return (false, None);
        };

        let remaining = remaining_until(end, now);
        if remaining == 0 {
            self.remaining_secs = 0;
            return (true, Some(self.complete(settings, now)));
        }

        let changed = remaining != self.remaining_secs;
        self.remaining_secs = remaining;
        (changed, None)
    }

    /// Catches up after the host was suspended. Completes immediately if the
    /// end time passed in the meantime.
    pub fn on_resume(
        &mut self,
        settings: &Settings,
        now: DateTime<Utc>,
    ) -> (bool, Option<CompletedPhase>) {
        if self.state != TimerState::Running {
            return (false, None);
        }
        debug!("re-evaluating after resume");
        self.tick(settings, now)
    }

    /// Recomputes the idle countdown after a settings change. Running and
    /// paused countdowns keep their length.
    pub fn settings_changed(&mut self, settings: &Settings) {
        if self.state == TimerState::Idle {
            self.restart_countdown(settings);
        }
    }

    /// Forgets all completed work cycles.
    pub fn clear_cycles(&mut self) {
        self.completed_cycles = 0;
    }

    fn restart_countdown(&mut self, settings: &Settings) {
        self.total_secs = settings.total_duration(self.phase);
        self.paused_remaining = self.total_secs;
        self.remaining_secs = self.total_secs;
    }

    fn complete(&mut self, settings: &Settings, now: DateTime<Utc>) -> CompletedPhase {
        let finished = self.phase;
        let completed = CompletedPhase {
            phase: finished,
            duration_secs: settings.total_duration(finished),
            completed_at: now,
        };

        if finished == Phase::Work {
            self.completed_cycles += 1;
        }

        self.state = TimerState::Idle;
        self.target_end = None;
        self.phase = next_phase(
            finished,
            self.completed_cycles,
            settings.cycles_before_long_break,
        );
        self.restart_countdown(settings);

        debug!(?finished, next = ?self.phase, cycles = self.completed_cycles, "phase complete");
        completed
    }
}

/// Whole seconds left until `end`, rounded up, never negative.
fn remaining_until(end: DateTime<Utc>, now: DateTime<Utc>) -> u32 {
    let millis = (end - now).num_milliseconds();
    if millis <= 0 {
        return 0;
    }
    u32::try_from((millis + 999) / 1000).unwrap_or(u32::MAX)
}
