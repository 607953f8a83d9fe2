//! Data models for the Pomode timer core.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One of the three phases the timer cycles through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    /// Focused work.
    #[default]
    Work,
    ShortBreak,
    LongBreak,
}

impl Phase {
    /// Returns true for either kind of break.
    pub fn is_break(self) -> bool {
        matches!(self, Self::ShortBreak | Self::LongBreak)
    }

    /// Human readable name for display collaborators.
    pub fn label(self) -> &'static str {
        match self {
            Self::Work => "Focus Time",
            Self::ShortBreak => "Short Break",
            Self::LongBreak => "Long Break",
        }
    }
}

/// Whether the countdown is moving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TimerState {
    #[default]
    Idle,
    Running,
    Paused,
}

impl TimerState {
    pub fn is_idle(self) -> bool {
        self == Self::Idle
    }

    pub fn is_running(self) -> bool {
        self == Self::Running
    }

    pub fn is_paused(self) -> bool {
        self == Self::Paused
    }
}

/// Decides which phase follows `current`.
///
/// `completed_work_cycles` must already include a Work phase that just
/// finished. A long break is due whenever that count is a positive multiple
/// of `cycles_before_long_break`.
pub fn next_phase(
    current: Phase,
    completed_work_cycles: u32,
    cycles_before_long_break: u32,
) -> Phase {
    match current {
        Phase::Work => {
            let every = cycles_before_long_break.max(1);
            if completed_work_cycles > 0 && completed_work_cycles % every == 0 {
                Phase::LongBreak
            } else {
                Phase::ShortBreak
            }
        }
        Phase::ShortBreak | Phase::LongBreak => Phase::Work,
    }
}

/// An entry in the session log for one completed phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: String,
    pub phase: Phase,
    pub duration_seconds: u32,
    pub completed_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Creates a record with a fresh unique id.
    pub fn new(phase: Phase, duration_seconds: u32, completed_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            phase,
            duration_seconds,
            completed_at,
        }
    }
}

/// Emitted exactly once each time a phase runs down to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseCompleted {
    /// The phase that just finished.
    pub phase: Phase,
}

/// Read-only view of the timer for display collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub phase: Phase,
    pub state: TimerState,
    pub remaining_secs: u32,
    pub total_secs: u32,
    /// Elapsed fraction of the current phase, 0.0 to 1.0.
    pub progress: f64,
    pub completed_cycles: u32,
}

impl TimerSnapshot {
    pub fn minutes(&self) -> u32 {
        self.remaining_secs / 60
    }

    pub fn seconds(&self) -> u32 {
        self.remaining_secs % 60
    }
}

/// Elapsed fraction of a countdown, defined as 0 when `total_secs` is 0.
pub fn progress_fraction(remaining_secs: u32, total_secs: u32) -> f64 {
    if total_secs == 0 {
        return 0.0;
    }
    let elapsed = total_secs.saturating_sub(remaining_secs);
    f64::from(elapsed) / f64::from(total_secs)
}
