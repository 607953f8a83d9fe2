//! Main application state: the timer engine plus its sibling stores.

use crate::clock::{Clock, SystemClock};
use crate::engine::{CompletedPhase, TimerEngine};
use crate::history::{SessionLog, SessionStats, StatsPeriod};
use crate::models::{Phase, PhaseCompleted, SessionRecord, TimerSnapshot, TimerState};
use crate::persistence::{Database, DatabaseError};
use crate::settings::{Settings, SettingsStore, SettingsUpdate};
use std::path::Path;
use std::sync::mpsc::{self, Receiver, Sender};
use tracing::{debug, info, warn};

/// Owns the timer and everything it reads from or writes to.
///
/// All commands are synchronous and never fail: storage problems are logged
/// and the timer keeps working from memory.
pub struct App<C: Clock = SystemClock> {
    clock: C,
    engine: TimerEngine,
    settings: SettingsStore,
    sessions: SessionLog,
    subscribers: Vec<Sender<PhaseCompleted>>,
}

impl App<SystemClock> {
    /// Creates the app backed by the database at the default location.
    pub fn new() -> Self {
        Self::with_clock(fallback_database(Database::new()), SystemClock)
    }

    /// Creates the app backed by a database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Self {
        Self::with_clock(fallback_database(Database::open(path)), SystemClock)
    }
}

impl Default for App<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> App<C> {
    /// Creates the app with an explicit storage handle and clock.
    /// Passing `None` keeps everything in memory.
    pub fn with_clock(db: Option<Database>, clock: C) -> Self {
        let settings = SettingsStore::load(db.clone());
        let sessions = SessionLog::load(db);
        let engine = TimerEngine::new(settings.get());

        Self {
            clock,
            engine,
            settings,
            sessions,
            subscribers: Vec::new(),
        }
    }

    // Queries

    pub fn phase(&self) -> Phase {
        self.engine.phase()
    }

    pub fn state(&self) -> TimerState {
        self.engine.state()
    }

    pub fn remaining_secs(&self) -> u32 {
        self.engine.remaining_secs()
    }

    /// Whole minutes of the remaining time.
    pub fn minutes(&self) -> u32 {
        self.remaining_secs() / 60
    }

    /// Seconds past the whole minutes of the remaining time.
    pub fn seconds(&self) -> u32 {
        self.remaining_secs() % 60
    }

    /// Elapsed fraction of the current countdown, 0.0 to 1.0.
    pub fn progress(&self) -> f64 {
        self.engine.progress()
    }

    /// Configured length of `phase` in seconds.
    pub fn total_duration(&self, phase: Phase) -> u32 {
        self.settings.get().total_duration(phase)
    }

    pub fn completed_cycles(&self) -> u32 {
        self.engine.completed_cycles()
    }

    pub fn settings(&self) -> &Settings {
        self.settings.get()
    }

    /// Completed phases, newest first.
    pub fn sessions(&self) -> &[SessionRecord] {
        self.sessions.records()
    }

    pub fn session_stats(&self, period: StatsPeriod) -> SessionStats {
        self.sessions.stats(period, self.clock.now())
    }

    /// True while periodic re-evaluation is wanted.
    pub fn is_ticking(&self) -> bool {
        self.engine.is_ticking()
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            phase: self.phase(),
            state: self.state(),
            remaining_secs: self.remaining_secs(),
            total_secs: self.engine.total_secs(),
            progress: self.progress(),
            completed_cycles: self.completed_cycles(),
        }
    }

    /// Registers for phase-complete events. Drop the receiver to unsubscribe.
    pub fn subscribe(&mut self) -> Receiver<PhaseCompleted> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    // Commands

    pub fn start(&mut self) {
        let now = self.clock.now();
        self.engine.start(self.settings.get(), now);
    }

    pub fn pause(&mut self) {
        let now = self.clock.now();
        self.engine.pause(now);
    }

    pub fn reset(&mut self) {
        self.engine.reset(self.settings.get());
        debug!(phase = ?self.phase(), "timer reset");
    }

    /// Moves on to the next phase without logging the current one.
    pub fn skip(&mut self) {
        self.engine.skip(self.settings.get());
    }

    /// Switches directly to `phase`, idle and full length.
    pub fn set_phase(&mut self, phase: Phase) {
        self.engine.set_phase(phase, self.settings.get());
    }

    /// Applies a partial settings change. An idle countdown picks up the new
    /// duration immediately.
    pub fn update_settings(&mut self, update: &SettingsUpdate) {
        let settings = self.settings.update(update);
        self.engine.settings_changed(settings);
    }

    /// Empties the session log and forgets completed cycles.
    pub fn clear_sessions(&mut self) {
        self.sessions.clear();
        self.engine.clear_cycles();
        info!("session history cleared");
    }

    /// Periodic re-evaluation.
    /// Returns (remaining_changed, optional_completion_event).
    pub fn tick(&mut self) -> (bool, Option<PhaseCompleted>) {
        let now = self.clock.now();
        let (changed, completed) = self.engine.tick(self.settings.get(), now);
        (changed, completed.map(|c| self.finish(c)))
    }

    /// Re-evaluates right away after the host was suspended.
    pub fn on_resume(&mut self) -> (bool, Option<PhaseCompleted>) {
        let now = self.clock.now();
        let (changed, completed) = self.engine.on_resume(self.settings.get(), now);
        (changed, completed.map(|c| self.finish(c)))
    }

    /// Freezes a running countdown and drops every subscriber. A later
    /// [`start`](Self::start) resumes from the frozen time. Safe to call twice.
    pub fn dispose(&mut self) {
        let now = self.clock.now();
        self.engine.pause(now);
        self.subscribers.clear();
        debug!("app disposed");
    }

    fn finish(&mut self, completed: CompletedPhase) -> PhaseCompleted {
        self.sessions.append(completed.to_record());

        let event = PhaseCompleted {
            phase: completed.phase,
        };
        info!(
            phase = ?completed.phase,
            duration_secs = completed.duration_secs,
            cycles = self.engine.completed_cycles(),
            "phase completed"
        );

        // Receivers that were dropped are unsubscribed here
        self.subscribers.retain(|tx| tx.send(event).is_ok());
        event
    }
}

/// Falls back to an in-memory database, then to no storage at all.
fn fallback_database(opened: Result<Database, DatabaseError>) -> Option<Database> {
    match opened {
        Ok(db) => Some(db),
        Err(e) => {
            warn!(error = %e, "failed to open database, history will not be kept");
            match Database::new_in_memory() {
                Ok(db) => Some(db),
                Err(e) => {
                    warn!(error = %e, "in-memory database unavailable, persistence disabled");
                    None
                }
            }
        }
    }
}
