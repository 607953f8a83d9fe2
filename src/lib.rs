//! Pomode - the core of a Pomodoro timer.
//!
//! A drift-corrected countdown that cycles through work and break phases,
//! with persisted settings and a bounded history of completed phases.
//! Display, sound and notifications live in the host; they read the
//! [`App`] accessors and subscribe to [`PhaseCompleted`] events.
//!
//! ```no_run
//! use pomode::{App, SettingsUpdate};
//!
//! let mut app = App::new();
//! let completions = app.subscribe();
//!
//! app.update_settings(&SettingsUpdate {
//!     work_minutes: Some(50.0),
//!     ..Default::default()
//! });
//! app.start();
//!
//! // Call `app.tick()` periodically, or hand the app to a `timer::Ticker`.
//! for event in completions.try_iter() {
//!     println!("{} finished", event.phase.label());
//! }
//! ```

pub mod app;
pub mod clock;
pub mod engine;
pub mod history;
pub mod models;
pub mod persistence;
pub mod settings;
pub mod timer;

pub use app::App;
pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{CompletedPhase, TimerEngine};
pub use history::{SessionLog, SessionStats, StatsPeriod, MAX_SESSIONS};
pub use models::{next_phase, Phase, PhaseCompleted, SessionRecord, TimerSnapshot, TimerState};
pub use persistence::{Database, DatabaseError};
pub use settings::{Settings, SettingsStore, SettingsUpdate};
pub use timer::{Ticker, TimerMessage};
