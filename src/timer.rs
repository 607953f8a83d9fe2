//! Background tick loop for re-evaluating the timer.
//!
//! The loop only keeps the published remaining time fresh while nobody is
//! calling [`App::tick`] from the foreground. It carries no timing authority:
//! every tick recomputes from the engine's absolute end time, so a late or
//! missed tick changes nothing but how soon the update is seen.

use crate::app::App;
use crate::clock::Clock;
use crate::models::{PhaseCompleted, TimerSnapshot};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

/// How often the loop re-evaluates the timer.
pub const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// A gap between iterations this much longer than the interval means the
/// host was suspended, and the loop treats the next iteration as a resume.
pub const SUSPEND_THRESHOLD: Duration = Duration::from_secs(2);

/// Message sent from the tick thread to the host.
#[derive(Debug, Clone, PartialEq)]
pub enum TimerMessage {
    /// Remaining time changed, display needs update.
    StateChanged { snapshot: TimerSnapshot },
    /// A phase ran out.
    Completed(PhaseCompleted),
}

/// Handle to a running tick thread. Stops the thread when dropped.
pub struct Ticker {
    stop: Option<Sender<()>>,
    join: Option<JoinHandle<()>>,
}

impl Ticker {
    /// Spawns the tick loop at [`TICK_INTERVAL`].
    pub fn spawn<C>(app: Arc<Mutex<App<C>>>, tx: Sender<TimerMessage>) -> Self
    where
        C: Clock + Send + 'static,
    {
        Self::with_interval(app, tx, TICK_INTERVAL)
    }

    pub fn with_interval<C>(
        app: Arc<Mutex<App<C>>>,
        tx: Sender<TimerMessage>,
        interval: Duration,
    ) -> Self
    where
        C: Clock + Send + 'static,
    {
        let (stop_tx, stop_rx) = mpsc::channel();
        let join = thread::spawn(move || {
            let mut last = SystemTime::now();
            loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {}
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }

                let now = SystemTime::now();
                let gap = now.duration_since(last).unwrap_or_default();
                last = now;

                if !run_iteration(&app, &tx, gap >= interval + SUSPEND_THRESHOLD) {
                    break;
                }
            }
            debug!("tick loop stopped");
        });

        Self {
            stop: Some(stop_tx),
            join: Some(join),
        }
    }

    /// Stops the loop and waits for the thread to exit. Safe to call twice.
    pub fn stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                warn!("tick thread panicked");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.join.as_ref().is_some_and(|j| !j.is_finished())
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Runs one re-evaluation. Returns false when the loop should end.
fn run_iteration<C: Clock>(
    app: &Mutex<App<C>>,
    tx: &Sender<TimerMessage>,
    resumed: bool,
) -> bool {
    let (changed, completion, snapshot) = {
        let mut app = match app.lock() {
            Ok(app) => app,
            Err(_) => {
                warn!("app lock poisoned, stopping tick loop");
                return false;
            }
        };

        let (changed, completion) = if resumed {
            debug!("host was suspended, catching up");
            app.on_resume()
        } else {
            app.tick()
        };
        (changed, completion, app.snapshot())
    };

    if let Some(event) = completion {
        if tx.send(TimerMessage::Completed(event)).is_err() {
            return false;
        }
    }

    if changed && tx.send(TimerMessage::StateChanged { snapshot }).is_err() {
        return false;
    }

    true
}
