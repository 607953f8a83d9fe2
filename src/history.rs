//! Bounded, newest-first log of completed phases and statistics over it.

use crate::models::{Phase, SessionRecord};
use crate::persistence::{Database, SESSIONS_KEY};
use chrono::{DateTime, Duration, Local, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Most records kept in the log.
pub const MAX_SESSIONS: usize = 100;

/// Owns the session history and writes it through to storage.
#[derive(Debug)]
pub struct SessionLog {
    records: Vec<SessionRecord>,
    db: Option<Database>,
}

impl SessionLog {
    /// Loads the persisted log. Entries that cannot be parsed are dropped;
    /// a missing or unreadable record yields an empty log.
    pub fn load(db: Option<Database>) -> Self {
        let mut records = Vec::new();

        if let Some(db) = &db {
            match db.load_json::<Vec<Value>>(SESSIONS_KEY) {
                Ok(Some(raw)) => {
                    let total = raw.len();
                    records = raw
                        .into_iter()
                        .filter_map(|v| serde_json::from_value::<SessionRecord>(v).ok())
                        .collect();
                    if records.len() < total {
                        warn!(
                            dropped = total - records.len(),
                            "ignored unreadable session records"
                        );
                    }
                    records.truncate(MAX_SESSIONS);
                }
                Ok(None) => debug!("no stored sessions"),
                Err(e) => warn!(error = %e, "failed to load sessions, starting empty"),
            }
        }

        Self { records, db }
    }

    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self {
            records: Vec::new(),
            db: None,
        }
    }

    /// All records, newest first.
    pub fn records(&self) -> &[SessionRecord] {
        &self.records
    }

    /// Adds `record` as the newest entry, dropping the oldest beyond the cap.
    pub fn append(&mut self, record: SessionRecord) {
        self.records.insert(0, record);
        self.records.truncate(MAX_SESSIONS);
        self.persist();
    }

    /// Removes every record, in memory and in storage.
    pub fn clear(&mut self) {
        self.records.clear();
        let Some(db) = &self.db else {
            return;
        };
        if let Err(e) = db.remove(SESSIONS_KEY) {
            warn!(error = %e, "failed to clear stored sessions");
        }
    }

    /// Records completed within `period` as of `now`, newest first.
    pub fn filter(&self, period: StatsPeriod, now: DateTime<Utc>) -> Vec<&SessionRecord> {
        let cutoff = period.cutoff(now);
        self.records
            .iter()
            .filter(|r| cutoff.map_or(true, |c| r.completed_at >= c))
            .collect()
    }

    /// Statistics over the records completed within `period`.
    pub fn stats(&self, period: StatsPeriod, now: DateTime<Utc>) -> SessionStats {
        SessionStats::from_records(self.filter(period, now))
    }

    fn persist(&self) {
        let Some(db) = &self.db else {
            return;
        };
        if let Err(e) = db.save_json(SESSIONS_KEY, &self.records) {
            warn!(error = %e, "failed to save sessions");
        }
    }
}

/// Time window for filtering the session log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StatsPeriod {
    /// Since local midnight.
    Today,
    /// The last seven days.
    Week,
    /// The last calendar month.
    Month,
    #[default]
    All,
}

impl StatsPeriod {
    /// Earliest completion time inside the window, `None` for [`StatsPeriod::All`].
    pub fn cutoff(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::Today => now
                .with_timezone(&Local)
                .date_naive()
                .and_hms_opt(0, 0, 0)
                .and_then(|midnight| midnight.and_local_timezone(Local).earliest())
                .map(|midnight| midnight.with_timezone(&Utc)),
            Self::Week => Some(now - Duration::days(7)),
            Self::Month => now.checked_sub_months(Months::new(1)),
            Self::All => None,
        }
    }
}

/// Aggregate figures over a set of session records.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub total_sessions: usize,
    pub work_sessions: usize,
    /// Whole minutes spent in completed work phases.
    pub total_focus_minutes: u32,
    /// Whole minutes spent in completed breaks.
    pub total_break_minutes: u32,
    /// Sessions per distinct local day, one decimal place.
    pub average_sessions_per_day: f64,
}

impl SessionStats {
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a SessionRecord>,
    {
        let mut stats = Self::default();
        let mut focus_secs = 0u64;
        let mut break_secs = 0u64;
        let mut days: HashSet<NaiveDate> = HashSet::new();

        for record in records {
            stats.total_sessions += 1;
            if record.phase == Phase::Work {
                stats.work_sessions += 1;
                focus_secs += u64::from(record.duration_seconds);
            } else {
                break_secs += u64::from(record.duration_seconds);
            }
            days.insert(record.completed_at.with_timezone(&Local).date_naive());
        }

        stats.total_focus_minutes = round_minutes(focus_secs);
        stats.total_break_minutes = round_minutes(break_secs);
        if !days.is_empty() {
            let average = stats.total_sessions as f64 / days.len() as f64;
            stats.average_sessions_per_day = (average * 10.0).round() / 10.0;
        }
        stats
    }
}

fn round_minutes(secs: u64) -> u32 {
    (secs as f64 / 60.0).round() as u32
}
