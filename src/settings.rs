//! User settings: validation limits, partial updates and the persisted store.

use crate::models::Phase;
use crate::persistence::{Database, SETTINGS_KEY};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

/// Inclusive bounds for a numeric setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit {
    pub min: u32,
    pub max: u32,
}

impl Limit {
    const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    /// Rounds `value` to a whole number and clamps it into range.
    /// Returns `None` for NaN and infinities.
    pub fn clamp(self, value: f64) -> Option<u32> {
        if !value.is_finite() {
            return None;
        }
        let clamped = value.round().clamp(f64::from(self.min), f64::from(self.max));
        Some(clamped as u32)
    }
}

pub const WORK_MINUTES_LIMIT: Limit = Limit::new(1, 60);
pub const SHORT_BREAK_MINUTES_LIMIT: Limit = Limit::new(1, 30);
pub const LONG_BREAK_MINUTES_LIMIT: Limit = Limit::new(1, 60);
pub const CYCLES_BEFORE_LONG_BREAK_LIMIT: Limit = Limit::new(1, 10);
pub const SOUND_VOLUME_LIMIT: Limit = Limit::new(0, 100);

/// User-configurable settings for the pomodoro timer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Duration of a work phase in minutes.
    pub work_minutes: u32,
    /// Duration of a short break in minutes.
    pub short_break_minutes: u32,
    /// Duration of a long break in minutes.
    pub long_break_minutes: u32,
    /// Number of completed work phases between long breaks.
    pub cycles_before_long_break: u32,
    /// Whether to play sounds on phase completion.
    pub sound_enabled: bool,
    /// Sound volume, 0 to 100.
    pub sound_volume: u32,
    /// Whether to show notifications on phase completion.
    pub notifications_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            work_minutes: 25,
            short_break_minutes: 5,
            long_break_minutes: 15,
            cycles_before_long_break: 4,
            sound_enabled: true,
            sound_volume: 70,
            notifications_enabled: true,
        }
    }
}

impl Settings {
    /// Configured length of `phase` in minutes.
    pub fn minutes_for(&self, phase: Phase) -> u32 {
        match phase {
            Phase::Work => self.work_minutes,
            Phase::ShortBreak => self.short_break_minutes,
            Phase::LongBreak => self.long_break_minutes,
        }
    }

    /// Configured length of `phase` in seconds.
    pub fn total_duration(&self, phase: Phase) -> u32 {
        self.minutes_for(phase).saturating_mul(60)
    }

    /// Merges the fields present in `update`, clamping numeric ones.
    pub fn apply(&mut self, update: &SettingsUpdate) {
        let numeric = [
            (update.work_minutes, WORK_MINUTES_LIMIT, &mut self.work_minutes),
            (
                update.short_break_minutes,
                SHORT_BREAK_MINUTES_LIMIT,
                &mut self.short_break_minutes,
            ),
            (
                update.long_break_minutes,
                LONG_BREAK_MINUTES_LIMIT,
                &mut self.long_break_minutes,
            ),
            (
                update.cycles_before_long_break,
                CYCLES_BEFORE_LONG_BREAK_LIMIT,
                &mut self.cycles_before_long_break,
            ),
            (update.sound_volume, SOUND_VOLUME_LIMIT, &mut self.sound_volume),
        ];
        for (value, limit, field) in numeric {
            if let Some(clamped) = value.and_then(|v| limit.clamp(v)) {
                *field = clamped;
            }
        }

        if let Some(enabled) = update.sound_enabled {
            self.sound_enabled = enabled;
        }
        if let Some(enabled) = update.notifications_enabled {
            self.notifications_enabled = enabled;
        }
    }
}

/// A partial settings change. Absent fields are left untouched.
///
/// Numeric fields are floats so that callers can pass raw user input; they
/// are rounded and clamped when applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_minutes: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_break_minutes: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub long_break_minutes: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cycles_before_long_break: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sound_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sound_volume: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notifications_enabled: Option<bool>,
}

impl SettingsUpdate {
    /// Picks every well-typed field out of a JSON object, ignoring the rest.
    pub fn from_json_lenient(value: &Value) -> Self {
        let number = |key: &str| value.get(key).and_then(Value::as_f64);
        let flag = |key: &str| value.get(key).and_then(Value::as_bool);

        Self {
            work_minutes: number("workMinutes"),
            short_break_minutes: number("shortBreakMinutes"),
            long_break_minutes: number("longBreakMinutes"),
            cycles_before_long_break: number("cyclesBeforeLongBreak"),
            sound_enabled: flag("soundEnabled"),
            sound_volume: number("soundVolume"),
            notifications_enabled: flag("notificationsEnabled"),
        }
    }
}

/// Owns the current settings and writes them through to storage.
#[derive(Debug)]
pub struct SettingsStore {
    settings: Settings,
    db: Option<Database>,
}

impl SettingsStore {
    /// Loads persisted settings, falling back to defaults field by field.
    /// Never fails; storage problems are logged.
    pub fn load(db: Option<Database>) -> Self {
        let mut settings = Settings::default();

        if let Some(db) = &db {
            match db.load_json::<Value>(SETTINGS_KEY) {
                Ok(Some(value)) if value.is_object() => {
                    settings.apply(&SettingsUpdate::from_json_lenient(&value));
                }
                Ok(Some(_)) => warn!("stored settings are not a JSON object, using defaults"),
                Ok(None) => debug!("no stored settings, using defaults"),
                Err(e) => warn!(error = %e, "failed to load settings, using defaults"),
            }
        }

        Self { settings, db }
    }

    pub fn get(&self) -> &Settings {
        &self.settings
    }

    /// Clamps and merges `update`, then persists the result.
    pub fn update(&mut self, update: &SettingsUpdate) -> &Settings {
        self.settings.apply(update);
        info!(settings = ?self.settings, "settings updated");
        self.persist();
        &self.settings
    }

    fn persist(&self) {
        let Some(db) = &self.db else {
            return;
        };
        if let Err(e) = db.save_json(SETTINGS_KEY, &self.settings) {
            warn!(error = %e, "failed to save settings");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tracing_test::traced_test;

    #[test]
    fn test_settings_default() {
        let settings = Settings::default();
        assert_eq!(settings.work_minutes, 25);
        assert_eq!(settings.short_break_minutes, 5);
        assert_eq!(settings.long_break_minutes, 15);
        assert_eq!(settings.cycles_before_long_break, 4);
        assert!(settings.sound_enabled);
        assert_eq!(settings.sound_volume, 70);
        assert!(settings.notifications_enabled);
    }

    #[test]
    fn test_total_duration_is_minutes_times_sixty() {
        let settings = Settings {
            work_minutes: 50,
            short_break_minutes: 10,
            long_break_minutes: 30,
            ..Settings::default()
        };
        assert_eq!(settings.total_duration(Phase::Work), 3000);
        assert_eq!(settings.total_duration(Phase::ShortBreak), 600);
        assert_eq!(settings.total_duration(Phase::LongBreak), 1800);

        for minutes in WORK_MINUTES_LIMIT.min..=WORK_MINUTES_LIMIT.max {
            let settings = Settings {
                work_minutes: minutes,
                ..Settings::default()
            };
            assert_eq!(settings.total_duration(Phase::Work), minutes * 60);
        }
    }

    #[test]
    fn test_limit_clamp() {
        assert_eq!(WORK_MINUTES_LIMIT.clamp(999.0), Some(60));
        assert_eq!(WORK_MINUTES_LIMIT.clamp(0.0), Some(1));
        assert_eq!(WORK_MINUTES_LIMIT.clamp(-5.0), Some(1));
        assert_eq!(WORK_MINUTES_LIMIT.clamp(24.6), Some(25));
        assert_eq!(SOUND_VOLUME_LIMIT.clamp(0.0), Some(0));
        assert_eq!(WORK_MINUTES_LIMIT.clamp(f64::NAN), None);
        assert_eq!(WORK_MINUTES_LIMIT.clamp(f64::INFINITY), None);
    }

    #[test]
    fn test_apply_clamps_and_merges() {
        let mut settings = Settings::default();
        settings.apply(&SettingsUpdate {
            work_minutes: Some(999.0),
            short_break_minutes: Some(0.0),
            cycles_before_long_break: Some(0.0),
            sound_volume: Some(150.0),
            notifications_enabled: Some(false),
            ..Default::default()
        });

        assert_eq!(settings.work_minutes, 60);
        assert_eq!(settings.short_break_minutes, 1);
        assert_eq!(settings.long_break_minutes, 15);
        assert_eq!(settings.cycles_before_long_break, 1);
        assert_eq!(settings.sound_volume, 100);
        assert!(settings.sound_enabled);
        assert!(!settings.notifications_enabled);
    }

    #[test]
    fn test_apply_ignores_non_finite() {
        let mut settings = Settings::default();
        settings.apply(&SettingsUpdate {
            work_minutes: Some(f64::NAN),
            ..Default::default()
        });
        assert_eq!(settings.work_minutes, 25);
    }

    #[test]
    fn test_update_deserializes_from_partial_json() {
        let update: SettingsUpdate =
            serde_json::from_value(json!({ "workMinutes": 30, "soundEnabled": false })).unwrap();
        assert_eq!(update.work_minutes, Some(30.0));
        assert_eq!(update.sound_enabled, Some(false));
        assert_eq!(update.long_break_minutes, None);
    }

    #[test]
    fn test_store_update_persists() {
        let db = Database::new_in_memory().unwrap();
        let mut store = SettingsStore::load(Some(db.clone()));

        store.update(&SettingsUpdate {
            work_minutes: Some(30.0),
            ..Default::default()
        });
        assert_eq!(store.get().work_minutes, 30);

        let stored: Value = db.load_json(SETTINGS_KEY).unwrap().unwrap();
        assert_eq!(stored["workMinutes"], 30);
        assert_eq!(stored["shortBreakMinutes"], 5);

        let reloaded = SettingsStore::load(Some(db));
        assert_eq!(reloaded.get().work_minutes, 30);
    }

    #[test]
    fn test_store_load_without_database() {
        let store = SettingsStore::load(None);
        assert_eq!(store.get(), &Settings::default());
    }

    #[test]
    fn test_store_without_database_updates() {
        let mut store = SettingsStore::load(None);
        let settings = store.update(&SettingsUpdate {
            long_break_minutes: Some(20.4),
            ..Default::default()
        });
        assert_eq!(settings.work_minutes, 25);
        assert_eq!(settings.long_break_minutes, 20);
    }

    #[test]
    fn test_total_duration_saturates_out_of_range_minutes() {
        let settings = Settings {
            work_minutes: u32::MAX / 10,
            ..Settings::default()
        };
        assert_eq!(settings.total_duration(Phase::Work), u32::MAX);
    }

    #[test]
    fn test_store_load_falls_back_per_field() {
        let db = Database::new_in_memory().unwrap();
        db.save_json(
            SETTINGS_KEY,
            &json!({
                "workMinutes": 45,
                "shortBreakMinutes": "ten",
                "longBreakMinutes": 500,
                "soundEnabled": "yes",
                "notificationsEnabled": false
            }),
        )
        .unwrap();

        let store = SettingsStore::load(Some(db));
        let settings = store.get();
        assert_eq!(settings.work_minutes, 45);
        assert_eq!(settings.short_break_minutes, 5);
        assert_eq!(settings.long_break_minutes, 60);
        assert_eq!(settings.cycles_before_long_break, 4);
        assert!(settings.sound_enabled);
        assert!(!settings.notifications_enabled);
    }

    #[test]
    #[traced_test]
    fn test_store_load_corrupt_record_uses_defaults() {
        let db = Database::new_in_memory().unwrap();
        db.put_raw(SETTINGS_KEY, "{not json").unwrap();

        let store = SettingsStore::load(Some(db));
        assert_eq!(store.get(), &Settings::default());
        assert!(logs_contain("failed to load settings"));
    }

    #[test]
    #[traced_test]
    fn test_store_load_non_object_uses_defaults() {
        let db = Database::new_in_memory().unwrap();
        db.put_raw(SETTINGS_KEY, "[1, 2, 3]").unwrap();

        let store = SettingsStore::load(Some(db));
        assert_eq!(store.get(), &Settings::default());
        assert!(logs_contain("not a JSON object"));
    }
}
