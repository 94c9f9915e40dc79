//! User settings and the store that holds them.
//!
//! Settings are validated at this boundary; the timer engine only ever
//! sees a [`Durations`] snapshot derived from a valid [`Settings`].

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, CoreError, ValidationError};
use crate::storage::{keys, Persistence};
use crate::timer::{Durations, TimerMode};

pub const FOCUS_TIME_RANGE: (u32, u32) = (1, 90);
pub const SHORT_BREAK_RANGE: (u32, u32) = (1, 30);
pub const LONG_BREAK_RANGE: (u32, u32) = (1, 60);
pub const LONG_BREAK_AFTER_RANGE: (u32, u32) = (1, 10);
pub const SOUND_VOLUME_RANGE: (u32, u32) = (0, 100);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    System,
}

impl Default for Theme {
    fn default() -> Self {
        Theme::System
    }
}

/// User-configurable preferences. Durations are in minutes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_focus_time")]
    pub focus_time: u32,
    #[serde(default = "default_short_break_time")]
    pub short_break_time: u32,
    #[serde(default = "default_long_break_time")]
    pub long_break_time: u32,
    #[serde(default = "default_long_break_after")]
    pub long_break_after: u32,
    /// Start the next focus session automatically after a break ends.
    #[serde(default)]
    pub auto_start_next_session: bool,
    /// Start the break automatically after a focus session ends.
    #[serde(default)]
    pub auto_start_break: bool,
    #[serde(default = "default_true")]
    pub notifications_enabled: bool,
    #[serde(default = "default_true")]
    pub sound_enabled: bool,
    #[serde(default = "default_sound_volume")]
    pub sound_volume: u32,
    #[serde(default)]
    pub theme: Theme,
}

fn default_focus_time() -> u32 {
    25
}
fn default_short_break_time() -> u32 {
    5
}
fn default_long_break_time() -> u32 {
    15
}
fn default_long_break_after() -> u32 {
    4
}
fn default_sound_volume() -> u32 {
    50
}
fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            focus_time: default_focus_time(),
            short_break_time: default_short_break_time(),
            long_break_time: default_long_break_time(),
            long_break_after: default_long_break_after(),
            auto_start_next_session: false,
            auto_start_break: false,
            notifications_enabled: true,
            sound_enabled: true,
            sound_volume: default_sound_volume(),
            theme: Theme::System,
        }
    }
}

/// Partial update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsPatch {
    pub focus_time: Option<u32>,
    pub short_break_time: Option<u32>,
    pub long_break_time: Option<u32>,
    pub long_break_after: Option<u32>,
    pub auto_start_next_session: Option<bool>,
    pub auto_start_break: Option<bool>,
    pub notifications_enabled: Option<bool>,
    pub sound_enabled: Option<bool>,
    pub sound_volume: Option<u32>,
    pub theme: Option<Theme>,
}

fn check_range(field: &str, value: u32, (min, max): (u32, u32)) -> Result<(), ValidationError> {
    if value < min || value > max {
        return Err(ValidationError::out_of_range(
            field,
            i64::from(value),
            i64::from(min),
            i64::from(max),
        ));
    }
    Ok(())
}

impl Settings {
    /// Check every bounded field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_range("focus_time", self.focus_time, FOCUS_TIME_RANGE)?;
        check_range("short_break_time", self.short_break_time, SHORT_BREAK_RANGE)?;
        check_range("long_break_time", self.long_break_time, LONG_BREAK_RANGE)?;
        check_range("long_break_after", self.long_break_after, LONG_BREAK_AFTER_RANGE)?;
        check_range("sound_volume", self.sound_volume, SOUND_VOLUME_RANGE)?;
        Ok(())
    }

    /// Duration snapshot for the engine.
    pub fn durations(&self) -> Durations {
        Durations::from_minutes(
            self.focus_time,
            self.short_break_time,
            self.long_break_time,
            self.long_break_after,
        )
    }

    /// Whether a session in `mode` should start on its own once staged.
    pub fn auto_start_for(&self, mode: TimerMode) -> bool {
        if mode.is_break() {
            self.auto_start_break
        } else {
            self.auto_start_next_session
        }
    }

    fn apply(&mut self, patch: SettingsPatch) {
        if let Some(v) = patch.focus_time {
            self.focus_time = v;
        }
        if let Some(v) = patch.short_break_time {
            self.short_break_time = v;
        }
        if let Some(v) = patch.long_break_time {
            self.long_break_time = v;
        }
        if let Some(v) = patch.long_break_after {
            self.long_break_after = v;
        }
        if let Some(v) = patch.auto_start_next_session {
            self.auto_start_next_session = v;
        }
        if let Some(v) = patch.auto_start_break {
            self.auto_start_break = v;
        }
        if let Some(v) = patch.notifications_enabled {
            self.notifications_enabled = v;
        }
        if let Some(v) = patch.sound_enabled {
            self.sound_enabled = v;
        }
        if let Some(v) = patch.sound_volume {
            self.sound_volume = v;
        }
        if let Some(v) = patch.theme {
            self.theme = v;
        }
    }

    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => serde_json::Value::Number(
                        value
                            .parse::<u64>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as a whole number")))?
                            .into(),
                    ),
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    /// Get a setting as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Return a copy with `key` set to `value`, validated.
    pub fn with_value(&self, key: &str, value: &str) -> Result<Settings, CoreError> {
        let mut json = serde_json::to_value(self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Settings = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        Ok(updated)
    }
}

/// Holds the current settings. No side effects beyond persistence.
#[derive(Debug, Clone, Default)]
pub struct SettingsStore {
    current: Settings,
}

impl SettingsStore {
    pub fn new(settings: Settings) -> Result<Self, ValidationError> {
        settings.validate()?;
        Ok(Self { current: settings })
    }

    /// Load persisted settings; anything invalid falls back to defaults.
    pub fn load(persistence: &Persistence) -> Self {
        let stored: Settings = persistence.load(keys::SETTINGS);
        match stored.validate() {
            Ok(()) => Self { current: stored },
            Err(e) => {
                tracing::warn!(error = %e, "stored settings invalid, using defaults");
                Self::default()
            }
        }
    }

    pub fn save(&self, persistence: &Persistence) -> bool {
        persistence.save(keys::SETTINGS, &self.current)
    }

    pub fn settings(&self) -> &Settings {
        &self.current
    }

    /// Apply a partial update. On error the current settings are untouched.
    pub fn update(&mut self, patch: SettingsPatch) -> Result<&Settings, ValidationError> {
        let mut next = self.current.clone();
        next.apply(patch);
        next.validate()?;
        self.current = next;
        Ok(&self.current)
    }

    /// Set one field by key, e.g. `set("focus_time", "30")`.
    pub fn set(&mut self, key: &str, value: &str) -> Result<&Settings, CoreError> {
        self.current = self.current.with_value(key, value)?;
        Ok(&self.current)
    }

    pub fn reset(&mut self) {
        self.current = Settings::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let s = Settings::default();
        assert!(s.validate().is_ok());
        assert_eq!(s.durations(), Durations::from_minutes(25, 5, 15, 4));
    }

    #[test]
    fn zero_duration_rejected() {
        let mut store = SettingsStore::default();
        let err = store
            .update(SettingsPatch {
                focus_time: Some(0),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { ref field, .. } if field == "focus_time"));
        assert_eq!(store.settings().focus_time, 25);
    }

    #[test]
    fn each_duration_bounded_independently() {
        let mut store = SettingsStore::default();
        assert!(store
            .update(SettingsPatch {
                short_break_time: Some(31),
                ..Default::default()
            })
            .is_err());
        assert!(store
            .update(SettingsPatch {
                long_break_time: Some(60),
                long_break_after: Some(10),
                ..Default::default()
            })
            .is_ok());
        assert_eq!(store.settings().long_break_time, 60);
    }

    #[test]
    fn auto_start_flag_depends_on_mode() {
        let s = Settings {
            auto_start_break: true,
            ..Default::default()
        };
        assert!(s.auto_start_for(TimerMode::ShortBreak));
        assert!(s.auto_start_for(TimerMode::LongBreak));
        assert!(!s.auto_start_for(TimerMode::Focus));
    }

    #[test]
    fn get_and_set_by_key() {
        let mut store = SettingsStore::default();
        assert_eq!(store.settings().get("focus_time").as_deref(), Some("25"));
        assert_eq!(store.settings().get("theme").as_deref(), Some("system"));
        assert!(store.settings().get("missing").is_none());

        store.set("focus_time", "30").unwrap();
        store.set("auto_start_break", "true").unwrap();
        store.set("theme", "dark").unwrap();
        assert_eq!(store.settings().focus_time, 30);
        assert!(store.settings().auto_start_break);
        assert_eq!(store.settings().theme, Theme::Dark);
    }

    #[test]
    fn set_rejects_bad_input() {
        let mut store = SettingsStore::default();
        assert!(matches!(
            store.set("nonexistent", "1"),
            Err(CoreError::Config(ConfigError::UnknownKey(_)))
        ));
        assert!(matches!(
            store.set("focus_time", "-5"),
            Err(CoreError::Config(ConfigError::InvalidValue { .. }))
        ));
        assert!(matches!(
            store.set("focus_time", "91"),
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));
        assert!(store.set("theme", "purple").is_err());
        assert!(store.set("sound_enabled", "yes").is_err());
        assert_eq!(store.settings(), &Settings::default());
    }

    #[test]
    fn invalid_stored_settings_fall_back() {
        let p = Persistence::in_memory();
        let bad = Settings {
            long_break_after: 0,
            ..Default::default()
        };
        p.save(keys::SETTINGS, &bad);
        assert_eq!(SettingsStore::load(&p).settings(), &Settings::default());
    }

    #[test]
    fn persists_across_reload() {
        let p = Persistence::in_memory();
        let mut store = SettingsStore::load(&p);
        store.set("short_break_time", "7").unwrap();
        store.save(&p);
        assert_eq!(SettingsStore::load(&p).settings().short_break_time, 7);
    }
}
