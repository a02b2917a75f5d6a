//! Typed access to user preferences stored in the kv store.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{keys, Store};
use crate::error::ValidationError;

pub const MIN_DURATION_MIN: u32 = 1;
pub const MAX_DURATION_MIN: u32 = 180;

const DEFAULT_FOCUS_MIN: u32 = 25;
const DEFAULT_BREAK_MIN: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    #[default]
    System,
    Light,
    Dark,
}

impl ThemeMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ThemeMode::System => "system",
            ThemeMode::Light => "light",
            ThemeMode::Dark => "dark",
        }
    }
}

impl fmt::Display for ThemeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThemeMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "system" => Ok(ThemeMode::System),
            "light" => Ok(ThemeMode::Light),
            "dark" => Ok(ThemeMode::Dark),
            other => Err(ValidationError::InvalidValue {
                field: "theme_mode".into(),
                message: format!("expected system, light or dark, got '{other}'"),
            }),
        }
    }
}

/// Preference reader/writer over a shared [`Store`].
///
/// Missing or out-of-range stored values read as the defaults.
#[derive(Clone)]
pub struct Preferences {
    store: Arc<Store>,
}

/// Plain snapshot of every preference, for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceValues {
    pub focus_minutes: u32,
    pub break_minutes: u32,
    pub theme: ThemeMode,
    pub sound_enabled: bool,
}

impl Preferences {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    pub fn focus_minutes(&self) -> u32 {
        self.duration(keys::FOCUS_DURATION_MIN, DEFAULT_FOCUS_MIN)
    }

    pub fn break_minutes(&self) -> u32 {
        self.duration(keys::BREAK_DURATION_MIN, DEFAULT_BREAK_MIN)
    }

    /// # Errors
    /// Returns an error if `minutes` is outside `1..=180`.
    pub fn set_focus_minutes(&self, minutes: u32) -> Result<(), ValidationError> {
        validate_minutes(minutes)?;
        self.store.set_int(keys::FOCUS_DURATION_MIN, i64::from(minutes));
        Ok(())
    }

    /// # Errors
    /// Returns an error if `minutes` is outside `1..=180`.
    pub fn set_break_minutes(&self, minutes: u32) -> Result<(), ValidationError> {
        validate_minutes(minutes)?;
        self.store.set_int(keys::BREAK_DURATION_MIN, i64::from(minutes));
        Ok(())
    }

    pub fn theme(&self) -> ThemeMode {
        self.store
            .get_string(keys::THEME_MODE)
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default()
    }

    pub fn set_theme(&self, theme: ThemeMode) {
        self.store.set_string(keys::THEME_MODE, theme.as_str());
    }

    pub fn sound_enabled(&self) -> bool {
        self.store.get_bool(keys::SOUND_ENABLED).unwrap_or(true)
    }

    pub fn set_sound_enabled(&self, enabled: bool) {
        self.store.set_bool(keys::SOUND_ENABLED, enabled);
    }

    pub fn values(&self) -> PreferenceValues {
        PreferenceValues {
            focus_minutes: self.focus_minutes(),
            break_minutes: self.break_minutes(),
            theme: self.theme(),
            sound_enabled: self.sound_enabled(),
        }
    }

    fn duration(&self, key: &str, default: u32) -> u32 {
        self.store
            .get_int(key)
            .and_then(|m| u32::try_from(m).ok())
            .filter(|m| validate_minutes(*m).is_ok())
            .unwrap_or(default)
    }
}

fn validate_minutes(minutes: u32) -> Result<(), ValidationError> {
    if (MIN_DURATION_MIN..=MAX_DURATION_MIN).contains(&minutes) {
        Ok(())
    } else {
        Err(ValidationError::DurationOutOfRange {
            minutes,
            min: MIN_DURATION_MIN,
            max: MAX_DURATION_MIN,
        })
    }
}
