//! TOML-based application configuration.
//!
//! Stores:
//! - Routine cycle shape (batch size, slot spacing, expiry, cooldown)
//! - Clock cadence, unlock grace and the day boundary offset
//! - Text generation endpoint and model
//!
//! Configuration is stored at `~/.config/thed/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::ConfigError;
use crate::generation::gemini::{DEFAULT_MODEL, GEMINI_BASE_URL};
use crate::policy::{DayClock, TemporalPolicy, HOUR_MS};

/// 12-hour flow configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutineConfig {
    /// Items requested per cycle; one per slot.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_slot_minutes")]
    pub slot_minutes: u32,
    #[serde(default = "default_expiry_hours")]
    pub expiry_hours: u32,
    #[serde(default = "default_cycle_hours")]
    pub cycle_hours: u32,
    /// Locked routine tasks shown ahead of the due ones.
    #[serde(default = "default_upcoming_window")]
    pub upcoming_window: usize,
}

/// Clock configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClockConfig {
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    #[serde(default = "default_unlock_grace_ms")]
    pub unlock_grace_ms: i64,
    /// Fixed UTC offset for day boundaries. Host local time when unset.
    #[serde(default)]
    pub utc_offset_minutes: Option<i32>,
}

/// Text generation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Prefer the environment or the OS keyring over storing this here.
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/thed/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub routine: RoutineConfig,
    #[serde(default)]
    pub clock: ClockConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
}

// Default functions
fn default_batch_size() -> usize {
    12
}
fn default_slot_minutes() -> u32 {
    60
}
fn default_expiry_hours() -> u32 {
    3
}
fn default_cycle_hours() -> u32 {
    12
}
fn default_upcoming_window() -> usize {
    3
}
fn default_tick_ms() -> u64 {
    1_000
}
fn default_unlock_grace_ms() -> i64 {
    1_000
}
fn default_model() -> String {
    DEFAULT_MODEL.into()
}
fn default_base_url() -> String {
    GEMINI_BASE_URL.into()
}

impl Default for RoutineConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            slot_minutes: default_slot_minutes(),
            expiry_hours: default_expiry_hours(),
            cycle_hours: default_cycle_hours(),
            upcoming_window: default_upcoming_window(),
        }
    }
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            unlock_grace_ms: default_unlock_grace_ms(),
            utc_offset_minutes: None,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: default_base_url(),
            api_key: None,
        }
    }
}

impl Config {
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
        if parts.peek().is_none() || key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_some() {
                current = current.get_mut(part).ok_or_else(unknown)?;
                continue;
            }

            let obj = current.as_object_mut().ok_or_else(unknown)?;
            let existing = obj.get(part).ok_or_else(unknown)?;

            let new_value = match existing {
                serde_json::Value::Bool(_) => serde_json::Value::Bool(
                    value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                ),
                serde_json::Value::Number(_) => value
                    .parse::<i64>()
                    .map(|n| serde_json::Value::Number(n.into()))
                    .map_err(|_| invalid(format!("cannot parse '{value}' as integer")))?,
                // Unset optional fields serialize as null: accept a number or a string.
                serde_json::Value::Null => {
                    if let Ok(n) = value.parse::<i64>() {
                        serde_json::Value::Number(n.into())
                    } else {
                        serde_json::Value::String(value.into())
                    }
                }
                serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                    serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                }
                serde_json::Value::String(_) => serde_json::Value::String(value.into()),
            };

            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        Err(unknown())
    }

    fn clear_json_value_by_path(root: &mut serde_json::Value, key: &str) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        if key.is_empty() {
            return Err(unknown());
        }
        let mut current = root;
        for part in key.split('.') {
            current = current.get_mut(part).ok_or_else(unknown)?;
        }
        *current = serde_json::Value::Null;
        Ok(())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, writing defaults there if the file is missing.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a value by dot-separated key without saving.
    ///
    /// `none` or an empty value clears an optional field; for any other
    /// field it is parsed as a literal.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let mut json = serde_json::to_value(&*self).map_err(|e| invalid(e.to_string()))?;

        if value.is_empty() || value.eq_ignore_ascii_case("none") {
            let mut cleared = json.clone();
            Self::clear_json_value_by_path(&mut cleared, key)?;
            if let Ok(config) = serde_json::from_value(cleared) {
                *self = config;
                return Ok(());
            }
        }

        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| invalid(e.to_string()))?;
        Ok(())
    }

    /// Day boundary calendar.
    pub fn day_clock(&self) -> DayClock {
        DayClock::from_offset_minutes(self.clock.utc_offset_minutes)
    }

    /// Temporal policy built from the routine and clock sections.
    pub fn policy(&self) -> TemporalPolicy {
        TemporalPolicy {
            expiry_ms: i64::from(self.routine.expiry_hours) * HOUR_MS,
            cycle_ms: i64::from(self.routine.cycle_hours) * HOUR_MS,
            upcoming_window: self.routine.upcoming_window,
            unlock_grace_ms: self.clock.unlock_grace_ms,
            day: self.day_clock(),
        }
    }
}
