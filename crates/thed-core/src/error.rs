//! Core error types for thed-core.
//!
//! Validation failures (empty titles) and policy no-ops (toggling a locked
//! routine task, starting a cycle during cooldown) are not errors and never
//! show up here.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Core error type for thed-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Gateway (store/auth) errors
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// No signed-in user
    #[error("Not signed in")]
    NotAuthenticated,
}

/// Errors raised by a [`SyncGateway`](crate::gateway::SyncGateway) implementation.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Underlying store failed
    #[error("Store failure: {0}")]
    Store(String),

    /// Record referenced by id does not exist
    #[error("No record with id '{0}'")]
    NotFound(String),

    /// Store is locked by another writer
    #[error("Store is locked")]
    Locked,

    /// Stored payload could not be decoded
    #[error("Malformed record: {0}")]
    Malformed(String),
}

/// Errors from the text-generation client. Never escapes a
/// [`TaskGenerator`](crate::gateway::TaskGenerator); the fallback payload is
/// used instead.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("No API key configured")]
    MissingApiKey,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Generation service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid endpoint: {0}")]
    Endpoint(#[from] url::ParseError),

    #[error("Unparseable payload: {0}")]
    Payload(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown dot-path key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Home/config directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Errors decoding persisted records into entities.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RecordError {
    #[error("routine task '{0}' has no unlock_at")]
    MissingUnlockAt(String),

    #[error("task '{id}' has unknown status '{status}'")]
    UnknownStatus { id: String, status: String },

    #[error("task '{0}' has only one of timer_minutes/timer_started_at")]
    PartialTimer(String),

    #[error("thresholds must be three distinct ascending values in 2..=9, got {0:?}")]
    InvalidThresholds(Vec<i64>),
}

/// User-facing actions the lifecycle controller performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Load,
    AddTask,
    ToggleTask,
    DeleteTask,
    StartCycle,
    Rollover,
    Onboard,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Action::Load => "load",
            Action::AddTask => "add task",
            Action::ToggleTask => "toggle task",
            Action::DeleteTask => "delete task",
            Action::StartCycle => "start cycle",
            Action::Rollover => "daily rollover",
            Action::Onboard => "onboarding",
        };
        f.write_str(label)
    }
}

/// A gateway failure surfaced to the presentation layer.
///
/// Carries the originating action and a human-readable message; the session
/// keeps running.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{action} failed: {message}")]
pub struct ActionError {
    pub action: Action,
    pub message: String,
}

impl ActionError {
    pub fn new(action: Action, err: impl fmt::Display) -> Self {
        Self {
            action,
            message: err.to_string(),
        }
    }
}

// Helper implementations for converting from other error types

impl From<rusqlite::Error> for GatewayError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg) => {
                if e.code == rusqlite::ErrorCode::DatabaseLocked {
                    GatewayError::Locked
                } else {
                    GatewayError::Store(err.to_string())
                }
            }
            _ => GatewayError::Store(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::Malformed(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_error_message_names_action() {
        let err = ActionError::new(Action::ToggleTask, GatewayError::Locked);
        assert_eq!(err.to_string(), "toggle task failed: Store is locked");
        assert_eq!(err.action, Action::ToggleTask);
    }

    #[test]
    fn gateway_error_wraps_into_core_error() {
        let err: CoreError = GatewayError::NotFound("t-1".into()).into();
        assert!(err.to_string().contains("t-1"));
    }
}
