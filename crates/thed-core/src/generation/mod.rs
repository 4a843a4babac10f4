//! Text-generation collaborators: the Gemini client and the offline fallback.

pub mod fallback;
pub mod gemini;

pub use fallback::{fallback_routine, fallback_single, FallbackGenerator};
pub use gemini::GeminiGenerator;

use std::sync::Arc;

use tracing::debug;

use crate::gateway::TaskGenerator;
use crate::storage::Config;

/// Environment variables checked for the Gemini key, in order.
pub const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

/// Keyring entry holding the Gemini key.
pub const KEYRING_API_KEY: &str = "gemini_api_key";

/// Thin wrapper around the OS keyring for credential storage.
pub mod keyring_store {
    const SERVICE: &str = "thed";

    pub fn get(key: &str) -> Result<Option<String>, keyring::Error> {
        let entry = keyring::Entry::new(SERVICE, key)?;
        match entry.get_password() {
            Ok(pw) => Ok(Some(pw)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn set(key: &str, value: &str) -> Result<(), keyring::Error> {
        let entry = keyring::Entry::new(SERVICE, key)?;
        entry.set_password(value)
    }

    pub fn delete(key: &str) -> Result<(), keyring::Error> {
        let entry = keyring::Entry::new(SERVICE, key)?;
        match entry.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// Resolve the Gemini key: config, then environment, then keyring.
pub fn resolve_api_key(config: &Config) -> Option<String> {
    if let Some(key) = config.generation.api_key.clone().filter(|k| !k.is_empty()) {
        return Some(key);
    }
    for var in API_KEY_VARS {
        if let Ok(key) = std::env::var(var) {
            if !key.is_empty() {
                return Some(key);
            }
        }
    }
    match keyring_store::get(KEYRING_API_KEY) {
        Ok(key) => key,
        Err(e) => {
            debug!("keyring lookup failed: {e}");
            None
        }
    }
}

/// Build the generator described by `config`. Without a key the offline
/// fallback is used.
pub fn generator_from_config(config: &Config) -> Arc<dyn TaskGenerator> {
    match resolve_api_key(config) {
        Some(key) => Arc::new(GeminiGenerator::new(
            config.generation.base_url.clone(),
            Some(key),
            config.generation.model.clone(),
        )),
        None => Arc::new(FallbackGenerator),
    }
}
