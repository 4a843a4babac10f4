use clap::Subcommand;
use thed_core::generation::{keyring_store, KEYRING_API_KEY};
use thed_core::Config;

use super::CmdResult;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a config value
    Get {
        /// Config key (e.g. "routine.batch_size", "clock.tick_ms")
        key: String,
    },
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// New value ("none" clears optional keys)
        value: String,
    },
    /// List all config values
    List,
    /// Reset config to defaults
    Reset,
    /// Store the Gemini API key in the OS keyring
    ApiKey {
        #[arg(required_unless_present = "clear")]
        key: Option<String>,
        /// Remove the stored key
        #[arg(long, conflicts_with = "key")]
        clear: bool,
    },
}

pub fn run(action: ConfigAction) -> CmdResult {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            match config.get(&key) {
                Some(value) => println!("{value}"),
                None => return Err(format!("unknown key: {key}").into()),
            }
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            println!("ok");
        }
        ConfigAction::List => {
            let config = Config::load()?;
            let json = serde_json::to_string_pretty(&config)?;
            println!("{json}");
        }
        ConfigAction::Reset => {
            let config = Config::default();
            config.save()?;
            println!("config reset to defaults");
        }
        ConfigAction::ApiKey { key, clear } => {
            if clear {
                keyring_store::delete(KEYRING_API_KEY)?;
                println!("API key removed");
            } else if let Some(key) = key {
                keyring_store::set(KEYRING_API_KEY, key.trim())?;
                println!("API key stored");
            }
        }
    }
    Ok(())
}
