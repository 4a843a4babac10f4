pub mod auth;
pub mod config;
pub mod cycle;
pub mod stats;
pub mod task;
pub mod watch;

use std::error::Error;
use std::sync::Arc;

use thed_core::{generator_from_config, Config, CoreError, LocalStore, Session};

pub type CmdResult = Result<(), Box<dyn Error>>;

/// Open the signed-in session against the local store.
pub async fn open_session() -> Result<Session, Box<dyn Error>> {
    let config = Config::load()?;
    let store = Arc::new(LocalStore::open()?);
    let generator = generator_from_config(&config);
    match Session::open(store, generator, &config).await {
        Ok(session) => Ok(session),
        Err(CoreError::NotAuthenticated) => Err("not signed in; run `thed login <email>`".into()),
        Err(e) => Err(e.into()),
    }
}
