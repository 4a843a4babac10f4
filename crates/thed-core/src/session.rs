//! Signed-in session context.
//!
//! A [`Session`] owns the shared controller and its clock for one user. It
//! is created explicitly from a gateway and generator; there is no global
//! state.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::clock::{spawn_clock, ClockHandle, SharedController};
use crate::error::{ActionError, CoreError, Result};
use crate::gateway::{SyncGateway, TaskGenerator};
use crate::lifecycle::{LifecycleController, TickView};
use crate::policy::now_ms;
use crate::storage::Config;

/// Identity and onboarding answers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Interest tags chosen during onboarding.
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub has_onboarded: bool,
}

/// Interest categories offered during onboarding.
pub const PROFILE_CATEGORIES: [&str; 3] = ["Creative", "Student", "Job"];

/// Most categories a user may pick during onboarding.
pub const MAX_CATEGORIES: usize = 2;

impl User {
    /// Validate onboarding answers.
    ///
    /// Returns the trimmed name and the canonical category names, or `None`
    /// when the name is blank, a category is unknown, or the selection is not
    /// between one and [`MAX_CATEGORIES`] entries. Categories match
    /// case-insensitively; duplicates collapse.
    pub fn onboarding_answers(name: &str, categories: &[String]) -> Option<(String, Vec<String>)> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        let mut picked: Vec<String> = Vec::new();
        for category in categories {
            let canonical = PROFILE_CATEGORIES
                .iter()
                .find(|c| c.eq_ignore_ascii_case(category.trim()))?;
            if !picked.iter().any(|p| p == canonical) {
                picked.push(canonical.to_string());
            }
        }
        if picked.is_empty() || picked.len() > MAX_CATEGORIES {
            return None;
        }
        Some((name.to_string(), picked))
    }

    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            name: None,
            tags: Vec::new(),
            has_onboarded: false,
        }
    }
}

pub struct Session {
    controller: SharedController,
    tick: Duration,
    clock: Option<ClockHandle>,
    load_error: Option<ActionError>,
}

impl Session {
    /// Open a session for the gateway's signed-in user.
    ///
    /// Loads profile and tasks and runs one clock tick so a pending rollover
    /// is applied before the first action. A store failure during loading is
    /// logged and kept in [`Session::load_error`]; the session still opens.
    ///
    /// # Errors
    /// [`CoreError::NotAuthenticated`] when nobody is signed in.
    pub async fn open(
        gateway: Arc<dyn SyncGateway>,
        generator: Arc<dyn TaskGenerator>,
        config: &Config,
    ) -> Result<Self> {
        let info = gateway.get_session().await?.ok_or(CoreError::NotAuthenticated)?;
        info!(
            user_id = %info.user_id,
            gateway = gateway.name(),
            generator = generator.name(),
            "opening session"
        );

        let mut controller =
            LifecycleController::new(gateway, generator, config, User::new(info.user_id, info.email));
        let now = now_ms();
        let load_error = controller.load(now).await.err();
        if let Some(e) = &load_error {
            warn!("session opened with unsynced state: {e}");
        }
        controller.run_clock_tick(now).await;

        Ok(Self {
            controller: Arc::new(Mutex::new(controller)),
            tick: Duration::from_millis(config.clock.tick_ms.max(1)),
            clock: None,
            load_error,
        })
    }

    pub fn controller(&self) -> SharedController {
        self.controller.clone()
    }

    /// Store failure hit while opening, if any.
    pub fn load_error(&self) -> Option<&ActionError> {
        self.load_error.as_ref()
    }

    /// Current derived view.
    pub async fn view(&self) -> TickView {
        self.controller.lock().await.view(now_ms())
    }

    /// Start ticking at the configured cadence. No-op if already running.
    pub fn start_clock(&mut self) {
        if self.clock.is_none() {
            self.clock = Some(spawn_clock(self.controller.clone(), self.tick));
        }
    }

    pub fn clock_running(&self) -> bool {
        self.clock.as_ref().is_some_and(ClockHandle::is_running)
    }

    /// Stop the clock and end the session.
    pub fn close(mut self) {
        if let Some(clock) = self.clock.take() {
            clock.stop();
        }
        info!("session closed");
    }
}
