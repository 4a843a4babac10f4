//! # TheD Core Library
//!
//! Core logic for TheD, a personal task and habit tracker. Users keep a list
//! of manual, AI-suggested and "12-hour flow" routine tasks, complete them,
//! and earn streaks and daily stars that roll over at local midnight.
//!
//! ## Architecture
//!
//! - **Policy**: pure time rules (unlock gating, expiry, visible window,
//!   cycle cooldown, daily rollover)
//! - **Lifecycle**: the controller that applies user actions optimistically
//!   and writes through a gateway, rolling back on failure
//! - **Gateway**: capability traits for the persistence/auth backend and the
//!   text generator
//! - **Storage**: SQLite gateway and TOML configuration
//! - **Generation**: Gemini client with an offline fallback
//!
//! ## Key Components
//!
//! - [`LifecycleController`]: task/stats state machine driven by actions and ticks
//! - [`TemporalPolicy`]: time rules parameterized by configuration
//! - [`LocalStore`]: SQLite implementation of [`SyncGateway`]
//! - [`Session`]: signed-in context owning the controller and its clock

pub mod clock;
pub mod error;
pub mod gateway;
pub mod generation;
pub mod lifecycle;
pub mod policy;
pub mod session;
pub mod stats;
pub mod storage;
pub mod task;

pub use clock::{spawn_clock, ClockHandle, SharedController};
pub use error::{Action, ActionError, ConfigError, CoreError, GatewayError, GenerationError, RecordError};
pub use gateway::{ProfileRecord, SessionInfo, SyncGateway, TaskGenerator, TaskPatch, TaskRecord};
pub use generation::{generator_from_config, FallbackGenerator, GeminiGenerator};
pub use lifecycle::{LifecycleController, NewTask, TaskView, TickView};
pub use policy::{format_time_left, now_ms, queue_order, stars_earned, DayClock, TemporalPolicy};
pub use session::{Session, User, MAX_CATEGORIES, PROFILE_CATEGORIES};
pub use stats::{Thresholds, UserStats};
pub use storage::{Config, LocalStore};
pub use task::{Countdown, Suggestion, Task, TaskKind, TaskStatus};
