use async_trait::async_trait;

use super::records::{ProfileRecord, SessionInfo, TaskRecord, TaskPatch};
use crate::error::GatewayError;
use crate::task::Suggestion;

/// Persistence/auth backend the controller writes through.
///
/// Each call is a single attempt; retries are left to the user.
#[async_trait]
pub trait SyncGateway: Send + Sync {
    /// Identifier for logs (e.g. "sqlite").
    fn name(&self) -> &str;

    /// The signed-in user, if any.
    async fn get_session(&self) -> Result<Option<SessionInfo>, GatewayError>;

    /// `Ok(None)` when the user has no profile yet.
    async fn load_profile(&self, user_id: &str) -> Result<Option<ProfileRecord>, GatewayError>;

    async fn load_tasks(&self, user_id: &str) -> Result<Vec<TaskRecord>, GatewayError>;

    /// Insert a task; the returned record carries the canonical id.
    async fn insert_task(&self, record: TaskRecord) -> Result<TaskRecord, GatewayError>;

    async fn update_task(&self, id: &str, patch: TaskPatch) -> Result<(), GatewayError>;

    /// Deleting a missing id is not an error.
    async fn delete_task(&self, id: &str) -> Result<(), GatewayError>;

    async fn upsert_profile(&self, record: ProfileRecord) -> Result<(), GatewayError>;
}

/// Text-generation collaborator.
///
/// Implementations never fail: on any error they return a built-in
/// fallback payload.
#[async_trait]
pub trait TaskGenerator: Send + Sync {
    fn name(&self) -> &str;

    /// Up to `count` routine items, one per hourly slot.
    async fn generate_routine_batch(&self, count: usize) -> Vec<Suggestion>;

    async fn generate_single_suggestion(&self) -> Suggestion;
}
