//! Persisted record shapes.
//!
//! Field names follow the store's snake_case columns. The task kind is
//! flattened back into the `is_routine`/`is_daily` flag pair so records stay
//! compatible with rows written by other clients.

use serde::{Deserialize, Serialize};

use crate::error::RecordError;
use crate::session::User;
use crate::stats::{Thresholds, UserStats};
use crate::task::{Countdown, Task, TaskKind, TaskStatus};

/// Authenticated session as reported by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionInfo {
    pub user_id: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskRecord {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub time_slot: String,
    pub status: String,
    pub is_routine: bool,
    pub is_personal: bool,
    pub is_daily: bool,
    pub created_at: i64,
    #[serde(default)]
    pub unlock_at: Option<i64>,
    #[serde(default)]
    pub timer_minutes: Option<u32>,
    #[serde(default)]
    pub timer_started_at: Option<i64>,
}

impl TaskRecord {
    pub fn from_task(task: &Task, user_id: &str) -> Self {
        Self {
            id: task.id.clone(),
            user_id: user_id.to_string(),
            title: task.title.clone(),
            description: task.description.clone(),
            time_slot: task.time_slot.clone(),
            status: task.status.as_str().to_string(),
            is_routine: task.is_routine(),
            is_personal: task.personal,
            is_daily: task.is_daily(),
            created_at: task.created_at,
            unlock_at: task.unlock_at(),
            timer_minutes: task.timer.map(|t| t.minutes),
            timer_started_at: task.timer.map(|t| t.started_at),
        }
    }

    /// Decode into a task. Routine wins over daily if a row sets both.
    pub fn into_task(self) -> Result<Task, RecordError> {
        let status = TaskStatus::parse(&self.status).ok_or_else(|| RecordError::UnknownStatus {
            id: self.id.clone(),
            status: self.status.clone(),
        })?;

        let kind = if self.is_routine {
            let unlock_at = self
                .unlock_at
                .ok_or_else(|| RecordError::MissingUnlockAt(self.id.clone()))?;
            TaskKind::Routine { unlock_at }
        } else if self.is_daily {
            TaskKind::Daily
        } else {
            TaskKind::OneTime
        };

        let timer = match (self.timer_minutes, self.timer_started_at) {
            (Some(minutes), Some(started_at)) => Some(Countdown {
                minutes,
                started_at,
            }),
            (None, None) => None,
            _ => return Err(RecordError::PartialTimer(self.id)),
        };

        Ok(Task {
            id: self.id,
            title: self.title,
            description: self.description,
            time_slot: self.time_slot,
            status,
            kind,
            personal: self.is_personal,
            created_at: self.created_at,
            timer,
        })
    }
}

/// Partial task update. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl TaskPatch {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status.as_str().to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileRecord {
    /// Same as the user id.
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub profiles_list: Vec<String>,
    #[serde(default)]
    pub has_onboarded: bool,
    /// Stars earned today, derived from `completed_today` and `thresholds`.
    #[serde(default)]
    pub stars: u8,
    #[serde(default)]
    pub streak: u32,
    #[serde(default)]
    pub total_stars: u32,
    #[serde(default)]
    pub completed_today: u32,
    #[serde(default)]
    pub current_day_timestamp: i64,
    #[serde(default)]
    pub last_cycle_timestamp: i64,
    #[serde(default)]
    pub thresholds: Vec<u32>,
}

impl ProfileRecord {
    pub fn from_parts(user: &User, stats: &UserStats) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            profiles_list: user.tags.clone(),
            has_onboarded: user.has_onboarded,
            stars: stats.stars_today(),
            streak: stats.streak,
            total_stars: stats.total_stars,
            completed_today: stats.completed_today,
            current_day_timestamp: stats.current_day_timestamp,
            last_cycle_timestamp: stats.last_cycle_timestamp,
            thresholds: stats.thresholds.values().to_vec(),
        }
    }

    /// Split into identity and stats; `email` comes from the session.
    pub fn into_parts(self, email: &str) -> Result<(User, UserStats), RecordError> {
        let values: [u32; 3] = self
            .thresholds
            .as_slice()
            .try_into()
            .map_err(|_| {
                RecordError::InvalidThresholds(
                    self.thresholds.iter().map(|&v| i64::from(v)).collect(),
                )
            })?;
        let stats = UserStats {
            streak: self.streak,
            total_stars: self.total_stars,
            completed_today: self.completed_today,
            current_day_timestamp: self.current_day_timestamp,
            last_cycle_timestamp: self.last_cycle_timestamp,
            thresholds: Thresholds::new(values)?,
        };
        let user = User {
            id: self.id,
            email: email.to_string(),
            name: self.name,
            tags: self.profiles_list,
            has_onboarded: self.has_onboarded,
        };
        Ok((user, stats))
    }
}
