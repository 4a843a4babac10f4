//! Task entity model.
//!
//! A task is one of three kinds: a routine item produced by a 12-hour cycle
//! (gated by an unlock time), a daily task that survives rollover, or a
//! one-time task. `personal` only affects queue ordering.
//!
//! Builders cover each creation path:
//!
//! ```text
//! manual     -> OneTime | Daily, personal, slot "Now"
//! boosted    -> OneTime, personal, slot "Now"
//! timed      -> OneTime, personal, countdown started now
//! routine    -> Routine { unlock_at = start + offset(n) }, not personal
//! ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::policy::{DayClock, HOUR_MS, MINUTE_MS};

/// Prefix for ids assigned locally before the store confirms an insert.
pub const PENDING_ID_PREFIX: &str = "pending-";

/// Slot label for tasks available immediately.
pub const SLOT_NOW: &str = "Now";

/// Task completion status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskStatus {
    Pending,
    Completed,
    Expired,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::Completed => "COMPLETED",
            TaskStatus::Expired => "EXPIRED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(TaskStatus::Pending),
            "COMPLETED" => Some(TaskStatus::Completed),
            "EXPIRED" => Some(TaskStatus::Expired),
            _ => None,
        }
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Pending
    }
}

/// How a task behaves across time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskKind {
    /// Generated by a 12-hour cycle; cannot be completed before `unlock_at`.
    Routine { unlock_at: i64 },
    /// Survives rollover and resets to pending.
    Daily,
    /// Purged at rollover once completed.
    OneTime,
}

/// Countdown layered onto a task.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Countdown {
    pub minutes: u32,
    pub started_at: i64,
}

impl Countdown {
    pub fn duration_ms(&self) -> i64 {
        i64::from(self.minutes) * MINUTE_MS
    }
}

/// A `{title, description}` pair returned by the text generator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Suggestion {
    pub title: String,
    pub description: String,
}

impl Suggestion {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Display slot: "Now" or the unlock time as HH:MM.
    pub time_slot: String,
    pub status: TaskStatus,
    pub kind: TaskKind,
    pub personal: bool,
    /// Creation time (ms since epoch).
    pub created_at: i64,
    pub timer: Option<Countdown>,
}

impl Task {
    fn personal_now(title: String, description: String, kind: TaskKind, now: i64) -> Self {
        Self {
            id: pending_id(),
            title,
            description,
            time_slot: SLOT_NOW.to_string(),
            status: TaskStatus::Pending,
            kind,
            personal: true,
            created_at: now,
            timer: None,
        }
    }

    /// Build a user-authored task. Returns `None` for a blank title.
    pub fn manual(title: &str, daily: bool, now: i64) -> Option<Self> {
        let title = title.trim();
        if title.is_empty() {
            return None;
        }
        let (kind, description) = if daily {
            (TaskKind::Daily, "Daily Routine")
        } else {
            (TaskKind::OneTime, "One-time Objective")
        };
        Some(Self::personal_now(
            title.to_string(),
            description.to_string(),
            kind,
            now,
        ))
    }

    /// Build a task from a single generated suggestion. Available immediately.
    pub fn boosted(suggestion: Suggestion, now: i64) -> Self {
        Self::personal_now(
            suggestion.title,
            suggestion.description,
            TaskKind::OneTime,
            now,
        )
    }

    /// Build a one-time task with a countdown starting at `now`.
    pub fn timed(title: &str, minutes: u32, now: i64) -> Option<Self> {
        let title = title.trim();
        if title.is_empty() {
            return None;
        }
        let mut task = Self::personal_now(
            title.to_string(),
            format!("{minutes}-minute focus"),
            TaskKind::OneTime,
            now,
        );
        task.timer = Some(Countdown {
            minutes,
            started_at: now,
        });
        Some(task)
    }

    /// Build a routine batch anchored at `start`.
    ///
    /// Item `n` unlocks at `start + slot_offset(n)`.
    pub fn routine_batch<F>(
        items: Vec<Suggestion>,
        start: i64,
        slot_offset: F,
        clock: &DayClock,
    ) -> Vec<Self>
    where
        F: Fn(usize) -> i64,
    {
        items
            .into_iter()
            .enumerate()
            .map(|(n, item)| {
                let unlock_at = start + slot_offset(n);
                Self {
                    id: format!("{PENDING_ID_PREFIX}routine-{start}-{n}"),
                    title: item.title,
                    description: item.description,
                    time_slot: clock.slot_label(unlock_at),
                    status: TaskStatus::Pending,
                    kind: TaskKind::Routine { unlock_at },
                    personal: false,
                    created_at: start,
                    timer: None,
                }
            })
            .collect()
    }

    pub fn is_routine(&self) -> bool {
        matches!(self.kind, TaskKind::Routine { .. })
    }

    pub fn is_daily(&self) -> bool {
        matches!(self.kind, TaskKind::Daily)
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    pub fn unlock_at(&self) -> Option<i64> {
        match self.kind {
            TaskKind::Routine { unlock_at } => Some(unlock_at),
            _ => None,
        }
    }

    /// Whether the id is still the local placeholder.
    pub fn is_pending_insert(&self) -> bool {
        self.id.starts_with(PENDING_ID_PREFIX)
    }
}

/// One-hour spacing: the n-th routine item unlocks `(n + 1)` hours after start.
pub fn hourly_slots(n: usize) -> i64 {
    (n as i64 + 1) * HOUR_MS
}

/// Spacing of `minutes` per slot, first slot one interval after start.
pub fn spaced_slots(minutes: u32) -> impl Fn(usize) -> i64 {
    move |n| (n as i64 + 1) * i64::from(minutes) * MINUTE_MS
}

fn pending_id() -> String {
    format!("{PENDING_ID_PREFIX}{}", Uuid::new_v4())
}
