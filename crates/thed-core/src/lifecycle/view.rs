use std::collections::HashSet;

use serde::Serialize;

use crate::error::ActionError;
use crate::policy::{queue_order, TemporalPolicy};
use crate::stats::UserStats;
use crate::task::Task;

/// A task with its derived time-dependent flags.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TaskView {
    #[serde(flatten)]
    pub task: Task,
    pub locked: bool,
    pub expired: bool,
    /// Routine tasks outside the visible window are hidden; other kinds are
    /// always visible.
    pub visible: bool,
    /// Milliseconds left on the countdown, if the task has one.
    pub countdown_ms: Option<i64>,
}

/// Snapshot derived on each clock tick.
#[derive(Debug, Clone)]
pub struct TickView {
    pub now: i64,
    /// Tasks in queue order.
    pub tasks: Vec<TaskView>,
    pub stats: UserStats,
    pub stars: u8,
    pub cycle_locked: bool,
    pub cycle_time_left_ms: i64,
    /// True when this tick performed the daily rollover.
    pub rolled_over: bool,
    /// Failure persisting state changed during this tick.
    pub sync_error: Option<ActionError>,
}

impl TickView {
    pub(crate) fn build(
        policy: &TemporalPolicy,
        tasks: &[Task],
        stats: &UserStats,
        now: i64,
    ) -> Self {
        let window: HashSet<String> = policy.visible_routine_window(tasks, now);
        let tasks = queue_order(tasks)
            .into_iter()
            .map(|task| TaskView {
                locked: policy.is_locked(task, now),
                expired: policy.is_expired(task, now),
                visible: !task.is_routine() || window.contains(&task.id),
                countdown_ms: policy.remaining_countdown(task, now),
                task: task.clone(),
            })
            .collect();

        Self {
            now,
            tasks,
            stars: stats.stars_today(),
            cycle_locked: policy.is_cycle_locked(stats, now),
            cycle_time_left_ms: policy.cycle_time_left(stats, now),
            stats: stats.clone(),
            rolled_over: false,
            sync_error: None,
        }
    }

    /// Tasks currently shown.
    pub fn visible(&self) -> impl Iterator<Item = &TaskView> {
        self.tasks.iter().filter(|t| t.visible)
    }

    pub fn find(&self, id: &str) -> Option<&TaskView> {
        self.tasks.iter().find(|t| t.task.id == id)
    }
}
