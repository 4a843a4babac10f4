//! Temporal policy engine.
//!
//! Pure functions over `(now, task-or-stats)`: unlock gating, expiry, the
//! visible routine window, countdowns, the 12-hour cycle cooldown and the
//! daily rollover. Nothing here performs I/O; the caller supplies the clock
//! and, for rollover, the RNG used to redraw thresholds.
//!
//! All checks are level-triggered. The caller re-evaluates them every tick
//! and relies on `apply_rollover` advancing `current_day_timestamp` so the
//! rollover does not fire twice for the same day.

mod day;

pub use day::DayClock;

use std::collections::HashSet;

use chrono::Utc;
use rand::Rng;

use crate::stats::{Thresholds, UserStats};
use crate::task::{Task, TaskStatus};

pub const SECOND_MS: i64 = 1_000;
pub const MINUTE_MS: i64 = 60 * SECOND_MS;
pub const HOUR_MS: i64 = 60 * MINUTE_MS;
pub const DAY_MS: i64 = 24 * HOUR_MS;

/// Current wall-clock time in milliseconds since the epoch.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Durations and calendar that parameterize the policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemporalPolicy {
    /// How long past `unlock_at` an incomplete routine task stays active.
    pub expiry_ms: i64,
    /// Cooldown between routine cycles.
    pub cycle_ms: i64,
    /// Number of not-yet-unlocked routine tasks shown ahead.
    pub upcoming_window: usize,
    /// Margin before `unlock_at` at which interactive toggles are accepted.
    pub unlock_grace_ms: i64,
    pub day: DayClock,
}

impl Default for TemporalPolicy {
    fn default() -> Self {
        Self {
            expiry_ms: 3 * HOUR_MS,
            cycle_ms: 12 * HOUR_MS,
            upcoming_window: 3,
            unlock_grace_ms: SECOND_MS,
            day: DayClock::Local,
        }
    }
}

/// Outcome of a daily rollover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rollover {
    pub tasks: Vec<Task>,
    pub stats: UserStats,
    /// Ids of tasks dropped by the rollover.
    pub purged: Vec<String>,
    /// Ids of daily tasks reset from completed to pending.
    pub reset: Vec<String>,
}

impl TemporalPolicy {
    /// Routine task that cannot be completed yet.
    pub fn is_locked(&self, task: &Task, now: i64) -> bool {
        !task.is_completed() && task.unlock_at().is_some_and(|unlock_at| now < unlock_at)
    }

    /// Interactive form of [`is_locked`](Self::is_locked): unlocks
    /// `unlock_grace_ms` early so the boundary second does not flicker.
    pub fn is_locked_with_grace(&self, task: &Task, now: i64) -> bool {
        !task.is_completed()
            && task
                .unlock_at()
                .is_some_and(|unlock_at| now < unlock_at - self.unlock_grace_ms)
    }

    /// Incomplete routine task more than `expiry_ms` past its unlock time.
    pub fn is_expired(&self, task: &Task, now: i64) -> bool {
        if task.is_completed() {
            return false;
        }
        task.unlock_at()
            .is_some_and(|unlock_at| now - unlock_at > self.expiry_ms)
    }

    /// Ids of the routine tasks currently shown: every due, incomplete,
    /// non-expired routine task plus the next `upcoming_window` locked ones.
    pub fn visible_routine_window(&self, tasks: &[Task], now: i64) -> HashSet<String> {
        let mut upcoming: Vec<(i64, &Task)> = Vec::new();
        let mut visible = HashSet::new();

        for task in tasks.iter().filter(|t| !t.is_completed()) {
            let Some(unlock_at) = task.unlock_at() else {
                continue;
            };
            if now < unlock_at {
                upcoming.push((unlock_at, task));
            } else if !self.is_expired(task, now) {
                visible.insert(task.id.clone());
            }
        }

        upcoming.sort_by_key(|(unlock_at, _)| *unlock_at);
        visible.extend(
            upcoming
                .into_iter()
                .take(self.upcoming_window)
                .map(|(_, t)| t.id.clone()),
        );
        visible
    }

    /// Milliseconds left on the task's countdown, floored at zero.
    pub fn remaining_countdown(&self, task: &Task, now: i64) -> Option<i64> {
        task.timer
            .map(|timer| (timer.duration_ms() - (now - timer.started_at)).max(0))
    }

    pub fn is_rollover_due(&self, stats: &UserStats, now: i64) -> bool {
        stats.current_day_timestamp != 0
            && self.day.midnight(now) != stats.current_day_timestamp
    }

    /// Apply the daily transition.
    ///
    /// Daily tasks survive and reset to pending; pending one-time tasks
    /// survive untouched; everything else (completed one-time tasks and all
    /// routine tasks) is dropped. Streak advances only if something was
    /// completed on the closing day.
    pub fn apply_rollover<R: Rng + ?Sized>(
        &self,
        tasks: Vec<Task>,
        stats: &UserStats,
        now: i64,
        rng: &mut R,
    ) -> Rollover {
        let mut kept = Vec::with_capacity(tasks.len());
        let mut purged = Vec::new();
        let mut reset = Vec::new();

        for mut task in tasks {
            if task.is_daily() {
                if task.status != TaskStatus::Pending {
                    task.status = TaskStatus::Pending;
                    reset.push(task.id.clone());
                }
                kept.push(task);
            } else if task.status == TaskStatus::Pending && !task.is_routine() {
                kept.push(task);
            } else {
                purged.push(task.id);
            }
        }

        let stats = UserStats {
            completed_today: 0,
            current_day_timestamp: self.day.midnight(now),
            thresholds: Thresholds::random(rng),
            streak: if stats.completed_today > 0 {
                stats.streak + 1
            } else {
                0
            },
            ..stats.clone()
        };

        Rollover {
            tasks: kept,
            stats,
            purged,
            reset,
        }
    }

    pub fn is_cycle_locked(&self, stats: &UserStats, now: i64) -> bool {
        now < stats.last_cycle_timestamp + self.cycle_ms
    }

    /// Time until a new cycle may start, zero when unlocked.
    pub fn cycle_time_left(&self, stats: &UserStats, now: i64) -> i64 {
        (stats.last_cycle_timestamp + self.cycle_ms - now).max(0)
    }
}

/// Stars earned today: 0..=3.
pub fn stars_earned(completed_today: u32, thresholds: &Thresholds) -> u8 {
    thresholds.stars_for(completed_today)
}

/// Display order: pending before completed, then by unlock (or creation)
/// time, personal tasks first on ties.
pub fn queue_order(tasks: &[Task]) -> Vec<&Task> {
    let mut ordered: Vec<&Task> = tasks.iter().collect();
    ordered.sort_by_key(|t| {
        (
            t.is_completed(),
            t.unlock_at().unwrap_or(t.created_at),
            !t.personal,
        )
    });
    ordered
}

/// `h:mm:ss`, as shown next to the cycle button.
pub fn format_time_left(ms: i64) -> String {
    let ms = ms.max(0);
    let h = ms / HOUR_MS;
    let m = (ms % HOUR_MS) / MINUTE_MS;
    let s = (ms % MINUTE_MS) / SECOND_MS;
    format!("{h}:{m:02}:{s:02}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{hourly_slots, Countdown, Suggestion, TaskKind};
    use chrono::FixedOffset;
    use rand::SeedableRng;
    use rand_pcg::Pcg64;

    const DAY: i64 = 20_000 * DAY_MS;

    fn policy() -> TemporalPolicy {
        TemporalPolicy {
            day: DayClock::Fixed(FixedOffset::east_opt(0).unwrap()),
            ..Default::default()
        }
    }

    fn routine(id: &str, unlock_at: i64, status: TaskStatus) -> Task {
        let mut t = Task::routine_batch(
            vec![Suggestion::new(id, "")],
            unlock_at - HOUR_MS,
            hourly_slots,
            &policy().day,
        )
        .remove(0);
        t.id = id.to_string();
        t.status = status;
        t
    }

    fn plain(id: &str, kind: TaskKind, status: TaskStatus) -> Task {
        let mut t = Task::manual(id, kind == TaskKind::Daily, DAY).unwrap();
        t.id = id.to_string();
        t.kind = kind;
        t.status = status;
        t
    }

    fn stats(completed_today: u32, streak: u32) -> UserStats {
        UserStats {
            streak,
            total_stars: 10,
            completed_today,
            current_day_timestamp: DAY,
            last_cycle_timestamp: 0,
            thresholds: Thresholds::new([3, 6, 9]).unwrap(),
        }
    }

    #[test]
    fn lock_boundary_is_exclusive() {
        let p = policy();
        let t = routine("r", DAY + HOUR_MS, TaskStatus::Pending);
        assert!(p.is_locked(&t, DAY + HOUR_MS - 1));
        assert!(!p.is_locked(&t, DAY + HOUR_MS));
        assert!(!p.is_locked(&plain("m", TaskKind::OneTime, TaskStatus::Pending), 0));
    }

    #[test]
    fn grace_unlocks_one_second_early() {
        let p = policy();
        let t = routine("r", DAY + HOUR_MS, TaskStatus::Pending);
        assert!(p.is_locked_with_grace(&t, DAY + HOUR_MS - 1_001));
        assert!(!p.is_locked_with_grace(&t, DAY + HOUR_MS - 1_000));
    }

    #[test]
    fn completed_task_is_never_locked() {
        let p = policy();
        let t = routine("r", DAY + HOUR_MS, TaskStatus::Completed);
        assert!(!p.is_locked(&t, DAY));
        assert!(!p.is_locked_with_grace(&t, DAY));
    }

    #[test]
    fn expiry_after_three_hours() {
        let p = policy();
        let unlock = DAY + HOUR_MS;
        let t = routine("r", unlock, TaskStatus::Pending);
        assert!(!p.is_expired(&t, unlock + 3 * HOUR_MS));
        assert!(p.is_expired(&t, unlock + 3 * HOUR_MS + 1));

        let done = routine("d", unlock, TaskStatus::Completed);
        assert!(!p.is_expired(&done, unlock + 10 * HOUR_MS));
    }

    #[test]
    fn visible_window_is_due_plus_next_three() {
        let p = policy();
        let now = DAY + 5 * HOUR_MS;
        let tasks = vec![
            routine("expired", now - 4 * HOUR_MS, TaskStatus::Pending),
            routine("due-1", now - HOUR_MS, TaskStatus::Pending),
            routine("due-2", now, TaskStatus::Pending),
            routine("done", now - HOUR_MS, TaskStatus::Completed),
            routine("up-4", now + 4 * HOUR_MS, TaskStatus::Pending),
            routine("up-1", now + HOUR_MS, TaskStatus::Pending),
            routine("up-3", now + 3 * HOUR_MS, TaskStatus::Pending),
            routine("up-2", now + 2 * HOUR_MS, TaskStatus::Pending),
            plain("manual", TaskKind::OneTime, TaskStatus::Pending),
        ];
        let visible = p.visible_routine_window(&tasks, now);
        let mut ids: Vec<_> = visible.iter().map(String::as_str).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec!["due-1", "due-2", "up-1", "up-2", "up-3"]);
    }

    #[test]
    fn countdown_floors_at_zero() {
        let p = policy();
        let mut t = plain("t", TaskKind::OneTime, TaskStatus::Pending);
        assert_eq!(p.remaining_countdown(&t, DAY), None);
        t.timer = Some(Countdown {
            minutes: 10,
            started_at: DAY,
        });
        assert_eq!(p.remaining_countdown(&t, DAY + MINUTE_MS), Some(9 * MINUTE_MS));
        assert_eq!(p.remaining_countdown(&t, DAY + 11 * MINUTE_MS), Some(0));
    }

    #[test]
    fn rollover_due_only_on_new_day_and_when_initialized() {
        let p = policy();
        let s = stats(0, 0);
        assert!(!p.is_rollover_due(&s, DAY + 23 * HOUR_MS));
        assert!(p.is_rollover_due(&s, DAY + DAY_MS));
        let unset = UserStats {
            current_day_timestamp: 0,
            ..s
        };
        assert!(!p.is_rollover_due(&unset, DAY + DAY_MS));
    }

    #[test]
    fn rollover_keeps_daily_and_pending_one_time() {
        let p = policy();
        let mut rng = Pcg64::seed_from_u64(3);
        let tasks = vec![
            plain("daily-pending", TaskKind::Daily, TaskStatus::Pending),
            plain("daily-done", TaskKind::Daily, TaskStatus::Completed),
            plain("once-pending", TaskKind::OneTime, TaskStatus::Pending),
            plain("once-done", TaskKind::OneTime, TaskStatus::Completed),
            routine("routine", DAY + HOUR_MS, TaskStatus::Pending),
        ];
        let out = p.apply_rollover(tasks, &stats(2, 4), DAY + DAY_MS + 5, &mut rng);

        let kept: Vec<_> = out.tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(kept, vec!["daily-pending", "daily-done", "once-pending"]);
        assert!(out.tasks.iter().all(|t| t.status == TaskStatus::Pending));
        assert_eq!(out.purged, vec!["once-done", "routine"]);
        assert_eq!(out.reset, vec!["daily-done"]);

        assert_eq!(out.stats.completed_today, 0);
        assert_eq!(out.stats.streak, 5);
        assert_eq!(out.stats.total_stars, 10);
        assert_eq!(out.stats.current_day_timestamp, DAY + DAY_MS);
        assert!(!p.is_rollover_due(&out.stats, DAY + DAY_MS + 5));
    }

    #[test]
    fn rollover_purges_completed_routine_task() {
        let p = policy();
        let mut rng = Pcg64::seed_from_u64(9);
        let tasks = vec![
            plain("daily-pending", TaskKind::Daily, TaskStatus::Pending),
            plain("daily-done", TaskKind::Daily, TaskStatus::Completed),
            plain("once-pending", TaskKind::OneTime, TaskStatus::Pending),
            plain("once-done", TaskKind::OneTime, TaskStatus::Completed),
            routine("routine", DAY + HOUR_MS, TaskStatus::Completed),
        ];
        let out = p.apply_rollover(tasks, &stats(1, 0), DAY + DAY_MS, &mut rng);

        let kept: Vec<_> = out.tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(kept, vec!["daily-pending", "daily-done", "once-pending"]);
        assert_eq!(out.purged, vec!["once-done", "routine"]);
        assert_eq!(out.stats.streak, 1);
    }

    #[test]
    fn rollover_without_completions_resets_streak() {
        let p = policy();
        let mut rng = Pcg64::seed_from_u64(5);
        let out = p.apply_rollover(Vec::new(), &stats(0, 7), DAY + DAY_MS, &mut rng);
        assert_eq!(out.stats.streak, 0);
    }

    #[test]
    fn cycle_lock_boundary() {
        let p = policy();
        let t = DAY + 3 * HOUR_MS;
        let s = UserStats {
            last_cycle_timestamp: t,
            ..stats(0, 0)
        };
        assert!(p.is_cycle_locked(&s, t + 12 * HOUR_MS - 1));
        assert!(!p.is_cycle_locked(&s, t + 12 * HOUR_MS));
        assert_eq!(p.cycle_time_left(&s, t + 11 * HOUR_MS), HOUR_MS);
        assert_eq!(p.cycle_time_left(&s, t + 13 * HOUR_MS), 0);
    }

    #[test]
    fn queue_puts_completed_last() {
        let mut early = plain("early", TaskKind::OneTime, TaskStatus::Completed);
        early.created_at = 1;
        let mut late = plain("late", TaskKind::OneTime, TaskStatus::Pending);
        late.created_at = 100;
        let mut generated = plain("generated", TaskKind::OneTime, TaskStatus::Pending);
        generated.created_at = 100;
        generated.personal = false;
        let tasks = vec![early, generated, late];
        let order: Vec<_> = queue_order(&tasks).iter().map(|t| t.id.as_str()).collect();
        assert_eq!(order, vec!["late", "generated", "early"]);
    }

    #[test]
    fn time_left_formatting() {
        assert_eq!(format_time_left(0), "0:00:00");
        assert_eq!(format_time_left(12 * HOUR_MS - 1), "11:59:59");
        assert_eq!(format_time_left(HOUR_MS + 5 * MINUTE_MS + 7 * SECOND_MS), "1:05:07");
        assert_eq!(format_time_left(-5), "0:00:00");
    }
}
