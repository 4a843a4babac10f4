use std::sync::Arc;

use rand::SeedableRng;
use rand_pcg::Pcg64;
use tracing::{debug, info, warn};

use super::view::TickView;
use crate::error::{Action, ActionError, GatewayError};
use crate::gateway::{ProfileRecord, SyncGateway, TaskGenerator, TaskPatch, TaskRecord};
use crate::policy::TemporalPolicy;
use crate::session::User;
use crate::stats::UserStats;
use crate::storage::{Config, RoutineConfig};
use crate::task::{spaced_slots, Task, TaskStatus};

/// What the user asked to add.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NewTask {
    Manual { title: String, daily: bool },
    /// One-time task with a countdown of `minutes`.
    Timed { title: String, minutes: u32 },
    /// Single suggestion from the text generator.
    Boost,
}

/// Orchestrates user actions and clock ticks over the in-memory task list and
/// stats, writing every change through the gateway.
///
/// Local state is updated first. When the gateway rejects a write the local
/// change is rolled back and an [`ActionError`] is returned; the controller
/// stays usable. A routine cycle that fails partway instead leaves the local
/// task list matching what the store kept.
///
/// The profile is only written once it has been read (or created on first
/// login). Until then stats live in memory only, so an unreachable or
/// unreadable profile is never overwritten with defaults.
pub struct LifecycleController {
    gateway: Arc<dyn SyncGateway>,
    generator: Arc<dyn TaskGenerator>,
    policy: TemporalPolicy,
    routine: RoutineConfig,
    user: User,
    tasks: Vec<Task>,
    stats: UserStats,
    profile_synced: bool,
    rng: Pcg64,
}

/// Store writes that went through during a routine cycle.
#[derive(Default)]
struct CycleWrites {
    /// Batch index and store id of each inserted task.
    inserted: Vec<(usize, String)>,
    deleted: Vec<String>,
}

impl LifecycleController {
    pub fn new(
        gateway: Arc<dyn SyncGateway>,
        generator: Arc<dyn TaskGenerator>,
        config: &Config,
        user: User,
    ) -> Self {
        let mut rng = Pcg64::from_entropy();
        let stats = UserStats::fresh(0, &mut rng);
        Self {
            gateway,
            generator,
            policy: config.policy(),
            routine: config.routine.clone(),
            user,
            tasks: Vec::new(),
            stats,
            profile_synced: false,
            rng,
        }
    }

    /// Replace the RNG with a seeded one (deterministic thresholds).
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Pcg64::seed_from_u64(seed);
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn stats(&self) -> &UserStats {
        &self.stats
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn policy(&self) -> &TemporalPolicy {
        &self.policy
    }

    /// Whether the stored profile has been read or created this session.
    pub fn profile_synced(&self) -> bool {
        self.profile_synced
    }

    pub fn find(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Derived view at `now` without advancing any state.
    pub fn view(&self, now: i64) -> TickView {
        TickView::build(&self.policy, &self.tasks, &self.stats, now)
    }

    // ── Load ─────────────────────────────────────────────────────────

    /// Load profile and tasks for the current user.
    ///
    /// Read failures leave defaults in place and keep the stored profile
    /// untouched for the rest of the session. A missing profile is a first
    /// login: fresh stats are created and written back. Tasks are loaded
    /// even when that write fails; the failure is returned afterwards.
    pub async fn load(&mut self, now: i64) -> Result<(), ActionError> {
        let today = self.policy.day.midnight(now);
        let mut failure = None;

        match self.gateway.load_profile(&self.user.id).await {
            Ok(Some(record)) => match record.into_parts(&self.user.email) {
                Ok((user, stats)) => {
                    self.user = user;
                    self.stats = stats;
                    self.profile_synced = true;
                }
                Err(e) => warn!("ignoring unreadable profile for {}: {e}", self.user.id),
            },
            Ok(None) => {
                info!(user_id = %self.user.id, "first login, creating profile");
                self.stats = UserStats::fresh(today, &mut self.rng);
                self.profile_synced = true;
                if let Err(e) = self.gateway.upsert_profile(self.profile_record()).await {
                    warn!("failed to create profile: {e}");
                    failure = Some(ActionError::new(Action::Load, e));
                }
            }
            Err(e) => warn!("failed to load profile, using defaults: {e}"),
        }

        match self.gateway.load_tasks(&self.user.id).await {
            Ok(records) => {
                self.tasks = records
                    .into_iter()
                    .filter_map(|record| match record.into_task() {
                        Ok(task) => Some(task),
                        Err(e) => {
                            warn!("skipping task: {e}");
                            None
                        }
                    })
                    .collect();
            }
            Err(e) => warn!("failed to load tasks, starting empty: {e}"),
        }

        debug!(
            tasks = self.tasks.len(),
            completed_today = self.stats.completed_today,
            profile_synced = self.profile_synced,
            "loaded"
        );
        failure.map_or(Ok(()), Err)
    }

    // ── Actions ──────────────────────────────────────────────────────

    /// Add a task. Blank titles are ignored (`Ok(None)`).
    pub async fn add_task(&mut self, new: NewTask, now: i64) -> Result<Option<Task>, ActionError> {
        let task = match new {
            NewTask::Manual { title, daily } => Task::manual(&title, daily, now),
            NewTask::Timed { title, minutes } => Task::timed(&title, minutes, now),
            NewTask::Boost => Some(Task::boosted(
                self.generator.generate_single_suggestion().await,
                now,
            )),
        };
        let Some(task) = task else {
            debug!("ignoring task with blank title");
            return Ok(None);
        };

        let pending_id = task.id.clone();
        self.tasks.insert(0, task.clone());

        match self
            .gateway
            .insert_task(TaskRecord::from_task(&task, &self.user.id))
            .await
        {
            Ok(saved) => {
                let task = Task {
                    id: saved.id,
                    ..task
                };
                if let Some(local) = self.tasks.iter_mut().find(|t| t.id == pending_id) {
                    local.id = task.id.clone();
                }
                info!(id = %task.id, title = %task.title, "task added");
                Ok(Some(task))
            }
            Err(e) => {
                self.tasks.retain(|t| t.id != pending_id);
                Err(ActionError::new(Action::AddTask, e))
            }
        }
    }

    /// Flip a task between pending and completed.
    ///
    /// Returns the new status, or `None` when the id is unknown or the task is
    /// still locked.
    pub async fn toggle_complete(
        &mut self,
        id: &str,
        now: i64,
    ) -> Result<Option<TaskStatus>, ActionError> {
        let Some(idx) = self.tasks.iter().position(|t| t.id == id) else {
            debug!(id, "toggle: unknown task");
            return Ok(None);
        };
        if self.policy.is_locked_with_grace(&self.tasks[idx], now) {
            debug!(id, "toggle: task is locked");
            return Ok(None);
        }

        let previous_status = self.tasks[idx].status;
        let previous_stats = self.stats.clone();

        let status = if previous_status == TaskStatus::Completed {
            self.stats.record_reopen();
            TaskStatus::Pending
        } else {
            self.stats.record_completion();
            TaskStatus::Completed
        };
        self.tasks[idx].status = status;

        if let Err(e) = self.persist_toggle(id, status, previous_status).await {
            if let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) {
                task.status = previous_status;
            }
            self.stats = previous_stats;
            return Err(ActionError::new(Action::ToggleTask, e));
        }

        debug!(id, status = status.as_str(), "toggled");
        Ok(Some(status))
    }

    async fn persist_toggle(
        &self,
        id: &str,
        status: TaskStatus,
        previous: TaskStatus,
    ) -> Result<(), GatewayError> {
        self.gateway.update_task(id, TaskPatch::status(status)).await?;
        if let Err(e) = self.save_profile().await {
            if let Err(undo) = self.gateway.update_task(id, TaskPatch::status(previous)).await {
                warn!(id, "could not revert task status: {undo}");
            }
            return Err(e);
        }
        Ok(())
    }

    /// Remove a task. Returns `false` when it was already gone.
    pub async fn delete_task(&mut self, id: &str) -> Result<bool, ActionError> {
        let Some(idx) = self.tasks.iter().position(|t| t.id == id) else {
            return Ok(false);
        };
        let task = self.tasks.remove(idx);

        if let Err(e) = self.gateway.delete_task(id).await {
            self.tasks.insert(idx.min(self.tasks.len()), task);
            return Err(ActionError::new(Action::DeleteTask, e));
        }
        info!(id, "task deleted");
        Ok(true)
    }

    /// Start a new 12-hour routine cycle.
    ///
    /// Returns the number of routine tasks created, or `None` while the cycle
    /// is cooling down. All existing routine tasks are replaced regardless of
    /// their status.
    pub async fn start_routine_cycle(&mut self, now: i64) -> Result<Option<usize>, ActionError> {
        if self.policy.is_cycle_locked(&self.stats, now) {
            debug!(
                left_ms = self.policy.cycle_time_left(&self.stats, now),
                "cycle is locked"
            );
            return Ok(None);
        }

        let items = self
            .generator
            .generate_routine_batch(self.routine.batch_size)
            .await;
        let batch = Task::routine_batch(
            items,
            now,
            spaced_slots(self.routine.slot_minutes),
            &self.policy.day,
        );

        let previous_tasks = self.tasks.clone();
        let previous_stats = self.stats.clone();
        let stale: Vec<String> = self
            .tasks
            .iter()
            .filter(|t| t.is_routine())
            .map(|t| t.id.clone())
            .collect();

        self.tasks.retain(|t| !t.is_routine());
        self.tasks.extend(batch.iter().cloned());
        self.stats.last_cycle_timestamp = now;

        let mut writes = CycleWrites::default();
        if let Err(e) = self.persist_cycle(&batch, &stale, &mut writes).await {
            warn!("routine cycle failed: {e}");
            if writes.deleted.is_empty() {
                let mut kept = Vec::new();
                for (idx, id) in std::mem::take(&mut writes.inserted) {
                    if let Err(undo) = self.gateway.delete_task(&id).await {
                        warn!(id = %id, "could not remove routine task after failed cycle: {undo}");
                        kept.push((idx, id));
                    }
                }
                writes.inserted = kept;
            }

            // Mirror the store: the profile is written last, so the cycle
            // stamp never advanced there.
            self.tasks = previous_tasks;
            self.tasks.retain(|t| !writes.deleted.contains(&t.id));
            self.tasks.extend(writes.inserted.iter().map(|(idx, id)| Task {
                id: id.clone(),
                ..batch[*idx].clone()
            }));
            self.stats = previous_stats;
            return Err(ActionError::new(Action::StartCycle, e));
        }

        for (idx, id) in writes.inserted {
            if let Some(local) = self.tasks.iter_mut().find(|t| t.id == batch[idx].id) {
                local.id = id;
            }
        }
        info!(count = batch.len(), replaced = stale.len(), "routine cycle started");
        Ok(Some(batch.len()))
    }

    /// Insert the new batch, drop the stale routine tasks, then stamp the
    /// profile. Every write that succeeds is recorded in `writes`.
    async fn persist_cycle(
        &self,
        batch: &[Task],
        stale: &[String],
        writes: &mut CycleWrites,
    ) -> Result<(), GatewayError> {
        for (idx, task) in batch.iter().enumerate() {
            let saved = self
                .gateway
                .insert_task(TaskRecord::from_task(task, &self.user.id))
                .await?;
            writes.inserted.push((idx, saved.id));
        }
        for id in stale {
            self.gateway.delete_task(id).await?;
            writes.deleted.push(id.clone());
        }
        self.save_profile().await
    }

    /// Record the onboarding answers.
    ///
    /// Returns `false` without touching anything when the answers are
    /// invalid (see [`User::onboarding_answers`]).
    pub async fn complete_onboarding(
        &mut self,
        name: &str,
        categories: &[String],
    ) -> Result<bool, ActionError> {
        let Some((name, categories)) = User::onboarding_answers(name, categories) else {
            debug!("onboarding: invalid answers");
            return Ok(false);
        };
        if !self.profile_synced {
            return Err(ActionError::new(
                Action::Onboard,
                "profile has not been loaded from the store",
            ));
        }

        let previous = self.user.clone();
        self.user.name = Some(name);
        self.user.tags = categories;
        self.user.has_onboarded = true;

        if let Err(e) = self.save_profile().await {
            self.user = previous;
            return Err(ActionError::new(Action::Onboard, e));
        }
        info!(user_id = %self.user.id, "onboarding complete");
        Ok(true)
    }

    // ── Clock ────────────────────────────────────────────────────────

    /// Advance time-driven state and return the derived view.
    ///
    /// Performs the daily rollover when the day has changed since
    /// `current_day_timestamp`. The rollover result is kept locally even if
    /// persisting it fails; the failure is reported in the view.
    pub async fn run_clock_tick(&mut self, now: i64) -> TickView {
        let mut sync_error = None;
        let mut rolled_over = false;

        if self.stats.current_day_timestamp == 0 {
            self.stats.current_day_timestamp = self.policy.day.midnight(now);
            if let Err(e) = self.save_profile().await {
                sync_error = Some(ActionError::new(Action::Rollover, e));
            }
        } else if self.policy.is_rollover_due(&self.stats, now) {
            let tasks = std::mem::take(&mut self.tasks);
            let rollover = self
                .policy
                .apply_rollover(tasks, &self.stats, now, &mut self.rng);
            self.tasks = rollover.tasks;
            self.stats = rollover.stats;
            rolled_over = true;
            info!(
                purged = rollover.purged.len(),
                reset = rollover.reset.len(),
                streak = self.stats.streak,
                "daily rollover"
            );

            if let Err(e) = self.persist_rollover(&rollover.purged, &rollover.reset).await {
                warn!("failed to persist rollover: {e}");
                sync_error = Some(ActionError::new(Action::Rollover, e));
            }
        }

        let mut view = self.view(now);
        view.rolled_over = rolled_over;
        view.sync_error = sync_error;
        view
    }

    async fn persist_rollover(&self, purged: &[String], reset: &[String]) -> Result<(), GatewayError> {
        for id in purged {
            self.gateway.delete_task(id).await?;
        }
        for id in reset {
            self.gateway
                .update_task(id, TaskPatch::status(TaskStatus::Pending))
                .await?;
        }
        self.save_profile().await
    }

    /// Write the profile, unless it was never read from the store.
    async fn save_profile(&self) -> Result<(), GatewayError> {
        if !self.profile_synced {
            debug!(user_id = %self.user.id, "profile not loaded, keeping stats local");
            return Ok(());
        }
        self.gateway.upsert_profile(self.profile_record()).await
    }

    fn profile_record(&self) -> ProfileRecord {
        ProfileRecord::from_parts(&self.user, &self.stats)
    }
}
