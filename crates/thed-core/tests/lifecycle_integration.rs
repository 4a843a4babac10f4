//! End-to-end controller scenarios against the SQLite gateway, including a
//! gateway that starts rejecting reads, writes or deletes mid-session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use thed_core::policy::{DAY_MS, HOUR_MS};
use thed_core::{
    Action, Config, FallbackGenerator, GatewayError, LifecycleController, LocalStore, NewTask,
    ProfileRecord, Session, SessionInfo, SyncGateway, Task, TaskPatch, TaskRecord, TaskStatus,
    Thresholds, User, UserStats,
};

const DAY: i64 = 20_000 * DAY_MS;

/// Wraps the local store; each class of operation can be made to fail.
struct FlakyGateway {
    inner: LocalStore,
    reads_fail: AtomicBool,
    writes_fail: AtomicBool,
    deletes_fail: AtomicBool,
    profile_writes_fail: AtomicBool,
}

impl FlakyGateway {
    fn new() -> Self {
        Self {
            inner: LocalStore::open_memory().unwrap(),
            reads_fail: AtomicBool::new(false),
            writes_fail: AtomicBool::new(false),
            deletes_fail: AtomicBool::new(false),
            profile_writes_fail: AtomicBool::new(false),
        }
    }

    fn set_offline(&self, offline: bool) {
        for flag in [&self.reads_fail, &self.writes_fail, &self.deletes_fail] {
            flag.store(offline, Ordering::SeqCst);
        }
    }

    fn check(flag: &AtomicBool) -> Result<(), GatewayError> {
        if flag.load(Ordering::SeqCst) {
            Err(GatewayError::Store("connection refused".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SyncGateway for FlakyGateway {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn get_session(&self) -> Result<Option<SessionInfo>, GatewayError> {
        self.inner.get_session().await
    }

    async fn load_profile(&self, user_id: &str) -> Result<Option<ProfileRecord>, GatewayError> {
        Self::check(&self.reads_fail)?;
        self.inner.load_profile(user_id).await
    }

    async fn load_tasks(&self, user_id: &str) -> Result<Vec<TaskRecord>, GatewayError> {
        Self::check(&self.reads_fail)?;
        self.inner.load_tasks(user_id).await
    }

    async fn insert_task(&self, record: TaskRecord) -> Result<TaskRecord, GatewayError> {
        Self::check(&self.writes_fail)?;
        self.inner.insert_task(record).await
    }

    async fn update_task(&self, id: &str, patch: TaskPatch) -> Result<(), GatewayError> {
        Self::check(&self.writes_fail)?;
        self.inner.update_task(id, patch).await
    }

    async fn delete_task(&self, id: &str) -> Result<(), GatewayError> {
        Self::check(&self.deletes_fail)?;
        self.inner.delete_task(id).await
    }

    async fn upsert_profile(&self, record: ProfileRecord) -> Result<(), GatewayError> {
        Self::check(&self.writes_fail)?;
        Self::check(&self.profile_writes_fail)?;
        self.inner.upsert_profile(record).await
    }
}

fn config() -> Config {
    let mut config = Config::default();
    config.clock.utc_offset_minutes = Some(0);
    config
}

async fn setup() -> (Arc<FlakyGateway>, LifecycleController) {
    let gateway = Arc::new(FlakyGateway::new());
    let mut controller = LifecycleController::new(
        gateway.clone(),
        Arc::new(FallbackGenerator),
        &config(),
        User::new("u-1", "a@b.c"),
    )
    .with_seed(42);
    controller.load(DAY).await.unwrap();
    (gateway, controller)
}

fn new_controller(gateway: Arc<FlakyGateway>) -> LifecycleController {
    LifecycleController::new(
        gateway,
        Arc::new(FallbackGenerator),
        &config(),
        User::new("u-1", "a@b.c"),
    )
    .with_seed(7)
}

fn routine_ids(ids: impl Iterator<Item = (bool, String)>) -> Vec<String> {
    let mut ids: Vec<String> = ids.filter(|(routine, _)| *routine).map(|(_, id)| id).collect();
    ids.sort();
    ids
}

fn manual(title: &str, daily: bool) -> NewTask {
    NewTask::Manual {
        title: title.into(),
        daily,
    }
}

#[tokio::test]
async fn failed_add_removes_optimistic_entry() {
    let (gateway, mut c) = setup().await;
    gateway.set_offline(true);

    let err = c.add_task(manual("Walk", false), DAY).await.unwrap_err();
    assert_eq!(err.action, Action::AddTask);
    assert!(err.to_string().contains("connection refused"));
    assert!(c.tasks().is_empty());
}

#[tokio::test]
async fn failed_toggle_restores_status_and_stats() {
    let (gateway, mut c) = setup().await;
    let id = c.add_task(manual("Walk", false), DAY).await.unwrap().unwrap().id;
    let before = c.stats().clone();

    gateway.set_offline(true);
    let err = c.toggle_complete(&id, DAY).await.unwrap_err();
    assert_eq!(err.action, Action::ToggleTask);
    assert_eq!(c.find(&id).unwrap().status, TaskStatus::Pending);
    assert_eq!(c.stats(), &before);
}

#[tokio::test]
async fn failed_delete_reinserts_at_same_position() {
    let (gateway, mut c) = setup().await;
    c.add_task(manual("A", false), DAY).await.unwrap();
    c.add_task(manual("B", false), DAY).await.unwrap();
    c.add_task(manual("C", false), DAY).await.unwrap();
    let order: Vec<String> = c.tasks().iter().map(|t| t.id.clone()).collect();

    gateway.set_offline(true);
    assert!(c.delete_task(&order[1]).await.is_err());
    let after: Vec<String> = c.tasks().iter().map(|t| t.id.clone()).collect();
    assert_eq!(after, order);

    gateway.set_offline(false);
    assert!(c.delete_task(&order[1]).await.unwrap());
    assert!(!c.delete_task(&order[1]).await.unwrap());
}

#[tokio::test]
async fn failed_cycle_keeps_previous_routine_set() {
    let (gateway, mut c) = setup().await;
    let now = DAY + HOUR_MS;
    c.start_routine_cycle(now).await.unwrap();
    let before = c.tasks().to_vec();
    let stamp = c.stats().last_cycle_timestamp;

    gateway.set_offline(true);
    let later = now + 12 * HOUR_MS;
    let err = c.start_routine_cycle(later).await.unwrap_err();
    assert_eq!(err.action, Action::StartCycle);
    assert_eq!(c.tasks(), before.as_slice());
    assert_eq!(c.stats().last_cycle_timestamp, stamp);

    gateway.set_offline(false);
    assert_eq!(c.start_routine_cycle(later).await.unwrap(), Some(4));
}

#[tokio::test]
async fn cycle_with_failing_deletes_leaves_local_matching_store() {
    let (gateway, mut c) = setup().await;
    let now = DAY + HOUR_MS;
    c.start_routine_cycle(now).await.unwrap();
    let stamp = c.stats().last_cycle_timestamp;

    gateway.deletes_fail.store(true, Ordering::SeqCst);
    let err = c.start_routine_cycle(now + 12 * HOUR_MS).await.unwrap_err();
    assert_eq!(err.action, Action::StartCycle);

    let stored = gateway.inner.load_tasks("u-1").await.unwrap();
    let local = routine_ids(c.tasks().iter().map(|t| (t.is_routine(), t.id.clone())));
    let remote = routine_ids(stored.into_iter().map(|r| (r.is_routine, r.id)));
    assert_eq!(local, remote);
    assert_eq!(local.len(), 8);

    let profile = gateway.inner.load_profile("u-1").await.unwrap().unwrap();
    assert_eq!(c.stats().last_cycle_timestamp, stamp);
    assert_eq!(profile.last_cycle_timestamp, stamp);
}

#[tokio::test]
async fn cycle_with_failing_profile_write_keeps_new_batch() {
    let (gateway, mut c) = setup().await;
    let now = DAY + HOUR_MS;
    c.start_routine_cycle(now).await.unwrap();
    let old: Vec<String> = c.tasks().iter().map(|t| t.id.clone()).collect();

    gateway.profile_writes_fail.store(true, Ordering::SeqCst);
    assert!(c.start_routine_cycle(now + 12 * HOUR_MS).await.is_err());

    let stored = gateway.inner.load_tasks("u-1").await.unwrap();
    let local = routine_ids(c.tasks().iter().map(|t| (t.is_routine(), t.id.clone())));
    let remote = routine_ids(stored.into_iter().map(|r| (r.is_routine, r.id)));
    assert_eq!(local, remote);
    assert_eq!(local.len(), 4);
    assert!(local.iter().all(|id| !old.contains(id)));

    let profile = gateway.inner.load_profile("u-1").await.unwrap().unwrap();
    assert_eq!(c.stats().last_cycle_timestamp, now);
    assert_eq!(profile.last_cycle_timestamp, now);
}

#[tokio::test]
async fn rollover_is_kept_locally_when_persisting_fails() {
    let (gateway, mut c) = setup().await;
    let id = c.add_task(manual("Call", false), DAY).await.unwrap().unwrap().id;
    c.toggle_complete(&id, DAY).await.unwrap();

    gateway.set_offline(true);
    let view = c.run_clock_tick(DAY + DAY_MS).await;
    assert!(view.rolled_over);
    assert_eq!(view.sync_error.map(|e| e.action), Some(Action::Rollover));
    assert!(c.tasks().is_empty());
    assert_eq!(c.stats().streak, 1);

    // Level-triggered check does not fire again once the day has advanced.
    let view = c.run_clock_tick(DAY + DAY_MS + 1_000).await;
    assert!(!view.rolled_over);
}

#[tokio::test]
async fn unreachable_profile_is_never_overwritten() {
    let gateway = Arc::new(FlakyGateway::new());
    let stats = UserStats {
        streak: 9,
        total_stars: 40,
        completed_today: 0,
        current_day_timestamp: DAY - DAY_MS,
        last_cycle_timestamp: 0,
        thresholds: Thresholds::new([2, 3, 4]).unwrap(),
    };
    let seeded = ProfileRecord::from_parts(&User::new("u-1", "a@b.c"), &stats);
    gateway.inner.upsert_profile(seeded.clone()).await.unwrap();

    gateway.reads_fail.store(true, Ordering::SeqCst);
    let mut c = new_controller(gateway.clone());
    c.load(DAY).await.unwrap();
    assert!(!c.profile_synced());

    let view = c.run_clock_tick(DAY).await;
    assert!(view.sync_error.is_none());
    let id = c.add_task(manual("Walk", false), DAY).await.unwrap().unwrap().id;
    c.toggle_complete(&id, DAY).await.unwrap();
    c.start_routine_cycle(DAY).await.unwrap();
    c.run_clock_tick(DAY + DAY_MS).await;

    let stored = gateway.inner.load_profile("u-1").await.unwrap().unwrap();
    assert_eq!(stored, seeded);
}

#[tokio::test]
async fn first_login_with_failing_profile_write_still_loads_tasks() {
    let gateway = Arc::new(FlakyGateway::new());
    let walk = Task::manual("Walk", false, DAY).unwrap();
    gateway
        .inner
        .insert_task(TaskRecord::from_task(&walk, "u-1"))
        .await
        .unwrap();

    gateway.writes_fail.store(true, Ordering::SeqCst);
    let mut c = new_controller(gateway.clone());
    let err = c.load(DAY).await.unwrap_err();
    assert_eq!(err.action, Action::Load);
    assert_eq!(c.tasks().len(), 1);
    assert_eq!(c.stats().current_day_timestamp, DAY);
    assert!(c.profile_synced());

    gateway.writes_fail.store(false, Ordering::SeqCst);
    c.run_clock_tick(DAY + HOUR_MS).await;
    assert!(gateway.inner.load_profile("u-1").await.unwrap().is_none());
    let id = c.tasks()[0].id.clone();
    c.toggle_complete(&id, DAY + HOUR_MS).await.unwrap();
    assert!(gateway.inner.load_profile("u-1").await.unwrap().is_some());
}

#[tokio::test]
async fn session_opens_when_profile_cannot_be_created() {
    let gateway = Arc::new(FlakyGateway::new());
    gateway.inner.sign_in("ada@example.com").unwrap();
    gateway.writes_fail.store(true, Ordering::SeqCst);

    let session = Session::open(gateway.clone(), Arc::new(FallbackGenerator), &config())
        .await
        .unwrap();
    assert_eq!(session.load_error().map(|e| e.action), Some(Action::Load));
    let view = session.view().await;
    assert!(view.tasks.is_empty());
    session.close();
}

#[tokio::test]
async fn read_failure_on_load_leaves_defaults() {
    let gateway = Arc::new(FlakyGateway::new());
    gateway.set_offline(true);
    let mut c = LifecycleController::new(
        gateway,
        Arc::new(FallbackGenerator),
        &config(),
        User::new("u-1", "a@b.c"),
    );
    c.load(DAY).await.unwrap();
    assert!(c.tasks().is_empty());
    assert_eq!(c.stats().completed_today, 0);
}

/// Five tasks across all kinds, then a rollover.
#[tokio::test]
async fn five_task_rollover_scenario() {
    let (gateway, mut c) = setup().await;
    let now = DAY + HOUR_MS;

    let daily_done = c.add_task(manual("Meditate", true), now).await.unwrap().unwrap().id;
    let daily_open = c.add_task(manual("Journal", true), now).await.unwrap().unwrap().id;
    let once_done = c.add_task(manual("Pay rent", false), now).await.unwrap().unwrap().id;
    let once_open = c.add_task(manual("Call mom", false), now).await.unwrap().unwrap().id;
    c.start_routine_cycle(now).await.unwrap();
    let routine_done = c.tasks().iter().find(|t| t.is_routine()).unwrap().id.clone();

    for id in [&daily_done, &once_done] {
        c.toggle_complete(id, now).await.unwrap();
    }
    c.toggle_complete(&routine_done, now + 2 * HOUR_MS).await.unwrap();
    assert_eq!(c.stats().completed_today, 3);

    let view = c.run_clock_tick(DAY + DAY_MS + 1).await;
    assert!(view.rolled_over);

    let mut kept: Vec<String> = c.tasks().iter().map(|t| t.id.clone()).collect();
    kept.sort();
    let mut expected = vec![daily_done.clone(), daily_open, once_open];
    expected.sort();
    assert_eq!(kept, expected);
    assert!(c.tasks().iter().all(|t| t.status == TaskStatus::Pending));
    assert_eq!(c.stats().streak, 1);
    assert_eq!(c.stats().completed_today, 0);

    let stored = gateway.inner.load_tasks("u-1").await.unwrap();
    assert_eq!(stored.len(), 3);
    assert!(stored.iter().all(|r| r.status == "PENDING"));
    let profile = gateway.inner.load_profile("u-1").await.unwrap().unwrap();
    assert_eq!(profile.current_day_timestamp, DAY + DAY_MS);
}
