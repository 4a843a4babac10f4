//! Periodic clock driving [`LifecycleController::run_clock_tick`].
//!
//! The controller is shared behind a tokio mutex so ticks and user actions
//! are applied one at a time.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::lifecycle::{LifecycleController, TickView};
use crate::policy::now_ms;

pub type SharedController = Arc<Mutex<LifecycleController>>;

/// Running clock task. Stops when [`stop`](Self::stop) is called or the
/// handle is dropped.
pub struct ClockHandle {
    task: JoinHandle<()>,
}

impl ClockHandle {
    pub fn stop(self) {
        self.task.abort();
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for ClockHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Tick the controller every `period`.
pub fn spawn_clock(controller: SharedController, period: Duration) -> ClockHandle {
    spawn_clock_with(controller, period, |_| {})
}

/// Like [`spawn_clock`], handing each tick's view to `on_tick`.
pub fn spawn_clock_with<F>(controller: SharedController, period: Duration, mut on_tick: F) -> ClockHandle
where
    F: FnMut(TickView) + Send + 'static,
{
    let task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            let view = controller.lock().await.run_clock_tick(now_ms()).await;
            if view.rolled_over {
                debug!(streak = view.stats.streak, "clock: rolled over");
            }
            if let Some(e) = &view.sync_error {
                warn!("clock: {e}");
            }
            on_tick(view);
        }
    });
    ClockHandle { task }
}
