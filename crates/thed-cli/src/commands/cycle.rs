//! 12-hour routine flow commands.

use clap::Subcommand;
use thed_core::{format_time_left, now_ms};

use super::{open_session, CmdResult};

#[derive(Subcommand)]
pub enum CycleAction {
    /// Generate a new routine batch
    Start,
    /// Show cooldown and routine progress
    Status,
}

pub async fn run(action: CycleAction) -> CmdResult {
    let session = open_session().await?;
    let controller = session.controller();
    let mut c = controller.lock().await;
    let now = now_ms();

    match action {
        CycleAction::Start => match c.start_routine_cycle(now).await? {
            Some(count) => println!("Routine cycle started: {count} tasks"),
            None => println!(
                "Cycle locked: {} left",
                format_time_left(c.policy().cycle_time_left(c.stats(), now))
            ),
        },
        CycleAction::Status => {
            let view = c.view(now);
            let routine: Vec<_> = view.tasks.iter().filter(|t| t.task.is_routine()).collect();
            let done = routine.iter().filter(|t| t.task.is_completed()).count();
            if view.cycle_locked {
                println!("Next cycle in {}", format_time_left(view.cycle_time_left_ms));
            } else {
                println!("Ready for a new cycle");
            }
            println!("Routine: {done}/{} completed", routine.len());
            for task in routine.iter().filter(|t| t.visible) {
                println!("{}", super::task::render(task));
            }
        }
    }
    Ok(())
}
