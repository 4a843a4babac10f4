//! Task management commands for CLI.

use clap::Subcommand;
use thed_core::{format_time_left, now_ms, LifecycleController, NewTask, TaskStatus, TaskView};

use super::{open_session, CmdResult};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Add a task
    Add {
        /// Task title
        title: String,
        /// Keep the task every day
        #[arg(long, conflicts_with = "timer")]
        daily: bool,
        /// Start a countdown of this many minutes
        #[arg(long, value_name = "MINUTES")]
        timer: Option<u32>,
    },
    /// List tasks in queue order
    List {
        #[arg(long)]
        json: bool,
        /// Include routine tasks outside the visible window
        #[arg(long)]
        all: bool,
    },
    /// Complete or reopen a task
    Toggle {
        /// Task ID (or a unique prefix)
        id: String,
    },
    /// Delete a task
    Delete {
        /// Task ID (or a unique prefix)
        id: String,
    },
}

pub async fn run(action: TaskAction) -> CmdResult {
    let session = open_session().await?;
    let controller = session.controller();
    let mut c = controller.lock().await;
    let now = now_ms();

    match action {
        TaskAction::Add {
            title,
            daily,
            timer,
        } => {
            let new = match timer {
                Some(minutes) => NewTask::Timed { title, minutes },
                None => NewTask::Manual { title, daily },
            };
            match c.add_task(new, now).await? {
                Some(task) => println!("Task added: {} ({})", task.title, task.id),
                None => return Err("task title must not be empty".into()),
            }
        }
        TaskAction::List { json, all } => {
            let view = c.view(now);
            let tasks: Vec<&TaskView> = view.tasks.iter().filter(|t| all || t.visible).collect();
            if json {
                println!("{}", serde_json::to_string_pretty(&tasks)?);
            } else if tasks.is_empty() {
                println!("No tasks");
            } else {
                for task in tasks {
                    println!("{}", render(task));
                }
            }
        }
        TaskAction::Toggle { id } => {
            let id = resolve_id(&c, &id)?;
            match c.toggle_complete(&id, now).await? {
                Some(TaskStatus::Completed) => println!("Completed: {id}"),
                Some(_) => println!("Reopened: {id}"),
                None => println!("Task is locked until its slot: {id}"),
            }
        }
        TaskAction::Delete { id } => {
            let id = resolve_id(&c, &id)?;
            c.delete_task(&id).await?;
            println!("Deleted: {id}");
        }
    }
    Ok(())
}

pub async fn boost() -> CmdResult {
    let session = open_session().await?;
    let controller = session.controller();
    let mut c = controller.lock().await;
    if let Some(task) = c.add_task(NewTask::Boost, now_ms()).await? {
        println!("Boost: {} - {} ({})", task.title, task.description, task.id);
    }
    Ok(())
}

/// Match a full id or a unique prefix.
fn resolve_id(c: &LifecycleController, prefix: &str) -> Result<String, String> {
    let matches: Vec<&str> = c
        .tasks()
        .iter()
        .map(|t| t.id.as_str())
        .filter(|id| id.starts_with(prefix))
        .collect();
    match matches.as_slice() {
        [id] => Ok(id.to_string()),
        [] => Err(format!("no task with id '{prefix}'")),
        _ if matches.contains(&prefix) => Ok(prefix.to_string()),
        _ => Err(format!("ambiguous id '{prefix}' ({} matches)", matches.len())),
    }
}

pub(crate) fn render(view: &TaskView) -> String {
    let task = &view.task;
    let mark = if task.is_completed() {
        "[x]"
    } else if view.expired {
        "[!]"
    } else if view.locked {
        "[-]"
    } else {
        "[ ]"
    };
    let short_id: String = task.id.chars().take(8).collect();
    let mut line = format!("{mark} {short_id}  {:>5}  {}", task.time_slot, task.title);
    if task.is_daily() {
        line.push_str("  (daily)");
    }
    if let Some(left) = view.countdown_ms {
        line.push_str(&format!("  {}", format_time_left(left)));
    }
    line
}
