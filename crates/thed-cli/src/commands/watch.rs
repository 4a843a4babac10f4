//! Live view driven by the session clock.

use std::time::Duration;

use thed_core::clock::spawn_clock_with;
use thed_core::{format_time_left, Config, TickView};

use super::{open_session, CmdResult};

pub async fn run(seconds: Option<u64>) -> CmdResult {
    let config = Config::load()?;
    let session = open_session().await?;

    let mut last = String::new();
    let clock = spawn_clock_with(
        session.controller(),
        Duration::from_millis(config.clock.tick_ms.max(1)),
        move |view| {
            let frame = frame(&view);
            if frame != last {
                println!("{frame}");
                last = frame;
            }
            if let Some(e) = view.sync_error {
                eprintln!("error: {e}");
            }
        },
    );

    match seconds {
        Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
        None => std::future::pending::<()>().await,
    }

    clock.stop();
    session.close();
    Ok(())
}

/// Text rendering of a tick. Countdowns are shown at minute resolution so a
/// frame only repeats when something visible changed.
fn frame(view: &TickView) -> String {
    let mut out = format!(
        "-- stars {}/3  streak {}  cycle {}",
        view.stars,
        view.stats.streak,
        if view.cycle_locked {
            format_time_left(view.cycle_time_left_ms)
        } else {
            "ready".to_string()
        }
    );
    if view.cycle_locked {
        // drop seconds
        out.truncate(out.len() - 3);
    }
    for task in view.visible() {
        let mut line = super::task::render(&thed_core::TaskView {
            countdown_ms: task.countdown_ms.map(|ms| ms - ms % 60_000),
            ..task.clone()
        });
        if task.countdown_ms == Some(0) {
            line.push_str("  done");
        }
        out.push('\n');
        out.push_str(&line);
    }
    out
}
