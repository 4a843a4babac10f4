//! Statistics command.

use super::{open_session, CmdResult};

pub async fn run(json: bool) -> CmdResult {
    let session = open_session().await?;
    let view = session.view().await;
    let stats = &view.stats;

    if json {
        let value = serde_json::json!({
            "streak": stats.streak,
            "total_stars": stats.total_stars,
            "completed_today": stats.completed_today,
            "stars": view.stars,
            "thresholds": stats.thresholds.values(),
            "current_day_timestamp": stats.current_day_timestamp,
            "last_cycle_timestamp": stats.last_cycle_timestamp,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let [one, two, three] = stats.thresholds.values();
    let stars: String = (0..3).map(|i| if i < view.stars { '*' } else { '.' }).collect();
    println!("Streak:          {} days", stats.streak);
    println!("Total stars:     {}", stats.total_stars);
    println!("Completed today: {}", stats.completed_today);
    println!("Today:           {stars}  (goals {one}/{two}/{three})");
    let day = chrono::DateTime::from_timestamp_millis(stats.current_day_timestamp)
        .map(|d| d.with_timezone(&chrono::Local).format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string());
    println!("Day:             {day}");
    Ok(())
}
