use anyhow::Result;
use chrono::Utc;

use goalpost::config::GoalpostConfig;
use goalpost::goals::stats::goal_stats;
use goalpost::goals::store::recent_activity;
use goalpost::goals::TaskStatus;

const RECENT_ACTIVITY: usize = 5;

/// Display goal and task statistics in the terminal.
pub fn stats(config: &GoalpostConfig) -> Result<()> {
    let db_path = config.resolved_db_path();
    let conn = goalpost::db::open_database(&db_path)?;

    let response = goal_stats(&conn, Utc::now())?;

    println!("Goal Statistics");
    println!("{}", "=".repeat(40));
    println!("  Total goals:         {}", response.total_goals);
    println!("  Active:              {}", response.active_goals);
    println!("  Archived:            {}", response.archived_goals);
    println!("  Completed:           {}", response.completed_goals);
    println!("  Sub-goals:           {}", response.sub_goals);
    if let Some(avg) = response.average_progress {
        println!("  Average progress:    {avg:.1}%");
    }
    println!();

    println!("Tasks:                 {}", response.total_tasks);
    for status in TaskStatus::ALL {
        let count = response
            .tasks_by_status
            .get(status.as_str())
            .copied()
            .unwrap_or(0);
        println!("  {:<12} {}", status.as_str(), count);
    }
    println!("  Overdue:             {}", response.overdue_tasks);
    println!("  Without a goal:      {}", response.orphan_tasks);
    println!();

    println!("Categories:            {}", response.categories);

    let activity = recent_activity(&conn, RECENT_ACTIVITY)?;
    if !activity.is_empty() {
        println!();
        println!("Recent activity:");
        for entry in activity {
            println!(
                "  {}  {:<7} {:<8} {}",
                entry.created_at.format("%Y-%m-%d %H:%M"),
                entry.operation,
                entry.entity,
                entry.entity_id
            );
        }
    }

    Ok(())
}
