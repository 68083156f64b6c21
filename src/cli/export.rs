use anyhow::Result;

use goalpost::config::GoalpostConfig;
use goalpost::goals::transfer::export_data;

/// Export all categories, goals, and tasks as JSON to stdout.
pub fn export(config: &GoalpostConfig) -> Result<()> {
    let db_path = config.resolved_db_path();
    let conn = goalpost::db::open_database(&db_path)?;

    let data = export_data(&conn)?;

    let json = serde_json::to_string_pretty(&data)?;
    println!("{json}");

    eprintln!(
        "Exported {} categories, {} goals, and {} tasks.",
        data.categories.len(),
        data.goals.len(),
        data.tasks.len()
    );

    Ok(())
}
