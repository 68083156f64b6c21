use anyhow::{Context, Result};
use chrono::Utc;
use std::path::Path;

use goalpost::config::GoalpostConfig;
use goalpost::goals::store::refresh_progress;
use goalpost::goals::transfer::{import_data, ExportData};

/// Import categories, goals, and tasks from a JSON export.
///
/// Skips rows whose id already exists, then recomputes stored progress.
pub fn import(config: &GoalpostConfig, file: &Path) -> Result<()> {
    let json = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read import file: {}", file.display()))?;

    let data: ExportData =
        serde_json::from_str(&json).context("failed to parse import JSON")?;

    let db_path = config.resolved_db_path();
    let mut conn = goalpost::db::open_database(&db_path)?;

    println!(
        "Importing {} categories, {} goals, and {} tasks...",
        data.categories.len(),
        data.goals.len(),
        data.tasks.len()
    );

    let summary = import_data(&mut conn, &data)?;
    let refreshed = refresh_progress(&mut conn, Utc::now())?;

    println!("Import complete:");
    println!("  Categories imported: {}", summary.categories_imported);
    println!("  Goals imported:      {}", summary.goals_imported);
    println!("  Tasks imported:      {}", summary.tasks_imported);
    println!("  Skipped:             {} (already exist)", summary.skipped);
    if summary.detached > 0 {
        println!("  Detached references: {}", summary.detached);
    }
    if refreshed.updated > 0 {
        println!("  Progress corrected:  {} goal(s)", refreshed.updated);
    }

    Ok(())
}
