//! CLI `reset` command — delete all goals, tasks, and categories after user
//! confirmation.

use anyhow::{bail, Result};
use std::io::Write;

use goalpost::config::GoalpostConfig;

pub fn reset(config: &GoalpostConfig) -> Result<()> {
    let db_path = config.resolved_db_path();

    println!("WARNING: This will permanently delete ALL goals, tasks, categories, and activity.");
    println!("Database: {}", db_path.display());
    print!("\nType YES to confirm: ");
    std::io::stdout().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;

    if input.trim() != "YES" {
        bail!("reset cancelled");
    }

    let conn = goalpost::db::open_database(&db_path)?;

    // Tasks before goals before categories, for the foreign keys
    conn.execute_batch(
        "DELETE FROM tasks;
         DELETE FROM goals;
         DELETE FROM categories;
         DELETE FROM activity_log;",
    )?;

    tracing::warn!(db = %db_path.display(), "database reset");
    println!("All goals deleted. Database reset complete.");
    Ok(())
}
