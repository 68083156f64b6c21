//! CLI `doctor` command — run database diagnostics and print a health report.

use anyhow::{Context, Result};

use goalpost::config::GoalpostConfig;
use goalpost::db;

/// Run database diagnostics and print a health report.
pub fn doctor(config: &GoalpostConfig) -> Result<()> {
    let db_path = config.resolved_db_path();

    if !db_path.exists() {
        println!("Database: not found at {}", db_path.display());
        println!("Run `goalpost goal add <name>` to create it.");
        return Ok(());
    }

    let file_size = std::fs::metadata(&db_path)
        .map(|m| m.len())
        .unwrap_or(0);

    let conn = db::open_database(&db_path)
        .context("failed to open database (may be corrupt)")?;

    let report = db::check_database_health(&conn)
        .context("failed to run health check")?;

    println!("Goalpost Health Report");
    println!("======================");
    println!();
    println!("Database:          {}", db_path.display());
    println!("File size:         {}", format_bytes(file_size));
    println!("Schema version:    {}", report.schema_version);
    println!();
    println!("Row counts:");
    println!("  Goals:           {}", report.goal_count);
    println!("  Tasks:           {}", report.task_count);
    println!("  Categories:      {}", report.category_count);
    println!("  Activity log:    {}", report.log_count);
    println!();
    if report.integrity_ok {
        println!("Integrity check:   PASSED");
    } else {
        println!("Integrity check:   FAILED ({})", report.integrity_details);
    }

    let mut problems = 0;
    if report.dangling_tasks > 0 {
        problems += 1;
        println!("WARNING: {} task(s) point at missing goals", report.dangling_tasks);
    }
    if report.dangling_parents > 0 {
        problems += 1;
        println!("WARNING: {} goal(s) point at missing parents", report.dangling_parents);
    }
    if !report.cyclic_goals.is_empty() {
        problems += 1;
        println!("WARNING: goals on a parent cycle: {}", report.cyclic_goals.join(", "));
        println!("  Fix with `goalpost goal move <id>` to detach one of them.");
    }
    if problems == 0 {
        println!("Goal tree:         OK");
    }

    if !report.integrity_ok {
        println!();
        println!("Recovery steps:");
        println!("  1. Restore from a backup: cp backup.db ~/.goalpost/goalpost.db");
        println!("  2. Or export from a good copy and reimport:");
        println!("     goalpost export > backup.json");
        println!("     goalpost reset && goalpost import backup.json");
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
