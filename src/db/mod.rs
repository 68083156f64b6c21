pub mod migrations;
pub mod schema;

use anyhow::{Context, Result};
use rusqlite::Connection;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Open (or create) the goalpost database at the given path with schema
/// initialized and migrations applied.
pub fn open_database(path: impl AsRef<Path>) -> Result<Connection> {
    let path = path.as_ref();

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }

    let mut conn = Connection::open(path)
        .with_context(|| format!("failed to open database at {}", path.display()))?;

    // Enable WAL mode for better concurrent read performance
    conn.pragma_update(None, "journal_mode", "WAL")?;
    // Enable foreign keys
    conn.pragma_update(None, "foreign_keys", "ON")?;

    schema::init_schema(&conn).context("failed to initialize schema")?;
    migrations::run_migrations(&mut conn).context("failed to run migrations")?;

    tracing::info!(path = %path.display(), "database initialized");
    Ok(conn)
}

/// Open an in-memory database with schema and migrations applied.
pub fn open_memory_database() -> Result<Connection> {
    let mut conn = Connection::open_in_memory().context("failed to open in-memory database")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    schema::init_schema(&conn).context("failed to initialize schema")?;
    migrations::run_migrations(&mut conn).context("failed to run migrations")?;
    Ok(conn)
}

/// SQLite's `data_version` counter. Changes whenever another connection
/// commits to the database file.
pub fn data_version(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row("PRAGMA data_version", [], |row| row.get(0))
}

/// Result of [`check_database_health`].
#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub schema_version: u32,
    pub integrity_ok: bool,
    pub integrity_details: String,
    pub goal_count: u64,
    pub task_count: u64,
    pub category_count: u64,
    pub log_count: u64,
    /// Tasks whose `goal_id` names a goal that does not exist.
    pub dangling_tasks: u64,
    /// Goals whose `parent_goal_id` names a goal that does not exist.
    pub dangling_parents: u64,
    /// Goals that are their own ancestor.
    pub cyclic_goals: Vec<String>,
}

/// Run integrity and referential checks.
pub fn check_database_health(conn: &Connection) -> Result<HealthReport> {
    let schema_version = migrations::get_schema_version(conn)?;

    let integrity_details: String =
        conn.query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
    let integrity_ok = integrity_details == "ok";

    let count = |sql: &str| -> Result<u64> {
        let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
        Ok(n.max(0) as u64)
    };

    let goal_count = count("SELECT COUNT(*) FROM goals")?;
    let task_count = count("SELECT COUNT(*) FROM tasks")?;
    let category_count = count("SELECT COUNT(*) FROM categories")?;
    let log_count = count("SELECT COUNT(*) FROM activity_log")?;
    let dangling_tasks = count(
        "SELECT COUNT(*) FROM tasks t \
         WHERE t.goal_id IS NOT NULL AND NOT EXISTS (SELECT 1 FROM goals g WHERE g.id = t.goal_id)",
    )?;
    let dangling_parents = count(
        "SELECT COUNT(*) FROM goals c \
         WHERE c.parent_goal_id IS NOT NULL \
           AND NOT EXISTS (SELECT 1 FROM goals p WHERE p.id = c.parent_goal_id)",
    )?;

    let mut stmt = conn.prepare("SELECT id, parent_goal_id FROM goals")?;
    let parents: HashMap<String, Option<String>> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<_, _>>()?;
    let cyclic_goals = find_cyclic_goals(&parents);

    Ok(HealthReport {
        schema_version,
        integrity_ok,
        integrity_details,
        goal_count,
        task_count,
        category_count,
        log_count,
        dangling_tasks,
        dangling_parents,
        cyclic_goals,
    })
}

/// Goals whose parent chain leads back to themselves, sorted by id.
fn find_cyclic_goals(parents: &HashMap<String, Option<String>>) -> Vec<String> {
    let mut finished: HashSet<&str> = HashSet::new();
    let mut cyclic: Vec<String> = Vec::new();

    for start in parents.keys() {
        let mut walk: Vec<&str> = Vec::new();
        let mut position: HashMap<&str, usize> = HashMap::new();
        let mut current = Some(start.as_str());

        while let Some(id) = current {
            if finished.contains(id) {
                break;
            }
            if let Some(&at) = position.get(id) {
                cyclic.extend(walk[at..].iter().map(|id| id.to_string()));
                break;
            }
            position.insert(id, walk.len());
            walk.push(id);
            current = parents.get(id).and_then(|p| p.as_deref());
        }
        finished.extend(walk);
    }

    cyclic.sort();
    cyclic
}
