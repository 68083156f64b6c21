//! JSON export and import of the whole goal database.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use super::store;
use super::types::{Category, Goal, Task};

/// Export format. Import accepts the same shape.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ExportData {
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub goals: Vec<Goal>,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub categories_imported: u64,
    pub goals_imported: u64,
    pub tasks_imported: u64,
    /// Rows whose id already existed.
    pub skipped: u64,
    /// References to missing goals or categories that were cleared.
    pub detached: u64,
}

/// Read every category, goal, and task.
pub fn export_data(conn: &Connection) -> Result<ExportData> {
    Ok(ExportData {
        categories: store::list_categories(conn)?,
        goals: store::load_goals(conn)?,
        tasks: store::load_tasks(conn)?,
    })
}

/// Insert exported rows in one transaction.
///
/// Rows whose id already exists are skipped. Parents are inserted before
/// their sub-goals; a reference to a goal or category that exists neither in
/// the file nor in the database is cleared with a warning. Stored progress is
/// taken as-is, so callers should refresh afterwards.
pub fn import_data(conn: &mut Connection, data: &ExportData) -> Result<ImportSummary> {
    let tx = conn.transaction()?;
    let mut summary = ImportSummary::default();

    // Categories: names are unique, so a clash by name maps onto the
    // existing row instead.
    let mut category_ids: HashMap<&str, String> = HashMap::new();
    for category in &data.categories {
        if row_exists(&tx, "categories", &category.id)? {
            summary.skipped += 1;
            category_ids.insert(&category.id, category.id.clone());
            continue;
        }
        let by_name: Option<String> = tx
            .query_row(
                "SELECT id FROM categories WHERE name = ?1",
                params![category.name],
                |row| row.get(0),
            )
            .optional()?;
        match by_name {
            Some(existing) => {
                tracing::warn!(id = %category.id, name = %category.name, "category name exists; merging");
                summary.skipped += 1;
                category_ids.insert(&category.id, existing);
            }
            None => {
                store::insert_category(&tx, category)?;
                summary.categories_imported += 1;
                category_ids.insert(&category.id, category.id.clone());
            }
        }
    }

    // Goals, parents first.
    let incoming: HashSet<&str> = data.goals.iter().map(|g| g.id.as_str()).collect();
    let mut pending: Vec<&Goal> = Vec::new();
    for goal in &data.goals {
        if store::goal_exists(&tx, &goal.id)? {
            summary.skipped += 1;
        } else {
            pending.push(goal);
        }
    }

    while !pending.is_empty() {
        let mut deferred = Vec::new();
        let before = pending.len();

        for goal in pending {
            let parent_ready = match goal.parent_goal_id.as_deref() {
                None => true,
                Some(parent) => store::goal_exists(&tx, parent)? || !incoming.contains(parent),
            };
            if parent_ready {
                insert_imported_goal(&tx, goal, &category_ids, &mut summary)?;
            } else {
                deferred.push(goal);
            }
        }

        if deferred.len() == before {
            // Only parent cycles remain: break one and go round again.
            let goal = deferred.remove(0);
            tracing::warn!(id = %goal.id, "goal is on a parent cycle; importing as top-level");
            let mut goal = goal.clone();
            goal.parent_goal_id = None;
            summary.detached += 1;
            insert_imported_goal(&tx, &goal, &category_ids, &mut summary)?;
        }
        pending = deferred;
    }

    for task in &data.tasks {
        if store::task_exists(&tx, &task.id)? {
            summary.skipped += 1;
            continue;
        }
        let mut task = task.clone();
        if let Some(goal_id) = task.goal_id.as_deref() {
            if !store::goal_exists(&tx, goal_id)? {
                tracing::warn!(id = %task.id, goal_id, "task goal missing; importing without a goal");
                task.goal_id = None;
                summary.detached += 1;
            }
        }
        store::insert_task(&tx, &task)
            .with_context(|| format!("failed to import task {}", task.id))?;
        summary.tasks_imported += 1;
    }

    tx.commit()?;

    tracing::info!(
        goals = summary.goals_imported,
        tasks = summary.tasks_imported,
        skipped = summary.skipped,
        "import complete"
    );
    Ok(summary)
}

fn insert_imported_goal(
    conn: &Connection,
    goal: &Goal,
    category_ids: &HashMap<&str, String>,
    summary: &mut ImportSummary,
) -> Result<()> {
    let mut goal = goal.clone();

    if let Some(parent) = goal.parent_goal_id.as_deref() {
        if !store::goal_exists(conn, parent)? {
            tracing::warn!(id = %goal.id, parent, "parent goal missing; importing as top-level");
            goal.parent_goal_id = None;
            summary.detached += 1;
        }
    }

    if let Some(category) = goal.category_id.take() {
        match category_ids.get(category.as_str()) {
            Some(mapped) => goal.category_id = Some(mapped.clone()),
            None if row_exists(conn, "categories", &category)? => goal.category_id = Some(category),
            None => {
                tracing::warn!(id = %goal.id, category = %category, "category missing; cleared");
                summary.detached += 1;
            }
        }
    }

    store::insert_goal(conn, &goal).with_context(|| format!("failed to import goal {}", goal.id))?;
    summary.goals_imported += 1;
    Ok(())
}

fn row_exists(conn: &Connection, table: &str, id: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        &format!("SELECT COUNT(*) > 0 FROM {table} WHERE id = ?1"),
        params![id],
        |row| row.get(0),
    )
}
