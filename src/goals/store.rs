//! SQLite persistence for categories, goals, and tasks.
//!
//! Every mutation writes an `activity_log` row in the same transaction. The
//! functions here know nothing about the ranking cache; callers that mutate
//! must invalidate it (see [`crate::planner::Planner`]).

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::progress::progress_by_goal;
use super::types::{Category, Goal, Priority, Task, TaskStatus};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("goal not found: {0}")]
    GoalNotFound(String),

    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error("category not found: {0}")]
    CategoryNotFound(String),

    #[error("category already exists: {0}")]
    DuplicateCategory(String),

    #[error("cannot move goal {goal} under {parent}: it would become its own ancestor")]
    ParentCycle { goal: String, parent: String },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

// ── Inputs ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewGoal {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category_id: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
    pub parent_goal_id: Option<String>,
    #[serde(default)]
    pub order: i64,
}

/// Partial goal edit. `None` leaves a field untouched; `Some(None)` clears a
/// nullable field.
#[derive(Debug, Clone, Default)]
pub struct GoalUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<Option<String>>,
    pub deadline: Option<Option<DateTime<Utc>>>,
    pub order: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTask {
    pub name: String,
    pub goal_id: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub name: Option<String>,
    pub goal_id: Option<Option<String>>,
    pub priority: Option<Priority>,
    pub due_date: Option<Option<DateTime<Utc>>>,
}

// ── Outputs ──────────────────────────────────────────────────────────────────

/// Outcome of [`refresh_progress`].
#[derive(Debug, Default, Serialize)]
pub struct RefreshResult {
    pub checked: usize,
    pub updated: usize,
    /// Goals that reached 100% in this refresh.
    pub completed: Vec<String>,
    /// Goals that dropped below 100% in this refresh.
    pub reopened: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ActivityEntry {
    pub operation: String,
    pub entity: String,
    pub entity_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

// ── Column lists and row mappers ─────────────────────────────────────────────

const GOAL_COLUMNS: &str = "g.id, g.name, g.description, g.category_id, g.deadline, g.progress, \
     g.is_archived, g.parent_goal_id, g.completed_at, g.created_at, g.updated_at, g.sort_order, \
     (SELECT COUNT(*) FROM goals c WHERE c.parent_goal_id = g.id AND c.id != g.id)";

const TASK_COLUMNS: &str =
    "id, name, goal_id, status, priority, due_date, completed_at, created_at, updated_at";

fn goal_from_row(row: &Row<'_>) -> rusqlite::Result<Goal> {
    Ok(Goal {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        category_id: row.get(3)?,
        deadline: row.get(4)?,
        progress: row.get(5)?,
        is_archived: row.get(6)?,
        parent_goal_id: row.get(7)?,
        completed_at: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
        order: row.get(11)?,
        sub_goal_count: row.get(12)?,
    })
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    let status: String = row.get(3)?;
    let priority: String = row.get(4)?;
    Ok(Task {
        id: row.get(0)?,
        name: row.get(1)?,
        goal_id: row.get(2)?,
        status: status
            .parse()
            .map_err(|e: String| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, e.into()))?,
        priority: priority
            .parse()
            .map_err(|e: String| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, e.into()))?,
        due_date: row.get(5)?,
        completed_at: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

// ── Activity log ─────────────────────────────────────────────────────────────

/// Append an activity log row.
pub fn write_activity_log(
    conn: &Connection,
    operation: &str,
    entity: &str,
    entity_id: &str,
    details: Option<&serde_json::Value>,
    now: DateTime<Utc>,
) -> rusqlite::Result<()> {
    let details_str = details.map(|d| d.to_string());
    conn.execute(
        "INSERT INTO activity_log (operation, entity, entity_id, details, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![operation, entity, entity_id, details_str, now],
    )?;
    Ok(())
}

/// Most recent activity first.
pub fn recent_activity(conn: &Connection, limit: usize) -> Result<Vec<ActivityEntry>> {
    let mut stmt = conn.prepare(
        "SELECT operation, entity, entity_id, details, created_at \
         FROM activity_log ORDER BY id DESC LIMIT ?1",
    )?;
    let rows = stmt
        .query_map(params![limit as i64], |row| {
            let details: Option<String> = row.get(3)?;
            Ok(ActivityEntry {
                operation: row.get(0)?,
                entity: row.get(1)?,
                entity_id: row.get(2)?,
                details: details.and_then(|s| serde_json::from_str(&s).ok()),
                created_at: row.get(4)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

// ── Categories ───────────────────────────────────────────────────────────────

pub fn create_category(conn: &mut Connection, name: &str, now: DateTime<Utc>) -> Result<Category> {
    let tx = conn.transaction()?;

    let exists: bool = tx.query_row(
        "SELECT COUNT(*) > 0 FROM categories WHERE name = ?1",
        params![name],
        |row| row.get(0),
    )?;
    if exists {
        return Err(StoreError::DuplicateCategory(name.to_string()));
    }

    let category = Category {
        id: uuid::Uuid::now_v7().to_string(),
        name: name.to_string(),
        created_at: now,
    };
    insert_category(&tx, &category)?;
    write_activity_log(&tx, "create", "category", &category.id, None, now)?;
    tx.commit()?;

    Ok(category)
}

/// Insert a fully-formed category row (used by create and import).
pub fn insert_category(conn: &Connection, category: &Category) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO categories (id, name, created_at) VALUES (?1, ?2, ?3)",
        params![category.id, category.name, category.created_at],
    )?;
    Ok(())
}

pub fn list_categories(conn: &Connection) -> Result<Vec<Category>> {
    let mut stmt = conn.prepare("SELECT id, name, created_at FROM categories ORDER BY name")?;
    let rows = stmt
        .query_map([], |row| {
            Ok(Category {
                id: row.get(0)?,
                name: row.get(1)?,
                created_at: row.get(2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Delete a category. Goals in it keep existing with no category.
pub fn delete_category(conn: &mut Connection, id: &str, now: DateTime<Utc>) -> Result<()> {
    let tx = conn.transaction()?;
    let deleted = tx.execute("DELETE FROM categories WHERE id = ?1", params![id])?;
    if deleted == 0 {
        return Err(StoreError::CategoryNotFound(id.to_string()));
    }
    write_activity_log(&tx, "delete", "category", id, None, now)?;
    tx.commit()?;
    Ok(())
}

fn category_exists(conn: &Connection, id: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM categories WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )
}

// ── Goals ────────────────────────────────────────────────────────────────────

pub fn create_goal(conn: &mut Connection, new: &NewGoal, now: DateTime<Utc>) -> Result<Goal> {
    let tx = conn.transaction()?;

    if let Some(parent) = new.parent_goal_id.as_deref() {
        if !goal_exists(&tx, parent)? {
            return Err(StoreError::GoalNotFound(parent.to_string()));
        }
    }
    if let Some(category) = new.category_id.as_deref() {
        if !category_exists(&tx, category)? {
            return Err(StoreError::CategoryNotFound(category.to_string()));
        }
    }

    let mut goal = Goal::new(new.name.clone(), now).with_order(new.order);
    goal.description = new.description.clone();
    goal.category_id = new.category_id.clone();
    goal.deadline = new.deadline;
    goal.parent_goal_id = new.parent_goal_id.clone();

    insert_goal(&tx, &goal)?;
    write_activity_log(
        &tx,
        "create",
        "goal",
        &goal.id,
        Some(&serde_json::json!({ "name": goal.name, "parent_goal_id": goal.parent_goal_id })),
        now,
    )?;
    tx.commit()?;

    Ok(goal)
}

/// Insert a fully-formed goal row (used by create and import).
pub fn insert_goal(conn: &Connection, goal: &Goal) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO goals (id, name, description, category_id, deadline, progress, is_archived, \
         parent_goal_id, completed_at, created_at, updated_at, sort_order) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            goal.id,
            goal.name,
            goal.description,
            goal.category_id,
            goal.deadline,
            goal.progress,
            goal.is_archived,
            goal.parent_goal_id,
            goal.completed_at,
            goal.created_at,
            goal.updated_at,
            goal.order,
        ],
    )?;
    Ok(())
}

pub fn get_goal(conn: &Connection, id: &str) -> Result<Goal> {
    conn.query_row(
        &format!("SELECT {GOAL_COLUMNS} FROM goals g WHERE g.id = ?1"),
        params![id],
        goal_from_row,
    )
    .optional()?
    .ok_or_else(|| StoreError::GoalNotFound(id.to_string()))
}

pub fn goal_exists(conn: &Connection, id: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM goals WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )
}

pub fn update_goal(
    conn: &mut Connection,
    id: &str,
    update: &GoalUpdate,
    now: DateTime<Utc>,
) -> Result<Goal> {
    let tx = conn.transaction()?;
    let mut goal = get_goal(&tx, id)?;

    if let Some(Some(category)) = update.category_id.as_ref() {
        if !category_exists(&tx, category)? {
            return Err(StoreError::CategoryNotFound(category.clone()));
        }
    }

    if let Some(name) = &update.name {
        goal.name = name.clone();
    }
    if let Some(description) = &update.description {
        goal.description = description.clone();
    }
    if let Some(category_id) = &update.category_id {
        goal.category_id = category_id.clone();
    }
    if let Some(deadline) = update.deadline {
        goal.deadline = deadline;
    }
    if let Some(order) = update.order {
        goal.order = order;
    }
    goal.updated_at = now;

    tx.execute(
        "UPDATE goals SET name = ?1, description = ?2, category_id = ?3, deadline = ?4, \
         sort_order = ?5, updated_at = ?6 WHERE id = ?7",
        params![
            goal.name,
            goal.description,
            goal.category_id,
            goal.deadline,
            goal.order,
            goal.updated_at,
            goal.id,
        ],
    )?;
    write_activity_log(&tx, "update", "goal", id, None, now)?;
    tx.commit()?;

    Ok(goal)
}

pub fn set_goal_archived(
    conn: &mut Connection,
    id: &str,
    archived: bool,
    now: DateTime<Utc>,
) -> Result<Goal> {
    let tx = conn.transaction()?;
    let updated = tx.execute(
        "UPDATE goals SET is_archived = ?1, updated_at = ?2 WHERE id = ?3",
        params![archived, now, id],
    )?;
    if updated == 0 {
        return Err(StoreError::GoalNotFound(id.to_string()));
    }
    let operation = if archived { "archive" } else { "unarchive" };
    write_activity_log(&tx, operation, "goal", id, None, now)?;
    let goal = get_goal(&tx, id)?;
    tx.commit()?;
    Ok(goal)
}

/// Move a goal under `parent` (or to the top level with `None`).
///
/// Rejects moves that would make the goal its own ancestor.
pub fn set_goal_parent(
    conn: &mut Connection,
    id: &str,
    parent: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Goal> {
    let tx = conn.transaction()?;
    if !goal_exists(&tx, id)? {
        return Err(StoreError::GoalNotFound(id.to_string()));
    }

    if let Some(parent) = parent {
        if !goal_exists(&tx, parent)? {
            return Err(StoreError::GoalNotFound(parent.to_string()));
        }
        if ancestor_chain(&tx, parent)?.iter().any(|ancestor| ancestor == id) {
            return Err(StoreError::ParentCycle {
                goal: id.to_string(),
                parent: parent.to_string(),
            });
        }
    }

    tx.execute(
        "UPDATE goals SET parent_goal_id = ?1, updated_at = ?2 WHERE id = ?3",
        params![parent, now, id],
    )?;
    write_activity_log(
        &tx,
        "reparent",
        "goal",
        id,
        Some(&serde_json::json!({ "parent_goal_id": parent })),
        now,
    )?;
    let goal = get_goal(&tx, id)?;
    tx.commit()?;
    Ok(goal)
}

/// `id` followed by its ancestors, nearest first. Stops at the first repeat.
fn ancestor_chain(conn: &Connection, id: &str) -> rusqlite::Result<Vec<String>> {
    let mut chain = vec![id.to_string()];
    let mut current = id.to_string();
    loop {
        let parent: Option<String> = conn
            .query_row(
                "SELECT parent_goal_id FROM goals WHERE id = ?1",
                params![current],
                |row| row.get(0),
            )
            .optional()?
            .flatten();
        match parent {
            Some(p) if !chain.contains(&p) => {
                chain.push(p.clone());
                current = p;
            }
            _ => return Ok(chain),
        }
    }
}

/// Delete a goal. Its sub-goals move to the top level and its tasks become
/// orphans.
pub fn delete_goal(conn: &mut Connection, id: &str, now: DateTime<Utc>) -> Result<()> {
    let tx = conn.transaction()?;
    let deleted = tx.execute("DELETE FROM goals WHERE id = ?1", params![id])?;
    if deleted == 0 {
        return Err(StoreError::GoalNotFound(id.to_string()));
    }
    write_activity_log(&tx, "delete", "goal", id, None, now)?;
    tx.commit()?;
    Ok(())
}

/// Every goal, with `sub_goal_count` derived.
pub fn load_goals(conn: &Connection) -> Result<Vec<Goal>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {GOAL_COLUMNS} FROM goals g ORDER BY g.sort_order, g.created_at, g.id"
    ))?;
    let goals = stmt
        .query_map([], goal_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(goals)
}

// ── Tasks ────────────────────────────────────────────────────────────────────

pub fn create_task(conn: &mut Connection, new: &NewTask, now: DateTime<Utc>) -> Result<Task> {
    let tx = conn.transaction()?;

    if let Some(goal_id) = new.goal_id.as_deref() {
        if !goal_exists(&tx, goal_id)? {
            return Err(StoreError::GoalNotFound(goal_id.to_string()));
        }
    }

    let mut task = Task::new(new.name.clone(), new.goal_id.as_deref(), now).with_priority(new.priority);
    task.due_date = new.due_date;

    insert_task(&tx, &task)?;
    write_activity_log(
        &tx,
        "create",
        "task",
        &task.id,
        Some(&serde_json::json!({ "name": task.name, "goal_id": task.goal_id })),
        now,
    )?;
    tx.commit()?;

    Ok(task)
}

/// Insert a fully-formed task row (used by create and import).
pub fn insert_task(conn: &Connection, task: &Task) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO tasks (id, name, goal_id, status, priority, due_date, completed_at, \
         created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            task.id,
            task.name,
            task.goal_id,
            task.status.as_str(),
            task.priority.as_str(),
            task.due_date,
            task.completed_at,
            task.created_at,
            task.updated_at,
        ],
    )?;
    Ok(())
}

pub fn get_task(conn: &Connection, id: &str) -> Result<Task> {
    conn.query_row(
        &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
        params![id],
        task_from_row,
    )
    .optional()?
    .ok_or_else(|| StoreError::TaskNotFound(id.to_string()))
}

pub fn update_task(
    conn: &mut Connection,
    id: &str,
    update: &TaskUpdate,
    now: DateTime<Utc>,
) -> Result<Task> {
    let tx = conn.transaction()?;
    let mut task = get_task(&tx, id)?;

    if let Some(Some(goal_id)) = update.goal_id.as_ref() {
        if !goal_exists(&tx, goal_id)? {
            return Err(StoreError::GoalNotFound(goal_id.clone()));
        }
    }

    if let Some(name) = &update.name {
        task.name = name.clone();
    }
    if let Some(goal_id) = &update.goal_id {
        task.goal_id = goal_id.clone();
    }
    if let Some(priority) = update.priority {
        task.priority = priority;
    }
    if let Some(due_date) = update.due_date {
        task.due_date = due_date;
    }
    task.updated_at = now;

    tx.execute(
        "UPDATE tasks SET name = ?1, goal_id = ?2, priority = ?3, due_date = ?4, updated_at = ?5 \
         WHERE id = ?6",
        params![
            task.name,
            task.goal_id,
            task.priority.as_str(),
            task.due_date,
            task.updated_at,
            task.id,
        ],
    )?;
    write_activity_log(&tx, "update", "task", id, None, now)?;
    tx.commit()?;

    Ok(task)
}

/// Change a task's status. `completed_at` is stamped on the transition into
/// COMPLETED and cleared on the way out.
pub fn set_task_status(
    conn: &mut Connection,
    id: &str,
    status: TaskStatus,
    now: DateTime<Utc>,
) -> Result<Task> {
    let tx = conn.transaction()?;
    let mut task = get_task(&tx, id)?;
    let previous = task.status;

    task.completed_at = match (previous, status) {
        (TaskStatus::Completed, TaskStatus::Completed) => task.completed_at.or(Some(now)),
        (_, TaskStatus::Completed) => Some(now),
        _ => None,
    };
    task.status = status;
    task.updated_at = now;

    tx.execute(
        "UPDATE tasks SET status = ?1, completed_at = ?2, updated_at = ?3 WHERE id = ?4",
        params![task.status.as_str(), task.completed_at, task.updated_at, task.id],
    )?;
    write_activity_log(
        &tx,
        "status",
        "task",
        id,
        Some(&serde_json::json!({ "from": previous.as_str(), "to": status.as_str() })),
        now,
    )?;
    tx.commit()?;

    Ok(task)
}

pub fn delete_task(conn: &mut Connection, id: &str, now: DateTime<Utc>) -> Result<()> {
    let tx = conn.transaction()?;
    let deleted = tx.execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
    if deleted == 0 {
        return Err(StoreError::TaskNotFound(id.to_string()));
    }
    write_activity_log(&tx, "delete", "task", id, None, now)?;
    tx.commit()?;
    Ok(())
}

pub fn task_exists(conn: &Connection, id: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM tasks WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )
}

pub fn load_tasks(conn: &Connection) -> Result<Vec<Task>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TASK_COLUMNS} FROM tasks ORDER BY created_at, id"
    ))?;
    let tasks = stmt
        .query_map([], task_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(tasks)
}

// ── Progress refresh ─────────────────────────────────────────────────────────

/// Recompute every goal's progress and write back the ones that changed.
///
/// A goal reaching 100% gets `completed_at = now`; one falling below 100%
/// has it cleared. Changed goals also get `updated_at = now`.
pub fn refresh_progress(conn: &mut Connection, now: DateTime<Utc>) -> Result<RefreshResult> {
    let tx = conn.transaction()?;
    let goals = load_goals(&tx)?;
    let tasks = load_tasks(&tx)?;
    let computed = progress_by_goal(&goals, &tasks);

    let mut result = RefreshResult {
        checked: goals.len(),
        ..RefreshResult::default()
    };

    for goal in &goals {
        let progress = computed.get(&goal.id).copied().unwrap_or(0);
        let completed_at = match (progress, goal.completed_at) {
            (100, Some(at)) => Some(at),
            (100, None) => Some(now),
            _ => None,
        };
        if progress == goal.progress && completed_at == goal.completed_at {
            continue;
        }

        tx.execute(
            "UPDATE goals SET progress = ?1, completed_at = ?2, updated_at = ?3 WHERE id = ?4",
            params![progress, completed_at, now, goal.id],
        )?;
        write_activity_log(
            &tx,
            "progress",
            "goal",
            &goal.id,
            Some(&serde_json::json!({ "from": goal.progress, "to": progress })),
            now,
        )?;

        if progress == 100 && goal.progress != 100 {
            result.completed.push(goal.id.clone());
        } else if progress != 100 && goal.progress == 100 {
            result.reopened.push(goal.id.clone());
        }
        result.updated += 1;
    }

    tx.commit()?;
    tracing::debug!(
        checked = result.checked,
        updated = result.updated,
        "goal progress refreshed"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        "2026-03-01T12:00:00Z".parse().unwrap()
    }

    fn new_goal(name: &str, parent: Option<&str>) -> NewGoal {
        NewGoal {
            name: name.into(),
            parent_goal_id: parent.map(str::to_string),
            ..NewGoal::default()
        }
    }

    fn new_task(name: &str, goal_id: Option<&str>) -> NewTask {
        NewTask {
            name: name.into(),
            goal_id: goal_id.map(str::to_string),
            ..NewTask::default()
        }
    }

    #[test]
    fn create_and_get_goal() {
        let mut conn = open_memory_database().unwrap();
        let mut input = new_goal("Run a marathon", None);
        input.deadline = Some(now() + Duration::days(90));
        input.description = "42km".into();

        let goal = create_goal(&mut conn, &input, now()).unwrap();
        let loaded = get_goal(&conn, &goal.id).unwrap();

        assert_eq!(loaded, goal);
        assert_eq!(loaded.progress, 0);
        assert!(loaded.completed_at.is_none());
    }

    #[test]
    fn create_goal_with_missing_parent_fails() {
        let mut conn = open_memory_database().unwrap();
        let err = create_goal(&mut conn, &new_goal("child", Some("nope")), now()).unwrap_err();
        assert!(matches!(err, StoreError::GoalNotFound(id) if id == "nope"));
    }

    #[test]
    fn load_goals_derives_sub_goal_count() {
        let mut conn = open_memory_database().unwrap();
        let parent = create_goal(&mut conn, &new_goal("parent", None), now()).unwrap();
        create_goal(&mut conn, &new_goal("a", Some(&parent.id)), now()).unwrap();
        create_goal(&mut conn, &new_goal("b", Some(&parent.id)), now()).unwrap();

        let goals = load_goals(&conn).unwrap();
        let loaded = goals.iter().find(|g| g.id == parent.id).unwrap();
        assert_eq!(loaded.sub_goal_count, 2);
    }

    #[test]
    fn reparent_rejects_cycles() {
        let mut conn = open_memory_database().unwrap();
        let root = create_goal(&mut conn, &new_goal("root", None), now()).unwrap();
        let mid = create_goal(&mut conn, &new_goal("mid", Some(&root.id)), now()).unwrap();
        let leaf = create_goal(&mut conn, &new_goal("leaf", Some(&mid.id)), now()).unwrap();

        let err = set_goal_parent(&mut conn, &root.id, Some(&leaf.id), now()).unwrap_err();
        assert!(matches!(err, StoreError::ParentCycle { .. }));

        let err = set_goal_parent(&mut conn, &root.id, Some(&root.id), now()).unwrap_err();
        assert!(matches!(err, StoreError::ParentCycle { .. }));

        let moved = set_goal_parent(&mut conn, &leaf.id, None, now()).unwrap();
        assert!(moved.parent_goal_id.is_none());
    }

    #[test]
    fn delete_goal_orphans_tasks_and_reroots_children() {
        let mut conn = open_memory_database().unwrap();
        let parent = create_goal(&mut conn, &new_goal("parent", None), now()).unwrap();
        let child = create_goal(&mut conn, &new_goal("child", Some(&parent.id)), now()).unwrap();
        let task = create_task(&mut conn, &new_task("t", Some(&parent.id)), now()).unwrap();

        delete_goal(&mut conn, &parent.id, now()).unwrap();

        assert!(get_goal(&conn, &child.id).unwrap().parent_goal_id.is_none());
        assert!(get_task(&conn, &task.id).unwrap().goal_id.is_none());
        assert!(matches!(
            delete_goal(&mut conn, &parent.id, now()),
            Err(StoreError::GoalNotFound(_))
        ));
    }

    #[test]
    fn set_task_status_maintains_completed_at() {
        let mut conn = open_memory_database().unwrap();
        let task = create_task(&mut conn, &new_task("t", None), now()).unwrap();

        let done = set_task_status(&mut conn, &task.id, TaskStatus::Completed, now()).unwrap();
        assert_eq!(done.completed_at, Some(now()));

        // Re-completing keeps the original stamp
        let later = now() + Duration::hours(1);
        let again = set_task_status(&mut conn, &task.id, TaskStatus::Completed, later).unwrap();
        assert_eq!(again.completed_at, Some(now()));

        let reopened = set_task_status(&mut conn, &task.id, TaskStatus::InProgress, later).unwrap();
        assert!(reopened.completed_at.is_none());

        let stored = get_task(&conn, &task.id).unwrap();
        assert_eq!(stored.status, TaskStatus::InProgress);
        assert!(stored.completed_at.is_none());
    }

    #[test]
    fn update_task_moves_between_goals() {
        let mut conn = open_memory_database().unwrap();
        let a = create_goal(&mut conn, &new_goal("a", None), now()).unwrap();
        let b = create_goal(&mut conn, &new_goal("b", None), now()).unwrap();
        let task = create_task(&mut conn, &new_task("t", Some(&a.id)), now()).unwrap();

        let update = TaskUpdate {
            goal_id: Some(Some(b.id.clone())),
            priority: Some(Priority::High),
            ..TaskUpdate::default()
        };
        let moved = update_task(&mut conn, &task.id, &update, now()).unwrap();
        assert_eq!(moved.goal_id.as_deref(), Some(b.id.as_str()));
        assert_eq!(get_task(&conn, &task.id).unwrap().priority, Priority::High);

        let bad = TaskUpdate {
            goal_id: Some(Some("missing".into())),
            ..TaskUpdate::default()
        };
        assert!(update_task(&mut conn, &task.id, &bad, now()).is_err());
    }

    #[test]
    fn refresh_progress_stamps_and_clears_completion() {
        let mut conn = open_memory_database().unwrap();
        let goal = create_goal(&mut conn, &new_goal("g", None), now()).unwrap();
        let task = create_task(&mut conn, &new_task("t", Some(&goal.id)), now()).unwrap();

        set_task_status(&mut conn, &task.id, TaskStatus::Completed, now()).unwrap();
        let result = refresh_progress(&mut conn, now()).unwrap();
        assert_eq!(result.completed, vec![goal.id.clone()]);

        let stored = get_goal(&conn, &goal.id).unwrap();
        assert_eq!(stored.progress, 100);
        assert_eq!(stored.completed_at, Some(now()));

        // Nothing changed: nothing written
        let result = refresh_progress(&mut conn, now() + Duration::hours(1)).unwrap();
        assert_eq!(result.updated, 0);
        assert_eq!(get_goal(&conn, &goal.id).unwrap().completed_at, Some(now()));

        set_task_status(&mut conn, &task.id, TaskStatus::Todo, now()).unwrap();
        let result = refresh_progress(&mut conn, now()).unwrap();
        assert_eq!(result.reopened, vec![goal.id.clone()]);
        let stored = get_goal(&conn, &goal.id).unwrap();
        assert_eq!(stored.progress, 0);
        assert!(stored.completed_at.is_none());
    }

    #[test]
    fn categories_are_unique_and_nullable_on_delete() {
        let mut conn = open_memory_database().unwrap();
        let health = create_category(&mut conn, "Health", now()).unwrap();
        assert!(matches!(
            create_category(&mut conn, "Health", now()),
            Err(StoreError::DuplicateCategory(_))
        ));

        let mut input = new_goal("Run", None);
        input.category_id = Some(health.id.clone());
        let goal = create_goal(&mut conn, &input, now()).unwrap();

        delete_category(&mut conn, &health.id, now()).unwrap();
        assert!(get_goal(&conn, &goal.id).unwrap().category_id.is_none());
        assert!(list_categories(&conn).unwrap().is_empty());
    }

    #[test]
    fn mutations_are_logged() {
        let mut conn = open_memory_database().unwrap();
        let goal = create_goal(&mut conn, &new_goal("g", None), now()).unwrap();
        let task = create_task(&mut conn, &new_task("t", Some(&goal.id)), now()).unwrap();
        set_task_status(&mut conn, &task.id, TaskStatus::InProgress, now()).unwrap();

        let log = recent_activity(&conn, 10).unwrap();
        let ops: Vec<&str> = log.iter().map(|e| e.operation.as_str()).collect();
        assert_eq!(ops, vec!["status", "create", "create"]);
        assert_eq!(log[0].details.as_ref().unwrap()["to"], "IN_PROGRESS");
    }
}
