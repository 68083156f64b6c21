#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use goalpost::config::GoalpostConfig;
use goalpost::db;
use goalpost::goals::store::{self, NewGoal, NewTask};
use goalpost::goals::{Goal, Task, TaskStatus};
use goalpost::planner::Planner;
use rusqlite::Connection;

/// Fixed reference time so scores and eligibility windows are reproducible.
pub fn now() -> DateTime<Utc> {
    "2026-03-01T12:00:00Z".parse().unwrap()
}

pub fn days_ago(days: i64) -> DateTime<Utc> {
    now() - Duration::days(days)
}

/// Open a fresh in-memory database with schema and migrations applied.
pub fn test_db() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    conn.pragma_update(None, "foreign_keys", "ON").unwrap();
    db::schema::init_schema(&conn).unwrap();
    db::migrations::run_migrations(&mut conn).unwrap();
    conn
}

/// A planner over a fresh in-memory database with default config.
pub fn test_planner() -> Planner {
    Planner::new(test_db(), GoalpostConfig::default())
}

/// Build an in-memory goal with a fixed id.
pub fn goal(id: &str) -> Goal {
    Goal::new(format!("goal {id}"), now()).with_id(id)
}

/// Build an in-memory task with a fixed id and status.
pub fn task(id: &str, goal_id: &str, status: TaskStatus) -> Task {
    Task::new(format!("task {id}"), Some(goal_id), now())
        .with_id(id)
        .with_status(status)
}

/// Insert a goal through the store. Returns its id.
pub fn add_goal(conn: &mut Connection, name: &str, parent: Option<&str>) -> String {
    store::create_goal(
        conn,
        &NewGoal {
            name: name.to_string(),
            parent_goal_id: parent.map(str::to_string),
            ..NewGoal::default()
        },
        now(),
    )
    .unwrap()
    .id
}

/// Insert a task through the store. Returns its id.
pub fn add_task(conn: &mut Connection, name: &str, goal_id: Option<&str>) -> String {
    store::create_task(
        conn,
        &NewTask {
            name: name.to_string(),
            goal_id: goal_id.map(str::to_string),
            ..NewTask::default()
        },
        now(),
    )
    .unwrap()
    .id
}
