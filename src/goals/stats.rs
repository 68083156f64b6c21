use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::Serialize;
use std::collections::BTreeMap;

use super::types::TaskStatus;

/// Response from goal_stats.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub total_goals: u64,
    pub active_goals: u64,
    pub archived_goals: u64,
    pub completed_goals: u64,
    pub sub_goals: u64,
    pub total_tasks: u64,
    pub tasks_by_status: BTreeMap<String, u64>,
    pub overdue_tasks: u64,
    pub orphan_tasks: u64,
    pub categories: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_progress: Option<f64>,
}

/// Compute goal and task statistics as of `now`.
pub fn goal_stats(conn: &Connection, now: DateTime<Utc>) -> Result<StatsResponse> {
    let count = |sql: &str| -> Result<u64> {
        let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
        Ok(n.max(0) as u64)
    };

    let total_goals = count("SELECT COUNT(*) FROM goals")?;
    let archived_goals = count("SELECT COUNT(*) FROM goals WHERE is_archived = 1")?;
    let completed_goals =
        count("SELECT COUNT(*) FROM goals WHERE is_archived = 0 AND progress = 100")?;
    let sub_goals = count("SELECT COUNT(*) FROM goals WHERE parent_goal_id IS NOT NULL")?;
    let total_tasks = count("SELECT COUNT(*) FROM tasks")?;
    let orphan_tasks = count("SELECT COUNT(*) FROM tasks WHERE goal_id IS NULL")?;
    let categories = count("SELECT COUNT(*) FROM categories")?;

    let mut tasks_by_status: BTreeMap<String, u64> = TaskStatus::ALL
        .iter()
        .map(|s| (s.as_str().to_string(), 0))
        .collect();
    let mut stmt = conn.prepare("SELECT status, COUNT(*) FROM tasks GROUP BY status")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
    })?;
    for row in rows {
        let (status, n) = row?;
        tasks_by_status.insert(status, n.max(0) as u64);
    }

    // Task due dates are compared in Rust: the stored text format is not
    // guaranteed to sort chronologically against an arbitrary `now`.
    let mut stmt = conn.prepare(
        "SELECT due_date FROM tasks \
         WHERE due_date IS NOT NULL AND status NOT IN (?1, ?2)",
    )?;
    let overdue_tasks = stmt
        .query_map(
            params![TaskStatus::Completed.as_str(), TaskStatus::Archived.as_str()],
            |row| row.get::<_, DateTime<Utc>>(0),
        )?
        .collect::<rusqlite::Result<Vec<_>>>()?
        .into_iter()
        .filter(|due| *due < now)
        .count() as u64;

    let average_progress: Option<f64> = conn.query_row(
        "SELECT AVG(progress) FROM goals WHERE is_archived = 0",
        [],
        |row| row.get(0),
    )?;

    Ok(StatsResponse {
        total_goals,
        active_goals: total_goals - archived_goals,
        archived_goals,
        completed_goals,
        sub_goals,
        total_tasks,
        tasks_by_status,
        overdue_tasks,
        orphan_tasks,
        categories,
        average_progress,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use crate::goals::store::{self, NewGoal, NewTask};
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        "2026-03-01T12:00:00Z".parse().unwrap()
    }

    #[test]
    fn empty_database_stats() {
        let conn = open_memory_database().unwrap();
        let stats = goal_stats(&conn, now()).unwrap();
        assert_eq!(stats.total_goals, 0);
        assert_eq!(stats.total_tasks, 0);
        assert_eq!(stats.tasks_by_status["TODO"], 0);
        assert!(stats.average_progress.is_none());
    }

    #[test]
    fn counts_tasks_and_goals() {
        let mut conn = open_memory_database().unwrap();
        let goal = store::create_goal(
            &mut conn,
            &NewGoal {
                name: "g".into(),
                ..NewGoal::default()
            },
            now(),
        )
        .unwrap();
        store::create_goal(
            &mut conn,
            &NewGoal {
                name: "sub".into(),
                parent_goal_id: Some(goal.id.clone()),
                ..NewGoal::default()
            },
            now(),
        )
        .unwrap();

        let late = store::create_task(
            &mut conn,
            &NewTask {
                name: "late".into(),
                goal_id: Some(goal.id.clone()),
                due_date: Some(now() - Duration::days(1)),
                ..NewTask::default()
            },
            now(),
        )
        .unwrap();
        store::create_task(
            &mut conn,
            &NewTask {
                name: "loose".into(),
                ..NewTask::default()
            },
            now(),
        )
        .unwrap();

        let stats = goal_stats(&conn, now()).unwrap();
        assert_eq!(stats.total_goals, 2);
        assert_eq!(stats.sub_goals, 1);
        assert_eq!(stats.total_tasks, 2);
        assert_eq!(stats.overdue_tasks, 1);
        assert_eq!(stats.orphan_tasks, 1);
        assert_eq!(stats.tasks_by_status["TODO"], 2);

        store::set_task_status(&mut conn, &late.id, TaskStatus::Completed, now()).unwrap();
        let stats = goal_stats(&conn, now()).unwrap();
        assert_eq!(stats.overdue_tasks, 0);
        assert_eq!(stats.tasks_by_status["COMPLETED"], 1);
    }
}
