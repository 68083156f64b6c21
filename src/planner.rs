//! The goal planner service.
//!
//! [`Planner`] owns the shared database connection and the top-goals cache.
//! Every mutation goes through the store, refreshes stored progress, and then
//! invalidates the cache so the next ranking sees the change.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::GoalpostConfig;
use crate::goals::cache::TopGoalsCache;
use crate::goals::progress::calculate_goal_progression;
use crate::goals::select::TopGoalsSelector;
use crate::goals::store::{self, GoalUpdate, NewGoal, NewTask, RefreshResult, TaskUpdate};
use crate::goals::types::{Category, Goal, ScoredGoal, Task, TaskStatus};

/// Goals and tasks loaded together.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub goals: Vec<Goal>,
    pub tasks: Vec<Task>,
}

#[derive(Clone)]
pub struct Planner {
    db: Arc<Mutex<Connection>>,
    cache: Arc<TopGoalsCache>,
    config: Arc<GoalpostConfig>,
}

impl Planner {
    pub fn new(conn: Connection, config: GoalpostConfig) -> Self {
        let cache = TopGoalsCache::from_config(&config.selection);
        Self {
            db: Arc::new(Mutex::new(conn)),
            cache: Arc::new(cache),
            config: Arc::new(config),
        }
    }

    /// Open the configured database and build a planner over it.
    pub fn open(config: GoalpostConfig) -> Result<Self> {
        let db_path = config.resolved_db_path();
        let conn = crate::db::open_database(&db_path)?;
        tracing::info!(db = %db_path.display(), "planner ready");
        Ok(Self::new(conn, config))
    }

    pub fn config(&self) -> &GoalpostConfig {
        &self.config
    }

    pub fn cache(&self) -> &TopGoalsCache {
        &self.cache
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.db
            .lock()
            .map_err(|e| anyhow::anyhow!("db lock poisoned: {e}"))
    }

    /// Run a store mutation, refresh progress, then invalidate the ranking.
    fn mutate<T>(
        &self,
        now: DateTime<Utc>,
        op: impl FnOnce(&mut Connection) -> store::Result<T>,
    ) -> Result<T> {
        let mut conn = self.conn()?;
        let value = op(&mut *conn)?;
        let refreshed = store::refresh_progress(&mut conn, now)
            .context("failed to refresh goal progress")?;
        drop(conn);

        if !refreshed.completed.is_empty() {
            tracing::info!(goals = ?refreshed.completed, "goals completed");
        }
        self.cache.invalidate();
        Ok(value)
    }

    // ── Reads ────────────────────────────────────────────────────────────────

    pub fn snapshot(&self) -> Result<Snapshot> {
        let conn = self.conn()?;
        Ok(Snapshot {
            goals: store::load_goals(&conn)?,
            tasks: store::load_tasks(&conn)?,
        })
    }

    /// The highest-ranked goals right now.
    pub fn top_goals(
        &self,
        count: usize,
        use_cache: bool,
        now: DateTime<Utc>,
    ) -> Result<Vec<ScoredGoal>> {
        let snapshot = self.snapshot()?;
        let selector = TopGoalsSelector::new(
            &self.cache,
            &self.config.scoring,
            &self.config.selection,
        );
        Ok(selector.top_goals(&snapshot.goals, &snapshot.tasks, count, use_cache, now))
    }

    /// Freshly computed progress for one goal.
    pub fn goal_progress(&self, id: &str) -> Result<u8> {
        let snapshot = self.snapshot()?;
        let goal = snapshot
            .goals
            .iter()
            .find(|g| g.id == id)
            .ok_or_else(|| store::StoreError::GoalNotFound(id.to_string()))?;
        Ok(calculate_goal_progression(goal, &snapshot.goals, &snapshot.tasks))
    }

    pub fn get_goal(&self, id: &str) -> Result<Goal> {
        Ok(store::get_goal(&*self.conn()?, id)?)
    }

    pub fn categories(&self) -> Result<Vec<Category>> {
        Ok(store::list_categories(&*self.conn()?)?)
    }

    // ── Mutations ────────────────────────────────────────────────────────────

    pub fn create_category(&self, name: &str, now: DateTime<Utc>) -> Result<Category> {
        let category = self.mutate(now, |conn| store::create_category(conn, name, now))?;
        tracing::info!(id = %category.id, name, "category created");
        Ok(category)
    }

    pub fn delete_category(&self, id: &str, now: DateTime<Utc>) -> Result<()> {
        self.mutate(now, |conn| store::delete_category(conn, id, now))?;
        tracing::info!(id, "category deleted");
        Ok(())
    }

    pub fn create_goal(&self, new: &NewGoal, now: DateTime<Utc>) -> Result<Goal> {
        let goal = self.mutate(now, |conn| store::create_goal(conn, new, now))?;
        tracing::info!(id = %goal.id, name = %goal.name, "goal created");
        Ok(goal)
    }

    pub fn update_goal(&self, id: &str, update: &GoalUpdate, now: DateTime<Utc>) -> Result<Goal> {
        let goal = self.mutate(now, |conn| store::update_goal(conn, id, update, now))?;
        tracing::info!(id, "goal updated");
        Ok(goal)
    }

    pub fn set_goal_archived(&self, id: &str, archived: bool, now: DateTime<Utc>) -> Result<Goal> {
        let goal = self.mutate(now, |conn| store::set_goal_archived(conn, id, archived, now))?;
        tracing::info!(id, archived, "goal archive state changed");
        Ok(goal)
    }

    pub fn move_goal(&self, id: &str, parent: Option<&str>, now: DateTime<Utc>) -> Result<Goal> {
        let goal = self.mutate(now, |conn| store::set_goal_parent(conn, id, parent, now))?;
        tracing::info!(id, parent = ?parent, "goal moved");
        Ok(goal)
    }

    pub fn delete_goal(&self, id: &str, now: DateTime<Utc>) -> Result<()> {
        self.mutate(now, |conn| store::delete_goal(conn, id, now))?;
        tracing::info!(id, "goal deleted");
        Ok(())
    }

    pub fn create_task(&self, new: &NewTask, now: DateTime<Utc>) -> Result<Task> {
        let task = self.mutate(now, |conn| store::create_task(conn, new, now))?;
        tracing::info!(id = %task.id, goal_id = ?task.goal_id, "task created");
        Ok(task)
    }

    pub fn update_task(&self, id: &str, update: &TaskUpdate, now: DateTime<Utc>) -> Result<Task> {
        let task = self.mutate(now, |conn| store::update_task(conn, id, update, now))?;
        tracing::info!(id, "task updated");
        Ok(task)
    }

    pub fn set_task_status(&self, id: &str, status: TaskStatus, now: DateTime<Utc>) -> Result<Task> {
        let task = self.mutate(now, |conn| store::set_task_status(conn, id, status, now))?;
        tracing::info!(id, status = %status, "task status changed");
        Ok(task)
    }

    pub fn delete_task(&self, id: &str, now: DateTime<Utc>) -> Result<()> {
        self.mutate(now, |conn| store::delete_task(conn, id, now))?;
        tracing::info!(id, "task deleted");
        Ok(())
    }

    /// Recompute and store progress for every goal.
    pub fn refresh_progress(&self, now: DateTime<Utc>) -> Result<RefreshResult> {
        let result = {
            let mut conn = self.conn()?;
            store::refresh_progress(&mut conn, now)?
        };
        if result.updated > 0 {
            self.cache.invalidate();
        }
        Ok(result)
    }

    /// Drop the cached ranking after a change made outside this planner
    /// (another process writing the same database file).
    pub fn invalidate_top_goals(&self) {
        self.cache.invalidate();
    }

    /// SQLite `data_version` of the underlying connection.
    pub fn data_version(&self) -> Result<i64> {
        Ok(crate::db::data_version(&*self.conn()?)?)
    }
}
