//! Core goal/task type definitions.
//!
//! Defines [`TaskStatus`] and [`Priority`] (task lifecycle and urgency),
//! [`Goal`] and [`Task`] (full records), [`Category`], and [`ScoredGoal`]
//! (the ephemeral ranking result).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Completed,
    Archived,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 4] = [
        Self::Todo,
        Self::InProgress,
        Self::Completed,
        Self::Archived,
    ];

    /// SQL-compatible string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Todo => "TODO",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Archived => "ARCHIVED",
        }
    }

    /// Contribution of a single task to its goal's progress, in percent.
    ///
    /// In-progress work counts as half done.
    pub fn progression(&self) -> u8 {
        match self {
            Self::Completed => 100,
            Self::InProgress => 50,
            Self::Todo | Self::Archived => 0,
        }
    }

    /// `true` for statuses that no longer represent outstanding work.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Completed | Self::Archived)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().replace('-', "_").as_str() {
            "TODO" => Ok(Self::Todo),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "COMPLETED" | "DONE" => Ok(Self::Completed),
            "ARCHIVED" => Ok(Self::Archived),
            _ => Err(format!("unknown task status: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "LOW" => Ok(Self::Low),
            "MEDIUM" => Ok(Self::Medium),
            "HIGH" => Ok(Self::High),
            _ => Err(format!("unknown priority: {s}")),
        }
    }
}

/// A user-defined grouping for goals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A goal record, matching the `goals` table schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    /// UUID v7 (time-sortable) primary key.
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category_id: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
    /// Last stored progress in `[0, 100]`. May lag behind the tasks until the
    /// next refresh.
    pub progress: u8,
    #[serde(default)]
    pub is_archived: bool,
    /// Parent goal, if this is a sub-goal.
    pub parent_goal_id: Option<String>,
    /// When stored progress last reached 100, cleared if it drops again.
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Sort key among siblings.
    #[serde(default)]
    pub order: i64,
    /// Number of direct sub-goals. Derived on load, never stored.
    #[serde(default)]
    pub sub_goal_count: u32,
}

impl Goal {
    /// A fresh, empty, top-level goal stamped at `now`.
    pub fn new(name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            name: name.into(),
            description: String::new(),
            category_id: None,
            deadline: None,
            progress: 0,
            is_archived: false,
            parent_goal_id: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
            order: 0,
            sub_goal_count: 0,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_goal_id = Some(parent_id.into());
        self
    }

    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_progress(mut self, progress: u8) -> Self {
        self.progress = progress.min(100);
        self
    }

    pub fn with_order(mut self, order: i64) -> Self {
        self.order = order;
        self
    }
}

/// A task record, matching the `tasks` table schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub name: String,
    /// Owning goal. Orphan tasks (`None`) never count towards progress.
    pub goal_id: Option<String>,
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: Priority,
    pub due_date: Option<DateTime<Utc>>,
    /// Set when the task transitions to COMPLETED.
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// A fresh TODO task stamped at `now`.
    pub fn new(name: impl Into<String>, goal_id: Option<&str>, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            name: name.into(),
            goal_id: goal_id.map(str::to_string),
            status: TaskStatus::Todo,
            priority: Priority::default(),
            due_date: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the status, keeping `completed_at` consistent with it.
    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.completed_at = match status {
            TaskStatus::Completed => Some(self.completed_at.unwrap_or(self.updated_at)),
            _ => None,
        };
        self.status = status;
        self
    }

    pub fn with_due_date(mut self, due: DateTime<Utc>) -> Self {
        self.due_date = Some(due);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Open work whose due date is strictly before `now`.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.status.is_closed() && self.due_date.is_some_and(|due| due < now)
    }
}

/// A goal together with its tasks and ranking score.
///
/// `score = base_score * (1 + sum of modifiers)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredGoal {
    pub goal: Goal,
    pub tasks: Vec<Task>,
    pub base_score: f64,
    /// Named adjustments, e.g. `{"overdueTasks": 0.15}`.
    pub modifiers: BTreeMap<String, f64>,
    pub score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn status_round_trips_through_strings() {
        for status in TaskStatus::ALL {
            assert_eq!(status.as_str().parse::<TaskStatus>().unwrap(), status);
        }
        assert_eq!("in-progress".parse::<TaskStatus>().unwrap(), TaskStatus::InProgress);
        assert!("blocked".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn status_progression_values() {
        assert_eq!(TaskStatus::Completed.progression(), 100);
        assert_eq!(TaskStatus::InProgress.progression(), 50);
        assert_eq!(TaskStatus::Todo.progression(), 0);
        assert_eq!(TaskStatus::Archived.progression(), 0);
    }

    #[test]
    fn with_status_maintains_completed_at() {
        let now = Utc::now();
        let task = Task::new("write", None, now).with_status(TaskStatus::Completed);
        assert_eq!(task.completed_at, Some(now));
        let task = task.with_status(TaskStatus::Todo);
        assert!(task.completed_at.is_none());
    }

    #[test]
    fn overdue_requires_open_status_and_past_due() {
        let now = Utc::now();
        let past = now - Duration::days(1);
        let open = Task::new("a", None, now).with_due_date(past);
        assert!(open.is_overdue(now));

        let done = open.clone().with_status(TaskStatus::Completed);
        assert!(!done.is_overdue(now));

        let archived = open.clone().with_status(TaskStatus::Archived);
        assert!(!archived.is_overdue(now));

        let due_now = Task::new("b", None, now).with_due_date(now);
        assert!(!due_now.is_overdue(now), "due exactly now is not strictly before now");

        let no_due = Task::new("c", None, now);
        assert!(!no_due.is_overdue(now));
    }

    #[test]
    fn goal_serializes_with_status_names() {
        let now = Utc::now();
        let task = Task::new("t", Some("g1"), now).with_status(TaskStatus::InProgress);
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["status"], "IN_PROGRESS");
        assert_eq!(json["priority"], "MEDIUM");
    }
}
