//! Top-goals selection for the dashboard's featured goals panel.
//!
//! Filters out archived and finished goals (keeping ones that finished
//! recently), scores the rest, and sorts by score with a deterministic
//! tie-break on `order` then `id`.

use chrono::{DateTime, Duration, Utc};
use std::cmp::Ordering;
use std::collections::HashMap;

use super::cache::{fingerprint, TopGoalsCache};
use super::score::calculate_goal_score;
use super::types::{Goal, ScoredGoal, Task};
use crate::config::{ScoringConfig, SelectionConfig};

/// Selects the highest-scoring eligible goals, consulting an injected cache.
pub struct TopGoalsSelector<'a> {
    cache: &'a TopGoalsCache,
    scoring: &'a ScoringConfig,
    selection: &'a SelectionConfig,
}

impl<'a> TopGoalsSelector<'a> {
    pub fn new(
        cache: &'a TopGoalsCache,
        scoring: &'a ScoringConfig,
        selection: &'a SelectionConfig,
    ) -> Self {
        Self {
            cache,
            scoring,
            selection,
        }
    }

    /// Return at most `count` goals, best first, each with its tasks.
    ///
    /// With `use_cache`, an unexpired ranking computed from identical goals,
    /// tasks and settings is served, minus any goal whose completion window
    /// has closed since. Inputs are never modified.
    pub fn top_goals(
        &self,
        goals: &[Goal],
        tasks: &[Task],
        count: usize,
        use_cache: bool,
        now: DateTime<Utc>,
    ) -> Vec<ScoredGoal> {
        if goals.is_empty() || count == 0 {
            return Vec::new();
        }

        let key = if use_cache {
            fingerprint(goals, tasks, self.scoring, self.selection)
        } else {
            None
        };

        if let Some(key) = key.as_deref() {
            if let Some(mut ranked) = self.cache.get(key, now) {
                tracing::debug!(count, cached = ranked.len(), "top goals served from cache");
                ranked.retain(|scored| is_eligible(&scored.goal, now, self.selection));
                ranked.truncate(count);
                return ranked;
            }
        }

        let ranked = rank_goals(goals, tasks, now, self.scoring, self.selection);
        tracing::debug!(
            goals = goals.len(),
            eligible = ranked.len(),
            "top goals ranked"
        );

        if let Some(key) = key {
            self.cache.set(key, ranked.clone(), now);
        }

        let mut top = ranked;
        top.truncate(count);
        top
    }
}

/// Score and sort every eligible goal. No cache, no truncation.
pub fn rank_goals(
    goals: &[Goal],
    tasks: &[Task],
    now: DateTime<Utc>,
    scoring: &ScoringConfig,
    selection: &SelectionConfig,
) -> Vec<ScoredGoal> {
    let mut tasks_by_goal: HashMap<&str, Vec<Task>> = HashMap::new();
    for task in tasks {
        if let Some(goal_id) = task.goal_id.as_deref() {
            tasks_by_goal.entry(goal_id).or_default().push(task.clone());
        }
    }

    let mut ranked: Vec<ScoredGoal> = goals
        .iter()
        .filter(|goal| is_eligible(goal, now, selection))
        .map(|goal| {
            let goal_tasks = tasks_by_goal
                .get(goal.id.as_str())
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            calculate_goal_score(goal, goal_tasks, goals, now, scoring)
        })
        .collect();

    ranked.sort_by(compare_ranked);
    ranked
}

/// Archived goals never qualify. Finished goals qualify only while their
/// completion is within the recent-completion window.
pub fn is_eligible(goal: &Goal, now: DateTime<Utc>, selection: &SelectionConfig) -> bool {
    if goal.is_archived {
        return false;
    }
    if goal.progress < 100 {
        return true;
    }
    let completed_at = goal.completed_at.unwrap_or(goal.updated_at);
    now - completed_at <= recent_completion_window(selection.recent_completion_days)
}

/// The window as a `Duration`, saturating when `days` is beyond chrono's range.
fn recent_completion_window(days: i64) -> Duration {
    Duration::try_days(days).unwrap_or(if days < 0 { Duration::MIN } else { Duration::MAX })
}

fn compare_ranked(a: &ScoredGoal, b: &ScoredGoal) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.goal.order.cmp(&b.goal.order))
        .then_with(|| a.goal.id.cmp(&b.goal.id))
}
