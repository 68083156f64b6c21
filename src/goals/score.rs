//! Goal ranking score.
//!
//! ```text
//! base  = floor + w_r * recency + w_d * proximity + w_s * ln(1 + sub_goals)
//! score = base * (1 + sum(modifiers))
//! ```
//!
//! * `recency` halves every `recency_half_life_days` since `updated_at`.
//! * `proximity` is `exp(-days_until_deadline / horizon)` for upcoming
//!   deadlines, `1.0` once the deadline has passed, and `deadline_neutral`
//!   when the goal has no deadline.
//! * Modifiers are multiplicative percentages; `overdueTasks` applies when any
//!   open task is past its due date.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use super::types::{Goal, ScoredGoal, Task};
use crate::config::ScoringConfig;

/// Modifier key applied when a goal has open tasks past their due date.
pub const OVERDUE_TASKS: &str = "overdueTasks";

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Score a single goal.
///
/// `tasks_for_goal` are the goal's direct tasks; `all_goals` is the full goal
/// collection, used to count sub-goals. Pure: the same inputs and `now`
/// always produce the same result.
pub fn calculate_goal_score(
    goal: &Goal,
    tasks_for_goal: &[Task],
    all_goals: &[Goal],
    now: DateTime<Utc>,
    config: &ScoringConfig,
) -> ScoredGoal {
    let sub_goals = count_sub_goals(goal, all_goals);

    let base_score = config.base_floor
        + config.recency_weight * recency(goal.updated_at, now, config)
        + config.deadline_weight * deadline_proximity(goal.deadline, now, config)
        + config.subgoal_weight * (1.0 + f64::from(sub_goals)).ln();

    let mut modifiers = BTreeMap::new();
    if tasks_for_goal.iter().any(|task| task.is_overdue(now)) {
        modifiers.insert(OVERDUE_TASKS.to_string(), config.overdue_tasks_modifier);
    }

    let score = combine(base_score, &modifiers);

    ScoredGoal {
        goal: goal.clone(),
        tasks: tasks_for_goal.to_vec(),
        base_score,
        modifiers,
        score,
    }
}

/// Apply modifiers to a base score. The selector sorts on this value.
pub fn combine(base_score: f64, modifiers: &BTreeMap<String, f64>) -> f64 {
    base_score * (1.0 + modifiers.values().sum::<f64>())
}

/// Number of goals in `all_goals` whose parent is `goal`.
///
/// Counted from the collection rather than trusting `goal.sub_goal_count`,
/// which may be stale. A goal listing itself as parent is not counted.
fn count_sub_goals(goal: &Goal, all_goals: &[Goal]) -> u32 {
    let count = all_goals
        .iter()
        .filter(|g| g.id != goal.id && g.parent_goal_id.as_deref() == Some(goal.id.as_str()))
        .count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

fn days_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_seconds() as f64 / SECONDS_PER_DAY
}

/// In `(0, 1]`: 1 when touched at or after `now`, halving every half-life.
fn recency(updated_at: DateTime<Utc>, now: DateTime<Utc>, config: &ScoringConfig) -> f64 {
    let age_days = days_between(updated_at, now).max(0.0);
    let half_life = config.recency_half_life_days.max(f64::EPSILON);
    0.5_f64.powf(age_days / half_life)
}

fn deadline_proximity(
    deadline: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    config: &ScoringConfig,
) -> f64 {
    let Some(deadline) = deadline else {
        return config.deadline_neutral;
    };
    if deadline < now {
        return 1.0;
    }
    let days_left = days_between(now, deadline);
    let horizon = config.deadline_horizon_days.max(f64::EPSILON);
    (-days_left / horizon).exp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goals::types::TaskStatus;
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        "2026-03-01T12:00:00Z".parse().unwrap()
    }

    fn goal(id: &str) -> Goal {
        Goal::new(id, now()).with_id(id)
    }

    fn score(goal: &Goal, tasks: &[Task], goals: &[Goal]) -> ScoredGoal {
        calculate_goal_score(goal, tasks, goals, now(), &ScoringConfig::default())
    }

    #[test]
    fn overdue_task_adds_modifier() {
        let g = goal("g");
        let overdue = Task::new("late", Some("g"), now()).with_due_date(now() - Duration::days(1));
        let plain = Task::new("fine", Some("g"), now());

        let with = score(&g, &[overdue, plain.clone()], &[g.clone()]);
        let without = score(&g, &[plain], &[g.clone()]);

        assert_eq!(with.modifiers.get(OVERDUE_TASKS), Some(&0.15));
        assert!(without.modifiers.is_empty());
        assert_eq!(with.base_score, without.base_score);
        assert!(with.score > without.score);
        assert!((with.score - without.score * 1.15).abs() < 1e-9);
    }

    #[test]
    fn completed_overdue_task_has_no_modifier() {
        let g = goal("g");
        let done = Task::new("late", Some("g"), now())
            .with_due_date(now() - Duration::days(3))
            .with_status(TaskStatus::Completed);
        let archived = Task::new("old", Some("g"), now())
            .with_due_date(now() - Duration::days(3))
            .with_status(TaskStatus::Archived);
        let scored = score(&g, &[done, archived], &[g.clone()]);
        assert!(!scored.modifiers.contains_key(OVERDUE_TASKS));
    }

    #[test]
    fn tolerates_completed_at_without_completed_status() {
        let g = goal("g");
        let mut odd = Task::new("odd", Some("g"), now()).with_due_date(now() - Duration::days(1));
        odd.completed_at = Some(now());
        let scored = score(&g, &[odd], &[g.clone()]);
        assert!(scored.modifiers.contains_key(OVERDUE_TASKS));
    }

    #[test]
    fn more_recent_update_scores_higher() {
        let fresh = goal("fresh");
        let mut stale = goal("stale");
        stale.updated_at = now() - Duration::days(10);

        let goals = vec![fresh.clone(), stale.clone()];
        assert!(score(&fresh, &[], &goals).base_score > score(&stale, &[], &goals).base_score);
    }

    #[test]
    fn closer_deadline_scores_higher() {
        let soon = goal("soon").with_deadline(now() + Duration::days(2));
        let later = goal("later").with_deadline(now() + Duration::days(40));
        let goals = vec![soon.clone(), later.clone()];
        assert!(score(&soon, &[], &goals).base_score > score(&later, &[], &goals).base_score);
    }

    #[test]
    fn missing_deadline_uses_neutral_proximity() {
        let config = ScoringConfig::default();
        assert_eq!(deadline_proximity(None, now(), &config), config.deadline_neutral);
        assert_eq!(
            deadline_proximity(Some(now() - Duration::hours(1)), now(), &config),
            1.0
        );
        assert_eq!(deadline_proximity(Some(now()), now(), &config), 1.0);
    }

    #[test]
    fn more_sub_goals_score_higher_sublinearly() {
        let parent = goal("p");
        let one = vec![parent.clone(), goal("c1").with_parent("p")];
        let three = vec![
            parent.clone(),
            goal("c1").with_parent("p"),
            goal("c2").with_parent("p"),
            goal("c3").with_parent("p"),
        ];

        let base0 = score(&parent, &[], &[parent.clone()]).base_score;
        let base1 = score(&parent, &[], &one).base_score;
        let base3 = score(&parent, &[], &three).base_score;

        assert!(base1 > base0);
        assert!(base3 > base1);
        assert!(base3 - base1 < 2.0 * (base1 - base0), "growth should be sub-linear");
    }

    #[test]
    fn base_score_is_strictly_positive() {
        let mut ancient = goal("ancient");
        ancient.updated_at = now() - Duration::days(365 * 50);
        ancient.deadline = Some(now() + Duration::days(365 * 50));
        let scored = score(&ancient, &[], &[ancient.clone()]);
        assert!(scored.base_score > 0.0);
    }

    #[test]
    fn scoring_is_deterministic() {
        let g = goal("g").with_deadline(now() + Duration::days(5));
        let tasks = vec![Task::new("t", Some("g"), now()).with_due_date(now() - Duration::days(1))];
        assert_eq!(score(&g, &tasks, &[g.clone()]), score(&g, &tasks, &[g.clone()]));
    }

    #[test]
    fn combine_is_multiplicative() {
        let mut modifiers = BTreeMap::new();
        modifiers.insert("a".to_string(), 0.1);
        modifiers.insert("b".to_string(), 0.4);
        assert!((combine(2.0, &modifiers) - 3.0).abs() < 1e-12);
        assert_eq!(combine(2.0, &BTreeMap::new()), 2.0);
    }
}
