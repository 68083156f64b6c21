use anyhow::Result;
use chrono::Utc;
use std::collections::{HashMap, HashSet};

use goalpost::config::GoalpostConfig;
use goalpost::goals::progress::progress_by_goal;
use goalpost::goals::Goal;

use super::{open_planner, progress_bar};

/// Show computed progress for one goal, or the whole goal tree.
pub fn progress(config: &GoalpostConfig, goal_id: Option<&str>) -> Result<()> {
    let planner = open_planner(config)?;

    if let Some(id) = goal_id {
        let goal = planner.get_goal(id)?;
        let computed = planner.goal_progress(id)?;
        println!("{} {:>3}%  {}", progress_bar(computed), computed, goal.name);
        if computed != goal.progress {
            println!("(stored value {}% is stale; run `goalpost refresh`)", goal.progress);
        }
        return Ok(());
    }

    let snapshot = planner.snapshot()?;
    if snapshot.goals.is_empty() {
        println!("No goals.");
        return Ok(());
    }
    let computed = progress_by_goal(&snapshot.goals, &snapshot.tasks);

    let known: HashSet<&str> = snapshot.goals.iter().map(|g| g.id.as_str()).collect();
    let mut children: HashMap<&str, Vec<&Goal>> = HashMap::new();
    let mut roots = Vec::new();
    for goal in &snapshot.goals {
        match goal.parent_goal_id.as_deref() {
            Some(parent) if known.contains(parent) && parent != goal.id => {
                children.entry(parent).or_default().push(goal)
            }
            _ => roots.push(goal),
        }
    }

    let mut printed = HashSet::new();
    for root in roots {
        print_subtree(root, &children, &computed, &mut printed);
    }
    // Anything left sits on a parent cycle with no root.
    for goal in &snapshot.goals {
        if !printed.contains(goal.id.as_str()) {
            print_subtree(goal, &children, &computed, &mut printed);
        }
    }
    Ok(())
}

/// Print `root` and its descendants, depth-first in display order.
fn print_subtree<'a>(
    root: &'a Goal,
    children: &HashMap<&str, Vec<&'a Goal>>,
    computed: &HashMap<String, u8>,
    printed: &mut HashSet<&'a str>,
) {
    let mut stack = vec![(root, 0usize)];
    while let Some((goal, depth)) = stack.pop() {
        if !printed.insert(goal.id.as_str()) {
            continue;
        }
        let value = computed.get(&goal.id).copied().unwrap_or(0);
        let archived = if goal.is_archived { "  (archived)" } else { "" };
        println!(
            "{}{} {:>3}%  {}{}",
            "  ".repeat(depth),
            progress_bar(value),
            value,
            goal.name,
            archived
        );
        if let Some(kids) = children.get(goal.id.as_str()) {
            let mut kids = kids.clone();
            kids.sort_by(|a, b| b.order.cmp(&a.order).then_with(|| b.id.cmp(&a.id)));
            stack.extend(kids.into_iter().map(|child| (child, depth + 1)));
        }
    }
}

/// Recompute and store progress for every goal.
pub fn refresh(config: &GoalpostConfig) -> Result<()> {
    let planner = open_planner(config)?;
    let result = planner.refresh_progress(Utc::now())?;

    println!("Progress refreshed:");
    println!("  Goals checked:   {}", result.checked);
    println!("  Goals updated:   {}", result.updated);
    if !result.completed.is_empty() {
        println!("  Newly complete:  {}", result.completed.join(", "));
    }
    if !result.reopened.is_empty() {
        println!("  Reopened:        {}", result.reopened.join(", "));
    }
    Ok(())
}
