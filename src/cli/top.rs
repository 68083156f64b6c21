//! CLI `top` command — print the featured goals.

use anyhow::Result;
use chrono::Utc;

use goalpost::config::GoalpostConfig;
use goalpost::goals::ScoredGoal;

use super::{open_planner, progress_bar};

pub fn top(config: &GoalpostConfig, count: Option<usize>, use_cache: bool, json: bool) -> Result<()> {
    let planner = open_planner(config)?;
    let count = count.unwrap_or(config.selection.default_count);
    let top = planner.top_goals(count, use_cache, Utc::now())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&top)?);
    } else {
        print_top_goals(&top);
    }
    Ok(())
}

/// Human-readable ranking, shared with `watch`.
pub fn print_top_goals(top: &[ScoredGoal]) {
    if top.is_empty() {
        println!("No eligible goals.");
        return;
    }

    for (rank, scored) in top.iter().enumerate() {
        let goal = &scored.goal;
        println!(
            "{:>2}. {} {:>3}%  {}",
            rank + 1,
            progress_bar(goal.progress),
            goal.progress,
            goal.name
        );

        let open = scored.tasks.iter().filter(|t| !t.status.is_closed()).count();
        let mut detail = format!(
            "      id {}  score {:.3}  tasks {}/{} open",
            goal.id,
            scored.score,
            open,
            scored.tasks.len()
        );
        if let Some(deadline) = goal.deadline {
            detail.push_str(&format!("  due {}", deadline.format("%Y-%m-%d")));
        }
        for (name, value) in &scored.modifiers {
            detail.push_str(&format!("  {name} +{value:.2}"));
        }
        println!("{detail}");
    }
}
