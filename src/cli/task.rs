use anyhow::Result;
use chrono::Utc;
use clap::Subcommand;

use goalpost::config::GoalpostConfig;
use goalpost::goals::store::{NewTask, TaskUpdate};
use goalpost::goals::types::Priority;
use goalpost::goals::TaskStatus;

use super::{open_planner, parse_datetime, set_or_clear};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Create a task, optionally under a goal
    Add {
        name: String,
        #[arg(short, long)]
        goal: Option<String>,
        /// LOW, MEDIUM, or HIGH
        #[arg(short, long, default_value = "MEDIUM")]
        priority: Priority,
        /// Due date (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        due: Option<String>,
    },
    /// Set a task's status: TODO, IN_PROGRESS, COMPLETED, or ARCHIVED
    Status { id: String, status: TaskStatus },
    /// Change a task's name, goal, priority, or due date
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, conflicts_with = "detach")]
        goal: Option<String>,
        /// Remove the task from its goal
        #[arg(long)]
        detach: bool,
        #[arg(long)]
        priority: Option<Priority>,
        #[arg(long, conflicts_with = "clear_due")]
        due: Option<String>,
        /// Remove the due date
        #[arg(long)]
        clear_due: bool,
    },
    /// Delete a task
    Delete { id: String },
}

pub fn run(config: &GoalpostConfig, action: TaskAction) -> Result<()> {
    let planner = open_planner(config)?;
    let now = Utc::now();

    match action {
        TaskAction::Add {
            name,
            goal,
            priority,
            due,
        } => {
            let new = NewTask {
                name,
                goal_id: goal,
                priority,
                due_date: due.as_deref().map(parse_datetime).transpose()?,
            };
            let task = planner.create_task(&new, now)?;
            println!("Created task {} ({})", task.id, task.name);
        }
        TaskAction::Status { id, status } => {
            let task = planner.set_task_status(&id, status, now)?;
            println!("Task {} is now {}", task.id, task.status);
            if let Some(goal_id) = task.goal_id {
                let goal = planner.get_goal(&goal_id)?;
                println!("Goal '{}' progress: {}%", goal.name, goal.progress);
            }
        }
        TaskAction::Edit {
            id,
            name,
            goal,
            detach,
            priority,
            due,
            clear_due,
        } => {
            let due = due.as_deref().map(parse_datetime).transpose()?;
            let update = TaskUpdate {
                name,
                goal_id: set_or_clear(goal, detach),
                priority,
                due_date: set_or_clear(due, clear_due),
            };
            let task = planner.update_task(&id, &update, now)?;
            println!("Updated task {} ({})", task.id, task.name);
        }
        TaskAction::Delete { id } => {
            planner.delete_task(&id, now)?;
            println!("Deleted task {id}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(subcommand)]
        action: TaskAction,
    }

    #[test]
    fn edit_can_clear_due_date() {
        let clear = Harness::try_parse_from(["task", "edit", "t1", "--clear-due"]).unwrap();
        assert!(matches!(
            clear.action,
            TaskAction::Edit { due: None, clear_due: true, .. }
        ));

        assert!(Harness::try_parse_from(["task", "edit", "t1", "--due", "2026-03-01", "--clear-due"]).is_err());
    }
}
