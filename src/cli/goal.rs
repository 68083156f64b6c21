use anyhow::Result;
use chrono::Utc;
use clap::Subcommand;

use goalpost::config::GoalpostConfig;
use goalpost::goals::store::{GoalUpdate, NewGoal};

use super::{open_planner, parse_datetime, set_or_clear};

#[derive(Subcommand)]
pub enum GoalAction {
    /// Create a goal
    Add {
        name: String,
        #[arg(short, long, default_value = "")]
        description: String,
        /// Category id
        #[arg(long)]
        category: Option<String>,
        /// Deadline (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        deadline: Option<String>,
        /// Parent goal id, making this a sub-goal
        #[arg(long)]
        parent: Option<String>,
        /// Sort key among siblings
        #[arg(long, default_value_t = 0)]
        order: i64,
    },
    /// Change a goal's name, description, category, deadline, or order
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Category id
        #[arg(long, conflicts_with = "clear_category")]
        category: Option<String>,
        #[arg(long)]
        clear_category: bool,
        #[arg(long, conflicts_with = "clear_deadline")]
        deadline: Option<String>,
        #[arg(long)]
        clear_deadline: bool,
        #[arg(long)]
        order: Option<i64>,
    },
    /// Hide a goal from the featured rotation
    Archive { id: String },
    /// Return an archived goal to the rotation
    Unarchive { id: String },
    /// Re-parent a goal (omit --parent to make it top-level)
    Move {
        id: String,
        #[arg(long)]
        parent: Option<String>,
    },
    /// Delete a goal; sub-goals become top-level and tasks are orphaned
    Delete { id: String },
}

pub fn run(config: &GoalpostConfig, action: GoalAction) -> Result<()> {
    let planner = open_planner(config)?;
    let now = Utc::now();

    match action {
        GoalAction::Add {
            name,
            description,
            category,
            deadline,
            parent,
            order,
        } => {
            let new = NewGoal {
                name,
                description,
                category_id: category,
                deadline: deadline.as_deref().map(parse_datetime).transpose()?,
                parent_goal_id: parent,
                order,
            };
            let goal = planner.create_goal(&new, now)?;
            println!("Created goal {} ({})", goal.id, goal.name);
        }
        GoalAction::Edit {
            id,
            name,
            description,
            category,
            clear_category,
            deadline,
            clear_deadline,
            order,
        } => {
            let deadline = deadline.as_deref().map(parse_datetime).transpose()?;
            let update = GoalUpdate {
                name,
                description,
                category_id: set_or_clear(category, clear_category),
                deadline: set_or_clear(deadline, clear_deadline),
                order,
            };
            let goal = planner.update_goal(&id, &update, now)?;
            println!("Updated goal {} ({})", goal.id, goal.name);
        }
        GoalAction::Archive { id } => {
            planner.set_goal_archived(&id, true, now)?;
            println!("Archived goal {id}");
        }
        GoalAction::Unarchive { id } => {
            planner.set_goal_archived(&id, false, now)?;
            println!("Unarchived goal {id}");
        }
        GoalAction::Move { id, parent } => {
            planner.move_goal(&id, parent.as_deref(), now)?;
            match parent {
                Some(parent) => println!("Moved goal {id} under {parent}"),
                None => println!("Moved goal {id} to the top level"),
            }
        }
        GoalAction::Delete { id } => {
            planner.delete_goal(&id, now)?;
            println!("Deleted goal {id}");
        }
    }
    Ok(())
}
