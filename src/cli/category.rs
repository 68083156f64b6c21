use anyhow::Result;
use chrono::Utc;
use clap::Subcommand;

use goalpost::config::GoalpostConfig;

use super::open_planner;

#[derive(Subcommand)]
pub enum CategoryAction {
    /// Create a category
    Add { name: String },
    /// List categories
    List,
    /// Delete a category; its goals keep existing uncategorised
    Delete { id: String },
}

pub fn run(config: &GoalpostConfig, action: CategoryAction) -> Result<()> {
    let planner = open_planner(config)?;

    match action {
        CategoryAction::Add { name } => {
            let category = planner.create_category(&name, Utc::now())?;
            println!("Created category {} ({})", category.id, category.name);
        }
        CategoryAction::List => {
            let categories = planner.categories()?;
            if categories.is_empty() {
                println!("No categories.");
            }
            for category in categories {
                println!("{}  {}", category.id, category.name);
            }
        }
        CategoryAction::Delete { id } => {
            planner.delete_category(&id, Utc::now())?;
            println!("Deleted category {id}");
        }
    }
    Ok(())
}
