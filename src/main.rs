mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use goalpost::config::GoalpostConfig;

#[derive(Parser)]
#[command(name = "goalpost", version, about = "Goal tracking with progress rollup and top-goal ranking")]
struct Cli {
    /// Path to a config file (defaults to ~/.goalpost/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the featured goals, best first
    Top {
        /// Number of goals to show (defaults to selection.default_count)
        #[arg(short, long)]
        count: Option<usize>,
        /// Recompute instead of using the ranking cache
        #[arg(long)]
        no_cache: bool,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show computed progress for one goal, or for every goal
    Progress {
        goal_id: Option<String>,
    },
    /// Manage goals
    Goal {
        #[command(subcommand)]
        action: cli::goal::GoalAction,
    },
    /// Manage tasks
    Task {
        #[command(subcommand)]
        action: cli::task::TaskAction,
    },
    /// Manage categories
    Category {
        #[command(subcommand)]
        action: cli::category::CategoryAction,
    },
    /// Recompute and store progress for every goal
    Refresh,
    /// Show goal and task statistics
    Stats,
    /// Run database diagnostics
    Doctor,
    /// Export all categories, goals, and tasks as JSON to stdout
    Export,
    /// Import categories, goals, and tasks from a JSON export
    Import {
        file: PathBuf,
    },
    /// Delete all data after confirmation
    Reset,
    /// Periodically re-render the featured goals
    Watch {
        /// Seconds between refreshes (defaults to selection.watch_interval_secs)
        #[arg(short, long)]
        interval: Option<u64>,
        #[arg(short, long)]
        count: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => GoalpostConfig::load_from(path)?,
        None => GoalpostConfig::load()?,
    };

    // Log to stderr so stdout stays clean for command output.
    let filter = EnvFilter::try_new(&config.logging.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Top {
            count,
            no_cache,
            json,
        } => cli::top::top(&config, count, !no_cache, json)?,
        Command::Progress { goal_id } => cli::progress::progress(&config, goal_id.as_deref())?,
        Command::Goal { action } => cli::goal::run(&config, action)?,
        Command::Task { action } => cli::task::run(&config, action)?,
        Command::Category { action } => cli::category::run(&config, action)?,
        Command::Refresh => cli::progress::refresh(&config)?,
        Command::Stats => cli::stats::stats(&config)?,
        Command::Doctor => cli::doctor::doctor(&config)?,
        Command::Export => cli::export::export(&config)?,
        Command::Import { file } => cli::import::import(&config, &file)?,
        Command::Reset => cli::reset::reset(&config)?,
        Command::Watch { interval, count } => cli::watch::watch(config, interval, count).await?,
    }

    Ok(())
}
