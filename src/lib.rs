//! Goal tracking engine — recursive progress rollup and dashboard goal ranking.
//!
//! Goals nest into a tree and own tasks. goalpost keeps them in SQLite,
//! rolls task completion up the tree into a 0–100 progress figure, and picks
//! which goals to feature on a dashboard:
//!
//! | Stage | Function | Notes |
//! |-------|----------|-------|
//! | **Progress** | [`goals::calculate_goal_progression`] | Task-count weighted, recursive, cycle-guarded |
//! | **Score** | [`goals::calculate_goal_score`] | Recency, deadline, sub-goals; `overdueTasks` modifier |
//! | **Select** | [`goals::TopGoalsSelector`] | Eligibility filter, deterministic sort, cached |
//!
//! # Modules
//!
//! - [`config`] — Configuration loading from TOML files and environment variables
//! - [`db`] — SQLite database initialization, schema, migrations, and health checks
//! - [`goals`] — Core engine: types, progress, scoring, selection, cache, store, stats, export/import
//! - [`planner`] — Service tying the store to the ranking cache

pub mod config;
pub mod db;
pub mod goals;
pub mod planner;
