//! CLI `watch` command — the dashboard rotation loop.
//!
//! Every tick the loop compares SQLite's `data_version` with the last one it
//! saw. A change means another process committed, so the cached ranking is
//! dropped before the top goals are served again through the cache.

use anyhow::{Context, Result};
use chrono::Utc;
use std::time::Duration;

use goalpost::config::GoalpostConfig;
use goalpost::planner::Planner;

use super::top::print_top_goals;

pub async fn watch(config: GoalpostConfig, interval: Option<u64>, count: Option<usize>) -> Result<()> {
    let planner = tokio::task::spawn_blocking(move || Planner::open(config))
        .await
        .context("planner setup panicked")??;

    let selection = &planner.config().selection;
    let secs = interval.unwrap_or(selection.watch_interval_secs).max(1);
    let count = count.unwrap_or(selection.default_count);

    tracing::info!(interval_secs = secs, count, "watching top goals");
    let mut ticker = tokio::time::interval(Duration::from_secs(secs));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut last_version: Option<i64> = None;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let planner = planner.clone();
                last_version = Some(
                    tokio::task::spawn_blocking(move || render(&planner, count, last_version))
                        .await
                        .context("watch tick panicked")??,
                );
            }
            result = &mut shutdown => {
                result.context("failed to listen for Ctrl-C")?;
                println!();
                tracing::info!("watch stopped");
                break;
            }
        }
    }

    Ok(())
}

/// One tick: invalidate on external change, then print. Returns the
/// `data_version` observed.
fn render(planner: &Planner, count: usize, last_version: Option<i64>) -> Result<i64> {
    let version = planner.data_version()?;
    if last_version.is_some_and(|last| last != version) {
        tracing::debug!(version, "database changed; dropping cached ranking");
        planner.invalidate_top_goals();
    }

    let now = Utc::now();
    let top = planner.top_goals(count, true, now)?;

    let stats = planner.cache().stats();
    tracing::debug!(hits = stats.hits, misses = stats.misses, "top goals cache");

    println!("── Top goals @ {} ──", now.format("%Y-%m-%d %H:%M:%S"));
    print_top_goals(&top);
    println!();
    Ok(version)
}
