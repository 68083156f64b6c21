use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct GoalpostConfig {
    pub logging: LoggingConfig,
    pub storage: StorageConfig,
    pub scoring: ScoringConfig,
    pub selection: SelectionConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
}

/// Coefficients for the goal scorer.
///
/// Only the monotonicity of each term is load-bearing; the magnitudes are
/// tunable. See [`crate::goals::score`] for how they combine.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ScoringConfig {
    /// Added to every base score so it is always strictly positive.
    pub base_floor: f64,
    pub recency_weight: f64,
    /// Days after which the recency term halves.
    pub recency_half_life_days: f64,
    pub deadline_weight: f64,
    /// E-folding distance, in days, of the deadline proximity curve.
    pub deadline_horizon_days: f64,
    /// Proximity assumed for goals without a deadline.
    pub deadline_neutral: f64,
    pub subgoal_weight: f64,
    /// Magnitude of the `overdueTasks` modifier.
    pub overdue_tasks_modifier: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct SelectionConfig {
    pub default_count: usize,
    /// Goals that reached 100% within this many days stay eligible.
    pub recent_completion_days: i64,
    pub cache_ttl_secs: u64,
    pub watch_interval_secs: u64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_goalpost_dir()
            .join("goalpost.db")
            .to_string_lossy()
            .into_owned();
        Self { db_path }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            base_floor: 0.05,
            recency_weight: 1.0,
            recency_half_life_days: 7.0,
            deadline_weight: 1.0,
            deadline_horizon_days: 30.0,
            deadline_neutral: 0.25,
            subgoal_weight: 0.5,
            overdue_tasks_modifier: 0.15,
        }
    }
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            default_count: 3,
            recent_completion_days: 3,
            cache_ttl_secs: 300,
            watch_interval_secs: 60,
        }
    }
}

/// Returns `~/.goalpost/`
pub fn default_goalpost_dir() -> PathBuf {
    dirs::home_dir()
        .expect("home directory must exist")
        .join(".goalpost")
}

/// Returns the default config file path: `~/.goalpost/config.toml`
pub fn default_config_path() -> PathBuf {
    default_goalpost_dir().join("config.toml")
}

impl GoalpostConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            GoalpostConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (GOALPOST_DB, GOALPOST_LOG_LEVEL, GOALPOST_TOP_COUNT).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("GOALPOST_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("GOALPOST_LOG_LEVEL") {
            self.logging.log_level = val;
        }
        if let Ok(val) = std::env::var("GOALPOST_TOP_COUNT") {
            match val.parse() {
                Ok(count) => self.selection.default_count = count,
                Err(_) => tracing::warn!(value = %val, "ignoring non-numeric GOALPOST_TOP_COUNT"),
            }
        }
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .expect("home directory must exist")
            .join(rest)
    } else {
        PathBuf::from(path)
    }
}
