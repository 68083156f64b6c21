//! Goal tracking core: types, progress rollup, scoring, selection, caching,
//! persistence, and export/import.

pub mod cache;
pub mod progress;
pub mod score;
pub mod select;
pub mod stats;
pub mod store;
pub mod transfer;
pub mod types;

pub use cache::TopGoalsCache;
pub use progress::calculate_goal_progression;
pub use score::calculate_goal_score;
pub use select::TopGoalsSelector;
pub use types::{Goal, ScoredGoal, Task, TaskStatus};
