//! Top-goals result cache.
//!
//! Holds the most recent ranked list together with a fingerprint of the
//! goals, tasks and scoring settings it was computed from. The selector cannot observe store
//! mutations, so every mutation path must call [`TopGoalsCache::invalidate`].

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::types::{Goal, ScoredGoal, Task};
use crate::config::{ScoringConfig, SelectionConfig};

struct CacheEntry {
    fingerprint: String,
    computed_at: DateTime<Utc>,
    ranked: Vec<ScoredGoal>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// Single-entry, TTL-bounded cache of the full ranked goal list.
///
/// Shared across threads behind an `Arc`; the only writes are a full replace
/// and a full clear.
pub struct TopGoalsCache {
    entry: Mutex<Option<CacheEntry>>,
    ttl: chrono::Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl TopGoalsCache {
    pub fn new(ttl: std::time::Duration) -> Self {
        Self {
            entry: Mutex::new(None),
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &SelectionConfig) -> Self {
        Self::new(std::time::Duration::from_secs(config.cache_ttl_secs))
    }

    /// Return the cached ranking if it was computed from the same input and
    /// has not outlived the TTL.
    pub fn get(&self, fingerprint: &str, now: DateTime<Utc>) -> Option<Vec<ScoredGoal>> {
        let slot = self.slot();
        let hit = slot
            .as_ref()
            .filter(|entry| entry.fingerprint == fingerprint && now - entry.computed_at < self.ttl)
            .map(|entry| entry.ranked.clone());

        if hit.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        hit
    }

    pub fn set(&self, fingerprint: String, ranked: Vec<ScoredGoal>, now: DateTime<Utc>) {
        *self.slot() = Some(CacheEntry {
            fingerprint,
            computed_at: now,
            ranked,
        });
    }

    /// Drop the cached ranking unconditionally.
    pub fn invalidate(&self) {
        if self.slot().take().is_some() {
            tracing::debug!("top goals cache invalidated");
        }
    }

    pub fn is_empty(&self) -> bool {
        self.slot().is_none()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    // Writes replace or clear the whole entry, so a poisoned lock still holds
    // a consistent value.
    fn slot(&self) -> MutexGuard<'_, Option<CacheEntry>> {
        self.entry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// SHA-256 over the canonical JSON of the selector input and settings.
///
/// Returns `None` if the input cannot be serialized; callers then skip the
/// cache rather than fail.
pub fn fingerprint(
    goals: &[Goal],
    tasks: &[Task],
    scoring: &ScoringConfig,
    selection: &SelectionConfig,
) -> Option<String> {
    match serde_json::to_vec(&(goals, tasks, scoring, selection)) {
        Ok(bytes) => Some(sha256_hex(&bytes)),
        Err(e) => {
            tracing::warn!(error = %e, "failed to fingerprint top goals input, bypassing cache");
            None
        }
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut output = String::with_capacity(digest.len() * 2);
    for byte in digest {
        output.push_str(&format!("{byte:02x}"));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::collections::BTreeMap;

    fn now() -> DateTime<Utc> {
        "2026-03-01T12:00:00Z".parse().unwrap()
    }

    fn ranked(name: &str) -> Vec<ScoredGoal> {
        vec![ScoredGoal {
            goal: Goal::new(name, now()).with_id(name),
            tasks: Vec::new(),
            base_score: 1.0,
            modifiers: BTreeMap::new(),
            score: 1.0,
        }]
    }

    #[test]
    fn hit_requires_matching_fingerprint() {
        let cache = TopGoalsCache::new(std::time::Duration::from_secs(60));
        cache.set("abc".into(), ranked("g"), now());

        assert!(cache.get("abc", now()).is_some());
        assert!(cache.get("xyz", now()).is_none());
        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 1 });
    }

    #[test]
    fn entry_expires_after_ttl() {
        let cache = TopGoalsCache::new(std::time::Duration::from_secs(60));
        cache.set("abc".into(), ranked("g"), now());

        assert!(cache.get("abc", now() + Duration::seconds(59)).is_some());
        assert!(cache.get("abc", now() + Duration::seconds(60)).is_none());
    }

    #[test]
    fn invalidate_clears_entry() {
        let cache = TopGoalsCache::new(std::time::Duration::from_secs(60));
        cache.set("abc".into(), ranked("g"), now());
        assert!(!cache.is_empty());

        cache.invalidate();
        assert!(cache.is_empty());
        assert!(cache.get("abc", now()).is_none());

        // invalidating an empty cache is fine
        cache.invalidate();
    }

    #[test]
    fn set_replaces_previous_entry() {
        let cache = TopGoalsCache::new(std::time::Duration::from_secs(60));
        cache.set("one".into(), ranked("first"), now());
        cache.set("two".into(), ranked("second"), now());

        assert!(cache.get("one", now()).is_none());
        let hit = cache.get("two", now()).unwrap();
        assert_eq!(hit[0].goal.id, "second");
    }

    #[test]
    fn fingerprint_tracks_content() {
        let goals = vec![Goal::new("g", now()).with_id("g")];
        let tasks = vec![Task::new("t", Some("g"), now()).with_id("t")];

        let scoring = ScoringConfig::default();
        let selection = SelectionConfig::default();

        let a = fingerprint(&goals, &tasks, &scoring, &selection).unwrap();
        let b = fingerprint(&goals, &tasks, &scoring, &selection).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);

        let mut changed = tasks.clone();
        changed[0].status = crate::goals::types::TaskStatus::Completed;
        assert_ne!(a, fingerprint(&goals, &changed, &scoring, &selection).unwrap());
    }

    #[test]
    fn fingerprint_tracks_settings() {
        let goals = vec![Goal::new("g", now()).with_id("g")];
        let scoring = ScoringConfig::default();
        let selection = SelectionConfig::default();
        let base = fingerprint(&goals, &[], &scoring, &selection).unwrap();

        let heavier = ScoringConfig {
            overdue_tasks_modifier: 0.5,
            ..ScoringConfig::default()
        };
        assert_ne!(base, fingerprint(&goals, &[], &heavier, &selection).unwrap());

        let wider = SelectionConfig {
            recent_completion_days: 7,
            ..SelectionConfig::default()
        };
        assert_ne!(base, fingerprint(&goals, &[], &scoring, &wider).unwrap());
    }
}
