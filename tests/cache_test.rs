mod helpers;

use chrono::Duration;
use goalpost::config::{ScoringConfig, SelectionConfig};
use goalpost::goals::cache::CacheStats;
use goalpost::goals::store::NewGoal;
use goalpost::goals::{TopGoalsCache, TopGoalsSelector};

#[test]
fn ttl_expiry_forces_recompute() {
    let cache = TopGoalsCache::new(std::time::Duration::from_secs(60));
    let scoring = ScoringConfig::default();
    let selection = SelectionConfig::default();
    let selector = TopGoalsSelector::new(&cache, &scoring, &selection);
    let goals = vec![helpers::goal("a")];

    selector.top_goals(&goals, &[], 1, true, helpers::now());
    selector.top_goals(&goals, &[], 1, true, helpers::now() + Duration::seconds(30));
    assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 1 });

    selector.top_goals(&goals, &[], 1, true, helpers::now() + Duration::seconds(90));
    assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 2 });
}

#[test]
fn repeated_planner_reads_hit_the_cache() {
    let planner = helpers::test_planner();
    planner
        .create_goal(
            &NewGoal {
                name: "g".into(),
                ..NewGoal::default()
            },
            helpers::now(),
        )
        .unwrap();

    let first = planner.top_goals(3, true, helpers::now()).unwrap();
    let second = planner.top_goals(3, true, helpers::now()).unwrap();
    assert_eq!(first, second);
    assert_eq!(planner.cache().stats().hits, 1);

    planner.invalidate_top_goals();
    assert!(planner.cache().is_empty());
    planner.top_goals(3, true, helpers::now()).unwrap();
    assert_eq!(planner.cache().stats().misses, 2);
}

#[test]
fn external_write_is_seen_after_invalidation() {
    let tmp = tempfile::TempDir::new().unwrap();
    let db_path = tmp.path().join("goals.db");

    let mut config = goalpost::config::GoalpostConfig::default();
    config.storage.db_path = db_path.to_string_lossy().into_owned();
    let planner = goalpost::planner::Planner::open(config).unwrap();
    assert!(planner.top_goals(3, true, helpers::now()).unwrap().is_empty());
    let before = planner.data_version().unwrap();

    // A second connection plays the part of another process.
    let mut other = goalpost::db::open_database(&db_path).unwrap();
    helpers::add_goal(&mut other, "from elsewhere", None);

    assert_ne!(planner.data_version().unwrap(), before);
    planner.invalidate_top_goals();
    let top = planner.top_goals(3, true, helpers::now()).unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].goal.name, "from elsewhere");
}
