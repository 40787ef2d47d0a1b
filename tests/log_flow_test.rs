//! End-to-end flow over a real on-disk database
//!
//! Exercises the path the mobile client takes: register, check in for a
//! few days, slip and log it, then read back the profile, achievements,
//! and weekly analytics.

use tempfile::tempdir;

use junkstop::coach::CoachClient;
use junkstop::config::CoachConfig;
use junkstop::gamification::{GamificationEngine, GamificationEvent};
use junkstop::server::handlers;
use junkstop::server::ApiState;
use junkstop::store::models::NewLog;
use junkstop::store::{LogDb, LogQuery};

fn state_on_disk(dir: &std::path::Path) -> ApiState {
    let db = LogDb::open(&dir.join("junkstop.db")).unwrap();
    ApiState {
        queries: LogQuery::new(db.clone()),
        engine: GamificationEngine::new(db),
        coach: CoachClient::new(&CoachConfig::default()),
    }
}

fn slip(guilt: u8, cost: f64, calories: i64) -> NewLog {
    NewLog {
        guilt_rating: guilt,
        regret_rating: guilt,
        estimated_cost: cost,
        estimated_calories: calories,
        location: Some("drive-through".to_string()),
        photo_url: None,
    }
}

#[test]
fn test_week_of_checkins_then_slip() {
    let dir = tempdir().unwrap();
    let state = state_on_disk(dir.path());

    let user = state
        .queries
        .create_user("alice@example.com", "alice", 0)
        .unwrap();

    // Seven clean days
    for day in 1..=7 {
        let (streak, _, _) = state.engine.increment_streak(user.id).unwrap();
        assert_eq!(streak.current, day);
    }

    let unlocked = state.queries.unlocked_ids(user.id).unwrap();
    assert!(unlocked.contains(&"first_day".to_string()));
    assert!(unlocked.contains(&"three_day_streak".to_string()));
    assert!(unlocked.contains(&"week_warrior".to_string()));

    // The slip banks the streak and resets it
    let outcome = state
        .engine
        .record_log(user.id, &slip(7, 12.5, 800), None)
        .unwrap();
    assert_eq!(outcome.streak.current, 0);
    assert_eq!(outcome.streak.best, 7);
    assert!(outcome
        .events
        .iter()
        .any(|e| matches!(e, GamificationEvent::StreakBroken { previous: 7, .. })));

    let refreshed = state.queries.get_user(user.id).unwrap().unwrap();
    assert_eq!(refreshed.streak_count, 0);
    assert_eq!(refreshed.best_streak, 7);
}

#[test]
fn test_profile_and_analytics_endpoints_after_logs() {
    let dir = tempdir().unwrap();
    let state = state_on_disk(dir.path());
    let user = state
        .queries
        .create_user("bob@example.com", "bob", 0)
        .unwrap();

    for _ in 0..3 {
        state
            .engine
            .record_log(user.id, &slip(5, 6.0, 450), None)
            .unwrap();
    }

    let (status, profile) = handlers::get_profile(&state, user.id).unwrap();
    assert_eq!(status, 200);
    assert_eq!(profile["stats"]["total_logs"], 3);
    assert_eq!(profile["stats"]["total_saved"], 18.0);
    assert_eq!(profile["stats"]["total_calories_avoided"], 1350);

    let (_, analytics) = handlers::weekly_analytics(&state, user.id).unwrap();
    assert_eq!(analytics["total_logs"], 3);
    assert_eq!(analytics["daily_breakdown"].as_array().unwrap().len(), 7);
    // All three logs landed today, so at most one day is spoiled
    assert!(analytics["clean_days_percent"].as_u64().unwrap() >= 86);

    let (_, badges) = handlers::list_achievements(&state, user.id).unwrap();
    let first_log = badges["achievements"]
        .as_array()
        .unwrap()
        .iter()
        .find(|a| a["id"] == "first_log")
        .unwrap();
    assert_eq!(first_log["unlocked"], true);
}

#[test]
fn test_database_survives_reopen() {
    let dir = tempdir().unwrap();
    let user_id = {
        let state = state_on_disk(dir.path());
        let user = state
            .queries
            .create_user("carol@example.com", "carol", 0)
            .unwrap();
        state
            .engine
            .record_log(user.id, &slip(8, 4.0, 300), None)
            .unwrap();
        user.id
    };

    let state = state_on_disk(dir.path());
    let logs = state.queries.list_logs(user_id, 10, 0).unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].guilt_rating, 8);
    assert_eq!(logs[0].location.as_deref(), Some("drive-through"));

    let unlocked = state.queries.unlocked_ids(user_id).unwrap();
    assert!(unlocked.contains(&"first_log".to_string()));
}
