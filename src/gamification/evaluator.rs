//! Achievement unlock predicates
//!
//! Pure functions mapping [`UserStats`] (plus optional event context) to
//! unlock decisions. Already-unlocked ids are skipped, never re-evaluated, so
//! running the evaluator twice on unchanged stats unlocks nothing further.

use chrono::Weekday;

use super::catalog::{Achievement, AchievementId};
use crate::store::models::UserStats;

/// Context for the evaluation pass.
///
/// `log_hour` is the local hour-of-day of the triggering log and is only
/// present when the evaluation was caused by a new log; the two time-of-day
/// badges fire exclusively from it.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext {
    pub weekday: Weekday,
    pub log_hour: Option<u32>,
}

/// Evaluate all currently-locked achievements against the given stats.
/// Returns the ids that should transition to unlocked, in catalog order.
pub fn evaluate(
    stats: &UserStats,
    unlocked: &[String],
    ctx: &EvalContext,
) -> Vec<AchievementId> {
    let mut newly_unlocked = Vec::new();

    newly_unlocked.extend(check_streak_achievements(stats, unlocked));
    newly_unlocked.extend(check_milestone_achievements(stats, unlocked));
    newly_unlocked.extend(check_social_achievements(stats, unlocked));
    newly_unlocked.extend(check_special_achievements(stats, ctx, unlocked));
    newly_unlocked.extend(check_challenge_achievements(stats, unlocked));

    newly_unlocked
}

fn is_locked(id: AchievementId, unlocked: &[String]) -> bool {
    !unlocked.iter().any(|u| u == id.as_str())
}

/// Streak-length achievements (5 badges)
pub fn check_streak_achievements(stats: &UserStats, unlocked: &[String]) -> Vec<AchievementId> {
    let milestones = [
        (1, AchievementId::FirstDay),
        (3, AchievementId::ThreeDayStreak),
        (7, AchievementId::WeekWarrior),
        (30, AchievementId::MonthMaster),
        (100, AchievementId::CenturyClub),
    ];

    milestones
        .into_iter()
        .filter(|(threshold, id)| stats.current_streak >= *threshold && is_locked(*id, unlocked))
        .map(|(_, id)| id)
        .collect()
}

/// Logging and savings milestones (5 badges)
pub fn check_milestone_achievements(stats: &UserStats, unlocked: &[String]) -> Vec<AchievementId> {
    let mut newly_unlocked = Vec::new();

    let log_milestones = [
        (1, AchievementId::FirstLog),
        (10, AchievementId::TenLogs),
        (100, AchievementId::HundredLogs),
    ];
    for (threshold, id) in log_milestones {
        if stats.total_logs >= threshold && is_locked(id, unlocked) {
            newly_unlocked.push(id);
        }
    }

    if stats.total_saved >= 100.0 && is_locked(AchievementId::MoneySaver, unlocked) {
        newly_unlocked.push(AchievementId::MoneySaver);
    }

    if stats.total_calories_avoided >= 10_000 && is_locked(AchievementId::CalorieConscious, unlocked) {
        newly_unlocked.push(AchievementId::CalorieConscious);
    }

    newly_unlocked
}

/// Community achievements (3 badges)
pub fn check_social_achievements(stats: &UserStats, unlocked: &[String]) -> Vec<AchievementId> {
    let mut newly_unlocked = Vec::new();

    if stats.total_posts >= 1 && is_locked(AchievementId::FirstPost, unlocked) {
        newly_unlocked.push(AchievementId::FirstPost);
    }
    if stats.total_likes_given >= 10 && is_locked(AchievementId::SupportiveFriend, unlocked) {
        newly_unlocked.push(AchievementId::SupportiveFriend);
    }
    if stats.total_likes_received >= 10 && is_locked(AchievementId::Inspiration, unlocked) {
        newly_unlocked.push(AchievementId::Inspiration);
    }

    newly_unlocked
}

/// Time-of-day and weekend achievements (up to 3 badges)
///
/// `holiday_hero` has no automatic predicate: nothing in the stats says
/// whether a day was a holiday, so it stays manual.
pub fn check_special_achievements(
    stats: &UserStats,
    ctx: &EvalContext,
    unlocked: &[String],
) -> Vec<AchievementId> {
    let mut newly_unlocked = Vec::new();

    if let Some(hour) = ctx.log_hour {
        // Early Bird: logged before 9 AM
        if hour < 9 && is_locked(AchievementId::EarlyBird, unlocked) {
            newly_unlocked.push(AchievementId::EarlyBird);
        }
        // Night Owl: logged at or after 10 PM
        if hour >= 22 && is_locked(AchievementId::NightOwl, unlocked) {
            newly_unlocked.push(AchievementId::NightOwl);
        }
    }

    // Weekend Warrior: checked on Mondays with a streak that spans back
    // at least 3 days. Does not verify the streak covered Sat+Sun exactly.
    if ctx.weekday == Weekday::Mon
        && stats.current_streak >= 3
        && is_locked(AchievementId::WeekendWarrior, unlocked)
    {
        newly_unlocked.push(AchievementId::WeekendWarrior);
    }

    newly_unlocked
}

/// Challenge achievements (1 automatic badge)
///
/// `no_sweets_week` and `no_fast_food_month` need per-category log
/// classification that the stats projection does not carry; they are listed
/// in the catalog but never unlock automatically.
pub fn check_challenge_achievements(stats: &UserStats, unlocked: &[String]) -> Vec<AchievementId> {
    let mut newly_unlocked = Vec::new();

    // Guilt Free: trailing 7-day average guilt under 3. A missing average
    // (no logs in the window) means the predicate is simply not met.
    if let Some(avg) = stats.average_guilt_score {
        if avg < 3.0 && is_locked(AchievementId::GuiltFreeWeek, unlocked) {
            newly_unlocked.push(AchievementId::GuiltFreeWeek);
        }
    }

    newly_unlocked
}

/// Current progress toward a progressive achievement, capped at its target.
/// Returns `None` for badges without a progress bar or whose progress is not
/// derivable from the stats.
pub fn progress_for(id: AchievementId, stats: &UserStats) -> Option<(u32, u32)> {
    let max = Achievement::get(id).max_progress?;

    let current = match id {
        AchievementId::FirstDay
        | AchievementId::ThreeDayStreak
        | AchievementId::WeekWarrior
        | AchievementId::MonthMaster
        | AchievementId::CenturyClub => stats.current_streak,
        AchievementId::FirstLog | AchievementId::TenLogs | AchievementId::HundredLogs => {
            stats.total_logs.min(u32::MAX as u64) as u32
        }
        AchievementId::MoneySaver => stats.total_saved.max(0.0) as u32,
        AchievementId::CalorieConscious => {
            stats.total_calories_avoided.max(0).min(u32::MAX as i64) as u32
        }
        AchievementId::FirstPost => stats.total_posts.min(u32::MAX as u64) as u32,
        AchievementId::SupportiveFriend => stats.total_likes_given.min(u32::MAX as u64) as u32,
        AchievementId::Inspiration => stats.total_likes_received.min(u32::MAX as u64) as u32,
        _ => return None,
    };

    Some((current.min(max), max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    fn stats() -> UserStats {
        UserStats {
            total_logs: 0,
            current_streak: 0,
            best_streak: 0,
            total_saved: 0.0,
            total_calories_avoided: 0,
            total_likes_given: 0,
            total_likes_received: 0,
            total_posts: 0,
            average_guilt_score: None,
            join_date: 0,
        }
    }

    fn ctx(weekday: Weekday, log_hour: Option<u32>) -> EvalContext {
        EvalContext { weekday, log_hour }
    }

    #[test]
    fn test_log_milestones_unlock_at_thresholds() {
        let mut s = stats();
        s.total_logs = 10;

        let ids = evaluate(&s, &[], &ctx(Weekday::Wed, None));
        assert!(ids.contains(&AchievementId::FirstLog));
        assert!(ids.contains(&AchievementId::TenLogs));
        assert!(!ids.contains(&AchievementId::HundredLogs));
    }

    #[test]
    fn test_evaluate_is_idempotent() {
        let mut s = stats();
        s.total_logs = 10;
        s.current_streak = 7;

        let first = evaluate(&s, &[], &ctx(Weekday::Wed, None));
        assert!(!first.is_empty());

        let unlocked: Vec<String> = first.iter().map(|id| id.as_str().to_string()).collect();
        let second = evaluate(&s, &unlocked, &ctx(Weekday::Wed, None));
        assert!(second.is_empty());
    }

    #[test]
    fn test_time_of_day_badges_need_event_context() {
        let s = stats();

        // Hour 23 triggers night owl only
        let ids = evaluate(&s, &[], &ctx(Weekday::Tue, Some(23)));
        assert_eq!(ids, vec![AchievementId::NightOwl]);

        // Hour 14 triggers neither
        let ids = evaluate(&s, &[], &ctx(Weekday::Tue, Some(14)));
        assert!(ids.is_empty());

        // No event context: no time-of-day badges even at stats level
        let ids = evaluate(&s, &[], &ctx(Weekday::Tue, None));
        assert!(ids.is_empty());
    }

    #[test]
    fn test_weekend_warrior_monday_heuristic() {
        let mut s = stats();
        s.current_streak = 3;

        let ids = check_special_achievements(&s, &ctx(Weekday::Mon, None), &[]);
        assert_eq!(ids, vec![AchievementId::WeekendWarrior]);

        let ids = check_special_achievements(&s, &ctx(Weekday::Sun, None), &[]);
        assert!(ids.is_empty());

        s.current_streak = 2;
        let ids = check_special_achievements(&s, &ctx(Weekday::Mon, None), &[]);
        assert!(ids.is_empty());
    }

    #[test]
    fn test_guilt_free_week_skipped_without_average() {
        let mut s = stats();
        s.average_guilt_score = None;
        assert!(check_challenge_achievements(&s, &[]).is_empty());

        s.average_guilt_score = Some(2.5);
        assert_eq!(
            check_challenge_achievements(&s, &[]),
            vec![AchievementId::GuiltFreeWeek]
        );

        s.average_guilt_score = Some(3.0);
        assert!(check_challenge_achievements(&s, &[]).is_empty());
    }

    #[test]
    fn test_streak_badges() {
        let mut s = stats();
        s.current_streak = 100;
        let ids = check_streak_achievements(&s, &[]);
        assert_eq!(ids.len(), 5);

        // With week_warrior already unlocked it is skipped
        let unlocked = vec![AchievementId::WeekWarrior.as_str().to_string()];
        let ids = check_streak_achievements(&s, &unlocked);
        assert_eq!(ids.len(), 4);
        assert!(!ids.contains(&AchievementId::WeekWarrior));
    }

    #[test]
    fn test_manual_badges_never_auto_unlock() {
        let mut s = stats();
        s.total_logs = 1_000;
        s.current_streak = 365;
        s.total_saved = 10_000.0;
        s.total_calories_avoided = 1_000_000;
        s.total_posts = 50;
        s.total_likes_given = 500;
        s.total_likes_received = 500;
        s.average_guilt_score = Some(1.0);

        let ids = evaluate(&s, &[], &ctx(Weekday::Mon, Some(23)));
        assert!(!ids.contains(&AchievementId::HolidayHero));
        assert!(!ids.contains(&AchievementId::NoSweetsWeek));
        assert!(!ids.contains(&AchievementId::NoFastFoodMonth));
    }

    #[test]
    fn test_progress_capped_at_target() {
        let mut s = stats();
        s.total_logs = 250;
        s.current_streak = 5;

        assert_eq!(progress_for(AchievementId::HundredLogs, &s), Some((100, 100)));
        assert_eq!(progress_for(AchievementId::WeekWarrior, &s), Some((5, 7)));
        assert_eq!(progress_for(AchievementId::NightOwl, &s), None);
    }
}
