//! Gamification engine
//!
//! Achievement catalog, XP levels, streak counters, and the engine that
//! applies them transactionally when a log is recorded.

pub mod catalog;
pub mod evaluator;
pub mod levels;
pub mod streaks;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Datelike, Local, Timelike, Utc};

pub use catalog::{Achievement, AchievementId, AchievementKind, Rarity, ACHIEVEMENTS};
pub use evaluator::EvalContext;
pub use levels::LevelInfo;
pub use streaks::{current_streak, StreakCounters, StreakStanding};

use crate::progress;
use crate::store::models::{LogEntry, NewLog};
use crate::store::{queries, LogDb};

/// An achievement that was just unlocked
#[derive(Debug, Clone)]
pub struct UnlockedBadge {
    pub achievement: &'static Achievement,
    pub unlocked_at: i64,
}

/// A level up caused by newly awarded XP
#[derive(Debug, Clone)]
pub struct LevelUp {
    pub old_level: u32,
    pub new_level: u32,
}

/// Events emitted while applying a user action
#[derive(Debug, Clone)]
pub enum GamificationEvent {
    AchievementUnlocked(UnlockedBadge),
    LevelUp(LevelUp),
    /// A log broke the streak in flight; `banked_best` is the best streak
    /// after the broken run was folded in.
    StreakBroken { previous: u32, banked_best: u32 },
    StreakExtended { count: u32, is_new_record: bool },
}

/// Outcome of recording a log
#[derive(Debug, Clone)]
pub struct RecordOutcome {
    pub log: LogEntry,
    pub streak: StreakCounters,
    pub events: Vec<GamificationEvent>,
}

/// Total XP for a set of unlocked achievement ids. Unknown ids are ignored
/// so a catalog change never corrupts a profile.
pub fn xp_for_unlocked(unlocked: &[String]) -> u32 {
    unlocked
        .iter()
        .filter_map(|id| AchievementId::from_str(id))
        .map(|id| Achievement::get(id).xp_reward)
        .sum()
}

/// Engine applying streak, achievement, and level rules against the store.
///
/// Every user action runs in a single transaction: the log row, the streak
/// update, and any unlock rows land together or not at all.
#[derive(Clone)]
pub struct GamificationEngine {
    db: LogDb,
}

impl GamificationEngine {
    pub fn new(db: LogDb) -> Self {
        Self { db }
    }

    fn now_ms() -> i64 {
        Utc::now().timestamp_millis()
    }

    /// Record a junk food incident for a user.
    pub fn record_log(
        &self,
        user_id: i64,
        new_log: &NewLog,
        ai_motivation: Option<String>,
    ) -> Result<RecordOutcome> {
        self.record_log_at(user_id, new_log, ai_motivation, Self::now_ms())
    }

    /// Record a log at an explicit timestamp. Split out so tests can pin
    /// the clock.
    pub fn record_log_at(
        &self,
        user_id: i64,
        new_log: &NewLog,
        ai_motivation: Option<String>,
        now_ms: i64,
    ) -> Result<RecordOutcome> {
        new_log.validate().map_err(|e| anyhow!(e))?;

        let mut events = Vec::new();
        let mut conn = self.db.conn();
        let tx = conn.transaction()?;

        let user = queries::get_user_with(&tx, user_id)?
            .ok_or_else(|| anyhow!("user {user_id} not found"))?;

        let bucket = progress::day_bucket(now_ms);
        tx.execute(
            "INSERT INTO logs (user_id, guilt_rating, regret_rating, estimated_cost,
                               estimated_calories, location, photo_url, ai_motivation,
                               created_at, day_bucket)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            (
                user_id,
                new_log.guilt_rating,
                new_log.regret_rating,
                new_log.estimated_cost,
                new_log.estimated_calories,
                &new_log.location,
                &new_log.photo_url,
                &ai_motivation,
                now_ms,
                &bucket,
            ),
        )?;
        let log_id = tx.last_insert_rowid();

        // A log always breaks the streak; the run in flight is banked first
        let before = StreakCounters {
            current: user.streak_count,
            best: user.best_streak,
        };
        let streak = before.record_log();
        tx.execute(
            "UPDATE users SET streak_count = ?1, best_streak = ?2 WHERE id = ?3",
            (streak.current, streak.best, user_id),
        )?;
        if before.current > 0 {
            events.push(GamificationEvent::StreakBroken {
                previous: before.current,
                banked_best: streak.best,
            });
        }

        let mut updated_user = user.clone();
        updated_user.streak_count = streak.current;
        updated_user.best_streak = streak.best;

        let local: DateTime<Local> = DateTime::from_timestamp_millis(now_ms)
            .unwrap_or(DateTime::UNIX_EPOCH)
            .with_timezone(&Local);
        let ctx = EvalContext {
            weekday: local.weekday(),
            log_hour: Some(local.hour()),
        };
        self.apply_unlocks(&tx, &updated_user, now_ms, &ctx, &mut events)?;

        tx.commit()?;

        let log = LogEntry {
            id: log_id,
            user_id,
            guilt_rating: new_log.guilt_rating,
            regret_rating: new_log.regret_rating,
            estimated_cost: new_log.estimated_cost,
            estimated_calories: new_log.estimated_calories,
            location: new_log.location.clone(),
            photo_url: new_log.photo_url.clone(),
            ai_motivation,
            created_at: now_ms,
            day_bucket: bucket,
        };

        Ok(RecordOutcome { log, streak, events })
    }

    /// Explicit daily check-in: extend the streak without logging.
    /// Returns the updated counters and any events (new badges, level ups).
    pub fn increment_streak(
        &self,
        user_id: i64,
    ) -> Result<(StreakCounters, bool, Vec<GamificationEvent>)> {
        self.increment_streak_at(user_id, Self::now_ms())
    }

    pub fn increment_streak_at(
        &self,
        user_id: i64,
        now_ms: i64,
    ) -> Result<(StreakCounters, bool, Vec<GamificationEvent>)> {
        let mut events = Vec::new();
        let mut conn = self.db.conn();
        let tx = conn.transaction()?;

        let user = queries::get_user_with(&tx, user_id)?
            .ok_or_else(|| anyhow!("user {user_id} not found"))?;

        let before = StreakCounters {
            current: user.streak_count,
            best: user.best_streak,
        };
        let (streak, is_new_record) = before.increment();
        tx.execute(
            "UPDATE users SET streak_count = ?1, best_streak = ?2 WHERE id = ?3",
            (streak.current, streak.best, user_id),
        )?;
        events.push(GamificationEvent::StreakExtended {
            count: streak.current,
            is_new_record,
        });

        let mut updated_user = user.clone();
        updated_user.streak_count = streak.current;
        updated_user.best_streak = streak.best;

        // No triggering log here, so time-of-day badges cannot fire
        let local: DateTime<Local> = DateTime::from_timestamp_millis(now_ms)
            .unwrap_or(DateTime::UNIX_EPOCH)
            .with_timezone(&Local);
        let ctx = EvalContext {
            weekday: local.weekday(),
            log_hour: None,
        };
        self.apply_unlocks(&tx, &updated_user, now_ms, &ctx, &mut events)?;

        tx.commit()?;
        Ok((streak, is_new_record, events))
    }

    /// Manually unlock a badge that has no automatic predicate
    /// (holiday_hero and the food-specific challenges). Returns `None`
    /// when it was already unlocked.
    pub fn unlock_manual(&self, user_id: i64, id: AchievementId) -> Result<Option<UnlockedBadge>> {
        let now = Self::now_ms();
        let conn = self.db.conn();
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO achievements (user_id, achievement_id, unlocked_at) VALUES (?1, ?2, ?3)",
            (user_id, id.as_str(), now),
        )?;
        if inserted == 0 {
            return Ok(None);
        }
        Ok(Some(UnlockedBadge {
            achievement: Achievement::get(id),
            unlocked_at: now,
        }))
    }

    /// Run the evaluator against fresh stats and persist any new unlocks,
    /// pushing unlock and level-up events. Must be called with the user row
    /// already updated inside the same transaction.
    fn apply_unlocks(
        &self,
        tx: &rusqlite::Transaction<'_>,
        user: &crate::store::models::User,
        now_ms: i64,
        ctx: &EvalContext,
        events: &mut Vec<GamificationEvent>,
    ) -> Result<()> {
        let stats = queries::user_stats_with(tx, user, now_ms)?;
        let unlocked = queries::unlocked_ids_with(tx, user.id)?;
        let old_level = LevelInfo::for_xp(xp_for_unlocked(&unlocked));

        let newly_unlocked = evaluator::evaluate(&stats, &unlocked, ctx);
        let mut awarded_xp = 0u32;
        for id in newly_unlocked {
            tx.execute(
                "INSERT OR IGNORE INTO achievements (user_id, achievement_id, unlocked_at) VALUES (?1, ?2, ?3)",
                (user.id, id.as_str(), now_ms),
            )?;
            let achievement = Achievement::get(id);
            awarded_xp += achievement.xp_reward;
            events.push(GamificationEvent::AchievementUnlocked(UnlockedBadge {
                achievement,
                unlocked_at: now_ms,
            }));
        }

        if awarded_xp > 0 {
            let new_level = LevelInfo::for_xp(old_level.total_xp + awarded_xp);
            if new_level.level > old_level.level {
                events.push(GamificationEvent::LevelUp(LevelUp {
                    old_level: old_level.level,
                    new_level: new_level.level,
                }));
            }
        }

        Ok(())
    }
}
