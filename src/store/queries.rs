//! Read and write queries over the accountability database

use anyhow::{bail, Result};
use rusqlite::{OptionalExtension, Row};

use super::db::LogDb;
use super::models::{LogEntry, Post, UnlockedAchievement, User, UserStats};

const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Query layer shared by the HTTP handlers and the CLI
#[derive(Clone)]
pub struct LogQuery {
    db: LogDb,
}

impl LogQuery {
    pub fn new(db: LogDb) -> Self {
        Self { db }
    }

    // ========================================
    // USERS
    // ========================================

    pub fn create_user(&self, email: &str, username: &str, now_ms: i64) -> Result<User> {
        let conn = self.db.conn();
        let existing: Option<i64> = conn
            .query_row("SELECT id FROM users WHERE email = ?1", [email], |r| r.get(0))
            .optional()?;
        if existing.is_some() {
            bail!("user with email {email} already exists");
        }

        conn.execute(
            "INSERT INTO users (email, username, streak_count, best_streak, created_at) VALUES (?1, ?2, 0, 0, ?3)",
            (email, username, now_ms),
        )?;
        let id = conn.last_insert_rowid();

        Ok(User {
            id,
            email: email.to_string(),
            username: username.to_string(),
            streak_count: 0,
            best_streak: 0,
            created_at: now_ms,
        })
    }

    pub fn get_user(&self, id: i64) -> Result<Option<User>> {
        get_user_with(&self.db.conn(), id)
    }

    // ========================================
    // LOGS
    // ========================================

    /// A page of the user's logs, newest first
    pub fn list_logs(&self, user_id: i64, limit: u32, offset: u32) -> Result<Vec<LogEntry>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, guilt_rating, regret_rating, estimated_cost, estimated_calories,
                    location, photo_url, ai_motivation, created_at, day_bucket
             FROM logs WHERE user_id = ?1 ORDER BY created_at DESC LIMIT ?2 OFFSET ?3",
        )?;
        let logs: Vec<LogEntry> = stmt
            .query_map((user_id, limit, offset), row_to_log)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(logs)
    }

    /// All logs for a user created at or after the cutoff, oldest first
    pub fn logs_since(&self, user_id: i64, cutoff_ms: i64) -> Result<Vec<LogEntry>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, guilt_rating, regret_rating, estimated_cost, estimated_calories,
                    location, photo_url, ai_motivation, created_at, day_bucket
             FROM logs WHERE user_id = ?1 AND created_at >= ?2 ORDER BY created_at ASC",
        )?;
        let logs: Vec<LogEntry> = stmt
            .query_map((user_id, cutoff_ms), row_to_log)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(logs)
    }

    /// Timestamp of the user's most recent log, if any
    pub fn last_log_ms(&self, user_id: i64) -> Result<Option<i64>> {
        let conn = self.db.conn();
        let ts: Option<i64> = conn.query_row(
            "SELECT MAX(created_at) FROM logs WHERE user_id = ?1",
            [user_id],
            |r| r.get(0),
        )?;
        Ok(ts)
    }

    // ========================================
    // ACHIEVEMENTS
    // ========================================

    /// Unlocked achievement ids for a user
    pub fn unlocked_ids(&self, user_id: i64) -> Result<Vec<String>> {
        unlocked_ids_with(&self.db.conn(), user_id)
    }

    /// Unlocked achievements with their unlock timestamps
    pub fn unlocked(&self, user_id: i64) -> Result<Vec<UnlockedAchievement>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT achievement_id, unlocked_at FROM achievements WHERE user_id = ?1 ORDER BY unlocked_at ASC",
        )?;
        let rows: Vec<UnlockedAchievement> = stmt
            .query_map([user_id], |row| {
                Ok(UnlockedAchievement {
                    achievement_id: row.get(0)?,
                    unlocked_at: row.get(1)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    // ========================================
    // STATS PROJECTION
    // ========================================

    /// Build the aggregated stats projection fed to the achievement
    /// evaluator and the profile endpoint.
    pub fn user_stats(&self, user: &User, now_ms: i64) -> Result<UserStats> {
        user_stats_with(&self.db.conn(), user, now_ms)
    }

    // ========================================
    // COMMUNITY
    // ========================================

    pub fn create_post(
        &self,
        user_id: i64,
        content: &str,
        is_anonymous: bool,
        now_ms: i64,
    ) -> Result<Post> {
        let conn = self.db.conn();
        conn.execute(
            "INSERT INTO posts (user_id, content, is_anonymous, created_at) VALUES (?1, ?2, ?3, ?4)",
            (user_id, content, is_anonymous, now_ms),
        )?;
        let id = conn.last_insert_rowid();
        Ok(Post {
            id,
            user_id,
            content: content.to_string(),
            is_anonymous,
            like_count: 0,
            created_at: now_ms,
        })
    }

    /// Most recent posts, newest first
    pub fn list_posts(&self, limit: u32) -> Result<Vec<Post>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT p.id, p.user_id, p.content, p.is_anonymous,
                    (SELECT COUNT(*) FROM post_likes pl WHERE pl.post_id = p.id),
                    p.created_at
             FROM posts p ORDER BY p.created_at DESC LIMIT ?1",
        )?;
        let posts: Vec<Post> = stmt
            .query_map([limit], |row| {
                Ok(Post {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    content: row.get(2)?,
                    is_anonymous: row.get(3)?,
                    like_count: row.get(4)?,
                    created_at: row.get(5)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(posts)
    }

    /// Like a post. Returns false when the user already liked it.
    pub fn like_post(&self, post_id: i64, user_id: i64, now_ms: i64) -> Result<bool> {
        let conn = self.db.conn();
        let exists: Option<i64> = conn
            .query_row("SELECT id FROM posts WHERE id = ?1", [post_id], |r| r.get(0))
            .optional()?;
        if exists.is_none() {
            bail!("post {post_id} not found");
        }
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO post_likes (post_id, user_id, created_at) VALUES (?1, ?2, ?3)",
            (post_id, user_id, now_ms),
        )?;
        Ok(inserted > 0)
    }
}

// Connection-level variants, usable inside an open transaction

pub(crate) fn get_user_with(conn: &rusqlite::Connection, id: i64) -> Result<Option<User>> {
    let user = conn
        .query_row(
            "SELECT id, email, username, streak_count, best_streak, created_at FROM users WHERE id = ?1",
            [id],
            row_to_user,
        )
        .optional()?;
    Ok(user)
}

pub(crate) fn unlocked_ids_with(conn: &rusqlite::Connection, user_id: i64) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT achievement_id FROM achievements WHERE user_id = ?1")?;
    let ids: Vec<String> = stmt
        .query_map([user_id], |row| row.get(0))?
        .filter_map(|r| r.ok())
        .collect();
    Ok(ids)
}

pub(crate) fn user_stats_with(
    conn: &rusqlite::Connection,
    user: &User,
    now_ms: i64,
) -> Result<UserStats> {
    let (total_logs, total_saved, total_calories): (u64, f64, i64) = conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(estimated_cost), 0), COALESCE(SUM(estimated_calories), 0)
         FROM logs WHERE user_id = ?1",
        [user.id],
        |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
    )?;

    // Trailing 7-day guilt average; NULL when the window is empty
    let guilt_cutoff = now_ms - 7 * MS_PER_DAY;
    let average_guilt_score: Option<f64> = conn.query_row(
        "SELECT AVG(guilt_rating) FROM logs WHERE user_id = ?1 AND created_at >= ?2",
        (user.id, guilt_cutoff),
        |r| r.get(0),
    )?;

    let total_posts: u64 = conn.query_row(
        "SELECT COUNT(*) FROM posts WHERE user_id = ?1",
        [user.id],
        |r| r.get(0),
    )?;
    let total_likes_given: u64 = conn.query_row(
        "SELECT COUNT(*) FROM post_likes WHERE user_id = ?1",
        [user.id],
        |r| r.get(0),
    )?;
    let total_likes_received: u64 = conn.query_row(
        "SELECT COUNT(*) FROM post_likes pl JOIN posts p ON pl.post_id = p.id WHERE p.user_id = ?1",
        [user.id],
        |r| r.get(0),
    )?;

    Ok(UserStats {
        total_logs,
        current_streak: user.streak_count,
        best_streak: user.best_streak,
        total_saved,
        total_calories_avoided: total_calories,
        total_likes_given,
        total_likes_received,
        total_posts,
        average_guilt_score,
        join_date: user.created_at,
    })
}

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        username: row.get(2)?,
        streak_count: row.get(3)?,
        best_streak: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn row_to_log(row: &Row<'_>) -> rusqlite::Result<LogEntry> {
    Ok(LogEntry {
        id: row.get(0)?,
        user_id: row.get(1)?,
        guilt_rating: row.get(2)?,
        regret_rating: row.get(3)?,
        estimated_cost: row.get(4)?,
        estimated_calories: row.get(5)?,
        location: row.get(6)?,
        photo_url: row.get(7)?,
        ai_motivation: row.get(8)?,
        created_at: row.get(9)?,
        day_bucket: row.get(10)?,
    })
}
