//! SQLite database connection and schema management
//!
//! Manages the `~/.junkstop/junkstop.db` database with automatic schema
//! migration.

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use rusqlite::Connection;

use crate::config::Config;

/// Database wrapper shared between the HTTP handlers and the CLI
#[derive(Clone)]
pub struct LogDb {
    pub(crate) conn: Arc<Mutex<Connection>>,
}

impl LogDb {
    /// Open or create the database at the default location (~/.junkstop/junkstop.db)
    pub fn open_default() -> Result<Self> {
        let db_path = Config::global_config_dir().join("junkstop.db");
        Self::open(&db_path)
    }

    /// Open or create the database at a specific path
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create data dir: {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open db: {}", path.display()))?;

        // WAL so the server and CLI can read concurrently
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Open an in-memory database, used by tests
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Get a reference to the connection (for queries)
    pub fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().expect("DB lock poisoned")
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn();
        conn.execute_batch(SCHEMA_SQL)?;
        drop(conn);
        self.run_migrations()?;
        Ok(())
    }

    /// Run any pending migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn();

        let version: i32 = conn
            .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))
            .unwrap_or(0);

        // Migration 2: store the coach message alongside the log
        if version < 2 {
            let has_ai_motivation: bool = conn
                .prepare("SELECT COUNT(*) FROM pragma_table_info('logs') WHERE name = 'ai_motivation'")
                .and_then(|mut s| s.query_row([], |r| r.get::<_, i32>(0)))
                .map(|c| c > 0)
                .unwrap_or(false);

            if !has_ai_motivation {
                conn.execute_batch("ALTER TABLE logs ADD COLUMN ai_motivation TEXT;")?;
            }
            conn.execute("INSERT OR REPLACE INTO schema_version VALUES (2)", [])?;
        }

        Ok(())
    }

    /// Delete all log and gamification data for a user (account reset)
    pub fn reset_user(&self, user_id: i64) -> Result<()> {
        let conn = self.conn();
        conn.execute("DELETE FROM post_likes WHERE user_id = ?1", [user_id])?;
        conn.execute("DELETE FROM posts WHERE user_id = ?1", [user_id])?;
        conn.execute("DELETE FROM achievements WHERE user_id = ?1", [user_id])?;
        conn.execute("DELETE FROM logs WHERE user_id = ?1", [user_id])?;
        conn.execute(
            "UPDATE users SET streak_count = 0, best_streak = 0 WHERE id = ?1",
            [user_id],
        )?;
        Ok(())
    }
}

/// SQL schema for the accountability database
const SCHEMA_SQL: &str = r#"
-- Users with their streak counters
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    email TEXT NOT NULL UNIQUE,
    username TEXT NOT NULL,
    streak_count INTEGER DEFAULT 0,
    best_streak INTEGER DEFAULT 0,
    created_at INTEGER NOT NULL
);

-- Junk food incident logs (one row per logged slip)
CREATE TABLE IF NOT EXISTS logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id),
    guilt_rating INTEGER NOT NULL,
    regret_rating INTEGER NOT NULL,
    estimated_cost REAL DEFAULT 0.0,
    estimated_calories INTEGER DEFAULT 0,
    location TEXT,
    photo_url TEXT,
    ai_motivation TEXT,
    created_at INTEGER NOT NULL,
    day_bucket TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_logs_user ON logs(user_id);
CREATE INDEX IF NOT EXISTS idx_logs_day ON logs(user_id, day_bucket);
CREATE INDEX IF NOT EXISTS idx_logs_created_at ON logs(user_id, created_at);

-- Unlocked achievements (unlock-once per user)
CREATE TABLE IF NOT EXISTS achievements (
    user_id INTEGER NOT NULL REFERENCES users(id),
    achievement_id TEXT NOT NULL,
    unlocked_at INTEGER NOT NULL,
    PRIMARY KEY (user_id, achievement_id)
);

-- Community accountability posts
CREATE TABLE IF NOT EXISTS posts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id),
    content TEXT NOT NULL,
    is_anonymous INTEGER DEFAULT 0,
    created_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_posts_created_at ON posts(created_at);

-- One like per user per post
CREATE TABLE IF NOT EXISTS post_likes (
    post_id INTEGER NOT NULL REFERENCES posts(id),
    user_id INTEGER NOT NULL REFERENCES users(id),
    created_at INTEGER NOT NULL,
    PRIMARY KEY (post_id, user_id)
);

-- Schema version
CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY);
INSERT OR IGNORE INTO schema_version VALUES (2);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_and_init() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test_junkstop.db");
        let db = LogDb::open(&db_path).unwrap();

        let conn = db.conn();
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table'")
            .unwrap();
        let tables: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        assert!(tables.contains(&"users".to_string()));
        assert!(tables.contains(&"logs".to_string()));
        assert!(tables.contains(&"achievements".to_string()));
        assert!(tables.contains(&"posts".to_string()));
    }

    #[test]
    fn test_schema_version_current() {
        let db = LogDb::open_in_memory().unwrap();
        let version: i32 = db
            .conn()
            .query_row("SELECT MAX(version) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(version, 2);
    }
}
