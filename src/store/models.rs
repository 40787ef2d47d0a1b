//! Data models for the accountability store
//!
//! These structures represent the data stored in and queried from the
//! SQLite database.

use serde::{Deserialize, Serialize};

/// A registered user with their streak counters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub streak_count: u32,
    pub best_streak: u32,
    /// Timestamp (ms since epoch)
    pub created_at: i64,
}

/// A logged junk-food incident
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: i64,
    pub user_id: i64,
    /// 1-10, how guilty the user felt
    pub guilt_rating: u8,
    /// 1-10, how much they regret it
    pub regret_rating: u8,
    pub estimated_cost: f64,
    pub estimated_calories: i64,
    pub location: Option<String>,
    pub photo_url: Option<String>,
    /// Coach message generated at log time
    pub ai_motivation: Option<String>,
    /// Timestamp (ms since epoch)
    pub created_at: i64,
    /// Local day bucket (YYYY-MM-DD), precomputed for aggregation queries
    pub day_bucket: String,
}

/// Input for recording a new incident
#[derive(Debug, Clone, Deserialize)]
pub struct NewLog {
    pub guilt_rating: u8,
    pub regret_rating: u8,
    pub estimated_cost: f64,
    pub estimated_calories: i64,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
}

impl NewLog {
    /// Ratings outside 1-10 are rejected before anything is written.
    pub fn validate(&self) -> Result<(), String> {
        if !(1..=10).contains(&self.guilt_rating) {
            return Err(format!("guilt_rating must be 1-10, got {}", self.guilt_rating));
        }
        if !(1..=10).contains(&self.regret_rating) {
            return Err(format!("regret_rating must be 1-10, got {}", self.regret_rating));
        }
        if self.estimated_cost < 0.0 {
            return Err("estimated_cost must not be negative".to_string());
        }
        if self.estimated_calories < 0 {
            return Err("estimated_calories must not be negative".to_string());
        }
        Ok(())
    }
}

/// An unlocked achievement row for a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnlockedAchievement {
    pub achievement_id: String,
    /// Timestamp (ms since epoch)
    pub unlocked_at: i64,
}

/// A community accountability post
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub user_id: i64,
    pub content: String,
    pub is_anonymous: bool,
    pub like_count: u64,
    /// Timestamp (ms since epoch)
    pub created_at: i64,
}

/// Aggregated stats projection for one user, fed to the achievement
/// evaluator and the profile endpoint.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UserStats {
    pub total_logs: u64,
    pub current_streak: u32,
    pub best_streak: u32,
    /// Sum of estimated_cost over all logs
    pub total_saved: f64,
    /// Sum of estimated_calories over all logs
    pub total_calories_avoided: i64,
    pub total_likes_given: u64,
    pub total_likes_received: u64,
    pub total_posts: u64,
    /// Average guilt rating over the trailing 7 days. `None` when that
    /// window has no logs, which keeps guilt-based checks from firing.
    pub average_guilt_score: Option<f64>,
    /// Timestamp (ms since epoch) of account creation
    pub join_date: i64,
}
