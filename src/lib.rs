//! JunkStop - junk food accountability backend
//!
//! Tracks junk food incidents, runs the streak and achievement rules over
//! them, and serves the REST API the mobile client talks to.
//!
//! Modules:
//! - `store` - SQLite persistence for users, logs, achievements, and posts
//! - `gamification` - achievement catalog, XP levels, streaks, and the
//!   engine that applies them transactionally
//! - `progress` - day bucketing and windowed analytics rollups
//! - `coach` - AI motivation and calorie estimates with local fallbacks
//! - `server` - the tiny_http API surface
//! - `config` - `~/.junkstop/config.toml` loading and atomic saves

pub mod coach;
pub mod config;
pub mod gamification;
pub mod progress;
pub mod server;
pub mod store;
