//! Persistent storage for users, logs, achievements, and community posts

pub mod db;
pub mod models;
pub mod queries;

pub use db::LogDb;
pub use queries::LogQuery;
