//! Configuration loading and management
//!
//! Config lives at `~/.junkstop/config.toml` and is auto-created on first
//! run. Saves are atomic (temp file + rename) behind an exclusive file lock
//! so a CLI invocation and a running server never corrupt each other.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs2::FileExt;
use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub coach: CoachConfig,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the API server
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Shared secret for the X-Api-Token header. Auth is only enforced
    /// when this is explicitly set.
    #[serde(default)]
    pub api_token: String,
}

/// Database settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite file. Empty means ~/.junkstop/junkstop.db.
    #[serde(default)]
    pub path: String,
}

/// AI coach settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoachConfig {
    /// OpenRouter API key. When unset, canned fallback messages are used.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_coach_base_url")]
    pub base_url: String,

    #[serde(default = "default_coach_model")]
    pub model: String,
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

fn default_coach_base_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_coach_model() -> String {
    "meta-llama/llama-3.1-8b-instruct:free".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            api_token: String::new(),
        }
    }
}

impl Default for CoachConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_coach_base_url(),
            model: default_coach_model(),
        }
    }
}

impl Config {
    /// Get the global config directory path (~/.junkstop/)
    pub fn global_config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".junkstop")
    }

    /// Get the global config file path (~/.junkstop/config.toml)
    pub fn global_config_path() -> PathBuf {
        Self::global_config_dir().join("config.toml")
    }

    /// Resolved database path, falling back to the default location
    pub fn database_path(&self) -> PathBuf {
        if self.database.path.is_empty() {
            Self::global_config_dir().join("junkstop.db")
        } else {
            PathBuf::from(&self.database.path)
        }
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Save configuration to a file with atomic write and file locking.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(self).with_context(|| "Failed to serialize config")?;

        // Lock file kept separate from the config so the rename stays atomic
        let lock_path = path.with_extension("toml.lock");
        let lock_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&lock_path)
            .with_context(|| format!("Failed to create lock file: {}", lock_path.display()))?;

        lock_file
            .lock_exclusive()
            .with_context(|| "Failed to acquire config lock")?;

        let temp_path = path.with_extension("toml.tmp");
        let mut temp_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;

        temp_file
            .write_all(content.as_bytes())
            .with_context(|| "Failed to write config content")?;

        temp_file
            .sync_all()
            .with_context(|| "Failed to sync config file")?;

        std::fs::rename(&temp_path, path)
            .with_context(|| format!("Failed to rename config file: {}", path.display()))?;

        // Lock is released when lock_file is dropped
        Ok(())
    }

    /// Load global configuration from ~/.junkstop/config.toml,
    /// auto-creating it with defaults when missing.
    pub fn load() -> Result<Self> {
        let global_path = Self::global_config_path();

        if !global_path.exists() {
            Self::auto_init()?;
        }

        Self::from_file(&global_path)
    }

    /// Auto-initialize global configuration when no config exists.
    ///
    /// Uses file locking so concurrent first runs do not race.
    fn auto_init() -> Result<()> {
        let config_path = Self::global_config_path();
        let config_dir = Self::global_config_dir();

        if !config_dir.exists() {
            std::fs::create_dir_all(&config_dir).with_context(|| {
                format!("Failed to create config directory: {}", config_dir.display())
            })?;
        }

        let lock_path = config_path.with_extension("toml.lock");
        let lock_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&lock_path)
            .with_context(|| format!("Failed to create lock file: {}", lock_path.display()))?;

        lock_file
            .lock_exclusive()
            .with_context(|| "Failed to acquire config lock for auto-init")?;

        // Re-check after acquiring the lock; another process may have won
        if config_path.exists() {
            return Ok(());
        }

        // api_token intentionally left empty for local development.
        // Auth is only enforced when api_token is explicitly set.
        let default_config = Self::default();
        default_config.save_to_file(&config_path)?;

        eprintln!("Created {}", config_path.display());
        Ok(())
    }
}
