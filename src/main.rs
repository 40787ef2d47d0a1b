use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use junkstop::coach::CoachClient;
use junkstop::config::Config;
use junkstop::gamification::GamificationEngine;
use junkstop::server::{self, ApiState};
use junkstop::store::{LogDb, LogQuery};

#[derive(Parser)]
#[command(name = "junkstop")]
#[command(about = "Junk food accountability - streaks, achievements, and progress analytics")]
#[command(version)]
struct Cli {
    /// Path to the config file (defaults to ~/.junkstop/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the API server for the mobile client
    Serve {
        /// Override the bind address from the config
        #[arg(long)]
        bind: Option<String>,
    },

    /// Initialize ~/.junkstop/config.toml and the database
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Delete all logs, achievements, and posts for a user and zero
    /// their streak counters
    Reset {
        user_id: i64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    let config = match cli.config {
        Some(ref path) => Config::from_file(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Some(Commands::Serve { bind }) => {
            let mut config = config;
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            serve(&config)
        }
        Some(Commands::Init { force }) => init(force),
        Some(Commands::Reset { user_id }) => {
            let db = LogDb::open(&config.database_path())?;
            db.reset_user(user_id)?;
            println!("Reset user {user_id}");
            Ok(())
        }
        None => serve(&config),
    }
}

fn serve(config: &Config) -> Result<()> {
    let db = LogDb::open(&config.database_path())?;
    let state = ApiState {
        queries: LogQuery::new(db.clone()),
        engine: GamificationEngine::new(db),
        coach: CoachClient::new(&config.coach),
    };
    server::run(config, state)
}

fn init(force: bool) -> Result<()> {
    let path = Config::global_config_path();
    if path.exists() && !force {
        println!("Config already exists at {} (use --force to overwrite)", path.display());
    } else {
        Config::default().save_to_file(&path)?;
        println!("Created {}", path.display());
    }

    // Create the database alongside it so first server start is instant
    let config = Config::from_file(&path)?;
    LogDb::open(&config.database_path())?;
    Ok(())
}
