use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "momentum")]
#[command(about = "Momentum - XP, levels, streaks and achievements for your habits")]
#[command(version)]
struct Cli {
    /// Path to the config file (defaults to ~/.momentum/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the gamification database (overrides the config)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new ~/.momentum/config.toml configuration file
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,

        /// Reference timezone in minutes east of UTC
        #[arg(long, allow_hyphen_values = true)]
        utc_offset_minutes: Option<i32>,
    },

    /// Show level, streaks and achievements of a user as JSON
    Status {
        #[arg(short, long)]
        user: String,
    },

    /// Report a domain event (e.g. habit_completed, mood_logged)
    Trigger {
        /// Trigger name
        event: String,

        #[arg(short, long)]
        user: String,

        /// Habit id, required for habit_completed
        #[arg(long)]
        habit: Option<String>,
    },

    /// List the achievement catalog
    Catalog {
        /// Show progress of this user
        #[arg(short, long)]
        user: Option<String>,
    },

    /// Evaluate all achievements of a user
    Evaluate {
        #[arg(short, long)]
        user: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    let paths = cli::Paths {
        config: cli.config,
        db: cli.db,
    };

    match cli.command {
        Commands::Init {
            force,
            utc_offset_minutes,
        } => {
            cli::init::init_command(&paths, utc_offset_minutes, force)?;
        }
        Commands::Status { user } => {
            cli::status::status_command(&paths, &user)?;
        }
        Commands::Trigger { event, user, habit } => {
            cli::trigger::trigger_command(&paths, &event, &user, habit.as_deref()).await?;
        }
        Commands::Catalog { user } => {
            cli::catalog::catalog_command(&paths, user.as_deref())?;
        }
        Commands::Evaluate { user } => {
            cli::evaluate::evaluate_command(&paths, &user)?;
        }
    }

    Ok(())
}
