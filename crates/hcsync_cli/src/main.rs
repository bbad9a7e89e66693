//! hcsync CLI
//!
//! Command-line host for the hcsync engine.
//!
//! # Commands
//!
//! - `login` - Sign in and store the issued tokens
//! - `logout` - Revoke and forget the stored tokens
//! - `sync` - Run one sync pass now
//! - `config` - Show or change sync settings
//! - `run` - Run the scheduler and apply push messages read from stdin

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Health data gateway sync client.
#[derive(Parser)]
#[command(name = "hcsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding settings and the health store
    #[arg(global = true, short, long)]
    data_dir: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and store the issued tokens
    Login {
        /// Account name
        username: String,

        /// Account password
        #[arg(short, long)]
        password: String,

        /// Push registration token to send to the server
        #[arg(long)]
        fcm_token: Option<String>,
    },

    /// Revoke and forget the stored tokens
    Logout,

    /// Run one sync pass now
    Sync {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show or change sync settings
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },

    /// Run the scheduler and apply push messages read from stdin
    Run {
        /// Start a pass immediately instead of waiting one interval
        #[arg(long)]
        now: bool,

        /// Push messages buffered before stdin is back-pressured
        #[arg(long, default_value = "64")]
        queue_capacity: usize,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => commands::default_data_dir()?,
    };

    match cli.command {
        Commands::Login {
            username,
            password,
            fcm_token,
        } => {
            commands::login::run(&data_dir, &username, &password, fcm_token).await?;
        }
        Commands::Logout => {
            commands::logout::run(&data_dir).await?;
        }
        Commands::Sync { format } => {
            commands::sync::run(&data_dir, &format).await?;
        }
        Commands::Config { action } => {
            commands::config::run(&data_dir, action)?;
        }
        Commands::Run {
            now,
            queue_capacity,
        } => {
            commands::run::run(&data_dir, now, queue_capacity).await?;
        }
    }

    Ok(())
}
