//! Review Desk - command-line shell over a review timeline snapshot
//!
//! Loads a JSON repository snapshot, opens one entry's timeline as a given
//! viewer and prints, exports, copies or deletes updates.

mod commands;

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use review_timeline::{GlobalRole, TimelineConfig, UpdateKind, UserId, Viewer};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "REVIEW_DESK_LOG";
const CONFIG_DIR: &str = "review-desk";
const CONFIG_FILE: &str = "config.toml";

#[derive(Parser)]
#[command(name = "review-desk")]
#[command(about = "Browse and manage manuscript review updates", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Repository snapshot (JSON)
    #[arg(short, long, global = true, default_value = "snapshot.json")]
    snapshot: PathBuf,

    /// Config file (TOML or JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the merged update feed
    Timeline {
        #[command(flatten)]
        target: Target,

        /// Print the feed as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print or copy one update as plain text
    Export {
        #[command(flatten)]
        target: Target,

        #[command(flatten)]
        update: UpdateRef,

        /// Copy to the clipboard instead of printing
        #[arg(long)]
        copy: bool,
    },
    /// Delete one update and write the snapshot back
    Delete {
        #[command(flatten)]
        target: Target,

        #[command(flatten)]
        update: UpdateRef,
    },
    /// Print what the viewer may do on the entry
    Actions {
        #[command(flatten)]
        target: Target,
    },
}

/// Entry and viewer shared by every subcommand.
#[derive(Args)]
struct Target {
    #[arg(short, long)]
    entry: i64,

    /// Viewer user id; omit for an anonymous viewer
    #[arg(short, long)]
    viewer: Option<i64>,

    #[arg(short, long, default_value = "none")]
    role: GlobalRole,

    /// Evaluate permissions at this instant (RFC 3339) instead of now
    #[arg(long)]
    now: Option<DateTime<Utc>>,
}

impl Target {
    /// A role without a viewer id is ignored.
    fn viewer(&self) -> Viewer {
        match self.viewer {
            Some(id) => Viewer::new(UserId(id), self.role),
            None => Viewer::anonymous(),
        }
    }

    fn now(&self) -> DateTime<Utc> {
        self.now.unwrap_or_else(Utc::now)
    }
}

#[derive(Args)]
struct UpdateRef {
    #[arg(short, long)]
    kind: UpdateKind,

    #[arg(short, long)]
    update: i64,
}

fn load_config(explicit: Option<&PathBuf>) -> Result<TimelineConfig, Box<dyn std::error::Error>> {
    if let Some(path) = explicit {
        return Ok(TimelineConfig::load(path)?);
    }

    let default_path = dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE));
    match default_path {
        Some(path) if path.exists() => {
            tracing::debug!("Loading config from {}", path.display());
            Ok(TimelineConfig::load(path)?)
        }
        _ => Ok(TimelineConfig::default()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Timeline { target, json } => {
            commands::timeline(&cli.snapshot, &config, &target, json).await
        }
        Commands::Export {
            target,
            update,
            copy,
        } => commands::export(&cli.snapshot, &config, &target, &update, copy).await,
        Commands::Delete { target, update } => {
            commands::delete(&cli.snapshot, &config, &target, &update).await
        }
        Commands::Actions { target } => commands::actions(&cli.snapshot, &config, &target).await,
    }
}
