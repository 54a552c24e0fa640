// SPDX-FileCopyrightText: 2026 TagTime Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! TagTime - stochastic time sampling.
//!
//! This is the binary entry point: it parses the command line, loads the
//! layered configuration and dispatches to the subcommands.

mod app;
mod commands;
mod notify;
mod serve;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tagtime_config::model::TagTimeConfig;
use tagtime_core::TagTimeError;

use crate::app::App;

/// TagTime - stochastic time sampling with Beeminder goal sync.
#[derive(Parser, Debug)]
#[command(name = "tagtime", version, about, long_about = None)]
struct Cli {
    /// Load this configuration file instead of the standard locations.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the scheduler and the sync queue until interrupted. Tag edits are
    /// read from stdin as `<sample-id> <tags...>` lines.
    Serve,
    /// Record any due pings once, then exit.
    Ping,
    /// Replace a sample's tags and sync the affected goals.
    Tag {
        sample_id: i64,
        /// New tags; none clears the sample.
        tags: Vec<String>,
    },
    /// Manage Beeminder goals.
    #[command(subcommand)]
    Goal(GoalCommand),
    /// Show recent samples.
    Log {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Show upcoming ping times.
    Schedule {
        #[arg(long, default_value_t = 10)]
        count: usize,
    },
    /// Show store health and scheduler state.
    Status,
}

#[derive(Subcommand, Debug)]
enum GoalCommand {
    /// Link (or re-link) a goal to a set of tags.
    Link {
        user: String,
        slug: String,
        /// Beeminder auth token.
        #[arg(long)]
        token: String,
        #[arg(required = true)]
        tags: Vec<String>,
    },
    /// List linked goals.
    List,
    /// Unlink a goal.
    Remove { id: i64 },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => tagtime_config::load_and_validate_path(path),
        None => tagtime_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            tagtime_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.logging.level);

    if let Err(e) = run(cli.command, config).await {
        eprintln!("tagtime: {e}");
        std::process::exit(1);
    }
}

async fn run(command: Commands, config: TagTimeConfig) -> Result<(), TagTimeError> {
    let cancel = shutdown::install_signal_handler();
    let app = App::open(config, cancel.clone()).await?;

    let result = match command {
        Commands::Serve => serve::run_serve(&app, cancel).await,
        Commands::Ping => commands::ping(&app).await,
        Commands::Tag { sample_id, tags } => commands::tag(&app, sample_id, &tags).await,
        Commands::Goal(GoalCommand::Link {
            user,
            slug,
            token,
            tags,
        }) => commands::goal_link(&app, &user, &slug, &token, &tags).await,
        Commands::Goal(GoalCommand::List) => commands::goal_list(&app).await,
        Commands::Goal(GoalCommand::Remove { id }) => commands::goal_remove(&app, id).await,
        Commands::Log { limit } => commands::log(&app, limit).await,
        Commands::Schedule { count } => commands::schedule(&app, count).await,
        Commands::Status => commands::status(&app).await,
    };

    app.close().await?;
    result
}

/// Initializes the tracing subscriber. `RUST_LOG` overrides the configured level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("tagtime={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}
