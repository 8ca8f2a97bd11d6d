//! # Matrix Archive CLI (`matrix-archive`)
//!
//! Renders per-day JSON chat logs into a static HTML archive and builds a
//! full-text search database per room.
//!
//! ## Usage
//!
//! ```bash
//! matrix-archive --config ./config/archive.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `matrix-archive render` | Render new and recent days to HTML |
//! | `matrix-archive index [room]` | Build search databases for rooms without one |
//! | `matrix-archive search <room> "<query>"` | Query a room's search database |
//! | `matrix-archive rooms` | List rooms, day counts, and index status |

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use matrix_archive::config;
use matrix_archive::modifications::ConfiguredModifications;
use matrix_archive::{indexer, render_cmd, rooms, search};

/// Static HTML archive and search index builder for chat-room logs.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. When the file does not exist, built-in defaults are used
/// (`logs/json` in, `logs/docs` and `sql` out).
#[derive(Parser)]
#[command(name = "matrix-archive", version)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/archive.toml")]
    config: PathBuf,

    /// Enable debug logging (or set MATRIX_ARCHIVE_LOG).
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render day pages, room redirects, and the landing page.
    ///
    /// Days already rendered are left alone, except the two most recent of
    /// each room, which are always regenerated.
    Render,

    /// Build the full-text search database for each room.
    ///
    /// Rooms whose database file already exists are skipped; delete the
    /// file to rebuild it.
    Index {
        /// Only index this room.
        room: Option<String>,
    },

    /// Search one room's messages.
    Search {
        /// Room name as configured (spaces allowed).
        room: String,

        /// FTS5 query string.
        query: String,

        /// Maximum number of results to return.
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },

    /// List rooms and their status.
    Rooms,
}

fn init_tracing(verbose: bool) {
    let filter = std::env::var("MATRIX_ARCHIVE_LOG").unwrap_or_else(|_| {
        if verbose {
            "matrix_archive=debug".to_string()
        } else {
            "matrix_archive=info".to_string()
        }
    });
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::new(filter))
        .try_init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let cfg = config::load_or_default(&cli.config)?;
    let modifications = ConfiguredModifications::from_config(&cfg);

    match cli.command {
        Commands::Render => {
            render_cmd::run_render(&cfg, &modifications)?;
        }
        Commands::Index { room } => {
            indexer::run_index(&cfg, room.as_deref(), &modifications).await?;
        }
        Commands::Search { room, query, limit } => {
            search::run_search(&cfg, &room, &query, limit).await?;
        }
        Commands::Rooms => {
            rooms::list_rooms(&cfg)?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(cli).await {
        tracing::error!("{:#}", err);
        std::process::exit(1);
    }
}
