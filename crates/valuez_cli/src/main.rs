//! valuez CLI
//!
//! Command-line tools for valuez store files.
//!
//! # Commands
//!
//! - `inspect` - Display collections and file statistics
//! - `dump` - Print the values of one collection
//! - `verify` - Verify frame integrity
//! - `compact` - Rewrite the log as a single frame

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// valuez command-line store tools.
#[derive(Parser)]
#[command(name = "valuez")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the store file (`<name>.db`)
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display collections and file statistics
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Print the values of one collection
    Dump {
        /// Collection to dump
        #[arg(short, long)]
        collection: String,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Maximum number of items to print
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Verify frame integrity
    Verify,

    /// Rewrite the log as a single frame
    Compact {
        /// Dry run - show what would be done
        #[arg(short, long)]
        dry_run: bool,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Inspect { format } => {
            let path = cli.path.ok_or("Store path required for inspect")?;
            commands::inspect::run(&path, &format)?;
        }
        Commands::Dump {
            collection,
            format,
            limit,
        } => {
            let path = cli.path.ok_or("Store path required for dump")?;
            commands::dump::run(&path, &collection, &format, limit)?;
        }
        Commands::Verify => {
            let path = cli.path.ok_or("Store path required for verify")?;
            commands::verify::run(&path)?;
        }
        Commands::Compact { dry_run } => {
            let path = cli.path.ok_or("Store path required for compact")?;
            commands::compact::run(&path, dry_run)?;
        }
        Commands::Version => {
            println!("valuez CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
