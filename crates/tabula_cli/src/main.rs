//! Tabula CLI
//!
//! Command-line schema tools for Tabula mirror databases.
//!
//! # Commands
//!
//! - `check` - Validate a schema document and its type mappings
//! - `generate` - Generate the mirror DDL artifact
//! - `hash` - Print the schema hash
//! - `version` - Show version information

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Tabula command-line schema tools.
#[derive(Parser)]
#[command(name = "tabula")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a schema document and its type mappings
    Check {
        /// Path to the schema document
        schema: PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Generate the mirror DDL artifact
    Generate {
        /// Path to the schema document
        schema: PathBuf,

        /// Output path; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Overwrite an existing output file
        #[arg(short, long)]
        force: bool,
    },

    /// Print the schema hash
    Hash {
        /// Path to the schema document
        schema: PathBuf,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Check { schema, format } => {
            commands::check::run(&schema, &format)?;
        }
        Commands::Generate {
            schema,
            output,
            force,
        } => {
            commands::generate::run(&schema, output.as_deref(), force)?;
        }
        Commands::Hash { schema } => {
            commands::hash::run(&schema)?;
        }
        Commands::Version => {
            println!("Tabula CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
