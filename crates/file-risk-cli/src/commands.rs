use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "file-risk")]
#[command(about = "Scores catalogued files for deletion risk", long_about = None)]
pub struct Cli {
    /// Log engine internals at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Walk the configured root paths and update the file catalog
    Collect,
    /// Load catalog records (with embeddings) from a JSON Lines file
    Import {
        /// One JSON object per line: path, filename, last_accessed, embedding, server
        file: PathBuf,
    },
    /// Score every catalogued file and store its status
    Process,
    /// Show the highest-risk files
    Report {
        /// Number of files to show
        #[arg(short, long, default_value_t = 20)]
        limit: i64,
    },
    /// Write every file status to a CSV file
    Export {
        /// Output CSV path
        output: PathBuf,
    },
    /// Print configuration values
    PrintConfig,
    /// Truncate all database tables
    TruncateDb,
}
