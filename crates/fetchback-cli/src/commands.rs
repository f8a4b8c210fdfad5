use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "fetchback")]
#[command(about = "Free disk space by deleting downloads you can fetch again", long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub clean: CleanArgs,
}

#[derive(Debug, Clone, Args)]
pub struct CleanArgs {
    /// Size threshold, e.g. 100MB, 1.5GB, 500KB (defaults to the configured value)
    pub size: Option<String>,

    /// Delete every retrievable file without asking
    #[arg(long, conflicts_with = "prompt")]
    pub delete: bool,

    /// Ask before deleting (default)
    #[arg(long)]
    pub prompt: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Find large retrievable downloads and delete them (default)
    Clean(CleanArgs),
    /// Show what the ledger has recorded so far
    Stats,
    /// Find deleted files by MD5 and list their recovery URLs
    Lookup {
        md5: String,
    },
    /// List the most recent deletions
    History {
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// Manage files that are never offered for deletion
    Preserved {
        #[command(subcommand)]
        action: PreservedAction,
    },
    /// Print configuration values
    PrintConfig,
}

#[derive(Debug, Subcommand)]
pub enum PreservedAction {
    List,
    Add { path: PathBuf },
    Remove { path: PathBuf },
}
