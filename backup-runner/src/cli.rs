//! Command-line interface of `smart-backup`.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Smart Backup - mirror folders and keep every replaced file
#[derive(Parser, Debug)]
#[command(name = "smart-backup", author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// SQLite database (overrides config)
    #[arg(long, value_name = "FILE", global = true)]
    pub db: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage projects
    #[command(subcommand)]
    Project(ProjectCommand),

    /// Manage the source → target mappings of a project
    #[command(subcommand)]
    Mapping(MappingCommand),

    /// Show what a backup of a project would do
    Analyze(AnalyzeArgs),

    /// Back up a project
    Backup(BackupArgs),

    /// List recorded backup runs
    History(HistoryArgs),

    /// List the archived versions under a target's _REVISIONS folder
    Revisions(RevisionsArgs),

    /// Stored preferences
    #[command(subcommand)]
    Settings(SettingsCommand),
}

#[derive(Subcommand, Debug)]
pub enum ProjectCommand {
    /// Create a project
    Add {
        name: String,
        #[arg(short, long, default_value = "")]
        description: String,
    },
    /// List projects
    List,
    /// Delete a project with its mappings and history
    Remove {
        /// Project id or name
        project: String,
    },
    /// Rename a project or change its description
    Update {
        /// Project id or name
        project: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum MappingCommand {
    /// Add a mapping to a project
    Add {
        /// Project id or name
        project: String,
        #[arg(long)]
        source: String,
        #[arg(long)]
        target: String,
        /// Comma-separated include patterns
        #[arg(long, default_value = "*.*")]
        include: String,
        /// Comma-separated exclude patterns
        #[arg(long, default_value = "")]
        exclude: String,
        /// Only back up the top level of the source folder
        #[arg(long)]
        no_recurse: bool,
    },
    /// List the mappings of a project
    List {
        /// Project id or name
        project: String,
    },
    /// Count the files a mapping selects and excludes, without looking at the target
    Stats { id: i64 },
    /// Delete a mapping
    Remove { id: i64 },
    /// Change fields of a mapping
    Update {
        id: i64,
        #[arg(long)]
        source: Option<String>,
        #[arg(long)]
        target: Option<String>,
        #[arg(long)]
        include: Option<String>,
        #[arg(long)]
        exclude: Option<String>,
        /// Include subfolders (true/false)
        #[arg(long)]
        recurse: Option<bool>,
    },
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Project id or name
    pub project: String,

    /// Entries shown per list, -1 for all
    #[arg(long, allow_hyphen_values = true)]
    pub limit: Option<i64>,

    /// Print the analysis as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct BackupArgs {
    /// Project id or name
    pub project: String,

    /// Archive target files that no longer exist in the source
    #[arg(long)]
    pub mirror_deletions: bool,

    /// Only archive deleted files matching this pattern (name or relative path)
    #[arg(long, value_name = "PATTERN", requires = "mirror_deletions")]
    pub only_deleted: Vec<String>,

    /// Leave deleted files matching this pattern in the target
    #[arg(long, value_name = "PATTERN", requires = "mirror_deletions")]
    pub keep_deleted: Vec<String>,

    /// Also copy files under hidden folders
    #[arg(long)]
    pub include_hidden: bool,

    /// Record every copied file in the history
    #[arg(long)]
    pub save_details: bool,

    /// Only run these mappings
    #[arg(long = "mapping", value_name = "ID")]
    pub mappings: Vec<i64>,

    /// Run even when a target drive is not accessible
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct HistoryArgs {
    #[command(subcommand)]
    pub command: Option<HistoryCommand>,

    /// Only runs of this project (id or name)
    #[arg(long)]
    pub project: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum HistoryCommand {
    /// Details of one run
    Show { id: i64 },
    /// Delete one run and its details
    Remove { id: i64 },
    /// Find recorded files by name (`*` and `?` are wildcards)
    Search {
        term: String,
        /// Results shown, -1 for all
        #[arg(long, allow_hyphen_values = true)]
        limit: Option<i64>,
    },
}

#[derive(Args, Debug)]
pub struct RevisionsArgs {
    /// Target folder of a mapping
    pub target: PathBuf,

    /// Only versions of this file (relative to the target)
    #[arg(long)]
    pub file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum SettingsCommand {
    /// List stored preferences
    List,
    /// Show one preference
    Get { key: String },
    /// Store a preference
    Set { key: String, value: String },
    /// Remove a stored preference
    Unset { key: String },
}
