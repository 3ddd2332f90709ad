//! smart-backup - command-line front end of the backup engine
//!
//! Keeps projects, mappings and run history in SQLite and drives the
//! engine's analysis and apply passes.

mod cli;
mod commands;
mod config;
mod db;
mod error;
mod models;
mod services;
mod utils;

use crate::cli::Cli;
use crate::config::RunnerConfig;
use crate::db::connection::{close_pool, create_pool};
use crate::db::migrate::migrate;
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    // Load configuration
    let mut config = RunnerConfig::load(args.config.as_deref())?;
    config.apply_cli(args.db.clone(), args.log_level.clone());

    // Initialize logging
    utils::logger::init(&config.log_level)?;
    tracing::debug!("Using database {}", config.db_path.display());

    // Initialize database
    let pool = create_pool(&config.db_path)?;
    migrate(&pool)?;

    let result = commands::dispatch(args.command, &config, &pool).await;

    close_pool(&pool);
    result
}
