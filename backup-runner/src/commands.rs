//! Command dispatch.
//!
//! Database lookups run inline; analysis and backup runs go to a blocking
//! thread so the signal listener keeps running next to them.

use crate::cli::{
    AnalyzeArgs, BackupArgs, Command, HistoryArgs, HistoryCommand, MappingCommand, ProjectCommand, RevisionsArgs,
    SettingsCommand,
};
use crate::config::{display_limit_from, RunnerConfig};
use crate::db::connection::DbPool;
use crate::error::RunnerError;
use crate::models::mapping::{CreateMapping, UpdateMapping};
use crate::models::project::Project;
use crate::models::{backup_detail, backup_history, file_detail, mapping, project, settings};
use crate::services::backup::{analyze_project, run_backup, RunOptions};
use crate::services::report::{self, ConsoleObserver};
use crate::services::search;
use crate::utils::shutdown;
use backup_engine::revisions::{file_versions, list_revision_folders, list_revisions};
use rusqlite::Connection;
use tokio_util::sync::CancellationToken;

pub async fn dispatch(command: Command, config: &RunnerConfig, pool: &DbPool) -> anyhow::Result<()> {
    match command {
        Command::Project(cmd) => project_command(cmd, pool),
        Command::Mapping(cmd) => mapping_command(cmd, pool),
        Command::Analyze(args) => analyze(args, config, pool).await,
        Command::Backup(args) => backup(args, config, pool).await,
        Command::History(args) => history(args, config, pool),
        Command::Revisions(args) => revisions(args),
        Command::Settings(cmd) => settings_command(cmd, pool),
    }
}

fn resolve_project(conn: &Connection, key: &str) -> anyhow::Result<Project> {
    project::resolve(conn, key)?.ok_or_else(|| RunnerError::ProjectNotFound(key.to_string()).into())
}

/// CLI flag, then stored preference, then config
fn effective_display_limit(conn: &Connection, flag: Option<i64>, config: &RunnerConfig) -> anyhow::Result<Option<usize>> {
    let stored = match flag {
        Some(limit) => Some(limit),
        None => settings::get_i64(conn, settings::DISPLAY_LIMIT)?,
    };
    Ok(stored.map_or_else(|| config.display_limit(), display_limit_from))
}

fn effective_auto_save(conn: &Connection, config: &RunnerConfig) -> anyhow::Result<bool> {
    Ok(settings::get_bool(conn, settings::AUTO_SAVE_DETAILS)?.unwrap_or(config.auto_save_details))
}

fn project_command(cmd: ProjectCommand, pool: &DbPool) -> anyhow::Result<()> {
    let conn = pool.get()?;
    match cmd {
        ProjectCommand::Add { name, description } => {
            let created = project::create(&conn, &name, &description)?;
            tracing::info!("Created project {} ({})", created.name, created.id);
            println!("Created project {}: {}", created.id, created.name);
        }
        ProjectCommand::List => {
            println!("{}", report::render_projects(&project::find_all(&conn)?));
        }
        ProjectCommand::Remove { project: key } => {
            let found = resolve_project(&conn, &key)?;
            project::delete(&conn, found.id)?;
            tracing::info!("Deleted project {} ({})", found.name, found.id);
            println!("Deleted project {}", found.name);
        }
        ProjectCommand::Update {
            project: key,
            name,
            description,
        } => {
            let found = resolve_project(&conn, &key)?;
            let updated = project::update(&conn, found.id, name.as_deref(), description.as_deref())?
                .ok_or_else(|| RunnerError::ProjectNotFound(key.clone()))?;
            println!("Updated project {}: {}", updated.id, updated.name);
        }
    }
    Ok(())
}

fn mapping_command(cmd: MappingCommand, pool: &DbPool) -> anyhow::Result<()> {
    let conn = pool.get()?;
    match cmd {
        MappingCommand::Add {
            project: key,
            source,
            target,
            include,
            exclude,
            no_recurse,
        } => {
            let found = resolve_project(&conn, &key)?;
            let created = mapping::create(
                &conn,
                &CreateMapping {
                    project_id: found.id,
                    source_path: source,
                    file_filter: include,
                    exclude_filter: exclude,
                    include_subdirs: !no_recurse,
                    target_path: target,
                },
            )?;
            tracing::info!("Added mapping {} to project {}", created.id, found.name);
            println!("Added mapping {}: {}", created.id, created.label());
        }
        MappingCommand::List { project: key } => {
            let found = resolve_project(&conn, &key)?;
            println!("{}", report::render_mappings(&mapping::find_by_project(&conn, found.id)?));
        }
        MappingCommand::Stats { id } => {
            let record = mapping::find_by_id(&conn, id)?.ok_or(RunnerError::MappingNotFound(id))?;
            let totals = backup_engine::stats(&record.to_mapping(), &ConsoleObserver::new());
            println!("{}", report::render_mapping_stats(&record, &totals));
        }
        MappingCommand::Remove { id } => {
            if !mapping::delete(&conn, id)? {
                return Err(RunnerError::MappingNotFound(id).into());
            }
            println!("Deleted mapping {}", id);
        }
        MappingCommand::Update {
            id,
            source,
            target,
            include,
            exclude,
            recurse,
        } => {
            let changes = UpdateMapping {
                source_path: source,
                file_filter: include,
                exclude_filter: exclude,
                include_subdirs: recurse,
                target_path: target,
            };
            let updated = mapping::update(&conn, id, &changes)?.ok_or(RunnerError::MappingNotFound(id))?;
            println!("Updated mapping {}: {}", updated.id, updated.label());
        }
    }
    Ok(())
}

async fn analyze(args: AnalyzeArgs, config: &RunnerConfig, pool: &DbPool) -> anyhow::Result<()> {
    let (found, limit) = {
        let conn = pool.get()?;
        (
            resolve_project(&conn, &args.project)?,
            effective_display_limit(&conn, args.limit, config)?,
        )
    };

    let db = pool.clone();
    let json = args.json;
    let results = tokio::task::spawn_blocking(move || {
        if json {
            analyze_project(&db, &found, limit, &backup_engine::NoopObserver)
        } else {
            analyze_project(&db, &found, limit, &ConsoleObserver::new())
        }
    })
    .await
    .map_err(|e| anyhow::anyhow!(e))??;

    if args.json {
        let entries = results
            .iter()
            .map(|r| -> serde_json::Result<serde_json::Value> {
                Ok(serde_json::json!({
                    "mapping_id": r.mapping.id,
                    "analysis": serde_json::to_value(&r.analysis)?,
                }))
            })
            .collect::<serde_json::Result<Vec<_>>>()?;
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        println!("{}", report::render_project_analysis(&results));
    }
    Ok(())
}

async fn backup(args: BackupArgs, config: &RunnerConfig, pool: &DbPool) -> anyhow::Result<()> {
    let (found, options) = {
        let conn = pool.get()?;
        let found = resolve_project(&conn, &args.project)?;
        let options = RunOptions {
            mirror_deletions: args.mirror_deletions,
            only_deleted: args.only_deleted,
            keep_deleted: args.keep_deleted,
            include_hidden: args.include_hidden,
            save_details: args.save_details || effective_auto_save(&conn, config)?,
            mapping_ids: args.mappings,
            force: args.force,
            display_limit: effective_display_limit(&conn, None, config)?,
        };
        (found, options)
    };

    let cancel = CancellationToken::new();
    let listener = shutdown::spawn_listener(cancel.clone());

    let db = pool.clone();
    let token = cancel.clone();
    let result = tokio::task::spawn_blocking(move || {
        run_backup(&db, &found, &options, &ConsoleObserver::new(), &token)
    })
    .await;

    cancel.cancel();
    listener.abort();

    let summary = result.map_err(|e| anyhow::anyhow!(e))??;
    println!("{}", report::render_run_summary(&summary));
    Ok(())
}

fn history(args: HistoryArgs, config: &RunnerConfig, pool: &DbPool) -> anyhow::Result<()> {
    let conn = pool.get()?;
    match args.command {
        Some(HistoryCommand::Show { id }) => {
            let run = backup_history::find_by_id(&conn, id)?.ok_or(RunnerError::RunNotFound(id))?;
            let details = backup_detail::find_by_backup(&conn, id)?;
            let files = file_detail::find_by_backup(&conn, id)?;
            println!("{}", report::render_history_detail(&run, &details, &files));
            if !file_detail::has_details(&conn, id)? {
                println!("  No file details were saved for this run");
            }
        }
        Some(HistoryCommand::Remove { id }) => {
            if !backup_history::delete(&conn, id)? {
                return Err(RunnerError::RunNotFound(id).into());
            }
            println!("Deleted run {}", id);
        }
        Some(HistoryCommand::Search { term, limit }) => {
            let term = term.trim();
            if term.is_empty() {
                return Err(RunnerError::InvalidArgument("Search term is empty".to_string()).into());
            }
            let limit = effective_display_limit(&conn, limit, config)?;
            let results = search::search_files(&conn, term)?;
            println!("{}", report::render_search(term, &results, limit));
        }
        None => {
            let rows = match args.project {
                Some(key) => backup_history::find_by_project(&conn, resolve_project(&conn, &key)?.id)?,
                None => backup_history::find_all(&conn)?,
            };
            println!("{}", report::render_history(&rows));
        }
    }
    Ok(())
}

fn revisions(args: RevisionsArgs) -> anyhow::Result<()> {
    match args.file {
        Some(file) => {
            let versions = file_versions(&args.target, &file)?;
            println!("{}", report::render_file_versions(&versions));
        }
        None => {
            let folders = list_revision_folders(&args.target)?;
            let entries = list_revisions(&args.target);
            println!("{}", report::render_revisions(&folders, &entries));
        }
    }
    Ok(())
}

fn settings_command(cmd: SettingsCommand, pool: &DbPool) -> anyhow::Result<()> {
    let conn = pool.get()?;
    match cmd {
        SettingsCommand::List => {
            for (key, value) in settings::get_all(&conn)? {
                println!("{} = {}", key, value);
            }
        }
        SettingsCommand::Get { key } => match settings::get(&conn, &key)? {
            Some(value) => println!("{}", value),
            None => println!("{} is not set", key),
        },
        SettingsCommand::Set { key, value } => {
            validate_setting(&key, &value)?;
            settings::set(&conn, &key, value.trim())?;
            println!("{} = {}", key, value.trim());
        }
        SettingsCommand::Unset { key } => {
            settings::delete(&conn, &key)?;
            println!("{} unset", key);
        }
    }
    Ok(())
}

fn validate_setting(key: &str, value: &str) -> Result<(), RunnerError> {
    match key {
        settings::DISPLAY_LIMIT => value
            .trim()
            .parse::<i64>()
            .map(|_| ())
            .map_err(|_| RunnerError::InvalidArgument(format!("{} must be an integer, got '{}'", key, value))),
        settings::AUTO_SAVE_DETAILS => settings::parse_bool(value)
            .map(|_| ())
            .ok_or_else(|| RunnerError::InvalidArgument(format!("{} must be true or false, got '{}'", key, value))),
        _ => Err(RunnerError::InvalidArgument(format!(
            "Unknown setting '{}' (known: {})",
            key,
            settings::KNOWN_KEYS.join(", ")
        ))),
    }
}
