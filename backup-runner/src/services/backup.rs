//! Project-level analysis and backup runs.
//!
//! A run analyzes every selected mapping first, then applies them one after
//! the other, sums the statistics and stores them as one history row with a
//! detail row per mapping.

use crate::db::connection::DbPool;
use crate::error::RunnerError;
use crate::models::backup_detail;
use crate::models::backup_history::{self, NewBackupHistory};
use crate::models::file_detail::{self, NewFileDetail};
use crate::models::mapping::{self, MappingRecord};
use crate::models::project::Project;
use crate::services::preflight::inaccessible_drives;
use backup_engine::{
    analyze, AnalysisResult, ApplyStats, FileDisposition, OrphanSelection, ProgressObserver, Reconciler, RunStatus,
};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Archive files that vanished from the source
    pub mirror_deletions: bool,
    /// With mirroring, archive only orphans matching these patterns
    pub only_deleted: Vec<String>,
    /// With mirroring, leave orphans matching these patterns in place
    pub keep_deleted: Vec<String>,
    /// Copy files under hidden folders too
    pub include_hidden: bool,
    /// Store one row per planned file in `backup_file_details`
    pub save_details: bool,
    /// Restrict the run to these mappings; empty means all
    pub mapping_ids: Vec<i64>,
    /// Run even when a target drive is missing
    pub force: bool,
    pub display_limit: Option<usize>,
}

/// Analysis of one mapping
#[derive(Debug, Clone)]
pub struct MappingAnalysis {
    pub mapping: MappingRecord,
    pub analysis: AnalysisResult,
}

/// Outcome of one mapping within a run
#[derive(Debug, Clone)]
pub struct MappingRun {
    pub mapping: MappingRecord,
    pub stats: ApplyStats,
    pub excluded_count: u64,
    pub excluded_size: u64,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: i64,
    pub stats: ApplyStats,
    pub excluded_count: u64,
    pub excluded_size: u64,
    pub analysis_duration: Duration,
    pub duration: Duration,
    pub mappings: Vec<MappingRun>,
    pub details_saved: usize,
}

/// Mappings of `project`, optionally narrowed to `ids`
pub fn select_mappings(conn: &Connection, project: &Project, ids: &[i64]) -> anyhow::Result<Vec<MappingRecord>> {
    let all = mapping::find_by_project(conn, project.id)?;

    if let Some(missing) = ids.iter().find(|id| !all.iter().any(|m| m.id == **id)) {
        return Err(RunnerError::MappingNotFound(*missing).into());
    }

    let selected: Vec<MappingRecord> = if ids.is_empty() {
        all
    } else {
        all.into_iter().filter(|m| ids.contains(&m.id)).collect()
    };

    if selected.is_empty() {
        return Err(RunnerError::NoMappings(project.name.clone()).into());
    }
    Ok(selected)
}

pub fn analyze_mappings(
    mappings: &[MappingRecord],
    display_limit: Option<usize>,
    observer: &dyn ProgressObserver,
) -> Vec<MappingAnalysis> {
    mappings
        .iter()
        .map(|record| MappingAnalysis {
            analysis: analyze(&record.to_mapping(), display_limit, observer),
            mapping: record.clone(),
        })
        .collect()
}

/// Analyze every mapping of `project`
pub fn analyze_project(
    pool: &DbPool,
    project: &Project,
    display_limit: Option<usize>,
    observer: &dyn ProgressObserver,
) -> anyhow::Result<Vec<MappingAnalysis>> {
    let conn = pool.get()?;
    let mappings = select_mappings(&conn, project, &[])?;
    Ok(analyze_mappings(&mappings, display_limit, observer))
}

/// Analyze, apply and record one backup run of `project`
pub fn run_backup(
    pool: &DbPool,
    project: &Project,
    options: &RunOptions,
    observer: &dyn ProgressObserver,
    cancel: &CancellationToken,
) -> anyhow::Result<RunSummary> {
    let conn = pool.get()?;
    let mappings = select_mappings(&conn, project, &options.mapping_ids)?;
    let selection = OrphanSelection::new(&options.only_deleted, &options.keep_deleted)?;

    let missing = inaccessible_drives(&mappings);
    if !missing.is_empty() {
        let err = RunnerError::TargetDriveInaccessible(missing);
        if !options.force {
            return Err(err.into());
        }
        tracing::warn!("[Backup] {}, continuing because of --force", err);
    }

    tracing::info!("[Backup] Analyzing {} mapping(s) of '{}'", mappings.len(), project.name);
    let analysis_start = Instant::now();
    let analyses = analyze_mappings(&mappings, options.display_limit, observer);
    let analysis_duration = analysis_start.elapsed();

    let apply_start = Instant::now();
    let mut runs = Vec::with_capacity(analyses.len());
    let mut processed = Vec::with_capacity(analyses.len());
    let mut cancelled = false;

    for item in &analyses {
        if cancel.is_cancelled() {
            cancelled = true;
            break;
        }

        let files = files_to_copy(&item.analysis, options.include_hidden);
        let (excluded_count, excluded_size) = excluded_totals(&item.analysis, options.include_hidden);

        let orphans = if options.mirror_deletions {
            selection.select(&item.analysis.deleted_files_all)
        } else {
            Vec::new()
        };
        let kept = item.analysis.deleted_files_all.len() - orphans.len();
        if options.mirror_deletions && kept > 0 {
            tracing::info!("[Backup] Leaving {} orphan(s) of {} in place", kept, item.mapping.label());
        }

        let nothing_to_do = files.is_empty() && orphans.is_empty();

        let mut stats = if nothing_to_do {
            tracing::info!("[Backup] {} is up to date", item.mapping.label());
            ApplyStats::default()
        } else {
            let mut reconciler = Reconciler::with_cancel(
                &item.analysis.source_root,
                &item.analysis.target_root,
                cancel.clone(),
            );
            reconciler.run(&files, options.mirror_deletions, &orphans, observer)
        };

        stats.files_skipped += item.analysis.skipped_count;
        stats.size_skipped += item.analysis.skipped_size;
        cancelled |= stats.is_cancelled();

        runs.push(MappingRun {
            mapping: item.mapping.clone(),
            stats,
            excluded_count: excluded_count as u64,
            excluded_size,
        });
        processed.push((item.mapping.id, files));

        if cancelled {
            break;
        }
    }
    let duration = apply_start.elapsed();

    let mut total: ApplyStats = runs.iter().map(|r| r.stats).sum();
    if cancelled {
        total.status = RunStatus::Cancelled;
    }
    let excluded_count = runs.iter().map(|r| r.excluded_count).sum();
    let excluded_size = runs.iter().map(|r| r.excluded_size).sum();

    let run_id = backup_history::create(
        &conn,
        &NewBackupHistory {
            project_id: project.id,
            analysis_duration_seconds: analysis_duration.as_secs_f64(),
            duration_seconds: duration.as_secs_f64(),
            stats: total,
            excluded_count,
            excluded_size,
        },
    )?;
    for run in &runs {
        backup_detail::create(
            &conn,
            run_id,
            run.mapping.id,
            &run.stats,
            run.excluded_count,
            run.excluded_size,
        )?;
    }

    let details_saved = if options.save_details {
        save_file_details(&conn, run_id, &processed)?
    } else {
        0
    };

    tracing::info!(
        "[Backup] Run {} {}: {} copied, {} archived, {} deleted, {} skipped",
        run_id,
        total.status.as_str(),
        total.files_copied,
        total.files_moved_to_revisions,
        total.files_deleted,
        total.files_skipped
    );

    Ok(RunSummary {
        run_id,
        stats: total,
        excluded_count,
        excluded_size,
        analysis_duration,
        duration,
        mappings: runs,
        details_saved,
    })
}

/// Planned copies, with hidden-folder files appended on request
fn files_to_copy(analysis: &AnalysisResult, include_hidden: bool) -> Vec<FileDisposition> {
    let mut files = analysis.files_to_backup.clone();
    if include_hidden {
        files.extend(analysis.hidden_excluded_all.iter().cloned());
    }
    files
}

/// Excluded totals; hidden files stop counting once they are copied
fn excluded_totals(analysis: &AnalysisResult, include_hidden: bool) -> (usize, u64) {
    if include_hidden {
        (analysis.user_excluded_count, analysis.user_excluded_size)
    } else {
        (analysis.total_excluded_count, analysis.total_excluded_size)
    }
}

/// One row per planned file, with the size the latest earlier run recorded
fn save_file_details(
    conn: &Connection,
    run_id: i64,
    processed: &[(i64, Vec<FileDisposition>)],
) -> anyhow::Result<usize> {
    let mut rows = Vec::new();
    for (mapping_id, files) in processed {
        for file in files {
            let Some(source) = file.source_path.as_deref() else {
                continue;
            };
            let dir = source.parent().unwrap_or(Path::new("")).to_string_lossy().into_owned();
            let name = file.name();
            let previous_size = file_detail::get_previous_file_size(conn, &dir, &name, run_id)?;

            rows.push(NewFileDetail {
                mapping_id: Some(*mapping_id),
                file_path: dir,
                file_name: name,
                file_size: file.size,
                previous_size,
                backup_reason: file.disposition.reason().to_string(),
            });
        }
    }

    if rows.is_empty() {
        tracing::info!("[Backup] No file details to save for run {}", run_id);
        return Ok(0);
    }

    let saved = file_detail::insert_many(conn, run_id, &rows)?;
    tracing::info!("[Backup] Saved {} file details for run {}", saved, run_id);
    Ok(saved)
}
