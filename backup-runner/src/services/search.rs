//! File-name search over recorded runs.
//!
//! Each hit is placed where the file most likely lives now: the revision
//! folder of its run when an archived copy exists there, the mapping's target
//! folder when only the current copy exists, and the revision folder
//! otherwise (the target drive may simply not be attached).

use crate::models::file_detail::{self, FileSearchHit};
use crate::models::DATE_FORMAT;
use backup_engine::revisions::{revisions_root, FOLDER_FORMAT};
use chrono::NaiveDateTime;
use rusqlite::Connection;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    #[serde(flatten)]
    pub hit: FileSearchHit,
    /// Folder holding the file
    pub location: PathBuf,
}

pub fn search_files(conn: &Connection, term: &str) -> anyhow::Result<Vec<SearchResult>> {
    let hits = file_detail::search(conn, term)?;
    tracing::debug!("Search '{}' matched {} recorded file(s)", term, hits.len());
    Ok(hits
        .into_iter()
        .map(|hit| SearchResult {
            location: locate(&hit),
            hit,
        })
        .collect())
}

/// Folder of a recorded file under its mapping's target
pub fn locate(hit: &FileSearchHit) -> PathBuf {
    let recorded_dir = PathBuf::from(&hit.detail.file_path);
    let (Some(source), Some(target)) = (hit.source_path.as_deref(), hit.target_path.as_deref()) else {
        return recorded_dir;
    };

    let relative = recorded_dir
        .strip_prefix(source)
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let target_root = Path::new(target);
    let name = hit.detail.file_name.as_str();

    let revision_dir = revisions_root(target_root)
        .join(run_folder_name(&hit.backup_date))
        .join(&relative);
    if revision_dir.join(name).exists() {
        return revision_dir;
    }

    let target_dir = target_root.join(&relative);
    if target_dir.join(name).exists() {
        return target_dir;
    }
    revision_dir
}

/// Revision folder name of a run recorded at `backup_date`
fn run_folder_name(backup_date: &str) -> String {
    match NaiveDateTime::parse_from_str(backup_date, DATE_FORMAT) {
        Ok(date) => date.format(FOLDER_FORMAT).to_string(),
        Err(_) => backup_date.replace(':', "-").replace(' ', "_"),
    }
}
