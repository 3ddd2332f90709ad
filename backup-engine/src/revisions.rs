//! Inventory of the `_REVISIONS` archive kept inside every target folder.
//!
//! Layout:
//! ```text
//! <target>/_REVISIONS/<YYYY-MM-DD HH-MM>/<relative path>       superseded version
//! <target>/_REVISIONS/<YYYY-MM-DD HH-MM>/sil_<relative path>   archived deletion
//! ```

use crate::fs::walker::{walk_directory_with_callback, WalkOptions};
use crate::utils::errors::EngineError;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Name of the archive folder under every target root
pub const REVISIONS_DIR: &str = "_REVISIONS";

/// Marker prepended to the relative path of archived orphans
pub const DELETED_PREFIX: &str = "sil_";

/// `strftime` format of one run's revision folder name
pub const FOLDER_FORMAT: &str = "%Y-%m-%d %H-%M";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevisionKind {
    /// Older version moved aside before a newer copy replaced it
    Superseded,
    /// File that disappeared from the source, archived by mirror deletions
    Deleted,
}

/// One archived file
#[derive(Debug, Clone, Serialize)]
pub struct RevisionEntry {
    /// Full path of the archived file
    pub path: PathBuf,

    /// Name of the run folder holding it (first segment under `_REVISIONS`)
    pub timestamp_folder: String,

    /// Path the file had relative to the target root, deletion marker stripped
    pub relative_path: PathBuf,

    pub kind: RevisionKind,

    pub size: u64,
}

/// One run folder under `_REVISIONS`
#[derive(Debug, Clone, Serialize)]
pub struct RevisionFolderInfo {
    pub name: String,
    pub path: PathBuf,
    /// None when the folder name does not follow [`FOLDER_FORMAT`]
    pub timestamp: Option<NaiveDateTime>,
}

/// `<target_root>/_REVISIONS`
pub fn revisions_root(target_root: &Path) -> PathBuf {
    target_root.join(REVISIONS_DIR)
}

/// Parse a run folder name such as `2025-11-22 14-30`
pub fn parse_folder_name(name: &str) -> crate::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(name, FOLDER_FORMAT)
        .map_err(|e| EngineError::Revision(format!("'{name}' is not a revision folder name: {e}")))
}

/// Every archived file under `target_root/_REVISIONS`, sorted by path.
/// A missing archive yields an empty list.
pub fn list_revisions(target_root: &Path) -> Vec<RevisionEntry> {
    let root = revisions_root(target_root);
    let mut entries = Vec::new();

    if !root.is_dir() {
        return entries;
    }

    walk_directory_with_callback(&root, &WalkOptions::all(), |file| {
        if let Some(entry) = classify_entry(file.path, &file.relative_path, file.size) {
            entries.push(entry);
        }
    });

    entries.sort_by(|a, b| a.path.cmp(&b.path));
    entries
}

/// Run folders, newest first; names that do not parse come last
pub fn list_revision_folders(target_root: &Path) -> crate::Result<Vec<RevisionFolderInfo>> {
    let root = revisions_root(target_root);

    let reader = match fs::read_dir(&root) {
        Ok(reader) => reader,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut folders = Vec::new();
    for entry in reader {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        folders.push(RevisionFolderInfo {
            timestamp: parse_folder_name(&name).ok(),
            path: entry.path(),
            name,
        });
    }

    folders.sort_by(|a, b| newest_first(a.timestamp, &a.name, b.timestamp, &b.name));
    Ok(folders)
}

/// All archived copies of one file, newest first.
///
/// `relative_path` is relative to the target root; an absolute path is
/// accepted when it lies under `target_root`.
pub fn file_versions(target_root: &Path, relative_path: &Path) -> crate::Result<Vec<RevisionEntry>> {
    let relative = if relative_path.is_absolute() {
        relative_path
            .strip_prefix(target_root)
            .map_err(|_| EngineError::OutsideRoot {
                path: relative_path.to_path_buf(),
                root: target_root.to_path_buf(),
            })?
            .to_path_buf()
    } else {
        relative_path.to_path_buf()
    };

    let mut versions: Vec<RevisionEntry> = list_revisions(target_root)
        .into_iter()
        .filter(|entry| entry.relative_path == relative)
        .collect();

    versions.sort_by(|a, b| {
        newest_first(
            parse_folder_name(&a.timestamp_folder).ok(),
            &a.timestamp_folder,
            parse_folder_name(&b.timestamp_folder).ok(),
            &b.timestamp_folder,
        )
    });
    Ok(versions)
}

/// Split `<folder>/<rest>` into a revision entry. A file sitting directly in
/// `_REVISIONS` is its own folder label.
fn classify_entry(path: PathBuf, inside_archive: &Path, size: u64) -> Option<RevisionEntry> {
    let parts: Vec<String> = inside_archive
        .components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    let (timestamp_folder, first, rest) = match parts.as_slice() {
        [] => return None,
        [name] => (name.clone(), name.clone(), &[] as &[String]),
        [folder, first, rest @ ..] => (folder.clone(), first.clone(), rest),
    };

    let (kind, first) = match first.strip_prefix(DELETED_PREFIX) {
        Some(stripped) if !stripped.is_empty() => (RevisionKind::Deleted, stripped.to_string()),
        _ => (RevisionKind::Superseded, first),
    };

    let mut relative_path = PathBuf::from(first);
    relative_path.extend(rest.iter());

    Some(RevisionEntry {
        path,
        timestamp_folder,
        relative_path,
        kind,
        size,
    })
}

fn newest_first(
    a: Option<NaiveDateTime>,
    a_name: &str,
    b: Option<NaiveDateTime>,
    b_name: &str,
) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => b_name.cmp(a_name),
    }
}
