//! Source/target comparison for one mapping.
//!
//! Every file the include filter reaches (plus every file under a hidden
//! folder when recursing) lands in exactly one bucket: backup, skip,
//! user-excluded or hidden-excluded. The target side is scanned separately
//! for the revision inventory and for orphans.

pub mod disposition;

pub use disposition::{Disposition, FileDisposition};

use crate::fs::matcher::{self, FileSet, PathFilter};
use crate::fs::metadata::modified_time;
use crate::fs::walker::{has_component, in_hidden_directory, walk_directory_with_callback, WalkOptions};
use crate::mapping::Mapping;
use crate::revisions::{list_revisions, RevisionEntry, REVISIONS_DIR};
use crate::transfer::progress::{format_size, ProgressObserver};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Default cap for the display lists of an analysis
pub const DEFAULT_DISPLAY_LIMIT: usize = 50;

/// Result of analysing one mapping.
///
/// Lists suffixed `_all` and `files_to_backup` are complete; the other lists
/// are capped by the display limit while counts and sizes stay exact.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalysisResult {
    pub source_root: PathBuf,
    pub target_root: PathBuf,

    /// New and newer files, never truncated
    pub files_to_backup: Vec<FileDisposition>,
    /// Bytes to back up
    pub total_size: u64,

    pub skipped_files: Vec<FileDisposition>,
    pub skipped_count: usize,
    pub skipped_size: u64,

    pub user_excluded_files: Vec<FileDisposition>,
    pub user_excluded_count: usize,
    pub user_excluded_size: u64,

    pub hidden_excluded_files: Vec<FileDisposition>,
    pub hidden_excluded_all: Vec<FileDisposition>,
    pub hidden_excluded_count: usize,
    pub hidden_excluded_size: u64,

    pub total_excluded_count: usize,
    pub total_excluded_size: u64,

    pub revision_files: Vec<RevisionEntry>,
    pub revision_count: usize,
    pub revision_size: u64,

    pub deleted_files: Vec<FileDisposition>,
    pub deleted_files_all: Vec<FileDisposition>,
    pub deleted_count: usize,
    pub deleted_size: u64,
}

impl AnalysisResult {
    pub fn backup_count(&self) -> usize {
        self.files_to_backup.len()
    }

    /// Every source file the analysis accounted for
    pub fn accounted_count(&self) -> usize {
        self.backup_count() + self.skipped_count + self.total_excluded_count
    }

    /// Nothing to copy and nothing to archive
    pub fn is_up_to_date(&self) -> bool {
        self.files_to_backup.is_empty() && self.deleted_files_all.is_empty()
    }
}

/// Quick per-mapping totals, without looking at the target
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MappingStats {
    pub file_count: usize,
    pub total_size: u64,
    pub excluded_count: usize,
    pub excluded_size: u64,
}

/// Which orphans a mirroring run archives. Orphans left out stay in the
/// target untouched.
#[derive(Debug, Clone)]
pub struct OrphanSelection {
    only: PathFilter,
    keep: PathFilter,
}

impl OrphanSelection {
    /// Archive orphans matching `only` (every orphan when empty), except
    /// those matching `keep`
    pub fn new(only: &[String], keep: &[String]) -> crate::Result<Self> {
        Ok(Self {
            only: PathFilter::new(only)?,
            keep: PathFilter::new(keep)?,
        })
    }

    pub fn all() -> Self {
        Self {
            only: PathFilter::empty(),
            keep: PathFilter::empty(),
        }
    }

    pub fn selects(&self, orphan: &FileDisposition) -> bool {
        let path = orphan.relative_path.as_path();
        (self.only.is_empty() || self.only.is_match(path)) && !self.keep.is_match(path)
    }

    pub fn select(&self, orphans: &[FileDisposition]) -> Vec<FileDisposition> {
        orphans.iter().filter(|o| self.selects(o)).cloned().collect()
    }
}

/// Source side of a mapping, split by the filters
struct SourceScan {
    /// Matched by include, not excluded, not hidden
    selected: FileSet,
    /// Matched by include, removed by an exclude pattern
    user_excluded: FileSet,
    /// Every file under a hidden folder (recursive mappings only)
    hidden: FileSet,
}

impl SourceScan {
    fn run(mapping: &Mapping, observer: &dyn ProgressObserver) -> Self {
        let root = mapping.source_path.as_path();

        let mut included = matcher::resolve(root, &mapping.include_patterns(), mapping.recurse, observer);

        let mut hidden = FileSet::new();
        if mapping.recurse && root.is_dir() {
            walk_directory_with_callback(root, &WalkOptions::all(), |file| {
                if in_hidden_directory(&file.relative_path) {
                    hidden.insert(file.path.clone(), file);
                }
            });
            included.retain(|path, _| !hidden.contains_key(path));
        }

        let selected = matcher::exclude(
            &included,
            root,
            &mapping.exclude_patterns(),
            mapping.recurse,
            observer,
        );

        let user_excluded = included
            .into_iter()
            .filter(|(path, _)| !selected.contains_key(path))
            .collect();

        Self {
            selected,
            user_excluded,
            hidden,
        }
    }
}

/// Totals of one mapping: selected files plus user and hidden exclusions
pub fn stats(mapping: &Mapping, observer: &dyn ProgressObserver) -> MappingStats {
    observer.on_status(&format!("Analiz ediliyor: {}", mapping.source_path.display()));

    let scan = SourceScan::run(mapping, observer);

    MappingStats {
        file_count: scan.selected.len(),
        total_size: total(&scan.selected),
        excluded_count: scan.user_excluded.len() + scan.hidden.len(),
        excluded_size: total(&scan.user_excluded) + total(&scan.hidden),
    }
}

/// Classify every file of `mapping`.
///
/// `display_limit` caps the display lists; `None` keeps everything.
/// Unreadable files and folders are skipped, never reported as errors.
pub fn analyze(
    mapping: &Mapping,
    display_limit: Option<usize>,
    observer: &dyn ProgressObserver,
) -> AnalysisResult {
    let source_root = mapping.source_path.as_path();
    let target_root = mapping.target_path.as_path();

    info!(
        "Analyzing {} -> {} (include: '{}', exclude: '{}', recurse: {})",
        source_root.display(),
        target_root.display(),
        mapping.include,
        mapping.exclude,
        mapping.recurse
    );

    let scan = SourceScan::run(mapping, observer);
    let mut result = AnalysisResult {
        source_root: source_root.to_path_buf(),
        target_root: target_root.to_path_buf(),
        ..Default::default()
    };

    for (path, file) in &scan.user_excluded {
        result.user_excluded_count += 1;
        result.user_excluded_size += file.size;
        result.user_excluded_files.push(FileDisposition::source(
            path.clone(),
            file.relative_path.clone(),
            target_root,
            file.size,
            Disposition::UserExcluded,
        ));
    }

    for (path, file) in &scan.hidden {
        result.hidden_excluded_count += 1;
        result.hidden_excluded_size += file.size;
        result.hidden_excluded_all.push(FileDisposition::source(
            path.clone(),
            file.relative_path.clone(),
            target_root,
            file.size,
            Disposition::HiddenExcluded,
        ));
    }

    result.total_excluded_count = result.user_excluded_count + result.hidden_excluded_count;
    result.total_excluded_size = result.user_excluded_size + result.hidden_excluded_size;

    for (path, file) in &scan.selected {
        let target_path = target_root.join(&file.relative_path);
        let disposition = match classify(path, file.modified, &target_path) {
            Some(disposition) => disposition,
            None => continue,
        };

        let entry = FileDisposition::source(
            path.clone(),
            file.relative_path.clone(),
            target_root,
            file.size,
            disposition,
        );

        if entry.disposition.needs_copy() {
            result.total_size += file.size;
            result.files_to_backup.push(entry);
        } else {
            result.skipped_count += 1;
            result.skipped_size += file.size;
            result.skipped_files.push(entry);
        }
    }

    let revisions = list_revisions(target_root);
    result.revision_count = revisions.len();
    result.revision_size = revisions.iter().map(|r| r.size).sum();
    result.revision_files = revisions;

    if source_root.is_dir() {
        result.deleted_files_all = find_orphans(source_root, target_root);
        result.deleted_count = result.deleted_files_all.len();
        result.deleted_size = result.deleted_files_all.iter().map(|f| f.size).sum();
        result.deleted_files = result.deleted_files_all.clone();
    } else {
        warn!(
            "Skipping orphan scan of {}: source {} is unavailable",
            target_root.display(),
            source_root.display()
        );
    }

    truncate(&mut result.skipped_files, display_limit);
    truncate(&mut result.user_excluded_files, display_limit);
    result.hidden_excluded_files = result.hidden_excluded_all.clone();
    truncate(&mut result.hidden_excluded_files, display_limit);
    truncate(&mut result.revision_files, display_limit);
    truncate(&mut result.deleted_files, display_limit);

    info!(
        "Analysis of {}: {} to back up ({}), {} skipped, {} excluded, {} orphaned",
        source_root.display(),
        result.files_to_backup.len(),
        format_size(result.total_size),
        result.skipped_count,
        result.total_excluded_count,
        result.deleted_count
    );

    result
}

/// New, newer or up to date; None when the source can no longer be read
fn classify(
    source: &Path,
    source_mtime: Option<std::time::SystemTime>,
    target: &Path,
) -> Option<Disposition> {
    if !source.exists() {
        debug!("Source vanished during analysis: {}", source.display());
        return None;
    }

    if !target.exists() {
        return Some(Disposition::NewFile);
    }

    let source_mtime = match source_mtime {
        Some(mtime) => mtime,
        None => match modified_time(source) {
            Ok(mtime) => mtime,
            Err(e) => {
                debug!("Cannot read mtime of {}: {}", source.display(), e);
                return None;
            }
        },
    };

    match modified_time(target) {
        Ok(target_mtime) if source_mtime > target_mtime => {
            Some(Disposition::newer(source_mtime, target_mtime))
        }
        Ok(_) => Some(Disposition::UpToDateSkip),
        Err(e) => {
            debug!("Cannot read mtime of {}: {}", target.display(), e);
            Some(Disposition::UpToDateSkip)
        }
    }
}

/// Target files whose source counterpart no longer exists. The archive
/// folder is pruned from the walk and re-checked per file.
fn find_orphans(source_root: &Path, target_root: &Path) -> Vec<FileDisposition> {
    let mut orphans = Vec::new();

    if !target_root.is_dir() {
        return orphans;
    }

    let options = WalkOptions::all().prune_dir(REVISIONS_DIR);
    walk_directory_with_callback(target_root, &options, |file| {
        if has_component(&file.relative_path, REVISIONS_DIR) {
            return;
        }
        if !source_root.join(&file.relative_path).exists() {
            orphans.push(FileDisposition::orphan(file.path, file.relative_path, file.size));
        }
    });

    orphans.sort_by(|a, b| a.target_path.cmp(&b.target_path));
    orphans
}

fn total(files: &FileSet) -> u64 {
    files.values().map(|f| f.size).sum()
}

fn truncate<T>(list: &mut Vec<T>, limit: Option<usize>) {
    if let Some(limit) = limit {
        list.truncate(limit);
    }
}
