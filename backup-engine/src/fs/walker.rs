//! Directory traversal for analysis scans.
//!
//! Walks never fail as a whole: unreadable entries and subtrees are logged at
//! debug level and skipped, so a scan under-counts instead of aborting.

use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

/// Options for directory walking
#[derive(Debug, Clone, Default)]
pub struct WalkOptions {
    /// Maximum depth (None = unlimited, 1 = direct children only)
    pub max_depth: Option<usize>,

    /// Do not descend into directories whose name starts with `.`
    pub prune_hidden: bool,

    /// Directory names that are never descended into
    pub prune_dirs: Vec<String>,
}

impl WalkOptions {
    /// Walk the whole tree, hidden folders included
    pub fn all() -> Self {
        Self::default()
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn prune_hidden(mut self) -> Self {
        self.prune_hidden = true;
        self
    }

    pub fn prune_dir(mut self, name: impl Into<String>) -> Self {
        self.prune_dirs.push(name.into());
        self
    }
}

/// Information about a file discovered during walking
#[derive(Debug, Clone)]
pub struct FileInfo {
    /// Full path to the file
    pub path: PathBuf,

    /// Relative path from the root
    pub relative_path: PathBuf,

    /// File size in bytes
    pub size: u64,

    /// Last modification time, when the platform reports one
    pub modified: Option<SystemTime>,
}

impl FileInfo {
    /// Create FileInfo from a DirEntry.
    /// For symlinks, resolves to the target to get the real file size.
    /// Returns None for directories, symlinks to directories and broken symlinks.
    fn from_entry(entry: &DirEntry, root: &Path) -> std::io::Result<Option<Self>> {
        let raw_metadata = entry.metadata()?;
        let path = entry.path().to_path_buf();
        let relative_path = path.strip_prefix(root).unwrap_or(&path).to_path_buf();
        let metadata = if entry.path_is_symlink() {
            match std::fs::metadata(&path) {
                Ok(resolved) => resolved,
                Err(_) => return Ok(None),
            }
        } else {
            raw_metadata
        };

        if !metadata.is_file() {
            return Ok(None);
        }

        Ok(Some(Self {
            path,
            relative_path,
            size: metadata.len(),
            modified: metadata.modified().ok(),
        }))
    }
}

/// Walk a directory tree with a callback for each regular file
pub fn walk_directory_with_callback<F>(root: &Path, options: &WalkOptions, mut callback: F)
where
    F: FnMut(FileInfo),
{
    let mut walker = WalkDir::new(root);

    if let Some(max_depth) = options.max_depth {
        walker = walker.max_depth(max_depth);
    }

    let entries = walker
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !should_prune(entry, options));

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Skipping unreadable entry under {}: {}", root.display(), e);
                continue;
            }
        };

        if entry.file_type().is_dir() {
            continue;
        }

        match FileInfo::from_entry(&entry, root) {
            Ok(Some(file_info)) => callback(file_info),
            Ok(None) => {}
            Err(e) => debug!("Skipping {}: {}", entry.path().display(), e),
        }
    }
}

/// Names starting with `.` are hidden
pub fn is_hidden_name(name: &str) -> bool {
    name.starts_with('.')
}

/// True when any directory component of `relative` (the file name excluded) is hidden
pub fn in_hidden_directory(relative: &Path) -> bool {
    let mut components: Vec<_> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name),
            _ => None,
        })
        .collect();
    components.pop();
    components
        .iter()
        .any(|name| is_hidden_name(&name.to_string_lossy()))
}

/// True when `path` contains a component exactly equal to `name`
pub fn has_component(path: &Path, name: &str) -> bool {
    path.components()
        .any(|c| matches!(c, Component::Normal(part) if part == name))
}

fn should_prune(entry: &DirEntry, options: &WalkOptions) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    (options.prune_hidden && is_hidden_name(&name))
        || options.prune_dirs.iter().any(|d| d.as_str() == name)
}
