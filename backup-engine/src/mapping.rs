//! Source → target mapping definition.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Include pattern used when a mapping leaves its filter empty
pub const DEFAULT_INCLUDE: &str = "*.*";

/// One backup rule: which files of `source_path` are mirrored into `target_path`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mapping {
    /// Folder the files are read from
    pub source_path: PathBuf,

    /// Comma separated include globs (e.g. `*.txt, *.doc*`)
    pub include: String,

    /// Comma separated exclude globs
    #[serde(default)]
    pub exclude: String,

    /// Descend into subfolders
    #[serde(default = "default_recurse")]
    pub recurse: bool,

    /// Folder the files are mirrored into
    pub target_path: PathBuf,
}

fn default_recurse() -> bool {
    true
}

impl Mapping {
    pub fn new(source_path: impl Into<PathBuf>, target_path: impl Into<PathBuf>) -> Self {
        Self {
            source_path: source_path.into(),
            include: DEFAULT_INCLUDE.to_string(),
            exclude: String::new(),
            recurse: true,
            target_path: target_path.into(),
        }
    }

    pub fn with_include(mut self, include: impl Into<String>) -> Self {
        self.include = include.into();
        self
    }

    pub fn with_exclude(mut self, exclude: impl Into<String>) -> Self {
        self.exclude = exclude.into();
        self
    }

    pub fn with_recurse(mut self, recurse: bool) -> Self {
        self.recurse = recurse;
        self
    }

    /// Include patterns, falling back to [`DEFAULT_INCLUDE`]
    pub fn include_patterns(&self) -> Vec<String> {
        let patterns = split_patterns(&self.include);
        if patterns.is_empty() {
            vec![DEFAULT_INCLUDE.to_string()]
        } else {
            patterns
        }
    }

    pub fn exclude_patterns(&self) -> Vec<String> {
        split_patterns(&self.exclude)
    }
}

/// Split a comma separated pattern list, trimming blanks
pub fn split_patterns(patterns: &str) -> Vec<String> {
    patterns
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}
