//! Per-file classification produced by an analysis pass.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Format of the human-readable dates attached to [`Disposition::Newer`]
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Why a file ended up where it did
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum Disposition {
    /// Not present in the target yet
    NewFile,
    /// Source modified strictly after the target copy
    Newer {
        source_mtime: SystemTime,
        target_mtime: SystemTime,
        source_date: String,
        target_date: String,
    },
    /// Target copy is as new as the source (or newer)
    UpToDateSkip,
    /// Matched an exclude pattern
    UserExcluded,
    /// Lives under a hidden (dot) folder
    HiddenExcluded,
    /// Present in the target, gone from the source
    Orphaned,
}

impl Disposition {
    pub fn newer(source_mtime: SystemTime, target_mtime: SystemTime) -> Self {
        Disposition::Newer {
            source_mtime,
            target_mtime,
            source_date: format_date(source_mtime),
            target_date: format_date(target_mtime),
        }
    }

    /// Short label shown next to each file in reports
    pub fn reason(&self) -> &'static str {
        match self {
            Disposition::NewFile => "yeni dosya",
            Disposition::Newer { .. } => "daha yeni",
            Disposition::UpToDateSkip => "güncel",
            Disposition::UserExcluded => "hariç tutuldu",
            Disposition::HiddenExcluded => "gizli klasör",
            Disposition::Orphaned => "kaynakta yok",
        }
    }

    /// New and newer files are the ones an apply run copies
    pub fn needs_copy(&self) -> bool {
        matches!(self, Disposition::NewFile | Disposition::Newer { .. })
    }
}

/// One classified file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileDisposition {
    /// Source file, absent for orphans
    pub source_path: Option<PathBuf>,

    /// Where the file lives (or will live) under the target root
    pub target_path: PathBuf,

    /// Path relative to both roots
    pub relative_path: PathBuf,

    pub size: u64,

    #[serde(flatten)]
    pub disposition: Disposition,
}

impl FileDisposition {
    /// Classify a source file mirrored to `target_root/relative_path`
    pub fn source(
        source_path: PathBuf,
        relative_path: PathBuf,
        target_root: &Path,
        size: u64,
        disposition: Disposition,
    ) -> Self {
        Self {
            source_path: Some(source_path),
            target_path: target_root.join(&relative_path),
            relative_path,
            size,
            disposition,
        }
    }

    /// A target file without a source counterpart
    pub fn orphan(target_path: PathBuf, relative_path: PathBuf, size: u64) -> Self {
        Self {
            source_path: None,
            target_path,
            relative_path,
            size,
            disposition: Disposition::Orphaned,
        }
    }

    /// Source path when present, otherwise the target path
    pub fn display_path(&self) -> &Path {
        self.source_path.as_deref().unwrap_or(&self.target_path)
    }

    /// File name used in status lines
    pub fn name(&self) -> String {
        self.relative_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.relative_path.to_string_lossy().into_owned())
    }
}

/// Local-time rendering of a modification time
pub fn format_date(time: SystemTime) -> String {
    DateTime::<Local>::from(time).format(DATE_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_newer_carries_formatted_dates() {
        let older = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let newer = older + Duration::from_secs(3600);

        let disposition = Disposition::newer(newer, older);
        match &disposition {
            Disposition::Newer { source_date, target_date, .. } => {
                assert_eq!(source_date.len(), 19);
                assert_ne!(source_date, target_date);
            }
            other => panic!("unexpected disposition {other:?}"),
        }
        assert!(disposition.needs_copy());
        assert_eq!(disposition.reason(), "daha yeni");
    }

    #[test]
    fn test_target_path_is_joined_relative_path() {
        let file = FileDisposition::source(
            PathBuf::from("/src/docs/a.txt"),
            PathBuf::from("docs/a.txt"),
            Path::new("/dst"),
            3,
            Disposition::NewFile,
        );
        assert_eq!(file.target_path, PathBuf::from("/dst/docs/a.txt"));
        assert_eq!(file.name(), "a.txt");
        assert_eq!(file.display_path(), Path::new("/src/docs/a.txt"));
    }

    #[test]
    fn test_orphan_has_no_source() {
        let orphan = FileDisposition::orphan(PathBuf::from("/dst/x.txt"), PathBuf::from("x.txt"), 1);
        assert!(orphan.source_path.is_none());
        assert!(!orphan.disposition.needs_copy());
        assert_eq!(orphan.display_path(), Path::new("/dst/x.txt"));
    }
}
