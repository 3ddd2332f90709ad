//! The per-run revision folder.

use crate::revisions::{revisions_root, DELETED_PREFIX, FOLDER_FORMAT};
use chrono::Local;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

/// `<target>/_REVISIONS/<YYYY-MM-DD HH-MM>`, named and created on first use
/// and then shared by every archival of the run.
#[derive(Debug)]
pub struct RevisionFolder {
    target_root: PathBuf,
    path: Option<PathBuf>,
}

impl RevisionFolder {
    pub fn new(target_root: impl Into<PathBuf>) -> Self {
        Self {
            target_root: target_root.into(),
            path: None,
        }
    }

    /// Folder path if this run has archived anything yet
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Create the folder on first call; later calls return the same path
    pub fn get_or_create(&mut self) -> io::Result<&Path> {
        let path = match self.path.take() {
            Some(path) => path,
            None => {
                let name = Local::now().format(FOLDER_FORMAT).to_string();
                let path = revisions_root(&self.target_root).join(name);
                fs::create_dir_all(&path)?;
                info!("Using revision folder {}", path.display());
                path
            }
        };
        Ok(self.path.insert(path))
    }

    /// Destination of a superseded version: same relative path
    pub fn superseded_path(&mut self, relative_path: &Path) -> io::Result<PathBuf> {
        Ok(self.get_or_create()?.join(relative_path))
    }

    /// Destination of an archived orphan: `sil_` + relative path
    pub fn deleted_path(&mut self, relative_path: &Path) -> io::Result<PathBuf> {
        let marked = format!("{}{}", DELETED_PREFIX, relative_path.to_string_lossy());
        Ok(self.get_or_create()?.join(marked))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::revisions::{parse_folder_name, REVISIONS_DIR};
    use tempfile::TempDir;

    #[test]
    fn test_created_lazily_once() -> io::Result<()> {
        let dir = TempDir::new()?;
        let mut folder = RevisionFolder::new(dir.path());

        assert!(folder.path().is_none());
        assert!(!dir.path().join(REVISIONS_DIR).exists());

        let first = folder.get_or_create()?.to_path_buf();
        let second = folder.get_or_create()?.to_path_buf();

        assert_eq!(first, second);
        assert!(first.is_dir());
        let name = first.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        assert!(parse_folder_name(&name).is_ok());
        Ok(())
    }

    #[test]
    fn test_archive_destinations() -> io::Result<()> {
        let dir = TempDir::new()?;
        let mut folder = RevisionFolder::new(dir.path());

        let superseded = folder.superseded_path(Path::new("docs/a.txt"))?;
        let deleted = folder.deleted_path(Path::new("docs/a.txt"))?;
        let root = folder.get_or_create()?.to_path_buf();

        assert_eq!(superseded, root.join("docs/a.txt"));
        assert_eq!(deleted, root.join("sil_docs/a.txt"));
        Ok(())
    }
}
