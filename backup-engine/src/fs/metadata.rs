//! File metadata handling for mirror operations.
//!
//! Copies keep the source modification time so the next analysis compares
//! like with like; they are staged in a temporary file next to the
//! destination and renamed into place, so an interrupted copy never leaves a
//! truncated destination behind.

use filetime::FileTime;
use std::fs;
use std::io;
use std::path::Path;
use std::time::SystemTime;
use tempfile::NamedTempFile;

const STAGING_PREFIX: &str = ".smart-backup-";

/// Modification time of `path`
pub fn modified_time(path: &Path) -> io::Result<SystemTime> {
    fs::metadata(path)?.modified()
}

/// True when `source` was modified strictly after `target`
pub fn is_newer(source: &Path, target: &Path) -> io::Result<bool> {
    Ok(modified_time(source)? > modified_time(target)?)
}

/// Copy `source` to `target`, preserving permissions and access/modification
/// times. Parent folders must exist. Returns the number of bytes copied.
pub fn copy_preserving(source: &Path, target: &Path) -> io::Result<u64> {
    let (staging, bytes) = stage_copy(source, target)?;
    staging.persist(target).map_err(|e| e.error)?;
    Ok(bytes)
}

/// Copy `source` into a temporary file next to `target`, times applied.
/// Nothing at `target` is touched until the returned file is persisted;
/// dropping it removes the staged copy.
pub fn stage_copy(source: &Path, target: &Path) -> io::Result<(NamedTempFile, u64)> {
    let parent = target.parent().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "target has no parent folder")
    })?;

    let source_metadata = fs::metadata(source)?;

    let staging = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .tempfile_in(parent)?;

    // fs::copy carries permission bits along with the data
    let bytes = fs::copy(source, staging.path())?;

    let accessed = FileTime::from_last_access_time(&source_metadata);
    let modified = FileTime::from_last_modification_time(&source_metadata);
    filetime::set_file_times(staging.path(), accessed, modified)?;

    Ok((staging, bytes))
}

/// Move `source` to `target`, creating parent folders. Falls back to
/// copy + remove when a rename is not possible (e.g. across devices).
pub fn move_file(source: &Path, target: &Path) -> io::Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }

    match fs::rename(source, target) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            if !source.exists() {
                return Err(rename_err);
            }
            copy_preserving(source, target)?;
            fs::remove_file(source)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_failed_staging_leaves_target_alone() -> io::Result<()> {
        let dir = TempDir::new()?;
        let source = dir.path().join("folder");
        let target = dir.path().join("target.txt");
        fs::create_dir(&source)?;
        fs::write(&target, b"keep me")?;

        assert!(stage_copy(&source, &target).is_err());
        assert!(copy_preserving(&source, &target).is_err());

        assert_eq!(fs::read(&target)?, b"keep me");
        assert_eq!(fs::read_dir(dir.path())?.count(), 2);
        Ok(())
    }

    #[test]
    fn test_copy_preserves_mtime() -> io::Result<()> {
        let dir = TempDir::new()?;
        let source = dir.path().join("source.txt");
        let target = dir.path().join("target.txt");
        fs::write(&source, b"payload")?;
        filetime::set_file_mtime(&source, FileTime::from_unix_time(1_600_000_000, 0))?;

        let bytes = copy_preserving(&source, &target)?;

        assert_eq!(bytes, 7);
        assert_eq!(fs::read(&target)?, b"payload");
        assert_eq!(modified_time(&target)?, modified_time(&source)?);
        assert!(!is_newer(&source, &target)?);

        let leftovers = fs::read_dir(dir.path())?
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(STAGING_PREFIX))
            .count();
        assert_eq!(leftovers, 0);

        Ok(())
    }

    #[test]
    fn test_copy_overwrites_existing_target() -> io::Result<()> {
        let dir = TempDir::new()?;
        let source = dir.path().join("new.txt");
        let target = dir.path().join("old.txt");
        fs::write(&source, b"new")?;
        fs::write(&target, b"old content")?;

        copy_preserving(&source, &target)?;

        assert_eq!(fs::read(&target)?, b"new");
        Ok(())
    }

    #[test]
    #[cfg(unix)]
    fn test_copy_preserves_permissions() -> io::Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new()?;
        let source = dir.path().join("script.sh");
        let target = dir.path().join("copy.sh");
        fs::write(&source, b"#!/bin/sh")?;
        fs::set_permissions(&source, fs::Permissions::from_mode(0o750))?;

        copy_preserving(&source, &target)?;

        let mode = fs::metadata(&target)?.permissions().mode() & 0o777;
        assert_eq!(mode, 0o750);
        Ok(())
    }

    #[test]
    fn test_move_creates_parents() -> io::Result<()> {
        let dir = TempDir::new()?;
        let source = dir.path().join("a.txt");
        let target = dir.path().join("x/y/a.txt");
        fs::write(&source, b"moved")?;

        move_file(&source, &target)?;

        assert!(!source.exists());
        assert_eq!(fs::read(&target)?, b"moved");
        Ok(())
    }

    #[test]
    fn test_newer_comparison() -> io::Result<()> {
        let dir = TempDir::new()?;
        let old = dir.path().join("old.txt");
        let new = dir.path().join("new.txt");
        fs::write(&old, b"1")?;
        fs::write(&new, b"2")?;
        filetime::set_file_mtime(&old, FileTime::from_unix_time(1_000_000_000, 0))?;
        filetime::set_file_mtime(&new, FileTime::from_unix_time(1_000_000_100, 0))?;

        assert!(is_newer(&new, &old)?);
        assert!(!is_newer(&old, &new)?);
        Ok(())
    }
}
