//! Target drive check before a backup run.
//!
//! A missing target folder is fine (the first run creates it), a missing
//! drive or mount point is not: copying would silently fill the parent
//! filesystem instead.

use crate::models::mapping::MappingRecord;
use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

/// Drive or mount point holding `path`.
///
/// Windows paths resolve to their prefix (`E:\`, `\\server\share\`). On Unix
/// the well-known removable media roots count as mount points:
/// `/mnt/<name>`, `/Volumes/<name>`, `/media/<user>/<name>` and
/// `/run/media/<user>/<name>`. Anything else lives on `/`.
pub fn mount_root(path: &Path) -> PathBuf {
    let mut root = PathBuf::new();
    let mut names = Vec::new();
    let mut has_prefix = false;

    for component in path.components() {
        match component {
            Component::Prefix(_) => {
                has_prefix = true;
                root.push(component.as_os_str());
            }
            Component::RootDir => root.push(component.as_os_str()),
            Component::Normal(name) => names.push(name),
            Component::CurDir | Component::ParentDir => {}
        }
    }

    if has_prefix {
        return root;
    }
    if root.as_os_str().is_empty() {
        // Relative targets live under the working directory
        return PathBuf::from(".");
    }

    let first = names.first().and_then(|n| n.to_str());
    let second = names.get(1).and_then(|n| n.to_str());
    let depth = match (first, second) {
        (Some("mnt"), _) | (Some("Volumes"), _) => 2,
        (Some("media"), _) => 3,
        (Some("run"), Some("media")) => 4,
        _ => 0,
    };

    for name in names.iter().take(depth) {
        root.push(name);
    }
    root
}

/// Mount roots of `mappings` that do not exist, each listed once
pub fn inaccessible_drives(mappings: &[MappingRecord]) -> Vec<PathBuf> {
    let roots: BTreeSet<PathBuf> = mappings
        .iter()
        .map(|m| mount_root(Path::new(&m.target_path)))
        .collect();

    roots.into_iter().filter(|root| !root.exists()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(target: &str) -> MappingRecord {
        MappingRecord {
            id: 1,
            project_id: 1,
            source_path: "/src".into(),
            file_filter: "*.*".into(),
            exclude_filter: String::new(),
            include_subdirs: true,
            target_path: target.into(),
            created_date: String::new(),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_mount_roots() {
        assert_eq!(mount_root(Path::new("/mnt/usb/backup/docs")), PathBuf::from("/mnt/usb"));
        assert_eq!(mount_root(Path::new("/Volumes/Backup/docs")), PathBuf::from("/Volumes/Backup"));
        assert_eq!(mount_root(Path::new("/media/me/disk/docs")), PathBuf::from("/media/me/disk"));
        assert_eq!(mount_root(Path::new("/run/media/me/disk/x")), PathBuf::from("/run/media/me/disk"));
        assert_eq!(mount_root(Path::new("/home/me/backup")), PathBuf::from("/"));
        assert_eq!(mount_root(Path::new("backup/docs")), PathBuf::from("."));
    }

    #[test]
    fn test_missing_target_folder_on_existing_drive_is_fine() -> std::io::Result<()> {
        let dir = TempDir::new()?;
        let target = dir.path().join("not-created-yet");
        let records = vec![record(&target.to_string_lossy())];
        assert!(inaccessible_drives(&records).is_empty());
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_missing_mount_reported_once() {
        let records = vec![
            record("/mnt/smart-backup-missing-drive/a"),
            record("/mnt/smart-backup-missing-drive/b"),
            record("/home"),
        ];
        assert_eq!(
            inaccessible_drives(&records),
            vec![PathBuf::from("/mnt/smart-backup-missing-drive")]
        );
    }
}
