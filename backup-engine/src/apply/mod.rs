//! Apply phase: mirrors analysed files into the target and archives what it
//! replaces or (optionally) what disappeared from the source.
//!
//! Files are handled strictly in the order given. Cancellation is checked
//! before every file and every orphan; an in-flight copy always finishes, and
//! because copies are staged and renamed, a stop never leaves a partially
//! written destination.

pub mod revision_folder;

pub use revision_folder::RevisionFolder;

use crate::analysis::FileDisposition;
use crate::fs::metadata::{copy_preserving, is_newer, move_file, stage_copy};
use crate::transfer::progress::{format_size, ProgressObserver, ProgressTracker};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::ops::AddAssign;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Terminal state of an apply run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    #[default]
    Completed,
    Cancelled,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Completed => "completed",
            RunStatus::Cancelled => "cancelled",
        }
    }
}

/// Lifecycle of one [`Reconciler`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyState {
    Idle,
    Running,
    Finished(RunStatus),
}

/// Counters of one apply run. Sizes are source sizes in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyStats {
    pub files_copied: usize,
    pub files_moved_to_revisions: usize,
    pub files_skipped: usize,
    pub files_deleted: usize,
    pub size_copied: u64,
    pub size_moved: u64,
    pub size_skipped: u64,
    pub size_deleted: u64,
    pub status: RunStatus,
}

impl ApplyStats {
    pub fn is_cancelled(&self) -> bool {
        self.status == RunStatus::Cancelled
    }
}

/// Summing keeps `Cancelled` if any part was cancelled
impl AddAssign for ApplyStats {
    fn add_assign(&mut self, other: Self) {
        self.files_copied += other.files_copied;
        self.files_moved_to_revisions += other.files_moved_to_revisions;
        self.files_skipped += other.files_skipped;
        self.files_deleted += other.files_deleted;
        self.size_copied += other.size_copied;
        self.size_moved += other.size_moved;
        self.size_skipped += other.size_skipped;
        self.size_deleted += other.size_deleted;
        if other.status == RunStatus::Cancelled {
            self.status = RunStatus::Cancelled;
        }
    }
}

impl std::iter::Sum for ApplyStats {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(ApplyStats::default(), |mut acc, stats| {
            acc += stats;
            acc
        })
    }
}

/// Outcome of one file
enum FileOutcome {
    CopiedNew,
    CopiedOverOlder,
    Skipped,
}

/// Executes an analysis result against one target root
pub struct Reconciler {
    source_root: PathBuf,
    target_root: PathBuf,
    revision_folder: RevisionFolder,
    cancel_token: CancellationToken,
    state: ApplyState,
}

impl Reconciler {
    /// Create a reconciler (no cancellation support)
    pub fn new(source_root: impl Into<PathBuf>, target_root: impl Into<PathBuf>) -> Self {
        Self::with_cancel(source_root, target_root, CancellationToken::new())
    }

    /// Create a reconciler that stops when `cancel_token` is cancelled
    pub fn with_cancel(
        source_root: impl Into<PathBuf>,
        target_root: impl Into<PathBuf>,
        cancel_token: CancellationToken,
    ) -> Self {
        let target_root = target_root.into();
        Self {
            source_root: source_root.into(),
            revision_folder: RevisionFolder::new(target_root.clone()),
            target_root,
            cancel_token,
            state: ApplyState::Idle,
        }
    }

    pub fn state(&self) -> ApplyState {
        self.state
    }

    /// Revision folder used by this run, if one was needed
    pub fn revision_folder(&self) -> Option<&Path> {
        self.revision_folder.path()
    }

    /// Copy `files` (new/newer entries) and, with `mirror_deletions`, archive
    /// `orphans` under the `sil_` marker.
    pub fn run(
        &mut self,
        files: &[FileDisposition],
        mirror_deletions: bool,
        orphans: &[FileDisposition],
        observer: &dyn ProgressObserver,
    ) -> ApplyStats {
        self.state = ApplyState::Running;
        self.revision_folder = RevisionFolder::new(self.target_root.clone());

        let orphan_count = if mirror_deletions { orphans.len() } else { 0 };
        let mut tracker = ProgressTracker::new(files.len() + orphan_count);
        let mut stats = ApplyStats::default();

        info!(
            "Applying {} files to {} (mirror deletions: {}, {} orphans)",
            files.len(),
            self.target_root.display(),
            mirror_deletions,
            orphan_count
        );

        for file in files {
            if self.cancel_token.is_cancelled() {
                return self.finish(stats, RunStatus::Cancelled);
            }

            tracker.begin_item(file.name());
            let bytes = self.apply_file(file, &mut stats, observer);
            observer.on_progress(tracker.finish_item(bytes));
        }

        if mirror_deletions && !orphans.is_empty() {
            for orphan in orphans {
                if self.cancel_token.is_cancelled() {
                    return self.finish(stats, RunStatus::Cancelled);
                }

                tracker.begin_item(orphan.name());
                let bytes = self.archive_orphan(orphan, &mut stats, observer);
                observer.on_progress(tracker.finish_item(bytes));
            }
        }

        info!(
            "Apply finished in {:.1}s ({} handled): {} copied ({}), {} archived, {} skipped, {} deleted",
            tracker.elapsed().as_secs_f64(),
            format_size(tracker.progress().bytes_processed),
            stats.files_copied,
            format_size(stats.size_copied),
            stats.files_moved_to_revisions,
            stats.files_skipped,
            stats.files_deleted
        );

        self.finish(stats, RunStatus::Completed)
    }

    fn finish(&mut self, mut stats: ApplyStats, status: RunStatus) -> ApplyStats {
        if status == RunStatus::Cancelled {
            info!(
                "Apply to {} cancelled after {} copies",
                self.target_root.display(),
                stats.files_copied
            );
        }
        stats.status = status;
        self.state = ApplyState::Finished(status);
        stats
    }

    /// Returns the bytes handled for progress accounting
    fn apply_file(
        &mut self,
        file: &FileDisposition,
        stats: &mut ApplyStats,
        observer: &dyn ProgressObserver,
    ) -> u64 {
        let Some(source) = file.source_path.as_deref() else {
            debug!("Ignoring entry without source: {}", file.target_path.display());
            return 0;
        };

        let size = match fs::metadata(source) {
            Ok(metadata) => metadata.len(),
            Err(_) => {
                debug!("Source vanished before copy: {}", source.display());
                return 0;
            }
        };

        let relative = self.relative_to_source(file, source);
        let target = self.target_root.join(&relative);

        match self.copy_one(source, &target, &relative) {
            Ok(FileOutcome::CopiedNew) => {
                stats.files_copied += 1;
                stats.size_copied += size;
                observer.on_status(&format!(
                    "✓ Kopyalandı (yeni): {} ({})",
                    file.name(),
                    format_size(size)
                ));
            }
            Ok(FileOutcome::CopiedOverOlder) => {
                stats.files_moved_to_revisions += 1;
                stats.size_moved += size;
                stats.files_copied += 1;
                stats.size_copied += size;
                observer.on_status(&format!(
                    "✓ Kopyalandı (eski sürüm arşivlendi): {} ({})",
                    file.name(),
                    format_size(size)
                ));
            }
            Ok(FileOutcome::Skipped) => {
                stats.files_skipped += 1;
                stats.size_skipped += size;
            }
            Err(e) => {
                warn!("Failed to copy {}: {}", source.display(), e);
                observer.on_status(&format!("⚠ Kopyalama hatası: {} - {}", file.name(), e));
            }
        }

        size
    }

    fn copy_one(&mut self, source: &Path, target: &Path, relative: &Path) -> io::Result<FileOutcome> {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        if !target.exists() {
            copy_preserving(source, target)?;
            return Ok(FileOutcome::CopiedNew);
        }

        // The target may have changed since the analysis
        if !is_newer(source, target)? {
            return Ok(FileOutcome::Skipped);
        }

        // Stage first so a failed copy leaves the old version in place
        let (staged, _) = stage_copy(source, target)?;
        let archived = self.revision_folder.superseded_path(relative)?;
        move_file(target, &archived)?;

        if let Err(e) = staged.persist(target) {
            if let Err(restore) = move_file(&archived, target) {
                warn!(
                    "Could not restore {} from {}: {}",
                    target.display(),
                    archived.display(),
                    restore
                );
            }
            return Err(e.error);
        }
        Ok(FileOutcome::CopiedOverOlder)
    }

    fn archive_orphan(
        &mut self,
        orphan: &FileDisposition,
        stats: &mut ApplyStats,
        observer: &dyn ProgressObserver,
    ) -> u64 {
        let target = orphan.target_path.as_path();

        let size = match fs::metadata(target) {
            Ok(metadata) => metadata.len(),
            Err(_) => {
                debug!("Orphan already gone: {}", target.display());
                return 0;
            }
        };

        let relative = target
            .strip_prefix(&self.target_root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| orphan.relative_path.clone());

        let result = self
            .revision_folder
            .deleted_path(&relative)
            .and_then(|archived| move_file(target, &archived));

        match result {
            Ok(()) => {
                stats.files_deleted += 1;
                stats.size_deleted += size;
                observer.on_status(&format!(
                    "🗑 Silindi (arşivlendi): {} ({})",
                    orphan.name(),
                    format_size(size)
                ));
            }
            Err(e) => {
                warn!("Failed to archive orphan {}: {}", target.display(), e);
                observer.on_status(&format!("⚠ Silme hatası: {} - {}", orphan.name(), e));
            }
        }

        size
    }

    fn relative_to_source(&self, file: &FileDisposition, source: &Path) -> PathBuf {
        source
            .strip_prefix(&self.source_root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| file.relative_path.clone())
    }
}

/// One-shot apply of an analysis result
pub fn apply(
    source_root: &Path,
    target_root: &Path,
    files_to_backup: &[FileDisposition],
    mirror_deletions: bool,
    orphans: &[FileDisposition],
    observer: &dyn ProgressObserver,
    cancel_token: &CancellationToken,
) -> ApplyStats {
    Reconciler::with_cancel(source_root, target_root, cancel_token.clone()).run(
        files_to_backup,
        mirror_deletions,
        orphans,
        observer,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze;
    use crate::mapping::Mapping;
    use crate::revisions::{list_revision_folders, list_revisions, REVISIONS_DIR};
    use crate::transfer::progress::{FnObserver, NoopObserver};
    use filetime::FileTime;
    use std::cell::{Cell, RefCell};
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        source: PathBuf,
        target: PathBuf,
    }

    impl Fixture {
        fn new() -> io::Result<Self> {
            let dir = TempDir::new()?;
            let source = dir.path().join("source");
            let target = dir.path().join("target");
            fs::create_dir_all(&source)?;
            fs::create_dir_all(&target)?;
            Ok(Self { _dir: dir, source, target })
        }

        fn write(&self, root: &Path, relative: &str, content: &[u8], mtime: i64) -> io::Result<()> {
            let path = root.join(relative);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, content)?;
            filetime::set_file_mtime(&path, FileTime::from_unix_time(mtime, 0))
        }

        fn mapping(&self) -> Mapping {
            Mapping::new(&self.source, &self.target)
        }

        fn only_revision_folder(&self) -> io::Result<PathBuf> {
            let folders = list_revision_folders(&self.target).map_err(io::Error::other)?;
            assert_eq!(folders.len(), 1);
            Ok(folders[0].path.clone())
        }
    }

    #[test]
    fn test_new_file_copied_without_revision_folder() -> io::Result<()> {
        let fx = Fixture::new()?;
        fx.write(&fx.source, "doc.txt", b"document", 1_000)?;

        let analysis = analyze(&fx.mapping(), None, &NoopObserver);
        let mut reconciler = Reconciler::new(&fx.source, &fx.target);
        let stats = reconciler.run(&analysis.files_to_backup, false, &[], &NoopObserver);

        assert_eq!(stats.files_copied, 1);
        assert_eq!(stats.size_copied, 8);
        assert_eq!(stats.status, RunStatus::Completed);
        assert_eq!(reconciler.state(), ApplyState::Finished(RunStatus::Completed));
        assert_eq!(fs::read(fx.target.join("doc.txt"))?, b"document");
        assert!(!fx.target.join(REVISIONS_DIR).exists());
        assert!(reconciler.revision_folder().is_none());
        Ok(())
    }

    #[test]
    fn test_newer_file_preserves_old_version() -> io::Result<()> {
        let fx = Fixture::new()?;
        fx.write(&fx.source, "docs/doc.txt", b"version two", 2_000)?;
        fx.write(&fx.target, "docs/doc.txt", b"version one", 1_000)?;

        let analysis = analyze(&fx.mapping(), None, &NoopObserver);
        let stats = apply(
            &fx.source,
            &fx.target,
            &analysis.files_to_backup,
            false,
            &[],
            &NoopObserver,
            &CancellationToken::new(),
        );

        assert_eq!(stats.files_moved_to_revisions, 1);
        assert_eq!(stats.files_copied, 1);
        assert_eq!(fs::read(fx.target.join("docs/doc.txt"))?, b"version two");

        let folder = fx.only_revision_folder()?;
        assert_eq!(fs::read(folder.join("docs/doc.txt"))?, b"version one");
        Ok(())
    }

    #[test]
    fn test_target_changed_since_analysis_is_skipped() -> io::Result<()> {
        let fx = Fixture::new()?;
        fx.write(&fx.source, "a.txt", b"source", 2_000)?;
        fx.write(&fx.target, "a.txt", b"target", 1_000)?;

        let analysis = analyze(&fx.mapping(), None, &NoopObserver);
        assert_eq!(analysis.files_to_backup.len(), 1);

        filetime::set_file_mtime(fx.target.join("a.txt"), FileTime::from_unix_time(3_000, 0))?;
        let stats = Reconciler::new(&fx.source, &fx.target).run(
            &analysis.files_to_backup,
            false,
            &[],
            &NoopObserver,
        );

        assert_eq!(stats.files_skipped, 1);
        assert_eq!(stats.size_skipped, 6);
        assert_eq!(stats.files_copied, 0);
        assert_eq!(fs::read(fx.target.join("a.txt"))?, b"target");
        Ok(())
    }

    #[test]
    fn test_mirror_deletions_archives_orphans() -> io::Result<()> {
        let fx = Fixture::new()?;
        fx.write(&fx.source, "kept.txt", b"k", 1_000)?;
        fx.write(&fx.target, "kept.txt", b"k", 1_000)?;
        fx.write(&fx.target, "gone.txt", b"gone", 1_000)?;
        fx.write(&fx.target, "sub/old.txt", b"old", 1_000)?;

        let analysis = analyze(&fx.mapping(), Some(0), &NoopObserver);
        assert!(analysis.deleted_files.is_empty());

        let messages = RefCell::new(Vec::new());
        let observer = FnObserver::new(|m: &str| messages.borrow_mut().push(m.to_string()), |_| {});
        let stats = Reconciler::new(&fx.source, &fx.target).run(
            &analysis.files_to_backup,
            true,
            &analysis.deleted_files_all,
            &observer,
        );

        assert_eq!(stats.files_deleted, 2);
        assert_eq!(stats.size_deleted, 7);
        assert!(!fx.target.join("gone.txt").exists());
        assert!(!fx.target.join("sub/old.txt").exists());
        assert!(fx.target.join("kept.txt").exists());

        let folder = fx.only_revision_folder()?;
        assert_eq!(fs::read(folder.join("sil_gone.txt"))?, b"gone");
        assert_eq!(fs::read(folder.join("sil_sub/old.txt"))?, b"old");
        assert!(messages.borrow().iter().all(|m| m.starts_with("🗑 Silindi (arşivlendi)")));
        Ok(())
    }

    #[test]
    fn test_orphans_left_alone_without_mirroring() -> io::Result<()> {
        let fx = Fixture::new()?;
        fx.write(&fx.target, "gone.txt", b"gone", 1_000)?;

        let analysis = analyze(&fx.mapping(), None, &NoopObserver);
        let stats = Reconciler::new(&fx.source, &fx.target).run(
            &analysis.files_to_backup,
            false,
            &analysis.deleted_files_all,
            &NoopObserver,
        );

        assert_eq!(stats.files_deleted, 0);
        assert!(fx.target.join("gone.txt").exists());
        assert!(!fx.target.join(REVISIONS_DIR).exists());
        Ok(())
    }

    #[test]
    fn test_analyze_after_apply_is_idempotent() -> io::Result<()> {
        let fx = Fixture::new()?;
        fx.write(&fx.source, "a.txt", b"a", 1_000)?;
        fx.write(&fx.source, "nested/b.txt", b"b", 2_000)?;
        fx.write(&fx.target, "nested/b.txt", b"old", 1_000)?;

        let first = analyze(&fx.mapping(), None, &NoopObserver);
        assert_eq!(first.files_to_backup.len(), 2);
        apply(
            &fx.source,
            &fx.target,
            &first.files_to_backup,
            false,
            &[],
            &NoopObserver,
            &CancellationToken::new(),
        );

        let second = analyze(&fx.mapping(), None, &NoopObserver);
        assert!(second.files_to_backup.is_empty());
        assert_eq!(second.skipped_count, 2);
        assert_eq!(second.deleted_count, 0);
        assert!(second.is_up_to_date());
        Ok(())
    }

    #[test]
    fn test_cancellation_stops_after_current_file() -> io::Result<()> {
        let fx = Fixture::new()?;
        for i in 0..10 {
            fx.write(&fx.source, &format!("file{i:02}.txt"), b"0123456789", 1_000)?;
        }

        let analysis = analyze(&fx.mapping(), None, &NoopObserver);
        assert_eq!(analysis.files_to_backup.len(), 10);

        let token = CancellationToken::new();
        let copied = Cell::new(0);
        let observer = FnObserver::new(
            |_: &str| {
                copied.set(copied.get() + 1);
                if copied.get() == 3 {
                    token.cancel();
                }
            },
            |_| {},
        );

        let mut reconciler = Reconciler::with_cancel(&fx.source, &fx.target, token.clone());
        let stats = reconciler.run(&analysis.files_to_backup, false, &[], &observer);

        assert!(stats.files_copied <= 4);
        assert_eq!(stats.files_copied, 3);
        assert!(stats.is_cancelled());
        assert_eq!(reconciler.state(), ApplyState::Finished(RunStatus::Cancelled));

        let copied_files: Vec<_> = fs::read_dir(&fx.target)?.filter_map(|e| e.ok()).collect();
        assert_eq!(copied_files.len(), 3);
        for entry in copied_files {
            assert_eq!(fs::read(entry.path())?, b"0123456789");
        }
        Ok(())
    }

    #[test]
    fn test_copy_error_is_reported_and_run_continues() -> io::Result<()> {
        let fx = Fixture::new()?;
        fx.write(&fx.source, "blocked/a.txt", b"a", 1_000)?;
        fx.write(&fx.source, "ok.txt", b"ok", 1_000)?;
        // A file where the parent folder should be
        fs::write(fx.target.join("blocked"), b"not a folder")?;

        let analysis = analyze(&fx.mapping(), None, &NoopObserver);
        let messages = RefCell::new(Vec::new());
        let observer = FnObserver::new(|m: &str| messages.borrow_mut().push(m.to_string()), |_| {});
        let stats = Reconciler::new(&fx.source, &fx.target).run(
            &analysis.files_to_backup,
            false,
            &[],
            &observer,
        );

        assert_eq!(stats.files_copied, 1);
        assert!(messages.borrow().iter().any(|m| m.starts_with("⚠ Kopyalama hatası: a.txt - ")));
        assert_eq!(fs::read(fx.target.join("ok.txt"))?, b"ok");
        Ok(())
    }

    #[test]
    fn test_failed_copy_keeps_older_target() -> io::Result<()> {
        let fx = Fixture::new()?;
        fx.write(&fx.source, "doc.txt", b"new", 2_000)?;
        fx.write(&fx.target, "doc.txt", b"old", 1_000)?;

        let analysis = analyze(&fx.mapping(), None, &NoopObserver);
        assert_eq!(analysis.files_to_backup.len(), 1);

        // The source turns into a folder after the analysis
        let source = fx.source.join("doc.txt");
        fs::remove_file(&source)?;
        fs::create_dir(&source)?;
        filetime::set_file_mtime(&source, FileTime::from_unix_time(3_000, 0))?;

        let messages = RefCell::new(Vec::new());
        let observer = FnObserver::new(|m: &str| messages.borrow_mut().push(m.to_string()), |_| {});
        let mut reconciler = Reconciler::new(&fx.source, &fx.target);
        let stats = reconciler.run(&analysis.files_to_backup, false, &[], &observer);

        assert_eq!(stats.files_copied, 0);
        assert_eq!(stats.files_moved_to_revisions, 0);
        assert_eq!(stats.size_moved, 0);
        assert_eq!(fs::read(fx.target.join("doc.txt"))?, b"old");
        assert!(reconciler.revision_folder().is_none());
        assert!(list_revisions(&fx.target).is_empty());
        assert!(messages.borrow().iter().any(|m| m.starts_with("⚠ Kopyalama hatası: doc.txt - ")));
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_orphan_failure_does_not_stop_the_others() -> io::Result<()> {
        let fx = Fixture::new()?;
        // Fits the file system's name limit, but not once `sil_` is prepended
        let long_name = format!("{}.txt", "x".repeat(251));
        fx.write(&fx.target, "a.txt", b"a", 1_000)?;
        fx.write(&fx.target, &long_name, b"long", 1_000)?;
        fx.write(&fx.target, "z.txt", b"z", 1_000)?;

        let analysis = analyze(&fx.mapping(), None, &NoopObserver);
        assert_eq!(analysis.deleted_files_all.len(), 3);

        let messages = RefCell::new(Vec::new());
        let observer = FnObserver::new(|m: &str| messages.borrow_mut().push(m.to_string()), |_| {});
        let stats = Reconciler::new(&fx.source, &fx.target).run(&[], true, &analysis.deleted_files_all, &observer);

        assert_eq!(stats.files_deleted, 2);
        assert_eq!(stats.size_deleted, 2);
        assert!(fx.target.join(&long_name).exists());
        assert!(!fx.target.join("a.txt").exists());
        assert!(!fx.target.join("z.txt").exists());

        let folder = fx.only_revision_folder()?;
        assert!(folder.join("sil_a.txt").exists());
        assert!(folder.join("sil_z.txt").exists());

        let messages = messages.borrow();
        assert_eq!(messages.iter().filter(|m| m.starts_with("⚠ Silme hatası: ")).count(), 1);
        assert_eq!(messages.iter().filter(|m| m.starts_with("🗑 Silindi (arşivlendi)")).count(), 2);
        Ok(())
    }

    #[test]
    fn test_each_run_gets_its_own_revision_folder() -> io::Result<()> {
        let fx = Fixture::new()?;
        fx.write(&fx.source, "a.txt", b"two", 2_000)?;
        fx.write(&fx.target, "a.txt", b"one", 1_000)?;

        let mut reconciler = Reconciler::new(&fx.source, &fx.target);
        let first = analyze(&fx.mapping(), None, &NoopObserver);
        reconciler.run(&first.files_to_backup, false, &[], &NoopObserver);
        assert!(reconciler.revision_folder().is_some());

        fx.write(&fx.source, "b.txt", b"b", 1_000)?;
        let second = analyze(&fx.mapping(), None, &NoopObserver);
        let stats = reconciler.run(&second.files_to_backup, false, &[], &NoopObserver);

        assert_eq!(stats.files_copied, 1);
        assert_eq!(stats.files_moved_to_revisions, 0);
        assert!(reconciler.revision_folder().is_none());
        Ok(())
    }

    #[test]
    fn test_progress_reaches_one() -> io::Result<()> {
        let fx = Fixture::new()?;
        fx.write(&fx.source, "a.txt", b"a", 1_000)?;
        fx.write(&fx.source, "b.txt", b"b", 1_000)?;

        let analysis = analyze(&fx.mapping(), None, &NoopObserver);
        let fractions = RefCell::new(Vec::new());
        let observer = FnObserver::new(|_: &str| {}, |p: f64| fractions.borrow_mut().push(p));
        Reconciler::new(&fx.source, &fx.target).run(&analysis.files_to_backup, false, &[], &observer);

        assert_eq!(fractions.borrow().as_slice(), [0.5, 1.0]);
        Ok(())
    }

    #[test]
    fn test_stats_sum_keeps_cancellation() {
        let a = ApplyStats {
            files_copied: 2,
            size_copied: 20,
            ..Default::default()
        };
        let b = ApplyStats {
            files_copied: 1,
            size_copied: 5,
            status: RunStatus::Cancelled,
            ..Default::default()
        };

        let total: ApplyStats = [a, b].into_iter().sum();
        assert_eq!(total.files_copied, 3);
        assert_eq!(total.size_copied, 25);
        assert_eq!(total.status, RunStatus::Cancelled);
    }
}
