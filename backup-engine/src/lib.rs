//! Smart Backup engine.
//!
//! Compares a source folder against its mirror, copies new and newer files,
//! and keeps every replaced or orphaned file in a timestamped `_REVISIONS`
//! folder inside the target instead of deleting it.
//!
//! ```no_run
//! use backup_engine::{analyze, apply, Mapping, NoopObserver};
//! use tokio_util::sync::CancellationToken;
//!
//! let mapping = Mapping::new("/home/me/docs", "/mnt/backup/docs").with_exclude("*.tmp");
//! let analysis = analyze(&mapping, Some(50), &NoopObserver);
//! let stats = apply(
//!     &mapping.source_path,
//!     &mapping.target_path,
//!     &analysis.files_to_backup,
//!     false,
//!     &analysis.deleted_files_all,
//!     &NoopObserver,
//!     &CancellationToken::new(),
//! );
//! println!("{} files copied", stats.files_copied);
//! ```

pub mod analysis;
pub mod apply;
pub mod fs;
pub mod mapping;
pub mod revisions;
pub mod transfer;
pub mod utils;

// Re-export commonly used types
pub use analysis::{analyze, stats, AnalysisResult, Disposition, FileDisposition, MappingStats, OrphanSelection};
pub use apply::{apply, ApplyStats, Reconciler, RunStatus};
pub use mapping::Mapping;
pub use revisions::{RevisionEntry, RevisionKind};
pub use transfer::progress::{format_size, FnObserver, NoopObserver, ProgressObserver};
pub use utils::errors::{EngineError, Result};
