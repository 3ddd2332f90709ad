//! Progress and status reporting for analysis and apply runs.
//!
//! The engine reports through a [`ProgressObserver`] that is invoked inline
//! with processing, so implementations must return quickly.

use std::time::{Duration, Instant};

/// Receives human-readable status lines and overall run progress
pub trait ProgressObserver {
    /// A status line, e.g. `✓ Kopyalandı (yeni): file.txt (1.23 MB)`
    fn on_status(&self, _message: &str) {}

    /// Overall progress in `[0.0, 1.0]`
    fn on_progress(&self, _fraction: f64) {}
}

/// Observer that discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {}

/// Observer built from two closures
pub struct FnObserver<S, P>
where
    S: Fn(&str),
    P: Fn(f64),
{
    status: S,
    progress: P,
}

impl<S, P> FnObserver<S, P>
where
    S: Fn(&str),
    P: Fn(f64),
{
    pub fn new(status: S, progress: P) -> Self {
        Self { status, progress }
    }
}

impl<S, P> ProgressObserver for FnObserver<S, P>
where
    S: Fn(&str),
    P: Fn(f64),
{
    fn on_status(&self, message: &str) {
        (self.status)(message)
    }

    fn on_progress(&self, fraction: f64) {
        (self.progress)(fraction)
    }
}

impl<T: ProgressObserver + ?Sized> ProgressObserver for &T {
    fn on_status(&self, message: &str) {
        (**self).on_status(message)
    }

    fn on_progress(&self, fraction: f64) {
        (**self).on_progress(fraction)
    }
}

/// Item-level progress of one apply run
#[derive(Debug, Clone)]
pub struct RunProgress {
    /// Number of items (files + orphans) scheduled
    pub total_items: usize,

    /// Items handled so far, whatever their outcome
    pub items_processed: usize,

    /// Bytes of the scheduled items handled so far
    pub bytes_processed: u64,

    /// Item currently being handled
    pub current_item: Option<String>,
}

impl RunProgress {
    pub fn new(total_items: usize) -> Self {
        Self {
            total_items,
            items_processed: 0,
            bytes_processed: 0,
            current_item: None,
        }
    }

    /// Fraction complete; an empty run counts as complete
    pub fn fraction(&self) -> f64 {
        if self.total_items == 0 {
            1.0
        } else {
            (self.items_processed as f64 / self.total_items as f64).min(1.0)
        }
    }
}

/// Progress tracker that also measures elapsed time
pub struct ProgressTracker {
    start_time: Instant,
    progress: RunProgress,
}

impl ProgressTracker {
    pub fn new(total_items: usize) -> Self {
        Self {
            start_time: Instant::now(),
            progress: RunProgress::new(total_items),
        }
    }

    pub fn begin_item(&mut self, name: String) {
        self.progress.current_item = Some(name);
    }

    /// Mark the current item handled and return the new fraction
    pub fn finish_item(&mut self, bytes: u64) -> f64 {
        self.progress.items_processed += 1;
        self.progress.bytes_processed += bytes;
        self.progress.current_item = None;
        self.progress.fraction()
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn progress(&self) -> &RunProgress {
        &self.progress
    }
}

/// Format bytes as human-readable string (1024 based, two decimals)
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_index])
}
