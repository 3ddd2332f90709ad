//! Console rendering of analyses, runs, history and revisions.

use crate::models::backup_detail::BackupDetail;
use crate::models::backup_history::BackupHistory;
use crate::models::file_detail::FileDetail;
use crate::models::mapping::MappingRecord;
use crate::models::project::Project;
use crate::services::backup::{MappingAnalysis, RunSummary};
use crate::services::search::SearchResult;
use backup_engine::revisions::RevisionFolderInfo;
use backup_engine::{
    format_size, AnalysisResult, Disposition, FileDisposition, MappingStats, ProgressObserver, RevisionEntry, RevisionKind,
};
use std::sync::atomic::{AtomicU8, Ordering};

/// Prints status lines as they arrive and progress in 10% steps
#[derive(Debug, Default)]
pub struct ConsoleObserver {
    last_decile: AtomicU8,
}

impl ConsoleObserver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressObserver for ConsoleObserver {
    fn on_status(&self, message: &str) {
        println!("{}", message);
    }

    fn on_progress(&self, fraction: f64) {
        let decile = (fraction.clamp(0.0, 1.0) * 10.0).floor() as u8;
        if decile > self.last_decile.swap(decile, Ordering::Relaxed) {
            tracing::debug!("Progress: {}%", decile as u32 * 10);
        }
    }
}

fn file_line(file: &FileDisposition) -> String {
    match &file.disposition {
        Disposition::Newer {
            source_date,
            target_date,
            ..
        } => format!(
            "    {} ({}, {}: {} > {})",
            file.display_path().display(),
            format_size(file.size),
            file.disposition.reason(),
            source_date,
            target_date
        ),
        other => format!(
            "    {} ({}, {})",
            file.display_path().display(),
            format_size(file.size),
            other.reason()
        ),
    }
}

fn section(lines: &mut Vec<String>, title: &str, count: usize, size: u64, files: &[FileDisposition]) {
    if count == 0 {
        return;
    }
    lines.push(format!("  {}: {} ({})", title, count, format_size(size)));
    lines.extend(files.iter().map(file_line));
    if files.len() < count {
        lines.push(format!("    ... {} more", count - files.len()));
    }
}

/// Analysis of one mapping
pub fn render_analysis(mapping: &MappingRecord, analysis: &AnalysisResult) -> String {
    let mut lines = vec![format!("[{}] {}", mapping.id, mapping.label())];

    section(
        &mut lines,
        "To back up",
        analysis.backup_count(),
        analysis.total_size,
        &analysis.files_to_backup,
    );
    section(
        &mut lines,
        "Up to date",
        analysis.skipped_count,
        analysis.skipped_size,
        &analysis.skipped_files,
    );
    section(
        &mut lines,
        "Excluded",
        analysis.user_excluded_count,
        analysis.user_excluded_size,
        &analysis.user_excluded_files,
    );
    section(
        &mut lines,
        "Hidden folders",
        analysis.hidden_excluded_count,
        analysis.hidden_excluded_size,
        &analysis.hidden_excluded_files,
    );
    section(
        &mut lines,
        "Missing from source",
        analysis.deleted_count,
        analysis.deleted_size,
        &analysis.deleted_files,
    );

    if analysis.revision_count > 0 {
        lines.push(format!(
            "  Revisions: {} ({})",
            analysis.revision_count,
            format_size(analysis.revision_size)
        ));
    }
    if analysis.is_up_to_date() {
        lines.push("  Up to date, nothing to copy".to_string());
    }
    lines.join("\n")
}

/// Analyses of a whole project followed by the totals
pub fn render_project_analysis(results: &[MappingAnalysis]) -> String {
    let mut blocks: Vec<String> = results
        .iter()
        .map(|r| render_analysis(&r.mapping, &r.analysis))
        .collect();

    let count: usize = results.iter().map(|r| r.analysis.backup_count()).sum();
    let size: u64 = results.iter().map(|r| r.analysis.total_size).sum();
    let excluded: usize = results.iter().map(|r| r.analysis.total_excluded_count).sum();
    blocks.push(format!(
        "Total: {} file(s) to back up ({}), {} excluded",
        count,
        format_size(size),
        excluded
    ));
    blocks.join("\n\n")
}

pub fn render_run_summary(summary: &RunSummary) -> String {
    let stats = &summary.stats;
    let mut lines = vec![format!(
        "Run {} {} in {:.1}s (analysis {:.1}s)",
        summary.run_id,
        stats.status.as_str(),
        summary.duration.as_secs_f64(),
        summary.analysis_duration.as_secs_f64()
    )];
    lines.push(format!("  Copied:              {} ({})", stats.files_copied, format_size(stats.size_copied)));
    lines.push(format!(
        "  Old versions kept:   {} ({})",
        stats.files_moved_to_revisions,
        format_size(stats.size_moved)
    ));
    lines.push(format!("  Deleted (archived):  {} ({})", stats.files_deleted, format_size(stats.size_deleted)));
    lines.push(format!("  Skipped:             {} ({})", stats.files_skipped, format_size(stats.size_skipped)));
    lines.push(format!(
        "  Excluded:            {} ({})",
        summary.excluded_count,
        format_size(summary.excluded_size)
    ));
    if summary.details_saved > 0 {
        lines.push(format!("  File details saved:  {}", summary.details_saved));
    }
    lines.join("\n")
}

pub fn render_history(rows: &[BackupHistory]) -> String {
    if rows.is_empty() {
        return "No backups recorded".to_string();
    }
    rows.iter()
        .map(|h| {
            format!(
                "{:>5}  {}  {:<20} {:<9} {} copied ({}), {} archived, {} deleted, {:.1}s",
                h.id,
                h.backup_date,
                h.project_name.as_deref().unwrap_or("-"),
                h.status,
                h.total_files_copied,
                format_size(h.total_size_copied.max(0) as u64),
                h.total_files_moved_to_revisions,
                h.total_files_deleted_to_revisions,
                h.duration_seconds
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_history_detail(history: &BackupHistory, details: &[BackupDetail], files: &[FileDetail]) -> String {
    let mut lines = vec![format!(
        "Run {} of {} at {} ({})",
        history.id,
        history.project_name.as_deref().unwrap_or("-"),
        history.backup_date,
        history.status
    )];
    lines.push(format!(
        "  {} file(s): {} copied, {} archived, {} deleted, {} skipped, {} excluded",
        history.total_files(),
        history.total_files_copied,
        history.total_files_moved_to_revisions,
        history.total_files_deleted_to_revisions,
        history.total_files_skipped,
        history.total_files_excluded
    ));

    for detail in details {
        lines.push(format!(
            "  {} → {}: {} copied ({}), {} archived, {} deleted, {} skipped, {} excluded",
            detail.source_path.as_deref().unwrap_or("?"),
            detail.target_path.as_deref().unwrap_or("?"),
            detail.files_copied,
            format_size(detail.size_copied.max(0) as u64),
            detail.files_moved,
            detail.files_deleted,
            detail.files_skipped,
            detail.files_excluded
        ));
    }

    if !files.is_empty() {
        lines.push(format!("  Files ({}):", files.len()));
        for file in files {
            let previous = file
                .previous_size
                .map(|s| format!(", was {}", format_size(s.max(0) as u64)))
                .unwrap_or_default();
            lines.push(format!(
                "    {}/{} ({}{}, {})",
                file.file_path,
                file.file_name,
                format_size(file.file_size.max(0) as u64),
                previous,
                file.backup_reason
            ));
        }
    }
    lines.join("\n")
}

/// Search hits, at most `limit` of them listed
pub fn render_search(term: &str, results: &[SearchResult], limit: Option<usize>) -> String {
    if results.is_empty() {
        return format!("No recorded files match '{}'", term);
    }

    let shown = limit.map_or(results.len(), |l| l.min(results.len()));
    let mut lines = vec![if shown < results.len() {
        format!("{} file(s) match '{}', showing the first {}", results.len(), term, shown)
    } else {
        format!("{} file(s) match '{}'", results.len(), term)
    }];

    for result in &results[..shown] {
        let detail = &result.hit.detail;
        lines.push(format!(
            "  {}  {} ({}, {})  {}",
            result.hit.backup_date,
            detail.file_name,
            format_size(detail.file_size.max(0) as u64),
            detail.backup_reason,
            result.location.display()
        ));
    }
    lines.join("\n")
}

pub fn render_revisions(folders: &[RevisionFolderInfo], entries: &[RevisionEntry]) -> String {
    if folders.is_empty() {
        return "No revisions".to_string();
    }
    let mut lines = Vec::new();
    for folder in folders {
        lines.push(folder.name.clone());
        for entry in entries.iter().filter(|e| e.timestamp_folder == folder.name) {
            lines.push(format!(
                "    {} {} ({})",
                revision_marker(entry.kind),
                entry.relative_path.display(),
                format_size(entry.size)
            ));
        }
    }
    lines.join("\n")
}

pub fn render_file_versions(entries: &[RevisionEntry]) -> String {
    if entries.is_empty() {
        return "No archived versions".to_string();
    }
    entries
        .iter()
        .map(|e| {
            format!(
                "{}  {} {} ({})",
                e.timestamp_folder,
                revision_marker(e.kind),
                e.path.display(),
                format_size(e.size)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn revision_marker(kind: RevisionKind) -> &'static str {
    match kind {
        RevisionKind::Superseded => "~",
        RevisionKind::Deleted => "-",
    }
}

pub fn render_projects(projects: &[Project]) -> String {
    if projects.is_empty() {
        return "No projects".to_string();
    }
    projects
        .iter()
        .map(|p| {
            if p.description.is_empty() {
                format!("{:>4}  {}", p.id, p.name)
            } else {
                format!("{:>4}  {}  ({})", p.id, p.name, p.description)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_mappings(mappings: &[MappingRecord]) -> String {
    if mappings.is_empty() {
        return "No mappings".to_string();
    }
    mappings
        .iter()
        .map(|m| {
            format!(
                "{:>4}  {}  [include: {}] [exclude: {}]{}",
                m.id,
                m.label(),
                m.file_filter,
                m.exclude_filter,
                if m.include_subdirs { "" } else { " [top level only]" }
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_mapping_stats(mapping: &MappingRecord, stats: &MappingStats) -> String {
    format!(
        "[{}] {}\n  Selected: {} ({})\n  Excluded: {} ({})",
        mapping.id,
        mapping.label(),
        stats.file_count,
        format_size(stats.total_size),
        stats.excluded_count,
        format_size(stats.excluded_size)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn record() -> MappingRecord {
        MappingRecord {
            id: 7,
            project_id: 1,
            source_path: "/src".into(),
            file_filter: "*.*".into(),
            exclude_filter: String::new(),
            include_subdirs: true,
            target_path: "/dst".into(),
            created_date: String::new(),
        }
    }

    fn skipped(name: &str) -> FileDisposition {
        FileDisposition::source(
            PathBuf::from("/src").join(name),
            PathBuf::from(name),
            std::path::Path::new("/dst"),
            1024,
            Disposition::UpToDateSkip,
        )
    }

    #[test]
    fn test_truncated_list_mentions_the_rest() {
        let analysis = AnalysisResult {
            skipped_files: vec![skipped("a.txt"), skipped("b.txt")],
            skipped_count: 5,
            skipped_size: 5 * 1024,
            ..Default::default()
        };

        let text = render_analysis(&record(), &analysis);
        assert!(text.starts_with("[7] /src → /dst"));
        assert!(text.contains("Up to date: 5 (5.00 KB)"));
        assert!(text.contains("/src/a.txt (1.00 KB, güncel)"));
        assert!(text.contains("... 3 more"));
        assert!(text.contains("nothing to copy"));
    }

    #[test]
    fn test_newer_line_shows_both_dates() {
        let mut file = skipped("a.txt");
        file.disposition = Disposition::Newer {
            source_mtime: std::time::SystemTime::UNIX_EPOCH,
            target_mtime: std::time::SystemTime::UNIX_EPOCH,
            source_date: "2024-05-02 10:00:00".into(),
            target_date: "2024-05-01 09:00:00".into(),
        };
        assert_eq!(
            file_line(&file),
            "    /src/a.txt (1.00 KB, daha yeni: 2024-05-02 10:00:00 > 2024-05-01 09:00:00)"
        );
    }

    #[test]
    fn test_mapping_stats() {
        let stats = MappingStats {
            file_count: 3,
            total_size: 2048,
            excluded_count: 1,
            excluded_size: 10,
        };
        assert_eq!(
            render_mapping_stats(&record(), &stats),
            "[7] /src → /dst\n  Selected: 3 (2.00 KB)\n  Excluded: 1 (10.00 B)"
        );
    }

    #[test]
    fn test_search_listing_is_capped() {
        use crate::models::file_detail::{FileDetail, FileSearchHit};

        let result = |name: &str| SearchResult {
            hit: FileSearchHit {
                detail: FileDetail {
                    id: 1,
                    backup_id: 1,
                    mapping_id: None,
                    file_path: "/src".into(),
                    file_name: name.into(),
                    file_size: 2048,
                    previous_size: None,
                    backup_reason: "yeni dosya".into(),
                },
                backup_date: "2025-03-01 09:15:42".into(),
                source_path: None,
                target_path: None,
            },
            location: "/src".into(),
        };
        let results = vec![result("a.txt"), result("b.txt"), result("c.txt")];

        let text = render_search("*.txt", &results, Some(2));
        assert!(text.starts_with("3 file(s) match '*.txt', showing the first 2"));
        assert!(text.contains("a.txt (2.00 KB, yeni dosya)  /src"));
        assert!(!text.contains("c.txt"));

        assert_eq!(render_search("x", &[], None), "No recorded files match 'x'");
    }

    #[test]
    fn test_progress_deciles() {
        let observer = ConsoleObserver::new();
        observer.on_progress(0.55);
        assert_eq!(observer.last_decile.load(Ordering::Relaxed), 5);
        observer.on_progress(1.0);
        assert_eq!(observer.last_decile.load(Ordering::Relaxed), 10);
    }
}
