use backup_engine::{ApplyStats, RunStatus};
use rusqlite::{params, Connection, Row};
use serde::Serialize;

/// One backup run of a project, totals across all of its mappings
#[derive(Debug, Clone, Serialize)]
pub struct BackupHistory {
    pub id: i64,
    pub project_id: i64,
    /// Filled by the joined listings
    pub project_name: Option<String>,
    pub backup_date: String,
    pub analysis_duration_seconds: f64,
    pub duration_seconds: f64,
    pub total_files_copied: i64,
    pub total_files_moved_to_revisions: i64,
    pub total_files_skipped: i64,
    pub total_files_deleted_to_revisions: i64,
    pub total_files_excluded: i64,
    pub total_size_copied: i64,
    pub total_size_moved: i64,
    pub total_size_skipped: i64,
    pub total_size_deleted: i64,
    pub total_size_excluded: i64,
    pub status: String,
}

impl BackupHistory {
    /// Files the run looked at; replaced files are already counted as copied
    pub fn total_files(&self) -> i64 {
        self.total_files_copied
            + self.total_files_skipped
            + self.total_files_deleted_to_revisions
            + self.total_files_excluded
    }
}

#[derive(Debug, Clone)]
pub struct NewBackupHistory {
    pub project_id: i64,
    pub analysis_duration_seconds: f64,
    pub duration_seconds: f64,
    pub stats: ApplyStats,
    pub excluded_count: u64,
    pub excluded_size: u64,
}

impl NewBackupHistory {
    pub fn status(&self) -> RunStatus {
        self.stats.status
    }
}

fn row_to_history(row: &Row) -> rusqlite::Result<BackupHistory> {
    Ok(BackupHistory {
        id: row.get("id")?,
        project_id: row.get("project_id")?,
        project_name: row.get("project_name").ok(),
        backup_date: row.get("backup_date")?,
        analysis_duration_seconds: row.get("analysis_duration_seconds")?,
        duration_seconds: row.get("duration_seconds")?,
        total_files_copied: row.get("total_files_copied")?,
        total_files_moved_to_revisions: row.get("total_files_moved_to_revisions")?,
        total_files_skipped: row.get("total_files_skipped")?,
        total_files_deleted_to_revisions: row.get("total_files_deleted_to_revisions")?,
        total_files_excluded: row.get("total_files_excluded")?,
        total_size_copied: row.get("total_size_copied")?,
        total_size_moved: row.get("total_size_moved")?,
        total_size_skipped: row.get("total_size_skipped")?,
        total_size_deleted: row.get("total_size_deleted")?,
        total_size_excluded: row.get("total_size_excluded")?,
        status: row.get("status")?,
    })
}

pub fn create(conn: &Connection, data: &NewBackupHistory) -> anyhow::Result<i64> {
    let stats = &data.stats;
    conn.execute(
        "INSERT INTO backup_history
         (project_id, backup_date, analysis_duration_seconds, duration_seconds, total_files_copied,
          total_files_moved_to_revisions, total_files_skipped, total_files_deleted_to_revisions,
          total_files_excluded, total_size_copied, total_size_moved, total_size_skipped,
          total_size_deleted, total_size_excluded, status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
        params![
            data.project_id,
            super::now(),
            data.analysis_duration_seconds,
            data.duration_seconds,
            stats.files_copied as i64,
            stats.files_moved_to_revisions as i64,
            stats.files_skipped as i64,
            stats.files_deleted as i64,
            data.excluded_count as i64,
            stats.size_copied as i64,
            stats.size_moved as i64,
            stats.size_skipped as i64,
            stats.size_deleted as i64,
            data.excluded_size as i64,
            data.status().as_str(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn find_by_id(conn: &Connection, id: i64) -> anyhow::Result<Option<BackupHistory>> {
    let mut stmt = conn.prepare(
        "SELECT bh.*, p.name AS project_name
         FROM backup_history bh
         JOIN projects p ON bh.project_id = p.id
         WHERE bh.id = ?",
    )?;
    let mut rows = stmt.query_map(params![id], row_to_history)?;
    Ok(rows.next().and_then(|r| r.ok()))
}

/// Newest first
pub fn find_all(conn: &Connection) -> anyhow::Result<Vec<BackupHistory>> {
    let mut stmt = conn.prepare(
        "SELECT bh.*, p.name AS project_name
         FROM backup_history bh
         JOIN projects p ON bh.project_id = p.id
         ORDER BY bh.backup_date DESC, bh.id DESC",
    )?;
    let rows = stmt.query_map([], row_to_history)?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

/// Newest first
pub fn find_by_project(conn: &Connection, project_id: i64) -> anyhow::Result<Vec<BackupHistory>> {
    let mut stmt = conn.prepare(
        "SELECT bh.*, p.name AS project_name
         FROM backup_history bh
         JOIN projects p ON bh.project_id = p.id
         WHERE bh.project_id = ?
         ORDER BY bh.backup_date DESC, bh.id DESC",
    )?;
    let rows = stmt.query_map(params![project_id], row_to_history)?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

/// Per-mapping and per-file details go with the run
pub fn delete(conn: &Connection, id: i64) -> anyhow::Result<bool> {
    let changed = conn.execute("DELETE FROM backup_history WHERE id = ?", params![id])?;
    Ok(changed > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{project, test_support};

    #[test]
    fn test_history_round_trip() -> anyhow::Result<()> {
        let pool = test_support::pool()?;
        let conn = pool.get()?;
        let project = project::create(&conn, "Docs", "")?;

        let stats = ApplyStats {
            files_copied: 3,
            files_moved_to_revisions: 1,
            files_skipped: 5,
            files_deleted: 2,
            size_copied: 300,
            size_moved: 100,
            size_skipped: 500,
            size_deleted: 20,
            status: RunStatus::Cancelled,
        };
        let id = create(
            &conn,
            &NewBackupHistory {
                project_id: project.id,
                analysis_duration_seconds: 0.5,
                duration_seconds: 2.25,
                stats,
                excluded_count: 4,
                excluded_size: 40,
            },
        )?;

        let row = find_by_id(&conn, id)?.ok_or_else(|| anyhow::anyhow!("run not stored"))?;
        assert_eq!(row.project_name.as_deref(), Some("Docs"));
        assert_eq!(row.total_files_copied, 3);
        assert_eq!(row.total_files_deleted_to_revisions, 2);
        assert_eq!(row.total_size_excluded, 40);
        assert_eq!(row.duration_seconds, 2.25);
        assert_eq!(row.status, "cancelled");
        assert_eq!(row.total_files(), 3 + 5 + 2 + 4);

        assert_eq!(find_by_project(&conn, project.id)?.len(), 1);
        assert_eq!(find_all(&conn)?.len(), 1);

        assert!(delete(&conn, id)?);
        assert!(find_by_id(&conn, id)?.is_none());
        Ok(())
    }
}
