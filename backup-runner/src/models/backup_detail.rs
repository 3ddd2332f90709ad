use backup_engine::ApplyStats;
use rusqlite::{params, Connection, Row};
use serde::Serialize;

/// Statistics of one mapping within a run
#[derive(Debug, Clone, Serialize)]
pub struct BackupDetail {
    pub id: i64,
    pub backup_id: i64,
    pub mapping_id: i64,
    pub files_copied: i64,
    pub files_moved: i64,
    pub files_skipped: i64,
    pub files_deleted: i64,
    pub files_excluded: i64,
    pub size_copied: i64,
    pub size_moved: i64,
    pub size_skipped: i64,
    pub size_deleted: i64,
    pub size_excluded: i64,
    /// From the joined mapping, absent once the mapping is gone
    pub source_path: Option<String>,
    pub target_path: Option<String>,
}

fn row_to_detail(row: &Row) -> rusqlite::Result<BackupDetail> {
    Ok(BackupDetail {
        id: row.get("id")?,
        backup_id: row.get("backup_id")?,
        mapping_id: row.get("mapping_id")?,
        files_copied: row.get("files_copied")?,
        files_moved: row.get("files_moved")?,
        files_skipped: row.get("files_skipped")?,
        files_deleted: row.get("files_deleted")?,
        files_excluded: row.get("files_excluded")?,
        size_copied: row.get("size_copied")?,
        size_moved: row.get("size_moved")?,
        size_skipped: row.get("size_skipped")?,
        size_deleted: row.get("size_deleted")?,
        size_excluded: row.get("size_excluded")?,
        source_path: row.get("source_path")?,
        target_path: row.get("target_path")?,
    })
}

pub fn create(
    conn: &Connection,
    backup_id: i64,
    mapping_id: i64,
    stats: &ApplyStats,
    excluded_count: u64,
    excluded_size: u64,
) -> anyhow::Result<i64> {
    conn.execute(
        "INSERT INTO backup_details
         (backup_id, mapping_id, files_copied, files_moved, files_skipped, files_deleted,
          files_excluded, size_copied, size_moved, size_skipped, size_deleted, size_excluded)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            backup_id,
            mapping_id,
            stats.files_copied as i64,
            stats.files_moved_to_revisions as i64,
            stats.files_skipped as i64,
            stats.files_deleted as i64,
            excluded_count as i64,
            stats.size_copied as i64,
            stats.size_moved as i64,
            stats.size_skipped as i64,
            stats.size_deleted as i64,
            excluded_size as i64,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn find_by_backup(conn: &Connection, backup_id: i64) -> anyhow::Result<Vec<BackupDetail>> {
    let mut stmt = conn.prepare(
        "SELECT bd.*, m.source_path, m.target_path
         FROM backup_details bd
         LEFT JOIN mappings m ON bd.mapping_id = m.id
         WHERE bd.backup_id = ?
         ORDER BY bd.id",
    )?;
    let rows = stmt.query_map(params![backup_id], row_to_detail)?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}
