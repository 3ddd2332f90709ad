use rusqlite::{params, Connection, Row};
use serde::Serialize;

/// One file copied by a run
#[derive(Debug, Clone, Serialize)]
pub struct FileDetail {
    pub id: i64,
    pub backup_id: i64,
    pub mapping_id: Option<i64>,
    /// Folder of the source file
    pub file_path: String,
    pub file_name: String,
    pub file_size: i64,
    /// Size recorded by the latest earlier run, if any
    pub previous_size: Option<i64>,
    pub backup_reason: String,
}

#[derive(Debug, Clone)]
pub struct NewFileDetail {
    pub mapping_id: Option<i64>,
    pub file_path: String,
    pub file_name: String,
    pub file_size: u64,
    pub previous_size: Option<u64>,
    pub backup_reason: String,
}

/// A recorded file found by name, with the run date and mapping folders
#[derive(Debug, Clone, Serialize)]
pub struct FileSearchHit {
    #[serde(flatten)]
    pub detail: FileDetail,
    pub backup_date: String,
    /// None when the mapping was deleted since
    pub source_path: Option<String>,
    pub target_path: Option<String>,
}

fn row_to_file_detail(row: &Row) -> rusqlite::Result<FileDetail> {
    Ok(FileDetail {
        id: row.get("id")?,
        backup_id: row.get("backup_id")?,
        mapping_id: row.get("mapping_id")?,
        file_path: row.get("file_path")?,
        file_name: row.get("file_name")?,
        file_size: row.get("file_size")?,
        previous_size: row.get("previous_size")?,
        backup_reason: row.get("backup_reason")?,
    })
}

/// Size of `dir/name` in the most recent run strictly before `before_run_id`
pub fn get_previous_file_size(
    conn: &Connection,
    dir: &str,
    name: &str,
    before_run_id: i64,
) -> anyhow::Result<Option<u64>> {
    let mut stmt = conn.prepare(
        "SELECT file_size FROM backup_file_details
         WHERE file_path = ? AND file_name = ? AND backup_id < ?
         ORDER BY backup_id DESC
         LIMIT 1",
    )?;
    let mut rows = stmt.query_map(params![dir, name, before_run_id], |row| row.get::<_, i64>(0))?;
    Ok(rows
        .next()
        .and_then(|r| r.ok())
        .map(|size| size.max(0) as u64))
}

/// Insert all rows of one run in a single transaction
pub fn insert_many(conn: &Connection, backup_id: i64, details: &[NewFileDetail]) -> anyhow::Result<usize> {
    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO backup_file_details
             (backup_id, mapping_id, file_path, file_name, file_size, previous_size, backup_reason)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        for detail in details {
            stmt.execute(params![
                backup_id,
                detail.mapping_id,
                detail.file_path,
                detail.file_name,
                detail.file_size as i64,
                detail.previous_size.map(|s| s as i64),
                detail.backup_reason,
            ])?;
        }
    }
    tx.commit()?;
    Ok(details.len())
}

pub fn find_by_backup(conn: &Connection, backup_id: i64) -> anyhow::Result<Vec<FileDetail>> {
    let mut stmt = conn.prepare(
        "SELECT * FROM backup_file_details
         WHERE backup_id = ?
         ORDER BY COALESCE(mapping_id, 0), file_path, file_name",
    )?;
    let rows = stmt.query_map(params![backup_id], row_to_file_detail)?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

/// SQL `LIKE` pattern for a file-name search. `*` and `?` are wildcards; a
/// term without them matches anywhere in the name.
pub fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    for c in term.chars() {
        match c {
            '%' | '_' | '\\' => {
                pattern.push('\\');
                pattern.push(c);
            }
            '*' => pattern.push('%'),
            '?' => pattern.push('_'),
            c => pattern.push(c),
        }
    }

    if term.contains(['*', '?']) {
        pattern
    } else {
        format!("%{pattern}%")
    }
}

/// Recorded files whose name matches `term`, newest run first
pub fn search(conn: &Connection, term: &str) -> anyhow::Result<Vec<FileSearchHit>> {
    let mut stmt = conn.prepare(
        "SELECT f.*, h.backup_date, m.source_path, m.target_path
         FROM backup_file_details f
         JOIN backup_history h ON h.id = f.backup_id
         LEFT JOIN mappings m ON m.id = f.mapping_id
         WHERE f.file_name LIKE ?1 ESCAPE '\\'
         ORDER BY h.backup_date DESC, f.backup_id DESC, f.id",
    )?;
    let rows = stmt.query_map(params![like_pattern(term)], |row| {
        Ok(FileSearchHit {
            detail: row_to_file_detail(row)?,
            backup_date: row.get("backup_date")?,
            source_path: row.get("source_path")?,
            target_path: row.get("target_path")?,
        })
    })?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

pub fn has_details(conn: &Connection, backup_id: i64) -> anyhow::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM backup_file_details WHERE backup_id = ?",
        params![backup_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}
