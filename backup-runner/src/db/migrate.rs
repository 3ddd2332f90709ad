use crate::db::connection::DbPool;
use rusqlite::Connection;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS projects (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  name TEXT NOT NULL UNIQUE,
  description TEXT NOT NULL DEFAULT '',
  created_date TEXT NOT NULL,
  last_modified TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS mappings (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
  source_path TEXT NOT NULL,
  file_filter TEXT NOT NULL,
  exclude_filter TEXT NOT NULL DEFAULT '',
  include_subdirs INTEGER NOT NULL DEFAULT 1,
  target_path TEXT NOT NULL,
  created_date TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS backup_history (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
  backup_date TEXT NOT NULL,
  analysis_duration_seconds REAL NOT NULL DEFAULT 0,
  duration_seconds REAL NOT NULL,
  total_files_copied INTEGER NOT NULL DEFAULT 0,
  total_files_moved_to_revisions INTEGER NOT NULL DEFAULT 0,
  total_files_skipped INTEGER NOT NULL DEFAULT 0,
  total_files_deleted_to_revisions INTEGER NOT NULL DEFAULT 0,
  total_files_excluded INTEGER NOT NULL DEFAULT 0,
  total_size_copied INTEGER NOT NULL DEFAULT 0,
  total_size_moved INTEGER NOT NULL DEFAULT 0,
  total_size_skipped INTEGER NOT NULL DEFAULT 0,
  total_size_deleted INTEGER NOT NULL DEFAULT 0,
  total_size_excluded INTEGER NOT NULL DEFAULT 0,
  status TEXT NOT NULL CHECK(status IN ('completed','cancelled'))
);

CREATE TABLE IF NOT EXISTS backup_details (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  backup_id INTEGER NOT NULL REFERENCES backup_history(id) ON DELETE CASCADE,
  mapping_id INTEGER NOT NULL REFERENCES mappings(id) ON DELETE CASCADE,
  files_copied INTEGER NOT NULL DEFAULT 0,
  files_moved INTEGER NOT NULL DEFAULT 0,
  files_skipped INTEGER NOT NULL DEFAULT 0,
  files_deleted INTEGER NOT NULL DEFAULT 0,
  files_excluded INTEGER NOT NULL DEFAULT 0,
  size_copied INTEGER NOT NULL DEFAULT 0,
  size_moved INTEGER NOT NULL DEFAULT 0,
  size_skipped INTEGER NOT NULL DEFAULT 0,
  size_deleted INTEGER NOT NULL DEFAULT 0,
  size_excluded INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS backup_file_details (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  backup_id INTEGER NOT NULL REFERENCES backup_history(id) ON DELETE CASCADE,
  mapping_id INTEGER,
  file_path TEXT NOT NULL,
  file_name TEXT NOT NULL,
  file_size INTEGER NOT NULL DEFAULT 0,
  backup_reason TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS settings (
  key TEXT PRIMARY KEY,
  value TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_mappings_project_id ON mappings(project_id);
CREATE INDEX IF NOT EXISTS idx_backup_history_project_id ON backup_history(project_id);
CREATE INDEX IF NOT EXISTS idx_backup_details_backup_id ON backup_details(backup_id);
CREATE INDEX IF NOT EXISTS idx_file_details_lookup ON backup_file_details(file_path, file_name, backup_id DESC);
"#;

fn has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let columns: Vec<String> = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .filter_map(|r| r.ok())
        .collect();
    Ok(columns.iter().any(|c| c == column))
}

pub fn migrate(pool: &DbPool) -> anyhow::Result<()> {
    tracing::info!("[DB] Starting database migration...");

    let conn = pool.get()?;
    conn.execute_batch(SCHEMA)?;

    // Idempotent migrations for existing databases
    if !has_column(&conn, "backup_file_details", "previous_size")? {
        conn.execute_batch(
            "ALTER TABLE backup_file_details ADD COLUMN previous_size INTEGER DEFAULT NULL",
        )?;
    }

    tracing::info!("[DB] Migration completed successfully");
    Ok(())
}
