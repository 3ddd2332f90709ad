use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use std::path::Path;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Foreign keys are a per-connection setting, so every pooled connection gets it
fn with_pragmas(manager: SqliteConnectionManager) -> SqliteConnectionManager {
    manager.with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"))
}

pub fn create_pool(db_path: &Path) -> anyhow::Result<DbPool> {
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let manager = with_pragmas(SqliteConnectionManager::file(db_path));
    let pool = Pool::builder().max_size(4).build(manager)?;

    // Database-wide pragmas only need one connection
    let conn = pool.get()?;
    conn.execute_batch(
        "PRAGMA journal_mode = DELETE;
         PRAGMA synchronous = FULL;",
    )?;

    Ok(pool)
}

/// Single-connection in-memory pool (every connection would be a separate database)
pub fn create_memory_pool() -> anyhow::Result<DbPool> {
    let manager = with_pragmas(SqliteConnectionManager::memory());
    Ok(Pool::builder().max_size(1).build(manager)?)
}

pub fn close_pool(pool: &DbPool) {
    // r2d2 closes connections when the pool is dropped; this only flushes a WAL if one exists
    if let Ok(conn) = pool.get() {
        let _ = conn.execute_batch("PRAGMA wal_checkpoint(FULL)");
    }
}
