use rusqlite::{params, Connection};
use std::collections::BTreeMap;

/// Preferences the runner reads back from the database
pub const DISPLAY_LIMIT: &str = "display_limit";
pub const AUTO_SAVE_DETAILS: &str = "auto_save_details";

pub const KNOWN_KEYS: &[&str] = &[DISPLAY_LIMIT, AUTO_SAVE_DETAILS];

pub fn get(conn: &Connection, key: &str) -> anyhow::Result<Option<String>> {
    let mut stmt = conn.prepare("SELECT value FROM settings WHERE key = ?")?;
    let mut rows = stmt.query_map(params![key], |row| row.get::<_, String>(0))?;
    Ok(rows.next().and_then(|r| r.ok()))
}

pub fn set(conn: &Connection, key: &str, value: &str) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO settings (key, value) VALUES (?1, ?2) ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![key, value],
    )?;
    Ok(())
}

pub fn delete(conn: &Connection, key: &str) -> anyhow::Result<bool> {
    let changed = conn.execute("DELETE FROM settings WHERE key = ?", params![key])?;
    Ok(changed > 0)
}

pub fn get_all(conn: &Connection) -> anyhow::Result<BTreeMap<String, String>> {
    let mut stmt = conn.prepare("SELECT key, value FROM settings")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;
    let mut map = BTreeMap::new();
    for r in rows {
        let (k, v) = r?;
        map.insert(k, v);
    }
    Ok(map)
}

/// Stored integer preference, `None` when unset or not a number
pub fn get_i64(conn: &Connection, key: &str) -> anyhow::Result<Option<i64>> {
    Ok(get(conn, key)?.and_then(|v| v.trim().parse().ok()))
}

/// Stored flag, accepting `true/false`, `1/0` and `yes/no`
pub fn get_bool(conn: &Connection, key: &str) -> anyhow::Result<Option<bool>> {
    Ok(get(conn, key)?.and_then(|v| parse_bool(&v)))
}

pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
