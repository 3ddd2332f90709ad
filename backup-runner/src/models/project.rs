use rusqlite::{params, Connection, Row};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub created_date: String,
    pub last_modified: String,
}

fn row_to_project(row: &Row) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get("id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        created_date: row.get("created_date")?,
        last_modified: row.get("last_modified")?,
    })
}

pub fn find_all(conn: &Connection) -> anyhow::Result<Vec<Project>> {
    let mut stmt = conn.prepare("SELECT * FROM projects ORDER BY name")?;
    let rows = stmt.query_map([], row_to_project)?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

pub fn find_by_id(conn: &Connection, id: i64) -> anyhow::Result<Option<Project>> {
    let mut stmt = conn.prepare("SELECT * FROM projects WHERE id = ?")?;
    let mut rows = stmt.query_map(params![id], row_to_project)?;
    Ok(rows.next().and_then(|r| r.ok()))
}

pub fn find_by_name(conn: &Connection, name: &str) -> anyhow::Result<Option<Project>> {
    let mut stmt = conn.prepare("SELECT * FROM projects WHERE name = ?")?;
    let mut rows = stmt.query_map(params![name], row_to_project)?;
    Ok(rows.next().and_then(|r| r.ok()))
}

/// Look a project up by numeric id first, then by name
pub fn resolve(conn: &Connection, key: &str) -> anyhow::Result<Option<Project>> {
    if let Ok(id) = key.parse::<i64>() {
        if let Some(project) = find_by_id(conn, id)? {
            return Ok(Some(project));
        }
    }
    find_by_name(conn, key)
}

pub fn create(conn: &Connection, name: &str, description: &str) -> anyhow::Result<Project> {
    let now = super::now();
    conn.execute(
        "INSERT INTO projects (name, description, created_date, last_modified) VALUES (?1, ?2, ?3, ?4)",
        params![name, description, now, now],
    )?;
    let id = conn.last_insert_rowid();
    find_by_id(conn, id)?.ok_or_else(|| anyhow::anyhow!("Failed to retrieve created project"))
}

pub fn update(
    conn: &Connection,
    id: i64,
    name: Option<&str>,
    description: Option<&str>,
) -> anyhow::Result<Option<Project>> {
    let Some(existing) = find_by_id(conn, id)? else {
        return Ok(None);
    };

    conn.execute(
        "UPDATE projects SET name = ?1, description = ?2, last_modified = ?3 WHERE id = ?4",
        params![
            name.unwrap_or(&existing.name),
            description.unwrap_or(&existing.description),
            super::now(),
            id
        ],
    )?;
    find_by_id(conn, id)
}

/// Mappings and history go with the project (ON DELETE CASCADE)
pub fn delete(conn: &Connection, id: i64) -> anyhow::Result<bool> {
    let changed = conn.execute("DELETE FROM projects WHERE id = ?", params![id])?;
    Ok(changed > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_support;

    #[test]
    fn test_create_find_update_delete() -> anyhow::Result<()> {
        let pool = test_support::pool()?;
        let conn = pool.get()?;

        let created = create(&conn, "Documents", "daily copy")?;
        assert_eq!(created.name, "Documents");
        assert_eq!(created.created_date.len(), 19);

        assert_eq!(resolve(&conn, "Documents")?.map(|p| p.id), Some(created.id));
        assert_eq!(resolve(&conn, &created.id.to_string())?.map(|p| p.id), Some(created.id));
        assert!(resolve(&conn, "Missing")?.is_none());

        let updated = update(&conn, created.id, None, Some("weekly copy"))?;
        assert_eq!(updated.map(|p| p.description), Some("weekly copy".to_string()));

        assert!(delete(&conn, created.id)?);
        assert!(!delete(&conn, created.id)?);
        assert!(find_all(&conn)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_names_are_unique() -> anyhow::Result<()> {
        let pool = test_support::pool()?;
        let conn = pool.get()?;

        create(&conn, "Photos", "")?;
        assert!(create(&conn, "Photos", "").is_err());
        assert_eq!(find_all(&conn)?.len(), 1);
        Ok(())
    }
}
