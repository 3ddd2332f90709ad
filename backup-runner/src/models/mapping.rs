use backup_engine::Mapping;
use rusqlite::{params, Connection, Row};
use serde::Serialize;

/// A stored mapping row
#[derive(Debug, Clone, Serialize)]
pub struct MappingRecord {
    pub id: i64,
    pub project_id: i64,
    pub source_path: String,
    pub file_filter: String,
    pub exclude_filter: String,
    pub include_subdirs: bool,
    pub target_path: String,
    pub created_date: String,
}

impl MappingRecord {
    /// Engine view of this row
    pub fn to_mapping(&self) -> Mapping {
        Mapping::new(&self.source_path, &self.target_path)
            .with_include(self.file_filter.clone())
            .with_exclude(self.exclude_filter.clone())
            .with_recurse(self.include_subdirs)
    }

    /// `source → target` label used in reports
    pub fn label(&self) -> String {
        format!("{} → {}", self.source_path, self.target_path)
    }
}

#[derive(Debug, Clone)]
pub struct CreateMapping {
    pub project_id: i64,
    pub source_path: String,
    pub file_filter: String,
    pub exclude_filter: String,
    pub include_subdirs: bool,
    pub target_path: String,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateMapping {
    pub source_path: Option<String>,
    pub file_filter: Option<String>,
    pub exclude_filter: Option<String>,
    pub include_subdirs: Option<bool>,
    pub target_path: Option<String>,
}

fn row_to_mapping(row: &Row) -> rusqlite::Result<MappingRecord> {
    Ok(MappingRecord {
        id: row.get("id")?,
        project_id: row.get("project_id")?,
        source_path: row.get("source_path")?,
        file_filter: row.get("file_filter")?,
        exclude_filter: row.get("exclude_filter")?,
        include_subdirs: row.get::<_, i64>("include_subdirs")? != 0,
        target_path: row.get("target_path")?,
        created_date: row.get("created_date")?,
    })
}

pub fn find_by_project(conn: &Connection, project_id: i64) -> anyhow::Result<Vec<MappingRecord>> {
    let mut stmt = conn.prepare("SELECT * FROM mappings WHERE project_id = ? ORDER BY id")?;
    let rows = stmt.query_map(params![project_id], row_to_mapping)?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

pub fn find_by_id(conn: &Connection, id: i64) -> anyhow::Result<Option<MappingRecord>> {
    let mut stmt = conn.prepare("SELECT * FROM mappings WHERE id = ?")?;
    let mut rows = stmt.query_map(params![id], row_to_mapping)?;
    Ok(rows.next().and_then(|r| r.ok()))
}

pub fn create(conn: &Connection, data: &CreateMapping) -> anyhow::Result<MappingRecord> {
    conn.execute(
        "INSERT INTO mappings (project_id, source_path, file_filter, exclude_filter, include_subdirs, target_path, created_date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            data.project_id,
            data.source_path,
            data.file_filter,
            data.exclude_filter,
            data.include_subdirs as i64,
            data.target_path,
            super::now(),
        ],
    )?;
    let id = conn.last_insert_rowid();
    find_by_id(conn, id)?.ok_or_else(|| anyhow::anyhow!("Failed to retrieve created mapping"))
}

pub fn update(conn: &Connection, id: i64, data: &UpdateMapping) -> anyhow::Result<Option<MappingRecord>> {
    if find_by_id(conn, id)?.is_none() {
        return Ok(None);
    }

    let mut sets = Vec::new();
    let mut values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    if let Some(ref source_path) = data.source_path {
        sets.push("source_path = ?");
        values.push(Box::new(source_path.clone()));
    }
    if let Some(ref file_filter) = data.file_filter {
        sets.push("file_filter = ?");
        values.push(Box::new(file_filter.clone()));
    }
    if let Some(ref exclude_filter) = data.exclude_filter {
        sets.push("exclude_filter = ?");
        values.push(Box::new(exclude_filter.clone()));
    }
    if let Some(include_subdirs) = data.include_subdirs {
        sets.push("include_subdirs = ?");
        values.push(Box::new(include_subdirs as i64));
    }
    if let Some(ref target_path) = data.target_path {
        sets.push("target_path = ?");
        values.push(Box::new(target_path.clone()));
    }

    if !sets.is_empty() {
        values.push(Box::new(id));
        let sql = format!("UPDATE mappings SET {} WHERE id = ?", sets.join(", "));
        let refs: Vec<&dyn rusqlite::types::ToSql> = values.iter().map(|v| v.as_ref()).collect();
        conn.execute(&sql, refs.as_slice())?;
    }

    find_by_id(conn, id)
}

pub fn delete(conn: &Connection, id: i64) -> anyhow::Result<bool> {
    let changed = conn.execute("DELETE FROM mappings WHERE id = ?", params![id])?;
    Ok(changed > 0)
}
