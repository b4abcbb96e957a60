//! Template records: key, stored PDF, field map, images and data source

use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use template::{FieldMap, ImageOverlay, OverlaySpec};

use crate::db::now;
use crate::error::{AppError, AppResult};

/// Where a template's records come from
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DataSource {
    #[default]
    None,
    Table {
        table: String,
    },
    Import {
        import_id: i64,
    },
    ErpDoctype {
        doctype: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        filters: Option<Value>,
    },
    ErpReport {
        report: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        filters: Option<Value>,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct Template {
    pub id: i64,
    pub key: String,
    pub name: String,
    pub pdf_path: String,
    pub page_count: i64,
    pub field_map: FieldMap,
    pub images: Vec<ImageOverlay>,
    pub data_source: DataSource,
    pub created_at: String,
    pub updated_at: String,
}

impl Template {
    pub fn overlay_spec(&self) -> OverlaySpec {
        OverlaySpec::new(self.field_map.clone(), self.images.clone())
    }
}

/// List view without image payloads
#[derive(Debug, Clone, Serialize)]
pub struct TemplateSummary {
    pub id: i64,
    pub key: String,
    pub name: String,
    pub page_count: i64,
    pub field_count: usize,
    pub image_count: usize,
    pub data_source: DataSource,
    pub updated_at: String,
}

impl From<Template> for TemplateSummary {
    fn from(t: Template) -> Self {
        Self {
            id: t.id,
            key: t.key,
            name: t.name,
            page_count: t.page_count,
            field_count: t.field_map.len(),
            image_count: t.images.len(),
            data_source: t.data_source,
            updated_at: t.updated_at,
        }
    }
}

pub struct NewTemplate<'a> {
    pub key: &'a str,
    pub name: &'a str,
    pub pdf_path: &'a str,
    pub page_count: i64,
}

/// Template keys are used in URLs and file names: `[A-Za-z0-9_-]+`
pub fn validate_key(key: &str) -> AppResult<()> {
    let valid = !key.is_empty()
        && key.len() <= 64
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "invalid template key {key:?}: use 1-64 letters, digits, '_' or '-'"
        )))
    }
}

const SELECT_TEMPLATE: &str = "\
    SELECT id, key, name, pdf_path, page_count, field_map, images, data_source, \
           created_at, updated_at \
    FROM templates";

fn json_column<T: serde::de::DeserializeOwned>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn row_to_template(row: &rusqlite::Row) -> rusqlite::Result<Template> {
    Ok(Template {
        id: row.get(0)?,
        key: row.get(1)?,
        name: row.get(2)?,
        pdf_path: row.get(3)?,
        page_count: row.get(4)?,
        field_map: json_column(row, 5)?,
        images: json_column(row, 6)?,
        data_source: json_column(row, 7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

pub fn list(conn: &Connection) -> AppResult<Vec<Template>> {
    let mut stmt = conn.prepare(&format!("{SELECT_TEMPLATE} ORDER BY name, key"))?;
    let templates = stmt
        .query_map([], row_to_template)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(templates)
}

pub fn find_by_key(conn: &Connection, key: &str) -> AppResult<Option<Template>> {
    let template = conn
        .query_row(
            &format!("{SELECT_TEMPLATE} WHERE key = ?1"),
            params![key],
            row_to_template,
        )
        .optional()?;
    Ok(template)
}

pub fn get_by_key(conn: &Connection, key: &str) -> AppResult<Template> {
    find_by_key(conn, key)?
        .ok_or_else(|| AppError::NotFound(format!("template '{key}' not found")))
}

pub fn insert(conn: &Connection, new: &NewTemplate) -> AppResult<Template> {
    validate_key(new.key)?;
    if new.name.trim().is_empty() {
        return Err(AppError::Validation("template name must not be empty".to_string()));
    }
    if find_by_key(conn, new.key)?.is_some() {
        return Err(AppError::Validation(format!(
            "template key '{}' already exists",
            new.key
        )));
    }

    let ts = now();
    conn.execute(
        "INSERT INTO templates (key, name, pdf_path, page_count, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        params![new.key, new.name.trim(), new.pdf_path, new.page_count, ts],
    )?;
    get_by_key(conn, new.key)
}

fn touch(conn: &Connection, key: &str, column: &str, value: &str) -> AppResult<Template> {
    let changed = conn.execute(
        &format!("UPDATE templates SET {column} = ?1, updated_at = ?2 WHERE key = ?3"),
        params![value, now(), key],
    )?;
    if changed == 0 {
        return Err(AppError::NotFound(format!("template '{key}' not found")));
    }
    get_by_key(conn, key)
}

pub fn update_name(conn: &Connection, key: &str, name: &str) -> AppResult<Template> {
    if name.trim().is_empty() {
        return Err(AppError::Validation("template name must not be empty".to_string()));
    }
    touch(conn, key, "name", name.trim())
}

pub fn update_field_map(conn: &Connection, key: &str, fields: &FieldMap) -> AppResult<Template> {
    template::validate_field_map(fields)?;
    touch(conn, key, "field_map", &serde_json::to_string(fields)?)
}

pub fn update_images(conn: &Connection, key: &str, images: &[ImageOverlay]) -> AppResult<Template> {
    template::validate_images(images)?;
    touch(conn, key, "images", &serde_json::to_string(images)?)
}

pub fn update_data_source(conn: &Connection, key: &str, source: &DataSource) -> AppResult<Template> {
    touch(conn, key, "data_source", &serde_json::to_string(source)?)
}

/// Delete a template row; imports go with it through the foreign key
pub fn delete(conn: &Connection, key: &str) -> AppResult<bool> {
    let changed = conn.execute("DELETE FROM templates WHERE key = ?1", params![key])?;
    Ok(changed > 0)
}
