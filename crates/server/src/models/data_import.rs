//! Uploaded spreadsheets attached to a template

use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use crate::db::now;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DataImport {
    pub id: i64,
    pub template_id: i64,
    pub original_name: String,
    pub file_path: String,
    pub columns: Vec<String>,
    pub total_rows: i64,
    pub created_at: String,
}

pub struct NewDataImport<'a> {
    pub template_id: i64,
    pub original_name: &'a str,
    pub file_path: &'a str,
    pub columns: &'a [String],
    pub total_rows: i64,
}

const SELECT_IMPORT: &str = "\
    SELECT id, template_id, original_name, file_path, columns, total_rows, created_at \
    FROM data_imports";

fn row_to_import(row: &rusqlite::Row) -> rusqlite::Result<DataImport> {
    let columns: String = row.get(4)?;
    Ok(DataImport {
        id: row.get(0)?,
        template_id: row.get(1)?,
        original_name: row.get(2)?,
        file_path: row.get(3)?,
        columns: serde_json::from_str(&columns)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?,
        total_rows: row.get(5)?,
        created_at: row.get(6)?,
    })
}

pub fn insert(conn: &Connection, new: &NewDataImport) -> AppResult<DataImport> {
    conn.execute(
        "INSERT INTO data_imports (template_id, original_name, file_path, columns, total_rows, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            new.template_id,
            new.original_name,
            new.file_path,
            serde_json::to_string(new.columns)?,
            new.total_rows,
            now()
        ],
    )?;
    get(conn, conn.last_insert_rowid())
}

pub fn find(conn: &Connection, id: i64) -> AppResult<Option<DataImport>> {
    let import = conn
        .query_row(&format!("{SELECT_IMPORT} WHERE id = ?1"), params![id], row_to_import)
        .optional()?;
    Ok(import)
}

pub fn get(conn: &Connection, id: i64) -> AppResult<DataImport> {
    find(conn, id)?.ok_or_else(|| AppError::NotFound(format!("import {id} not found")))
}

pub fn list_for_template(conn: &Connection, template_id: i64) -> AppResult<Vec<DataImport>> {
    let mut stmt = conn.prepare(&format!(
        "{SELECT_IMPORT} WHERE template_id = ?1 ORDER BY id DESC"
    ))?;
    let imports = stmt
        .query_map(params![template_id], row_to_import)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(imports)
}

pub fn delete(conn: &Connection, id: i64) -> AppResult<bool> {
    let changed = conn.execute("DELETE FROM data_imports WHERE id = ?1", params![id])?;
    Ok(changed > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MIGRATIONS;
    use crate::models::template::{self, NewTemplate};
    use pretty_assertions::assert_eq;

    fn setup() -> (Connection, i64) {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys=ON;").unwrap();
        conn.execute_batch(MIGRATIONS).unwrap();
        let t = template::insert(
            &conn,
            &NewTemplate {
                key: "letters",
                name: "Letters",
                pdf_path: "templates/l.pdf",
                page_count: 1,
            },
        )
        .unwrap();
        (conn, t.id)
    }

    #[test]
    fn test_insert_and_list() {
        let (conn, template_id) = setup();
        let columns = vec!["name".to_string(), "age".to_string()];
        let import = insert(
            &conn,
            &NewDataImport {
                template_id,
                original_name: "people.csv",
                file_path: "imports/a.csv",
                columns: &columns,
                total_rows: 3,
            },
        )
        .unwrap();

        assert_eq!(import.columns, columns);
        assert_eq!(import.total_rows, 3);
        assert_eq!(list_for_template(&conn, template_id).unwrap(), vec![import.clone()]);

        assert!(delete(&conn, import.id).unwrap());
        assert!(matches!(get(&conn, import.id), Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_template_delete_cascades() {
        let (conn, template_id) = setup();
        insert(
            &conn,
            &NewDataImport {
                template_id,
                original_name: "a.csv",
                file_path: "imports/a.csv",
                columns: &[],
                total_rows: 0,
            },
        )
        .unwrap();

        template::delete(&conn, "letters").unwrap();
        assert!(list_for_template(&conn, template_id).unwrap().is_empty());
    }
}
