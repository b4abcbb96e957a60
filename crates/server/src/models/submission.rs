//! Demo form submissions

use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use template::Record;

use crate::db::now;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Submission {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub age: Option<i64>,
    pub created_at: String,
}

impl Submission {
    /// Record used when rendering the submission onto a template
    pub fn to_record(&self) -> Record {
        let mut record = Record::new();
        record.insert("id".to_string(), json!(self.id));
        record.insert("name".to_string(), json!(self.name));
        record.insert("email".to_string(), json!(self.email));
        record.insert(
            "age".to_string(),
            self.age.map(Value::from).unwrap_or(Value::Null),
        );
        record.insert("created_at".to_string(), json!(self.created_at));
        record
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmissionInput {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub age: Option<i64>,
}

impl SubmissionInput {
    pub fn validate(&self) -> AppResult<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::Validation("name is required".to_string()));
        }
        let email = self.email.trim();
        let valid_email = email
            .split_once('@')
            .is_some_and(|(user, domain)| !user.is_empty() && domain.contains('.'));
        if !valid_email {
            return Err(AppError::Validation(format!("invalid email address: {email:?}")));
        }
        if let Some(age) = self.age {
            if !(0..=150).contains(&age) {
                return Err(AppError::Validation("age must be between 0 and 150".to_string()));
            }
        }
        Ok(())
    }
}

fn row_to_submission(row: &rusqlite::Row) -> rusqlite::Result<Submission> {
    Ok(Submission {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        age: row.get(3)?,
        created_at: row.get(4)?,
    })
}

pub fn list(conn: &Connection) -> AppResult<Vec<Submission>> {
    let mut stmt =
        conn.prepare("SELECT id, name, email, age, created_at FROM submissions ORDER BY id DESC")?;
    let submissions = stmt
        .query_map([], row_to_submission)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(submissions)
}

pub fn get(conn: &Connection, id: i64) -> AppResult<Submission> {
    conn.query_row(
        "SELECT id, name, email, age, created_at FROM submissions WHERE id = ?1",
        params![id],
        row_to_submission,
    )
    .optional()?
    .ok_or_else(|| AppError::NotFound(format!("submission {id} not found")))
}

pub fn insert(conn: &Connection, input: &SubmissionInput) -> AppResult<Submission> {
    input.validate()?;
    conn.execute(
        "INSERT INTO submissions (name, email, age, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![input.name.trim(), input.email.trim(), input.age, now()],
    )?;
    get(conn, conn.last_insert_rowid())
}

pub fn update(conn: &Connection, id: i64, input: &SubmissionInput) -> AppResult<Submission> {
    input.validate()?;
    let changed = conn.execute(
        "UPDATE submissions SET name = ?1, email = ?2, age = ?3 WHERE id = ?4",
        params![input.name.trim(), input.email.trim(), input.age, id],
    )?;
    if changed == 0 {
        return Err(AppError::NotFound(format!("submission {id} not found")));
    }
    get(conn, id)
}

pub fn delete(conn: &Connection, id: i64) -> AppResult<bool> {
    let changed = conn.execute("DELETE FROM submissions WHERE id = ?1", params![id])?;
    Ok(changed > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MIGRATIONS;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(MIGRATIONS).unwrap();
        conn
    }

    fn input(name: &str, email: &str, age: Option<i64>) -> SubmissionInput {
        SubmissionInput {
            name: name.to_string(),
            email: email.to_string(),
            age,
        }
    }

    #[test]
    fn test_validation() {
        assert!(input("Jane", "jane@example.com", Some(30)).validate().is_ok());
        assert!(input("Jane", "jane@example.com", None).validate().is_ok());
        assert!(input(" ", "jane@example.com", None).validate().is_err());
        assert!(input("Jane", "jane", None).validate().is_err());
        assert!(input("Jane", "@example.com", None).validate().is_err());
        assert!(input("Jane", "jane@example.com", Some(-1)).validate().is_err());
    }

    #[test]
    fn test_crud() {
        let conn = setup();
        let created = insert(&conn, &input(" Jane ", "jane@example.com", Some(30))).unwrap();
        assert_eq!(created.name, "Jane");

        let updated = update(&conn, created.id, &input("Jane Doe", "jane@example.com", None)).unwrap();
        assert_eq!(updated.name, "Jane Doe");
        assert_eq!(updated.age, None);

        assert_eq!(list(&conn).unwrap().len(), 1);
        assert!(delete(&conn, created.id).unwrap());
        assert!(matches!(get(&conn, created.id), Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_to_record() {
        let conn = setup();
        let created = insert(&conn, &input("Jane", "jane@example.com", Some(30))).unwrap();
        let record = created.to_record();
        assert_eq!(record["name"], json!("Jane"));
        assert_eq!(record["age"], json!(30));
    }
}
