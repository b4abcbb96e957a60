use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use std::path::Path;

use crate::error::AppResult;

pub type DbPool = Pool<SqliteConnectionManager>;

pub const MIGRATIONS: &str = include_str!("schema.sql");

/// Tables owned by the service itself
pub const SERVICE_TABLES: [&str; 3] = ["templates", "data_imports", "submissions"];

pub fn init_pool<P: AsRef<Path>>(database_path: P) -> AppResult<DbPool> {
    if let Some(parent) = database_path.as_ref().parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let manager = SqliteConnectionManager::file(database_path).with_init(|conn| {
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        Ok(())
    });
    let pool = Pool::builder().max_size(8).build(manager)?;
    Ok(pool)
}

pub fn run_migrations(pool: &DbPool) -> AppResult<()> {
    let conn = pool.get()?;
    conn.execute_batch(MIGRATIONS)?;
    tracing::info!("Database migrations complete");
    Ok(())
}

/// Current time as stored in timestamp columns
pub fn now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}
