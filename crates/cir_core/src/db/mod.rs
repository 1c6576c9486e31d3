use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use rusqlite::{Connection, Transaction};

use crate::error::AppError;

/// The server opens one connection per request, so writers queue instead of failing fast.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

struct Migration {
    name: &'static str,
    sql: &'static str,
}

macro_rules! migration {
    ($file:literal) => {
        Migration {
            name: $file,
            sql: include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/../../migrations/", $file)),
        }
    };
}

/// Applied in order; names are recorded in `_migrations` and never reused.
const MIGRATIONS: &[Migration] = &[
    migration!("0001_init.sql"),
    migration!("0002_add_annotation_status.sql"),
];

fn db_err(code: &str, message: &str, e: rusqlite::Error) -> AppError {
    AppError::new(code, message).with_details(e.to_string())
}

fn configure(conn: &Connection) -> Result<(), AppError> {
    conn.busy_timeout(BUSY_TIMEOUT)
        .map_err(|e| db_err("DB_OPEN_FAILED", "Failed to set busy timeout", e))?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(|e| db_err("DB_OPEN_FAILED", "Failed to enable foreign keys", e))
}

pub fn open(path: &Path) -> Result<Connection, AppError> {
    let conn = Connection::open(path).map_err(|e| {
        AppError::new("DB_OPEN_FAILED", "Failed to open SQLite database")
            .with_details(format!("path={}; err={}", path.display(), e))
    })?;
    configure(&conn)?;
    Ok(conn)
}

pub fn open_in_memory() -> Result<Connection, AppError> {
    let conn = Connection::open_in_memory()
        .map_err(|e| db_err("DB_OPEN_FAILED", "Failed to open in-memory SQLite database", e))?;
    configure(&conn)?;
    Ok(conn)
}

pub fn open_and_migrate(path: &Path) -> Result<Connection, AppError> {
    let mut conn = open(path)?;
    migrate(&mut conn)?;
    Ok(conn)
}

fn applied_migrations(conn: &Connection) -> Result<HashSet<String>, AppError> {
    let mut stmt = conn
        .prepare("SELECT name FROM _migrations")
        .map_err(|e| db_err("DB_MIGRATIONS_QUERY_FAILED", "Failed to query applied migrations", e))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .and_then(|rows| rows.collect::<Result<HashSet<_>, _>>())
        .map_err(|e| db_err("DB_MIGRATIONS_QUERY_FAILED", "Failed to read applied migrations", e))?;
    Ok(names)
}

fn apply(tx: Transaction<'_>, migration: &Migration) -> Result<(), AppError> {
    tx.execute_batch(migration.sql).map_err(|e| {
        AppError::new("DB_MIGRATION_FAILED", format!("Migration {} failed", migration.name))
            .with_details(e.to_string())
    })?;
    tx.execute(
        "INSERT INTO _migrations(name, applied_at) VALUES (?1, strftime('%Y-%m-%dT%H:%M:%fZ','now'))",
        [migration.name],
    )
    .map_err(|e| {
        AppError::new(
            "DB_MIGRATION_FAILED",
            format!("Failed to record migration {}", migration.name),
        )
        .with_details(e.to_string())
    })?;
    tx.commit()
        .map_err(|e| db_err("DB_TX_FAILED", "Failed to commit migration transaction", e))
}

/// Bring the schema up to date and return how many migrations ran.
///
/// Each pending migration runs in its own transaction together with its `_migrations` row.
pub fn migrate(conn: &mut Connection) -> Result<usize, AppError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
           name TEXT PRIMARY KEY NOT NULL,
           applied_at TEXT NOT NULL
         );",
    )
    .map_err(|e| {
        db_err(
            "DB_MIGRATIONS_TABLE_FAILED",
            "Failed to ensure migrations table exists",
            e,
        )
    })?;

    let applied = applied_migrations(conn)?;
    let mut ran = 0;
    for migration in MIGRATIONS.iter().filter(|m| !applied.contains(m.name)) {
        let tx = conn
            .transaction()
            .map_err(|e| db_err("DB_TX_FAILED", "Failed to start migration transaction", e))?;
        apply(tx, migration)?;
        tracing::debug!(migration = migration.name, "applied migration");
        ran += 1;
    }

    if ran > 0 {
        tracing::info!(applied = ran, "database schema updated");
    }
    Ok(ran)
}
