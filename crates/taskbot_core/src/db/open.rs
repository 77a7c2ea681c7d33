//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Resolve a database url into a file or in-memory location.
//! - Configure connection pragmas and run migrations before handing out a
//!   connection.
//!
//! # Invariants
//! - Returned connections have migrations fully applied.

use super::migrations::apply_migrations;
use super::{DbError, DbResult};
use log::{error, info};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

const SQLITE_URL_PREFIX: &str = "sqlite://";
const MEMORY_LOCATION: &str = ":memory:";

/// Where a task database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbLocation {
    File(PathBuf),
    Memory,
}

impl DbLocation {
    /// Parses a connection string.
    ///
    /// Accepts a plain path, a `sqlite://<path>` url, or `:memory:`
    /// (optionally prefixed with `sqlite://`).
    pub fn parse(url: &str) -> DbResult<Self> {
        let trimmed = url.trim();
        let path = trimmed.strip_prefix(SQLITE_URL_PREFIX).unwrap_or(trimmed);
        if path.is_empty() {
            return Err(DbError::InvalidUrl(url.to_string()));
        }
        if path == MEMORY_LOCATION {
            return Ok(Self::Memory);
        }
        if path.contains("://") {
            return Err(DbError::InvalidUrl(url.to_string()));
        }
        Ok(Self::File(PathBuf::from(path)))
    }
}

/// Opens the database described by a connection string.
pub fn open_db_url(url: &str) -> DbResult<Connection> {
    match DbLocation::parse(url)? {
        DbLocation::File(path) => open_db(path),
        DbLocation::Memory => open_db_in_memory(),
    }
}

/// Opens a SQLite database file and applies all pending migrations.
///
/// # Side effects
/// - Emits `db_open` logging events with duration and status.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    open_with("file", || Connection::open(path))
}

/// Opens an in-memory SQLite database and applies all pending migrations.
pub fn open_db_in_memory() -> DbResult<Connection> {
    open_with("memory", Connection::open_in_memory)
}

fn open_with(
    mode: &'static str,
    connect: impl FnOnce() -> rusqlite::Result<Connection>,
) -> DbResult<Connection> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode={mode}");

    let mut conn = match connect() {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_open_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    match bootstrap_connection(&mut conn) {
        Ok(()) => {
            info!(
                "event=db_open module=db status=ok mode={} duration_ms={}",
                mode,
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_bootstrap_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn bootstrap_connection(conn: &mut Connection) -> DbResult<()> {
    conn.busy_timeout(Duration::from_secs(5))?;
    apply_migrations(conn)?;
    Ok(())
}
