//! Database sessions.
//!
//! The engine talks to the target database only through [`Session`], so a run
//! can be driven against SQLite, an in-memory database, or a test double.

use crate::config::ConnectionsConfig;
use crate::error::{DeployError, Result};
use crate::types::Environment;
use rusqlite::types::ValueRef;
use rusqlite::{Batch, Connection, OpenFlags};
use std::path::Path;

pub trait Session {
    /// Run every statement in `script`, in order.
    ///
    /// Returns one entry per statement: the first column of its first row
    /// rendered as text, or `None` when the statement produced no row. The
    /// first failing statement stops the script and is returned as
    /// [`DeployError::Execution`], as is a script with no statements at all.
    fn execute_script(&mut self, script: &str) -> Result<Vec<Option<String>>>;
}

// ---------------------------------------------------------------------------
// SqliteSession
// ---------------------------------------------------------------------------

/// A live connection to one target database. Closed on drop.
pub struct SqliteSession {
    target: String,
    conn: Option<Connection>,
}

impl SqliteSession {
    /// Open an existing database file. A missing or unreadable database is a
    /// [`DeployError::Connection`]; nothing is created.
    pub fn open(target: &str, path: &Path) -> Result<Self> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags)
            .map_err(|e| DeployError::Connection(format!("{target} ({}): {e}", path.display())))?;
        conn.query_row("PRAGMA schema_version", [], |row| row.get::<_, i64>(0))
            .map_err(|e| DeployError::Connection(format!("{target} ({}): {e}", path.display())))?;
        Ok(Self {
            target: target.to_string(),
            conn: Some(conn),
        })
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| DeployError::Connection(format!("in-memory: {e}")))?;
        Ok(Self {
            target: "memory".to_string(),
            conn: Some(conn),
        })
    }

    /// Release the connection now instead of at end of scope.
    pub fn close(self) {
        drop(self);
    }
}

impl Session for SqliteSession {
    fn execute_script(&mut self, script: &str) -> Result<Vec<Option<String>>> {
        let conn = self
            .conn
            .as_ref()
            .ok_or_else(|| DeployError::Connection(format!("{} is closed", self.target)))?;

        let mut results = Vec::new();
        let mut batch = Batch::new(conn, script);
        while let Some(mut stmt) = batch.next().map_err(execution)? {
            let columns = stmt.column_count();
            let mut rows = stmt.raw_query();
            let first = match rows.next().map_err(execution)? {
                Some(row) if columns > 0 => Some(render_value(row.get_ref(0).map_err(execution)?)),
                _ => None,
            };
            results.push(first);
        }
        if results.is_empty() {
            return Err(DeployError::Execution("no statements to execute".to_string()));
        }
        Ok(results)
    }
}

impl Drop for SqliteSession {
    fn drop(&mut self) {
        if self.conn.take().is_some() {
            tracing::info!("Database connection closed.");
        }
    }
}

fn execution(e: rusqlite::Error) -> DeployError {
    DeployError::Execution(e.to_string())
}

fn render_value(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => "NULL".to_string(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(t) => String::from_utf8_lossy(t).into_owned(),
        ValueRef::Blob(b) => format!("<blob {} bytes>", b.len()),
    }
}

// ---------------------------------------------------------------------------
// Environment resolution
// ---------------------------------------------------------------------------

/// Map a logical environment name to its environment, logging rejections.
pub fn resolve_environment(name: &str) -> Result<Environment> {
    name.parse::<Environment>().inspect_err(|_| {
        tracing::error!(
            "Invalid environment argument: {name}. Valid values are 'dev', 'tst' or 'prd'."
        );
    })
}

/// Open a session against the database backing `environment`.
pub fn open_session(environment: Environment, config: &ConnectionsConfig) -> Result<SqliteSession> {
    let target = environment.target();
    let opened = config
        .database_path(target)
        .and_then(|path| SqliteSession::open(target, &path));
    match opened {
        Ok(session) => {
            tracing::info!("Successfully connected to {target}.");
            Ok(session)
        }
        Err(e) => {
            tracing::error!("Failed to connect to {target}: {e}");
            Err(e)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
