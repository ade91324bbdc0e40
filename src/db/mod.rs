//! Database module for rwho-server
//!
//! Provides SQLite storage for the host registry and the session table.

pub mod hosts;
pub mod schema;
pub mod utmp;

use crate::error::{CoreError, Result};
use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinError;

/// Database manager owning a single SQLite connection
pub struct Database {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl Database {
    /// Open (or create) the database file and initialize the schema
    pub fn new(db_path: PathBuf) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&db_path)?;
        schema::init_db(&conn)?;

        Ok(Database {
            conn: Mutex::new(conn),
            path: Some(db_path),
        })
    }

    /// Create a throwaway in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::init_db(&conn)?;

        Ok(Database {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    /// Lock the connection.
    ///
    /// A panic while holding the lock leaves SQLite itself consistent (any
    /// open transaction is rolled back on drop), so poisoning is ignored.
    pub fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run `f` against the connection on the blocking thread pool.
    ///
    /// A panic inside `f` is resumed on the caller. A task cancelled before
    /// it ran (runtime shutdown) is reported as `CoreError::Api`.
    pub async fn with_conn<F, T>(self: &Arc<Self>, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> T + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(self);
        join_result(tokio::task::spawn_blocking(move || f(&mut db.conn())).await)
    }

    /// Get the database file path (None for in-memory databases)
    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }
}

fn join_result<T>(result: std::result::Result<T, JoinError>) -> Result<T> {
    match result {
        Ok(value) => Ok(value),
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(e) => Err(CoreError::Api(format!("database task cancelled: {}", e))),
    }
}

// Re-export schema for convenience
pub use schema::init_db;
