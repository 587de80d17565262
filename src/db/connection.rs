use rusqlite::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::db::migration_runner::MigrationRunner;
use crate::error::{JournalError, Result};

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();
        let conn = Connection::open(db_path)?;

        // WAL lets the recap views read while a trade is being written
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Self::initialize(conn, Some(db_path))
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::initialize(Connection::open_in_memory()?, None)
    }

    fn initialize(conn: Connection, db_path: Option<&Path>) -> Result<Self> {
        conn.execute("PRAGMA foreign_keys = ON", [])?;

        let runner = MigrationRunner::new();

        log::info!("=== Starting database migration check ===");

        let applied = runner.run_pending_migrations(&conn, db_path)?;
        if applied > 0 {
            log::info!("Applied {} migrations successfully", applied);
        } else {
            log::info!("Database schema is up to date");
        }

        runner.verify_migrations(&conn)?;

        if let Some(version) = runner.get_current_version(&conn)? {
            log::info!("Final schema version: {}", version);
        }

        Ok(Database {
            conn: Mutex::new(conn),
        })
    }

    pub fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| JournalError::LockPoisoned)
    }
}
