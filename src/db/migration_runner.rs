use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crate::error::{JournalError, Result};

const BACKUPS_TO_KEEP: usize = 5;

#[derive(Debug, Clone)]
pub struct Migration {
    pub version: u32,
    pub name: &'static str,
    pub sql: &'static str,
}

impl Migration {
    pub fn checksum(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.sql.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    pub fn new(version: u32, name: &'static str, sql: &'static str) -> Self {
        Self { version, name, sql }
    }
}

pub struct MigrationRunner {
    migrations: Vec<Migration>,
}

impl Default for MigrationRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl MigrationRunner {
    pub fn new() -> Self {
        Self {
            migrations: Self::collect_migrations(),
        }
    }

    fn collect_migrations() -> Vec<Migration> {
        vec![
            Migration::new(0, "bootstrap", include_str!("migrations/000_bootstrap.sql")),
            Migration::new(1, "initial_schema", include_str!("migrations/001_initial_schema.sql")),
            Migration::new(2, "settings", include_str!("migrations/002_settings.sql")),
        ]
    }

    /// Applies every migration newer than the recorded version and returns how many ran.
    /// `db_path` is used for the pre-migration backup; `None` skips it (in-memory databases).
    pub fn run_pending_migrations(
        &self,
        conn: &Connection,
        db_path: Option<&Path>,
    ) -> Result<usize> {
        let mut applied = 0;

        if !self.has_schema_migrations_table(conn)? {
            log::info!("No migration history found - initialising schema tracking");
            self.apply_migration(conn, &self.migrations[0])?;
            applied += 1;
        }

        let current_version = self.get_current_version(conn)?;
        log::info!("Current schema version: {:?}", current_version);

        let pending: Vec<&Migration> = self
            .migrations
            .iter()
            .filter(|m| current_version.map_or(true, |v| m.version > v))
            .collect();

        let Some(target) = pending.last() else {
            return Ok(applied);
        };

        log::info!("Found {} pending migrations", pending.len());

        // A database that has only the tracking table holds no user data yet
        let backup_path = match db_path {
            Some(path) if current_version.unwrap_or(0) > 0 => {
                Some(self.create_backup(path, target.version)?)
            }
            _ => None,
        };
        if let Some(path) = &backup_path {
            log::info!("Backup created: {}", path.display());
        }

        for migration in pending {
            if let Err(e) = self.apply_migration(conn, migration) {
                log::error!("Migration {} failed: {}", migration.version, e);
                log::error!("Migration stopped. Database rolled back to before this migration.");
                if let Some(path) = &backup_path {
                    log::error!("Backup available at: {}", path.display());
                }
                return Err(e);
            }
            applied += 1;
            log::info!("Applied migration {}: {}", migration.version, migration.name);
        }

        Ok(applied)
    }

    fn apply_migration(&self, conn: &Connection, migration: &Migration) -> Result<()> {
        let start = Instant::now();

        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(migration.sql)?;

        let execution_time = start.elapsed().as_millis() as i64;
        tx.execute(
            "INSERT INTO schema_migrations
                (version, name, applied_at, checksum, execution_time_ms, notes)
             VALUES (?, ?, ?, ?, ?, NULL)",
            params![
                migration.version,
                migration.name,
                current_timestamp(),
                migration.checksum(),
                execution_time
            ],
        )?;

        tx.commit()?;

        log::debug!("Applied migration {} in {}ms", migration.name, execution_time);

        Ok(())
    }

    /// Fails when a recorded checksum no longer matches the bundled SQL.
    pub fn verify_migrations(&self, conn: &Connection) -> Result<()> {
        let mut stmt = conn.prepare(
            "SELECT version, name, checksum FROM schema_migrations
             WHERE checksum IS NOT NULL ORDER BY version",
        )?;

        let applied: Vec<(u32, String, String)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        for (version, name, stored_checksum) in applied {
            let Some(migration) = self.migrations.iter().find(|m| m.version == version) else {
                continue;
            };
            let expected_checksum = migration.checksum();
            if stored_checksum != expected_checksum {
                log::error!("Checksum mismatch for migration {} ({})", version, name);
                log::error!("Expected: {}", expected_checksum);
                log::error!("Actual:   {}", stored_checksum);
                return Err(JournalError::MigrationError(format!(
                    "migration {} ({}) was modified after it was applied",
                    version, name
                )));
            }
        }

        Ok(())
    }

    pub fn get_current_version(&self, conn: &Connection) -> Result<Option<u32>> {
        if !self.has_schema_migrations_table(conn)? {
            return Ok(None);
        }

        let version: Option<u32> = conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                row.get::<_, Option<u32>>(0)
            })
            .optional()?
            .flatten();

        Ok(version)
    }

    fn create_backup(&self, db_path: &Path, target_version: u32) -> Result<PathBuf> {
        let db_dir = db_path.parent().ok_or_else(|| {
            JournalError::MigrationError(format!("invalid database path: {}", db_path.display()))
        })?;

        let backup_dir = db_dir.join("backups");
        fs::create_dir_all(&backup_dir)?;

        let backup_name = format!("pre_migration_v{}_{}.db", target_version, current_timestamp());
        let backup_path = backup_dir.join(&backup_name);

        let src = Connection::open(db_path)?;
        let mut dst = Connection::open(&backup_path)?;

        {
            let backup = rusqlite::backup::Backup::new(&src, &mut dst)?;
            backup.run_to_completion(5, Duration::from_millis(250), None)?;
        }

        let metadata = fs::metadata(&backup_path)?;
        if metadata.len() == 0 {
            return Err(JournalError::MigrationError("backup file is empty".to_string()));
        }

        let integrity: String = dst.pragma_query_value(None, "integrity_check", |row| row.get(0))?;
        if integrity != "ok" {
            return Err(JournalError::MigrationError(format!(
                "backup integrity check failed: {}",
                integrity
            )));
        }

        log::info!(
            "Backup created successfully: {} ({:.2} MB)",
            backup_path.display(),
            metadata.len() as f64 / 1_048_576.0
        );

        self.cleanup_old_backups(&backup_dir)?;

        Ok(backup_path)
    }

    fn cleanup_old_backups(&self, backup_dir: &Path) -> Result<()> {
        let mut backups: Vec<_> = fs::read_dir(backup_dir)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                entry.path().extension().and_then(|s| s.to_str()) == Some("db")
                    && entry
                        .file_name()
                        .to_str()
                        .is_some_and(|s| s.starts_with("pre_migration_"))
            })
            .collect();

        // Oldest first
        backups.sort_by_key(|entry| {
            entry
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH)
        });

        if backups.len() > BACKUPS_TO_KEEP {
            for entry in backups.iter().take(backups.len() - BACKUPS_TO_KEEP) {
                if let Err(e) = fs::remove_file(entry.path()) {
                    log::warn!("Failed to delete old backup: {}", e);
                }
            }
        }

        Ok(())
    }

    fn has_schema_migrations_table(&self, conn: &Connection) -> Result<bool> {
        let count: i32 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='schema_migrations'",
            [],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

pub(crate) fn current_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
