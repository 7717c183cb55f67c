//! SQLite-backed legacy id lookup against the repository database.

use super::LegacyLookup;
use crate::error::{MigrateError, Result};
use crate::models::{LegacyId, ObjectKind};
use rusqlite::{Connection, OpenFlags, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

/// Table and legacy-id column for each object kind.
fn legacy_table(kind: ObjectKind) -> (&'static str, &'static str) {
    match kind {
        ObjectKind::Community => ("community", "community_id"),
        ObjectKind::Collection => ("collection", "collection_id"),
        ObjectKind::Item => ("item", "item_id"),
        ObjectKind::Bitstream => ("bitstream", "bitstream_id"),
        ObjectKind::EPerson => ("eperson", "eperson_id"),
        ObjectKind::Group => ("epersongroup", "eperson_group_id"),
    }
}

/// Read-only lookup over the repository's object tables.
pub struct SqliteLookup {
    db_path: PathBuf,
    conn: Mutex<Connection>,
}

impl SqliteLookup {
    /// Open the repository database read-only.
    pub fn open(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if !db_path.exists() {
            return Err(MigrateError::Config {
                message: format!("Repository database not found: {}", db_path.display()),
            });
        }

        let conn = Connection::open_with_flags(
            &db_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| MigrateError::Database {
            message: format!("Failed to open {}: {}", db_path.display(), e),
            source: Some(e),
        })?;
        Self::configure_connection(&conn)?;

        info!("Opened repository database {}", db_path.display());
        Ok(Self {
            db_path,
            conn: Mutex::new(conn),
        })
    }

    fn configure_connection(conn: &Connection) -> Result<()> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(())
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| MigrateError::Database {
            message: "Failed to acquire connection lock".to_string(),
            source: None,
        })
    }
}

impl LegacyLookup for SqliteLookup {
    fn find_by_legacy_id(&self, kind: ObjectKind, legacy_id: LegacyId) -> Result<Option<Uuid>> {
        let (table, column) = legacy_table(kind);
        let conn = self.lock()?;

        let mut stmt = conn.prepare_cached(&format!(
            "SELECT uuid FROM {} WHERE {} = ?1 LIMIT 1",
            table, column
        ))?;
        let raw: Option<String> = stmt
            .query_row([legacy_id], |row| row.get(0))
            .optional()?;

        match raw {
            Some(raw) => {
                let uuid = Uuid::parse_str(raw.trim()).map_err(|e| MigrateError::Database {
                    message: format!("{} {} has malformed uuid {:?}: {}", kind, legacy_id, raw, e),
                    source: None,
                })?;
                debug!("Resolved {} {} -> {}", kind, legacy_id, uuid);
                Ok(Some(uuid))
            }
            None => Ok(None),
        }
    }

    fn refresh(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.flush_prepared_statement_cache();
        Ok(())
    }

    fn describe(&self) -> String {
        format!("repository database {}", self.db_path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::params;
    use tempfile::TempDir;

    fn create_test_db(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("repository.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE item (uuid TEXT PRIMARY KEY, item_id INTEGER);
             CREATE TABLE eperson (uuid TEXT PRIMARY KEY, eperson_id INTEGER);
             CREATE TABLE epersongroup (uuid TEXT PRIMARY KEY, eperson_group_id INTEGER);",
        )
        .unwrap();
        conn.execute(
            "INSERT INTO item (uuid, item_id) VALUES (?1, ?2)",
            params!["5b1c2bb6-7d8a-4f27-9fd4-0c1a3a3c2b11", 42],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO eperson (uuid, eperson_id) VALUES (?1, ?2)",
            params!["not-a-uuid", 9],
        )
        .unwrap();
        path
    }

    #[test]
    fn test_find_existing_item() {
        let dir = TempDir::new().unwrap();
        let lookup = SqliteLookup::open(create_test_db(&dir)).unwrap();

        let found = lookup.find_by_legacy_id(ObjectKind::Item, 42).unwrap();
        assert_eq!(
            found,
            Some(Uuid::parse_str("5b1c2bb6-7d8a-4f27-9fd4-0c1a3a3c2b11").unwrap())
        );
        assert_eq!(lookup.find_by_legacy_id(ObjectKind::Item, 43).unwrap(), None);
    }

    #[test]
    fn test_describe_names_database_file() {
        let dir = TempDir::new().unwrap();
        let path = create_test_db(&dir);
        let lookup = SqliteLookup::open(&path).unwrap();

        assert_eq!(lookup.db_path(), path.as_path());
        assert_eq!(
            lookup.describe(),
            format!("repository database {}", path.display())
        );
    }

    #[test]
    fn test_missing_table_is_database_error() {
        let dir = TempDir::new().unwrap();
        let lookup = SqliteLookup::open(create_test_db(&dir)).unwrap();

        let err = lookup
            .find_by_legacy_id(ObjectKind::Community, 1)
            .unwrap_err();
        assert!(err.is_persistence_failure());
    }

    #[test]
    fn test_malformed_uuid_is_database_error() {
        let dir = TempDir::new().unwrap();
        let lookup = SqliteLookup::open(create_test_db(&dir)).unwrap();

        let err = lookup.find_by_legacy_id(ObjectKind::EPerson, 9).unwrap_err();
        assert!(matches!(err, MigrateError::Database { .. }));
    }

    #[test]
    fn test_open_missing_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let result = SqliteLookup::open(dir.path().join("absent.db"));
        assert!(matches!(result, Err(MigrateError::Config { .. })));
    }

    #[test]
    fn test_refresh_keeps_lookup_usable() {
        let dir = TempDir::new().unwrap();
        let lookup = SqliteLookup::open(create_test_db(&dir)).unwrap();
        lookup.find_by_legacy_id(ObjectKind::Item, 42).unwrap();
        lookup.refresh().unwrap();
        assert!(lookup.find_by_legacy_id(ObjectKind::Item, 42).unwrap().is_some());
    }
}
