//! `sqlite` store: one row per pack size in `pack_sizes(size)`.

use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::{Connection, params};

use super::PackSizeStore;
use crate::error::AppError;

const SCHEMA_VERSION: i64 = 1;

#[derive(Debug, Clone)]
pub struct SqliteStore {
    db_path: PathBuf,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `db_path`.
    pub fn open(db_path: &Path) -> Result<Self, AppError> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                AppError::Store(format!("sqlite: cannot create {}: {e}", parent.display()))
            })?;
        }
        let store = Self { db_path: db_path.to_path_buf() };
        store.init_db()?;
        Ok(store)
    }

    fn init_db(&self) -> Result<(), AppError> {
        let conn = self.open_conn()?;
        let version: i64 = conn
            .query_row("PRAGMA user_version;", [], |row| row.get(0))
            .map_err(|e| AppError::Store(format!("sqlite: read schema version: {e}")))?;

        if version == 0 {
            conn.execute_batch(
                "
                CREATE TABLE IF NOT EXISTS pack_sizes (
                    size INTEGER PRIMARY KEY
                );

                PRAGMA user_version = 1;
                ",
            )
            .map_err(|e| AppError::Store(format!("sqlite: initialize schema: {e}")))?;
            return Ok(());
        }

        if version != SCHEMA_VERSION {
            return Err(AppError::Store(format!(
                "sqlite: unsupported schema version {version}, expected {SCHEMA_VERSION}"
            )));
        }

        Ok(())
    }

    fn open_conn(&self) -> Result<Connection, AppError> {
        let conn = Connection::open(&self.db_path).map_err(|e| {
            AppError::Store(format!("sqlite: open {}: {e}", self.db_path.display()))
        })?;
        conn.pragma_update(None, "busy_timeout", 5000)
            .map_err(|e| AppError::Store(format!("sqlite: set busy_timeout: {e}")))?;
        Ok(conn)
    }
}

impl PackSizeStore for SqliteStore {
    fn store_type(&self) -> &str {
        "sqlite"
    }

    fn load(&self) -> Result<Vec<u64>, AppError> {
        let conn = self.open_conn()?;
        let mut stmt = conn
            .prepare("SELECT size FROM pack_sizes ORDER BY size DESC")
            .map_err(|e| AppError::Store(format!("sqlite: prepare list: {e}")))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, i64>(0))
            .map_err(|e| AppError::Store(format!("sqlite: list pack sizes: {e}")))?;

        let mut sizes = Vec::new();
        for row in rows {
            let size = row.map_err(|e| AppError::Store(format!("sqlite: read row: {e}")))?;
            let size = u64::try_from(size)
                .map_err(|_| AppError::Store(format!("sqlite: stored pack size {size} is negative")))?;
            sizes.push(size);
        }
        Ok(sizes)
    }

    fn save(&self, sizes: &[u64]) -> Result<(), AppError> {
        let mut conn = self.open_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| AppError::Store(format!("sqlite: begin tx: {e}")))?;

        tx.execute("DELETE FROM pack_sizes", [])
            .map_err(|e| AppError::Store(format!("sqlite: clear pack sizes: {e}")))?;
        for &size in sizes {
            let size = i64::try_from(size)
                .map_err(|_| AppError::Store(format!("sqlite: pack size {size} out of range")))?;
            tx.execute("INSERT INTO pack_sizes (size) VALUES (?1)", params![size])
                .map_err(|e| AppError::Store(format!("sqlite: insert {size}: {e}")))?;
        }

        tx.commit()
            .map_err(|e| AppError::Store(format!("sqlite: commit replace: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_temp() -> (TempDir, SqliteStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(&dir.path().join("packs.db")).unwrap();
        (dir, store)
    }

    #[test]
    fn empty_on_first_open() {
        let (_dir, store) = open_temp();
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn save_and_load_descending() {
        let (_dir, store) = open_temp();
        store.save(&[250, 1000, 500]).unwrap();
        assert_eq!(store.load().unwrap(), vec![1000, 500, 250]);
    }

    #[test]
    fn save_replaces_previous_rows() {
        let (_dir, store) = open_temp();
        store.save(&[5000, 2000, 250]).unwrap();
        store.save(&[53, 31, 23]).unwrap();
        assert_eq!(store.load().unwrap(), vec![53, 31, 23]);
    }

    #[test]
    fn reopen_keeps_rows() {
        let (dir, store) = open_temp();
        store.save(&[42]).unwrap();
        drop(store);
        let reopened = SqliteStore::open(&dir.path().join("packs.db")).unwrap();
        assert_eq!(reopened.load().unwrap(), vec![42]);
    }

    #[test]
    fn failed_insert_rolls_back() {
        let (_dir, store) = open_temp();
        store.save(&[500, 250]).unwrap();
        // Duplicate primary key aborts the transaction before commit.
        assert!(store.save(&[100, 100]).is_err());
        assert_eq!(store.load().unwrap(), vec![500, 250]);
    }
}
