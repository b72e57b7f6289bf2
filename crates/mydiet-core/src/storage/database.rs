//! Database connection and schema management.

use std::path::Path;

use rusqlite::Connection;
use tracing::info;

use crate::storage::error::StorageResult;

/// Database connection wrapper.
///
/// Manages the SQLite connection and schema initialization.
pub struct Database {
    conn: Connection,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").field("path", &self.conn.path()).finish()
    }
}

impl Database {
    /// Opens a database at the specified path, creating it if needed.
    ///
    /// # Errors
    /// * `StorageError::Connection` - If the database connection fails
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Opens an in-memory database for testing.
    ///
    /// # Errors
    /// * `StorageError::Connection` - If the database connection fails
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Gets a reference to the underlying connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Gets a mutable reference to the underlying connection.
    pub fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Initializes the database schema.
    ///
    /// `trained_at` is stored as microseconds since the Unix epoch so that
    /// "latest" is a plain numeric ordering.
    fn init_schema(&self) -> StorageResult<()> {
        info!("Initializing database schema");

        self.conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS model_metrics (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                metrics_json TEXT NOT NULL,
                model_versions_json TEXT,
                trained_at INTEGER NOT NULL,
                dataset_files_json TEXT
            )
            "#,
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_model_metrics_trained_at ON model_metrics(trained_at DESC, id DESC)",
            [],
        )?;

        info!("Database schema initialized successfully");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_names(db: &Database) -> Vec<String> {
        let mut stmt =
            db.conn().prepare("SELECT name FROM sqlite_master WHERE type='table'").unwrap();
        stmt.query_map([], |row| row.get(0)).unwrap().map(|r| r.unwrap()).collect()
    }

    #[test]
    fn test_database_open_in_memory() {
        let db = Database::open_in_memory().unwrap();
        assert!(table_names(&db).contains(&"model_metrics".to_string()));
    }

    #[test]
    fn test_database_open_file_is_reopenable() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("metrics.db");

        {
            let mut db = Database::open(&path).unwrap();
            db.conn_mut()
                .execute(
                    "INSERT INTO model_metrics (metrics_json, trained_at) VALUES (?1, ?2)",
                    rusqlite::params![r#"{"accuracy":0.9}"#, 1_700_000_000_000_000_i64],
                )
                .unwrap();
        }
        assert!(path.exists());

        // Schema creation is idempotent and data survives a reopen
        let db = Database::open(&path).unwrap();
        let count: i64 =
            db.conn().query_row("SELECT COUNT(*) FROM model_metrics", [], |row| row.get(0)).unwrap();
        assert_eq!(count, 1);
    }
}
