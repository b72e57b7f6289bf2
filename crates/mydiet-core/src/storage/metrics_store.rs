//! Persistence for training-run metrics.
//!
//! Records are insert-only: there is no update or delete path. "Latest" means
//! greatest `trained_at`, with later inserts winning ties.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mydiet_training::{MetricsMap, MetricsRecord, NewMetricsRecord};
use rusqlite::{OptionalExtension, Row, params};
use tracing::debug;

use crate::storage::database::Database;
use crate::storage::error::{StorageError, StorageResult};

const SELECT_COLUMNS: &str =
    "SELECT id, metrics_json, model_versions_json, trained_at, dataset_files_json FROM model_metrics";

/// Async access to the metrics store, shared by all request handlers.
#[async_trait]
pub trait MetricsStore: Send + Sync {
    /// Persists a new record, stamping `trained_at` with the current time when absent.
    async fn insert(&self, record: NewMetricsRecord) -> StorageResult<MetricsRecord>;

    /// Returns the record with the greatest `trained_at`, if any.
    async fn latest(&self) -> StorageResult<Option<MetricsRecord>>;

    /// Returns up to `limit` records, newest first.
    async fn recent(&self, limit: usize) -> StorageResult<Vec<MetricsRecord>>;

    /// Returns the number of stored records.
    async fn count(&self) -> StorageResult<u64>;
}

// ============================================================================
// Row Parsing Helpers
// ============================================================================

fn parse_json_field(row: &Row, idx: usize, column_name: &str) -> rusqlite::Result<MetricsMap> {
    let json_str: String = row.get(idx)?;
    serde_json::from_str(&json_str).map_err(|_| {
        rusqlite::Error::InvalidColumnType(idx, column_name.to_string(), rusqlite::types::Type::Text)
    })
}

fn parse_optional_json_field(
    row: &Row,
    idx: usize,
    column_name: &str,
) -> rusqlite::Result<Option<MetricsMap>> {
    let json_str: Option<String> = row.get(idx)?;
    json_str
        .map(|s| {
            serde_json::from_str(&s).map_err(|_| {
                rusqlite::Error::InvalidColumnType(
                    idx,
                    column_name.to_string(),
                    rusqlite::types::Type::Text,
                )
            })
        })
        .transpose()
}

fn parse_timestamp(row: &Row, idx: usize, column_name: &str) -> rusqlite::Result<DateTime<Utc>> {
    let micros: i64 = row.get(idx)?;
    DateTime::from_timestamp_micros(micros).ok_or_else(|| {
        rusqlite::Error::InvalidColumnType(
            idx,
            column_name.to_string(),
            rusqlite::types::Type::Integer,
        )
    })
}

fn row_to_record(row: &Row) -> rusqlite::Result<MetricsRecord> {
    Ok(MetricsRecord {
        id: row.get(0)?,
        metrics: parse_json_field(row, 1, "metrics_json")?,
        model_versions: parse_optional_json_field(row, 2, "model_versions_json")?,
        trained_at: parse_timestamp(row, 3, "trained_at")?,
        dataset_files: parse_optional_json_field(row, 4, "dataset_files_json")?,
    })
}

fn optional_json(map: Option<&MetricsMap>) -> StorageResult<Option<String>> {
    Ok(map.map(serde_json::to_string).transpose()?)
}

// ============================================================================
// Repository
// ============================================================================

/// Synchronous repository over a borrowed [`Database`].
pub struct SqliteMetricsRepository<'a> {
    db: &'a Database,
}

impl<'a> SqliteMetricsRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Inserts a record and returns it as stored.
    ///
    /// The stored timestamp has microsecond precision; the returned record
    /// carries the truncated value so it compares equal to later reads.
    pub fn insert(&self, record: &NewMetricsRecord) -> StorageResult<MetricsRecord> {
        let micros = record.trained_at.unwrap_or_else(Utc::now).timestamp_micros();
        let trained_at = DateTime::from_timestamp_micros(micros)
            .ok_or_else(|| StorageError::InvalidData(format!("trained_at out of range: {micros}")))?;

        self.db.conn().execute(
            "INSERT INTO model_metrics (metrics_json, model_versions_json, trained_at, dataset_files_json)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                serde_json::to_string(&record.metrics)?,
                optional_json(record.model_versions.as_ref())?,
                micros,
                optional_json(record.dataset_files.as_ref())?,
            ],
        )?;
        let id = self.db.conn().last_insert_rowid();
        debug!(id, trained_at = %trained_at, "Stored metrics record");

        Ok(MetricsRecord {
            id,
            metrics: record.metrics.clone(),
            model_versions: record.model_versions.clone(),
            trained_at,
            dataset_files: record.dataset_files.clone(),
        })
    }

    pub fn latest(&self) -> StorageResult<Option<MetricsRecord>> {
        let sql = format!("{SELECT_COLUMNS} ORDER BY trained_at DESC, id DESC LIMIT 1");
        Ok(self.db.conn().query_row(&sql, [], row_to_record).optional()?)
    }

    pub fn recent(&self, limit: usize) -> StorageResult<Vec<MetricsRecord>> {
        let sql = format!("{SELECT_COLUMNS} ORDER BY trained_at DESC, id DESC LIMIT ?1");
        let mut stmt = self.db.conn().prepare(&sql)?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let records = stmt
            .query_map(params![limit], row_to_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    pub fn count(&self) -> StorageResult<u64> {
        let count: i64 =
            self.db.conn().query_row("SELECT COUNT(*) FROM model_metrics", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

// ============================================================================
// Async store
// ============================================================================

/// [`MetricsStore`] over a shared SQLite connection.
///
/// Every call runs on the blocking thread pool so SQLite I/O never stalls the
/// async runtime.
#[derive(Debug, Clone)]
pub struct SqliteMetricsStore {
    db: Arc<Mutex<Database>>,
}

impl SqliteMetricsStore {
    pub fn new(db: Database) -> Self {
        Self { db: Arc::new(Mutex::new(db)) }
    }

    /// Opens an in-memory store for testing.
    pub fn in_memory() -> StorageResult<Self> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    async fn with_repo<T, F>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&SqliteMetricsRepository<'_>) -> StorageResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let db = db.lock().map_err(|_| StorageError::LockPoisoned)?;
            f(&SqliteMetricsRepository::new(&db))
        })
        .await?
    }
}

#[async_trait]
impl MetricsStore for SqliteMetricsStore {
    async fn insert(&self, record: NewMetricsRecord) -> StorageResult<MetricsRecord> {
        self.with_repo(move |repo| repo.insert(&record)).await
    }

    async fn latest(&self) -> StorageResult<Option<MetricsRecord>> {
        self.with_repo(|repo| repo.latest()).await
    }

    async fn recent(&self, limit: usize) -> StorageResult<Vec<MetricsRecord>> {
        self.with_repo(move |repo| repo.recent(limit)).await
    }

    async fn count(&self) -> StorageResult<u64> {
        self.with_repo(|repo| repo.count()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use mydiet_training::MetricValue;

    fn metrics(pairs: &[(&str, f64)]) -> MetricsMap {
        pairs.iter().map(|(k, v)| ((*k).to_string(), MetricValue::from(*v))).collect()
    }

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_repository_latest_on_empty_store() {
        let db = Database::open_in_memory().unwrap();
        let repo = SqliteMetricsRepository::new(&db);
        assert!(repo.latest().unwrap().is_none());
        assert_eq!(repo.count().unwrap(), 0);
    }

    #[test]
    fn test_repository_latest_is_max_trained_at_not_last_insert() {
        let db = Database::open_in_memory().unwrap();
        let repo = SqliteMetricsRepository::new(&db);

        repo.insert(&NewMetricsRecord::new(metrics(&[("accuracy", 0.2)])).trained_at(at(2024, 3, 1)))
            .unwrap();
        repo.insert(&NewMetricsRecord::new(metrics(&[("accuracy", 0.1)])).trained_at(at(2024, 1, 1)))
            .unwrap();

        let latest = repo.latest().unwrap().unwrap();
        assert_eq!(latest.trained_at, at(2024, 3, 1));
        assert_eq!(latest.metrics, metrics(&[("accuracy", 0.2)]));
    }

    #[test]
    fn test_repository_ties_go_to_later_insert() {
        let db = Database::open_in_memory().unwrap();
        let repo = SqliteMetricsRepository::new(&db);

        let first = repo.insert(&NewMetricsRecord::new(metrics(&[("run", 1.0)])).trained_at(at(2024, 5, 5))).unwrap();
        let second = repo.insert(&NewMetricsRecord::new(metrics(&[("run", 2.0)])).trained_at(at(2024, 5, 5))).unwrap();
        assert!(second.id > first.id);

        assert_eq!(repo.latest().unwrap().unwrap().id, second.id);
    }

    #[test]
    fn test_repository_round_trips_optional_maps() {
        let db = Database::open_in_memory().unwrap();
        let repo = SqliteMetricsRepository::new(&db);

        let mut versions = MetricsMap::new();
        versions.insert("user_kmeans".to_string(), MetricValue::from("v3"));
        let mut files = MetricsMap::new();
        files.insert("recipes".to_string(), MetricValue::from("recipes_2024_03.csv"));

        let mut new = NewMetricsRecord::new(metrics(&[("silhouette", 0.41)])).trained_at(at(2024, 3, 1));
        new.model_versions = Some(versions.clone());
        new.dataset_files = Some(files.clone());

        let stored = repo.insert(&new).unwrap();
        let loaded = repo.latest().unwrap().unwrap();
        assert_eq!(stored, loaded);
        assert_eq!(loaded.model_versions, Some(versions));
        assert_eq!(loaded.dataset_files, Some(files));
    }

    #[test]
    fn test_repository_recent_is_newest_first_and_limited() {
        let db = Database::open_in_memory().unwrap();
        let repo = SqliteMetricsRepository::new(&db);
        for month in 1..=4 {
            repo.insert(&NewMetricsRecord::new(metrics(&[("month", f64::from(month))])).trained_at(at(2024, month, 1)))
                .unwrap();
        }

        let recent = repo.recent(3).unwrap();
        let months: Vec<f64> = recent.iter().map(|r| r.metrics["month"].as_f64().unwrap()).collect();
        assert_eq!(months, vec![4.0, 3.0, 2.0]);
        assert_eq!(repo.count().unwrap(), 4);
    }

    #[test]
    fn test_repository_defaults_trained_at_to_now() {
        let db = Database::open_in_memory().unwrap();
        let repo = SqliteMetricsRepository::new(&db);

        let before = Utc::now();
        let stored = repo.insert(&NewMetricsRecord::new(metrics(&[("accuracy", 0.5)]))).unwrap();
        let after = Utc::now();

        // Stored precision is microseconds
        assert!(stored.trained_at >= before - chrono::Duration::microseconds(1));
        assert!(stored.trained_at <= after);
    }

    #[tokio::test]
    async fn test_store_insert_and_latest() {
        let store = SqliteMetricsStore::in_memory().unwrap();
        assert!(store.latest().await.unwrap().is_none());

        store
            .insert(NewMetricsRecord::new(metrics(&[("accuracy", 0.7)])).trained_at(at(2024, 1, 1)))
            .await
            .unwrap();
        store
            .insert(NewMetricsRecord::new(metrics(&[("accuracy", 0.9)])).trained_at(at(2024, 3, 1)))
            .await
            .unwrap();

        let latest = store.latest().await.unwrap().unwrap();
        assert_eq!(latest.metrics, metrics(&[("accuracy", 0.9)]));
        assert_eq!(store.count().await.unwrap(), 2);
        assert_eq!(store.recent(10).await.unwrap().len(), 2);
    }
}
