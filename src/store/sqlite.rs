use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection};
use rusqlite_migration::{Migrations, M};

use crate::app::{FeedwatchError, Result};
use crate::domain::SeenRecord;
use crate::store::RecordStore;

pub struct SqliteRecordStore {
    conn: Mutex<Connection>,
}

impl SqliteRecordStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| FeedwatchError::StoreUnavailable(format!("connection poisoned: {}", e)))
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.lock()?;
        migrations
            .to_latest(&mut conn)
            .map_err(|e| FeedwatchError::StoreUnavailable(format!("migration failed: {}", e)))?;

        Ok(())
    }

    fn format_datetime(dt: &DateTime<Utc>) -> String {
        dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }

    fn parse_datetime(idx: usize, s: &str) -> rusqlite::Result<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn read_all(&self) -> Result<Vec<SeenRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT id, first_seen FROM seen_records")?;

        let records = stmt
            .query_map([], |row| {
                let first_seen: String = row.get(1)?;
                Ok(SeenRecord {
                    id: row.get(0)?,
                    first_seen: Self::parse_datetime(1, &first_seen)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(records)
    }

    async fn write_all(&self, records: &[SeenRecord]) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM seen_records", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO seen_records (id, first_seen) VALUES (?1, ?2)",
            )?;
            for record in records {
                stmt.execute(params![record.id, Self::format_datetime(&record.first_seen)])?;
            }
        }

        tx.commit()?;
        Ok(())
    }
}
