//! Storage sinks for decoded power records.
//!
//! The log-consuming node hands each fully decoded record to a [`LogSink`].
//! A sink failure is treated as the store being down, not as a transient
//! error; the sensor reacts by disabling further logging for its lifetime.

use corepwr_common::record::PowerRecord;
use thiserror::Error;

/// The downstream store rejected an ingest.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend rejected the record: {0}")]
    Backend(String),

    #[cfg(feature = "storage")]
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Downstream store abstraction the decode path feeds.
pub trait LogSink {
    fn add_log(&mut self, namespace: &str, record: &PowerRecord) -> Result<(), StoreError>;
}

/// In-memory sink for tests and one-shot CLI runs.
#[derive(Debug, Default)]
pub struct MemoryLogSink {
    records: Vec<(String, PowerRecord)>,
}

impl MemoryLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[(String, PowerRecord)] {
        &self.records
    }
}

impl LogSink for MemoryLogSink {
    fn add_log(&mut self, namespace: &str, record: &PowerRecord) -> Result<(), StoreError> {
        self.records.push((namespace.to_string(), record.clone()));
        Ok(())
    }
}

#[cfg(feature = "storage")]
pub use sqlite::SqliteLogSink;

#[cfg(feature = "storage")]
mod sqlite {
    use super::{LogSink, StoreError};
    use corepwr_common::record::{LogValue, PowerRecord};
    use rusqlite::Connection;
    use std::path::Path;

    /// SQLite-backed sink: one row per core reading, keyed by record time.
    pub struct SqliteLogSink {
        conn: Connection,
    }

    impl SqliteLogSink {
        pub fn open(path: &Path) -> Result<Self, StoreError> {
            let conn = Connection::open(path)?;
            Self::init_schema(&conn)?;
            Ok(Self { conn })
        }

        pub fn open_in_memory() -> Result<Self, StoreError> {
            let conn = Connection::open_in_memory()?;
            Self::init_schema(&conn)?;
            Ok(Self { conn })
        }

        fn init_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS power_log (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    namespace TEXT NOT NULL,
                    ctime TEXT NOT NULL,
                    key TEXT NOT NULL,
                    watts REAL NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_power_log_ctime
                    ON power_log (namespace, ctime);",
            )
        }

        pub fn row_count(&self) -> Result<u64, StoreError> {
            let count: i64 =
                self.conn
                    .query_row("SELECT COUNT(*) FROM power_log", [], |row| row.get(0))?;
            Ok(count as u64)
        }
    }

    impl LogSink for SqliteLogSink {
        fn add_log(&mut self, namespace: &str, record: &PowerRecord) -> Result<(), StoreError> {
            let ctime = record
                .ctime()
                .ok_or_else(|| StoreError::Backend("record is missing its ctime entry".into()))?
                .to_string();

            let tx = self.conn.transaction()?;
            {
                let mut insert = tx.prepare_cached(
                    "INSERT INTO power_log (namespace, ctime, key, watts)
                     VALUES (?1, ?2, ?3, ?4)",
                )?;
                for entry in record.entries() {
                    if let LogValue::Real(watts) = entry.value {
                        insert.execute(rusqlite::params![
                            namespace,
                            ctime,
                            entry.key,
                            f64::from(watts)
                        ])?;
                    }
                }
            }
            tx.commit()?;
            Ok(())
        }
    }

}
