use crate::error::{Result, StoreError};
use crate::SampleStore;
use chrono::DateTime;
use loadmon_common::types::{Host, Sample};
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS machine (
    id      INTEGER PRIMARY KEY AUTOINCREMENT,
    name    TEXT NOT NULL,
    address TEXT NOT NULL DEFAULT '',
    UNIQUE(name)
);
CREATE TABLE IF NOT EXISTS record (
    id      INTEGER PRIMARY KEY AUTOINCREMENT,
    ttime   INTEGER NOT NULL,
    machine INT NOT NULL REFERENCES machine(id),
    users   INTEGER NOT NULL,
    load    REAL NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_record_machine_time
    ON record(machine, ttime);
";

pub struct SqliteSampleStore {
    conn: Mutex<Connection>,
}

impl SqliteSampleStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// In-memory store, used by tests and the collector test harness.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Lock the connection, recovering from a poisoned Mutex if necessary.
    fn lock_conn(&self) -> MutexGuard<'_, Connection> {
        self.conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SampleStore for SqliteSampleStore {
    fn register_host(&self, alias: &str, address: &str) -> Result<Host> {
        let conn = self.lock_conn();
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO machine (name, address) VALUES (?1, ?2)",
            rusqlite::params![alias, address],
        )?;
        if inserted > 0 {
            tracing::info!(host = %alias, "Registered new host");
        }
        conn.query_row(
            "SELECT id, name, address FROM machine WHERE name = ?1",
            rusqlite::params![alias],
            |row| {
                Ok(Host {
                    id: row.get(0)?,
                    alias: row.get(1)?,
                    address: row.get(2)?,
                })
            },
        )
        .optional()?
        .ok_or_else(|| StoreError::RegisterReadback(alias.to_string()))
    }

    fn hosts(&self) -> Result<Vec<Host>> {
        let conn = self.lock_conn();
        let mut stmt = conn.prepare_cached("SELECT id, name, address FROM machine ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok(Host {
                id: row.get(0)?,
                alias: row.get(1)?,
                address: row.get(2)?,
            })
        })?;
        let mut hosts = Vec::new();
        for row in rows {
            hosts.push(row?);
        }
        Ok(hosts)
    }

    fn append(&self, host_id: i64, sample: &Sample) -> Result<()> {
        let conn = self.lock_conn();
        let known: Option<i64> = conn
            .query_row(
                "SELECT id FROM machine WHERE id = ?1",
                rusqlite::params![host_id],
                |row| row.get(0),
            )
            .optional()?;
        if known.is_none() {
            return Err(StoreError::UnknownHost(host_id));
        }
        let mut stmt = conn.prepare_cached(
            "INSERT INTO record (ttime, machine, users, load) VALUES (?1, ?2, ?3, ?4)",
        )?;
        stmt.execute(rusqlite::params![
            sample.timestamp.timestamp(),
            host_id,
            sample.users,
            sample.load,
        ])?;
        Ok(())
    }

    fn samples_for(&self, host_id: i64) -> Result<Vec<Sample>> {
        let conn = self.lock_conn();
        let mut stmt = conn.prepare_cached(
            "SELECT ttime, users, load FROM record WHERE machine = ?1 ORDER BY ttime ASC",
        )?;
        let rows = stmt.query_map(rusqlite::params![host_id], |row| {
            let ttime: i64 = row.get(0)?;
            let users: u32 = row.get(1)?;
            let load: f64 = row.get(2)?;
            Ok((ttime, users, load))
        })?;
        let mut samples = Vec::new();
        for row in rows {
            let (ttime, users, load) = row?;
            let timestamp =
                DateTime::from_timestamp(ttime, 0).ok_or(StoreError::InvalidTimestamp(ttime))?;
            samples.push(Sample {
                timestamp,
                users,
                load,
            });
        }
        Ok(samples)
    }
}
