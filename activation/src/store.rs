//! SQLite persistence for activations.

use chrono::{DateTime, Duration, Utc};
use qfloor_license::ActivationRecord;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::{debug, info};

/// Errors raised by the activation store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite failed to open, migrate or run a statement.
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS activations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        license_key TEXT NOT NULL,
        machine_id TEXT NOT NULL,
        activated_at TEXT NOT NULL,
        expires_at TEXT NOT NULL,
        is_active INTEGER NOT NULL DEFAULT 1,
        activation_count INTEGER NOT NULL DEFAULT 1,
        UNIQUE(license_key, machine_id)
    );

    CREATE INDEX IF NOT EXISTS idx_license_key ON activations(license_key);
";

const SELECT_RECORD: &str = "
    SELECT license_key, machine_id, activated_at, expires_at, is_active, activation_count
    FROM activations
    WHERE license_key = ?1 AND machine_id = ?2
";

/// Activation table shared by every request handler.
///
/// Cloning shares the connection.
#[derive(Clone)]
pub struct ActivationStore {
    conn: Arc<Mutex<Connection>>,
}

impl ActivationStore {
    /// Opens (or creates) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path.as_ref())?;
        info!("opened activation store at {:?}", path.as_ref());
        Self::init(conn)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Activates `license_key` on `machine_id` without a limit check.
    ///
    /// A new pair expires `duration_days` from now. An existing pair is
    /// marked active again and its count incremented; its expiry is kept.
    pub fn activate(
        &self,
        license_key: &str,
        machine_id: &str,
        duration_days: i64,
    ) -> StoreResult<ActivationRecord> {
        let conn = self.conn();
        upsert(&conn, license_key, machine_id, duration_days, Utc::now())
    }

    /// Like [`activate`](Self::activate), but refuses a machine that is not
    /// already active once the license has `max_activations` active
    /// machines. Returns `None` when refused.
    pub fn activate_within_limit(
        &self,
        license_key: &str,
        machine_id: &str,
        duration_days: i64,
        max_activations: u32,
    ) -> StoreResult<Option<ActivationRecord>> {
        let conn = self.conn();
        let already_active = find(&conn, license_key, machine_id)?.is_some_and(|r| r.is_active);
        if !already_active && count_active(&conn, license_key)? >= max_activations {
            debug!("activation limit reached for license");
            return Ok(None);
        }
        upsert(&conn, license_key, machine_id, duration_days, Utc::now()).map(Some)
    }

    /// The activation, if it is active and unexpired now.
    pub fn validate(
        &self,
        license_key: &str,
        machine_id: &str,
    ) -> StoreResult<Option<ActivationRecord>> {
        self.validate_at(license_key, machine_id, Utc::now())
    }

    pub fn validate_at(
        &self,
        license_key: &str,
        machine_id: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<ActivationRecord>> {
        let record = find(&self.conn(), license_key, machine_id)?;
        Ok(record.filter(|r| r.is_current_at(now)))
    }

    /// Marks the pair inactive. True when the pair exists.
    pub fn deactivate(&self, license_key: &str, machine_id: &str) -> StoreResult<bool> {
        let affected = self.conn().execute(
            "UPDATE activations SET is_active = 0 WHERE license_key = ?1 AND machine_id = ?2",
            params![license_key, machine_id],
        )?;
        Ok(affected > 0)
    }

    /// Machines on which `license_key` is currently active.
    pub fn active_count(&self, license_key: &str) -> StoreResult<u32> {
        count_active(&self.conn(), license_key)
    }
}

fn upsert(
    conn: &Connection,
    license_key: &str,
    machine_id: &str,
    duration_days: i64,
    now: DateTime<Utc>,
) -> StoreResult<ActivationRecord> {
    let expires = Duration::try_days(duration_days)
        .and_then(|d| now.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    conn.execute(
        "INSERT INTO activations (license_key, machine_id, activated_at, expires_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(license_key, machine_id)
         DO UPDATE SET is_active = 1, activation_count = activation_count + 1",
        params![license_key, machine_id, now, expires],
    )?;
    let record = conn.query_row(SELECT_RECORD, params![license_key, machine_id], record_from_row)?;
    info!(
        "activation #{} for machine {}",
        record.activation_count, record.machine_id
    );
    Ok(record)
}

fn find(
    conn: &Connection,
    license_key: &str,
    machine_id: &str,
) -> StoreResult<Option<ActivationRecord>> {
    Ok(conn
        .query_row(SELECT_RECORD, params![license_key, machine_id], record_from_row)
        .optional()?)
}

fn count_active(conn: &Connection, license_key: &str) -> StoreResult<u32> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM activations WHERE license_key = ?1 AND is_active = 1",
        params![license_key],
        |row| row.get(0),
    )?)
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<ActivationRecord> {
    Ok(ActivationRecord {
        license_key: row.get(0)?,
        machine_id: row.get(1)?,
        activated_at: row.get(2)?,
        expires_at: row.get(3)?,
        is_active: row.get(4)?,
        activation_count: row.get(5)?,
    })
}
