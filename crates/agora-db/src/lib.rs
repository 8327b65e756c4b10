//! SQLite storage for the Agora data model.
//!
//! Every query is a free function over an explicit `&Connection` so several
//! calls can share one transaction; the `Database` methods wrap them with
//! locking and, for multi-statement writes, an IMMEDIATE transaction.

pub mod config;
pub mod error;
pub mod migrations;
pub mod models;
pub mod queries;
mod timestamp;

use anyhow::Result;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::info;

pub use config::DbConfig;
pub use error::DbError;

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        Self::from_config(&DbConfig {
            path: path.to_path_buf(),
            ..DbConfig::default()
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn, &DbConfig::in_memory())
    }

    pub fn from_config(config: &DbConfig) -> Result<Self> {
        let conn = Connection::open(&config.path)?;
        Self::init(conn, config)
    }

    fn init(conn: Connection, config: &DbConfig) -> Result<Self> {
        // WAL mode for concurrent readers; in-memory databases report "memory"
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(config.busy_timeout)?;

        let applied = migrations::run(&conn)?;

        info!(
            "Database opened at {} (journal={}, {} migrations applied)",
            config.path.display(),
            mode,
            applied
        );
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| DbError::LockPoisoned(e.to_string()).into())
    }

    /// Run `f` against the connection in autocommit mode. Reads only.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Run a single-statement write in autocommit mode. Writes that touch
    /// more than one row set go through [`Database::with_tx`].
    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self.lock()?;
        f(&mut conn)
    }

    /// Run `f` inside an IMMEDIATE transaction. Commits when `f` returns
    /// `Ok`, rolls back on `Err`.
    pub fn with_tx<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}
