//! Single owned sqlite connection shared by the history and settings stores.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;
use tracing::{debug, warn};

use crate::error::{Error, Result};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS history (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        content TEXT NOT NULL,
        timestamp TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS settings (
        key_name TEXT PRIMARY KEY,
        key_value TEXT NOT NULL
    );
";

/// Database handle. Every store operation locks the connection for the
/// duration of one statement or transaction; the guard releases it on every
/// exit path.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) the database file, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| Error::StorageLocation {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        debug!("Opening history database at {}", path.display());
        Self::init(Connection::open(path)?)
    }

    /// Non-durable database for tests.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Connection> {
        match self.conn.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Database mutex poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}
