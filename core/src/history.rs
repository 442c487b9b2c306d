use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::db::Database;
use crate::error::Result;

/// Number of entries kept when nothing else is configured.
pub const DEFAULT_CAPACITY: usize = 2;

/// Switching needs two entries, so the store never keeps fewer.
pub const MIN_CAPACITY: usize = 2;

/// One recorded clipboard text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Source of entry timestamps
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Capacity-bounded, durable log of clipboard contents.
///
/// Cloning is cheap and every clone talks to the same database. Appends run
/// insert and eviction in one transaction while holding the connection, so
/// no reader ever sees more than `capacity` rows.
#[derive(Clone)]
pub struct HistoryStore {
    db: Arc<Database>,
    capacity: usize,
    clock: Arc<dyn Clock>,
}

impl HistoryStore {
    pub fn new(db: Arc<Database>, capacity: usize) -> Self {
        Self::with_clock(db, capacity, Arc::new(SystemClock))
    }

    pub fn with_clock(db: Arc<Database>, capacity: usize, clock: Arc<dyn Clock>) -> Self {
        if capacity < MIN_CAPACITY {
            warn!(
                "History capacity {} is below the minimum, using {}",
                capacity, MIN_CAPACITY
            );
        }
        Self {
            db,
            capacity: capacity.max(MIN_CAPACITY),
            clock,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Record `content` as the newest entry, evicting the oldest ones
    /// beyond capacity.
    pub fn append(&self, content: &str) -> Result<HistoryEntry> {
        let timestamp = self.clock.now();
        let mut conn = self.db.lock();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO history (content, timestamp) VALUES (?1, ?2)",
            params![content, timestamp],
        )?;
        let id = tx.last_insert_rowid();
        let evicted = tx.execute(
            "DELETE FROM history WHERE id NOT IN (
                SELECT id FROM history ORDER BY id DESC LIMIT ?1
            )",
            params![self.capacity as i64],
        )?;
        tx.commit()?;

        debug!("Stored history entry {} ({} chars, {} evicted)", id, content.chars().count(), evicted);
        Ok(HistoryEntry {
            id,
            content: content.to_string(),
            timestamp,
        })
    }

    /// Up to `k` most recent contents, newest first.
    pub fn latest(&self, k: usize) -> Result<Vec<String>> {
        let conn = self.db.lock();
        let mut stmt = conn.prepare("SELECT content FROM history ORDER BY id DESC LIMIT ?1")?;
        let rows = stmt.query_map(params![k as i64], |row| row.get(0))?;
        let mut items = Vec::new();
        for row in rows {
            items.push(row?);
        }
        Ok(items)
    }

    /// All retained entries, newest first.
    pub fn entries(&self) -> Result<Vec<HistoryEntry>> {
        let conn = self.db.lock();
        let mut stmt = conn.prepare("SELECT id, content, timestamp FROM history ORDER BY id DESC")?;
        let rows = stmt.query_map([], |row| {
            Ok(HistoryEntry {
                id: row.get(0)?,
                content: row.get(1)?,
                timestamp: row.get(2)?,
            })
        })?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }

    pub fn len(&self) -> Result<usize> {
        let conn = self.db.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM history", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn clear(&self) -> Result<()> {
        let conn = self.db.lock();
        conn.execute("DELETE FROM history", [])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn store(capacity: usize) -> HistoryStore {
        HistoryStore::new(Arc::new(Database::open_in_memory().unwrap()), capacity)
    }

    #[test]
    fn appending_three_keeps_the_last_two() {
        let history = store(2);
        for text in ["a", "b", "c"] {
            history.append(text).unwrap();
        }

        assert_eq!(history.latest(2).unwrap(), vec!["c", "b"]);
        assert_eq!(history.len().unwrap(), 2);
    }

    #[test]
    fn count_never_exceeds_capacity() {
        for capacity in 2..6 {
            let history = store(capacity);
            for i in 0..20 {
                history.append(&format!("item-{i}")).unwrap();
                assert!(history.len().unwrap() <= capacity);
            }
            let expected: Vec<String> = (20 - capacity..20).rev().map(|i| format!("item-{i}")).collect();
            assert_eq!(history.latest(capacity).unwrap(), expected);
        }
    }

    #[test]
    fn latest_returns_fewer_when_history_is_short() {
        let history = store(2);
        assert!(history.latest(2).unwrap().is_empty());

        history.append("only").unwrap();
        assert_eq!(history.latest(2).unwrap(), vec!["only"]);
    }

    #[test]
    fn ids_keep_increasing_after_eviction() {
        let history = store(2);
        let first = history.append("a").unwrap();
        history.append("b").unwrap();
        history.append("c").unwrap();
        let last = history.append("d").unwrap();

        assert!(last.id > first.id);
        let ids: Vec<i64> = history.entries().unwrap().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![last.id, last.id - 1]);
    }

    #[test]
    fn entries_carry_the_clock_timestamp() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        let history = HistoryStore::with_clock(
            Arc::new(Database::open_in_memory().unwrap()),
            2,
            Arc::new(FixedClock(at)),
        );

        let entry = history.append("stamped").unwrap();

        assert_eq!(entry.timestamp, at);
        assert_eq!(history.entries().unwrap(), vec![entry]);
    }

    #[test]
    fn capacity_below_two_is_raised() {
        assert_eq!(store(0).capacity(), MIN_CAPACITY);
        assert_eq!(store(1).capacity(), MIN_CAPACITY);
        assert_eq!(store(5).capacity(), 5);
    }

    #[test]
    fn clear_removes_everything() {
        let history = store(2);
        history.append("a").unwrap();
        history.clear().unwrap();

        assert!(history.is_empty().unwrap());
    }

    #[test]
    fn history_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clipboard_history.db");
        {
            let history = HistoryStore::new(Arc::new(Database::open(&path).unwrap()), 2);
            history.append("first").unwrap();
            history.append("second").unwrap();
        }

        let reopened = HistoryStore::new(Arc::new(Database::open(&path).unwrap()), 2);
        assert_eq!(reopened.latest(2).unwrap(), vec!["second", "first"]);
    }
}
