//! SQLite-backed session store.

use super::store::SessionStore;
use crate::error::{ResolveError, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Session store on a single SQLite database.
///
/// Thread-safe via internal mutex on the connection. Expiry times are stored
/// as Unix milliseconds.
pub struct SqliteSessionStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteSessionStore {
    /// Open (or create) a store at the given path.
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| ResolveError::Storage {
                    message: format!(
                        "Failed to create session store directory {}: {}",
                        parent.display(),
                        e
                    ),
                })?;
            }
        }

        let conn = Connection::open(db_path).map_err(|e| ResolveError::Storage {
            message: format!("Failed to open session store: {}", e),
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(|e| ResolveError::Storage {
                message: format!("Failed to set pragmas: {}", e),
            })?;

        Self::with_connection(conn)
    }

    /// A store that lives only as long as this value.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS session_entries (
                key TEXT PRIMARY KEY,
                value BLOB NOT NULL,
                expires_at_ms INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_session_expires
                ON session_entries(expires_at_ms);
            "#,
        )
        .map_err(|e| ResolveError::Storage {
            message: format!("Failed to initialize session schema: {}", e),
        })?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| ResolveError::Storage {
            message: format!("Failed to lock session store: {}", e),
        })
    }
}

impl SessionStore for SqliteSessionStore {
    fn get(&self, key: &str, now: DateTime<Utc>) -> Result<Option<Vec<u8>>> {
        let conn = self.lock()?;
        let value = conn
            .query_row(
                "SELECT value FROM session_entries WHERE key = ?1 AND expires_at_ms > ?2",
                params![key, now.timestamp_millis()],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn put(&self, key: &str, value: &[u8], expires_at: DateTime<Utc>) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO session_entries (key, value, expires_at_ms)
            VALUES (?1, ?2, ?3)
            "#,
            params![key, value, expires_at.timestamp_millis()],
        )
        .map_err(|e| ResolveError::Storage {
            message: format!("Failed to write session entry {}: {}", key, e),
        })?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        let conn = self.lock()?;
        let deleted = conn.execute("DELETE FROM session_entries WHERE key = ?1", params![key])?;
        Ok(deleted > 0)
    }

    fn clear_prefix(&self, prefix: &str) -> Result<usize> {
        let conn = self.lock()?;
        // substr avoids LIKE wildcards in the prefix
        let deleted = conn.execute(
            "DELETE FROM session_entries WHERE substr(key, 1, length(?1)) = ?1",
            params![prefix],
        )?;
        debug!("Cleared {} session entries under '{}'", deleted, prefix);
        Ok(deleted)
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM session_entries WHERE expires_at_ms <= ?1",
            params![now.timestamp_millis()],
        )?;
        if deleted > 0 {
            debug!("Purged {} expired session entries", deleted);
        }
        Ok(deleted)
    }

    fn len(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM session_entries", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn later(now: DateTime<Utc>, secs: i64) -> DateTime<Utc> {
        now + chrono::Duration::seconds(secs)
    }

    #[test]
    fn test_put_and_get() {
        let store = SqliteSessionStore::in_memory().unwrap();
        let now = Utc::now();

        store.put("refresolve:resolved:unit:102", b"data", later(now, 60)).unwrap();

        let value = store.get("refresolve:resolved:unit:102", now).unwrap();
        assert_eq!(value, Some(b"data".to_vec()));
        assert_eq!(store.get("missing", now).unwrap(), None);
    }

    #[test]
    fn test_expired_values_are_hidden() {
        let store = SqliteSessionStore::in_memory().unwrap();
        let now = Utc::now();

        store.put("k", b"v", later(now, 5)).unwrap();

        assert!(store.get("k", later(now, 4)).unwrap().is_some());
        assert!(store.get("k", later(now, 5)).unwrap().is_none());

        assert_eq!(store.purge_expired(later(now, 6)).unwrap(), 1);
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_overwrite() {
        let store = SqliteSessionStore::in_memory().unwrap();
        let now = Utc::now();

        store.put("k", b"old", later(now, 60)).unwrap();
        store.put("k", b"new", later(now, 60)).unwrap();

        assert_eq!(store.get("k", now).unwrap(), Some(b"new".to_vec()));
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_remove_and_clear_prefix() {
        let store = SqliteSessionStore::in_memory().unwrap();
        let expires = later(Utc::now(), 60);

        store.put("a:1", b"1", expires).unwrap();
        store.put("a:2", b"2", expires).unwrap();
        store.put("a_3", b"3", expires).unwrap();
        store.put("b:1", b"4", expires).unwrap();

        assert!(store.remove("a:1").unwrap());
        assert!(!store.remove("a:1").unwrap());

        // '_' must not act as a wildcard
        assert_eq!(store.clear_prefix("a:").unwrap(), 1);
        assert_eq!(store.len().unwrap(), 2);
    }

    #[test]
    fn test_persists_across_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("session").join("cache.sqlite");
        let now = Utc::now();

        {
            let store = SqliteSessionStore::open(&db_path).unwrap();
            store.put("k", b"v", later(now, 60)).unwrap();
        }

        let store = SqliteSessionStore::open(&db_path).unwrap();
        assert_eq!(store.get("k", now).unwrap(), Some(b"v".to_vec()));
    }
}
