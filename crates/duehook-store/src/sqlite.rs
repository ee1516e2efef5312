//! SQLite-backed hook store.
//!
//! One `records` table keyed by the namespaced hook id. Survives restarts,
//! supports concurrent access via WAL.

use rusqlite::{Connection, params};
use std::path::Path;
use std::sync::Mutex;

use duehook_core::{DuehookError, Result};

use crate::{KEY_PREFIX, ScheduleStore, namespaced};

/// SQLite store: one row per scheduled hook.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create the store database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .map_err(|e| DuehookError::Store(format!("DB open: {e}")))?;

        // WAL mode for better concurrent read performance
        conn.execute_batch("PRAGMA journal_mode=WAL;").ok();

        let store = Self { conn: Mutex::new(conn) };
        store.migrate()?;
        Ok(store)
    }

    /// Open a fresh in-memory store (tests, ephemeral runs).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| DuehookError::Store(format!("DB open: {e}")))?;
        let store = Self { conn: Mutex::new(conn) };
        store.migrate()?;
        Ok(store)
    }

    /// Run schema migrations.
    fn migrate(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS records (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )
        .map_err(|e| DuehookError::Store(format!("Migration: {e}")))?;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| DuehookError::Store(format!("Lock: {e}")))
    }
}

/// Escape LIKE metacharacters so a key prefix matches literally.
/// Hook ids routinely contain `_`, which LIKE treats as a wildcard.
fn escape_like(prefix: &str) -> String {
    prefix
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

impl ScheduleStore for SqliteStore {
    fn put(&self, id: &str, value: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO records (key, value) VALUES (?1, ?2)",
            params![namespaced(id), value],
        )
        .map_err(|e| DuehookError::Store(format!("Put record: {e}")))?;
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<String>> {
        let conn = self.lock()?;
        match conn.query_row(
            "SELECT value FROM records WHERE key = ?1",
            params![namespaced(id)],
            |row| row.get::<_, String>(0),
        ) {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(DuehookError::Store(format!("Get record: {e}"))),
        }
    }

    fn delete(&self, id: &str) -> Result<bool> {
        let conn = self.lock()?;
        let affected = conn
            .execute("DELETE FROM records WHERE key = ?1", params![namespaced(id)])
            .map_err(|e| DuehookError::Store(format!("Delete record: {e}")))?;
        Ok(affected > 0)
    }

    fn scan_ids(&self, prefix: &str) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let pattern = format!("{}%", escape_like(&namespaced(prefix)));
        let mut stmt = conn
            .prepare("SELECT key FROM records WHERE key LIKE ?1 ESCAPE '\\' ORDER BY key")
            .map_err(|e| DuehookError::Store(format!("Prepare: {e}")))?;

        let ids = stmt
            .query_map(params![pattern], |row| row.get::<_, String>(0))
            .map_err(|e| DuehookError::Store(format!("Query: {e}")))?
            .filter_map(|r| r.ok())
            .filter_map(|key| key.strip_prefix(KEY_PREFIX).map(String::from))
            .collect();

        Ok(ids)
    }

    fn ping(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .map_err(|e| DuehookError::Store(format!("Ping: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> SqliteStore {
        SqliteStore::open_in_memory().unwrap()
    }

    #[test]
    fn test_put_get_delete() {
        let store = temp_store();

        assert!(store.get("acc1_2h").unwrap().is_none());

        store.put("acc1_2h", r#"{"id":"acc1_2h"}"#).unwrap();
        assert_eq!(
            store.get("acc1_2h").unwrap().as_deref(),
            Some(r#"{"id":"acc1_2h"}"#)
        );

        assert!(store.delete("acc1_2h").unwrap());
        assert!(store.get("acc1_2h").unwrap().is_none());
    }

    #[test]
    fn test_put_replaces() {
        let store = temp_store();
        store.put("x1", "v1").unwrap();
        store.put("x1", "v2").unwrap();
        assert_eq!(store.get("x1").unwrap().as_deref(), Some("v2"));
        assert_eq!(store.scan_ids("").unwrap().len(), 1);
    }

    #[test]
    fn test_delete_missing_returns_false() {
        let store = temp_store();
        assert!(!store.delete("ghost").unwrap());
    }

    #[test]
    fn test_scan_prefix() {
        let store = temp_store();
        store.put("acc1_2h", "a").unwrap();
        store.put("acc1_12h", "b").unwrap();
        store.put("acc2_2h", "c").unwrap();

        let ids = store.scan_ids("acc1_").unwrap();
        assert_eq!(ids, vec!["acc1_12h", "acc1_2h"]);

        let all = store.scan_ids("").unwrap();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_scan_underscore_is_literal() {
        let store = temp_store();
        store.put("acc1_2h", "a").unwrap();
        store.put("acc1x2h", "b").unwrap();

        // An unescaped LIKE would treat `_` as "any one char" and match both.
        let ids = store.scan_ids("acc1_").unwrap();
        assert_eq!(ids, vec!["acc1_2h"]);
    }

    #[test]
    fn test_scan_percent_is_literal() {
        let store = temp_store();
        store.put("a%b", "a").unwrap();
        store.put("axb", "b").unwrap();

        let ids = store.scan_ids("a%").unwrap();
        assert_eq!(ids, vec!["a%b"]);
    }

    #[test]
    fn test_ping() {
        let store = temp_store();
        store.ping().unwrap();
    }

    #[test]
    fn test_open_file_backed() {
        let dir = std::env::temp_dir().join("duehook-store-test");
        std::fs::create_dir_all(&dir).ok();
        let path = dir.join("hooks.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.put("persist_me", "v").unwrap();
        }
        {
            let store = SqliteStore::open(&path).unwrap();
            assert_eq!(store.get("persist_me").unwrap().as_deref(), Some("v"));
        }

        std::fs::remove_dir_all(&dir).ok();
    }
}
