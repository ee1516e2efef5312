//! # Duehook Store
//!
//! Durable key-value storage for scheduled hooks. The store is the single
//! source of truth for "what should eventually fire": the scheduler's
//! in-memory timers are rebuilt from it at startup.
//!
//! Records are stored under a fixed `hook:` namespace prefix. The prefix is
//! applied and stripped inside each adapter; callers only ever see plain
//! hook ids.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use duehook_core::Result;

/// Namespace shared by every persisted hook record.
pub(crate) const KEY_PREFIX: &str = "hook:";

pub(crate) fn namespaced(id: &str) -> String {
    format!("{KEY_PREFIX}{id}")
}

/// Durable storage for scheduled hook records.
///
/// Implementations are local, fast stores called inline from async code;
/// methods must not block beyond a single key operation. All methods take
/// plain hook ids; namespacing is internal. Values are opaque strings
/// (the scheduler stores serialized JSON records).
pub trait ScheduleStore: Send + Sync {
    /// Insert or replace the record for `id`.
    fn put(&self, id: &str, value: &str) -> Result<()>;

    /// Fetch the record for `id`, if any.
    fn get(&self, id: &str) -> Result<Option<String>>;

    /// Remove the record for `id`. Returns whether a record existed.
    fn delete(&self, id: &str) -> Result<bool>;

    /// All ids starting with `prefix`, sorted. An empty prefix returns
    /// every id.
    fn scan_ids(&self, prefix: &str) -> Result<Vec<String>>;

    /// Connectivity probe for health checks. Never mutates state.
    fn ping(&self) -> Result<()>;
}
