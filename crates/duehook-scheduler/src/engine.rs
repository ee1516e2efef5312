//! The scheduling facade: owns the store handle, the timer registry, and
//! the clock task. Every gateway operation goes through here.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use duehook_core::{DuehookError, Result};
use duehook_store::ScheduleStore;

use crate::clock;
use crate::dispatch::DispatchContext;
use crate::filter::IdFilter;
use crate::hook::{AnnotatedHook, ScheduledHook};
use crate::registry::{TimerRegistry, TimerSnapshot};

/// What a bulk delete actually removed.
#[derive(Debug, Clone)]
pub struct BulkDeleteOutcome {
    pub count: usize,
    pub ids: Vec<String>,
}

/// The scheduler: delayed one-shot webhook delivery over a durable store.
///
/// Stateless per request; the store is the source of truth and the
/// registry mirrors it for armed timers. Construction spawns the clock
/// task, so it must happen inside a tokio runtime.
pub struct Scheduler {
    store: Arc<dyn ScheduleStore>,
    registry: Arc<TimerRegistry>,
    clock: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl Scheduler {
    /// Create a scheduler over `store` and start its clock.
    pub fn new(store: Arc<dyn ScheduleStore>, dispatch_timeout: Duration) -> Self {
        let registry = Arc::new(TimerRegistry::new());
        let ctx = DispatchContext {
            store: store.clone(),
            registry: registry.clone(),
            client: reqwest::Client::new(),
            timeout: dispatch_timeout,
        };
        let clock = clock::spawn_clock(ctx, registry.clone());
        Self {
            store,
            registry,
            clock: Mutex::new(Some(clock)),
        }
    }

    /// Persist a hook and arm its timer. Scheduling an existing id
    /// replaces its record and its timer; there is no conflict case.
    /// A past `fireAt` delivers immediately.
    pub fn schedule(&self, hook: ScheduledHook) -> Result<()> {
        hook.validate()?;
        let rearmed = self.registry.get(&hook.id).is_some();

        self.store.put(&hook.id, &hook.to_json()?)?;
        self.registry.upsert(&hook.id, hook.fire_at);

        if rearmed {
            tracing::info!("🔁 Hook '{}' rescheduled for {}", hook.id, hook.fire_at);
        } else {
            tracing::info!("📅 Hook '{}' scheduled for {}", hook.id, hook.fire_at);
        }
        Ok(())
    }

    /// Fetch the persisted record for `id`.
    pub fn get(&self, id: &str) -> Result<ScheduledHook> {
        match self.store.get(id)? {
            Some(raw) => ScheduledHook::from_json(&raw),
            None => Err(DuehookError::NotFound(id.to_string())),
        }
    }

    /// All persisted hooks matching `filter`, annotated with their armed
    /// fire time. Undecodable records are skipped with a warning.
    pub fn search(&self, filter: &IdFilter) -> Result<Vec<AnnotatedHook>> {
        let ids = filter.resolve_ids(self.store.as_ref())?;
        let mut hooks = Vec::with_capacity(ids.len());

        for id in ids {
            let Some(raw) = self.store.get(&id)? else {
                continue; // deleted mid-scan
            };
            match ScheduledHook::from_json(&raw) {
                Ok(hook) => hooks.push(AnnotatedHook {
                    next_fire: self.registry.get(&hook.id),
                    hook,
                }),
                Err(e) => tracing::warn!("⚠️ Skipping undecodable record '{}': {e}", id),
            }
        }
        Ok(hooks)
    }

    /// Delete one hook. `NotFound` when no record is persisted.
    pub fn delete(&self, id: &str) -> Result<()> {
        if !self.store.delete(id)? {
            return Err(DuehookError::NotFound(id.to_string()));
        }
        self.registry.cancel(id);
        tracing::info!("🗑️ Hook '{}' deleted", id);
        Ok(())
    }

    /// Delete every hook matching `filter`. One failed delete is logged
    /// and skipped, never aborting the rest.
    pub fn bulk_delete(&self, filter: &IdFilter) -> Result<BulkDeleteOutcome> {
        let ids = filter.resolve_ids(self.store.as_ref())?;
        let mut deleted = Vec::new();

        for id in ids {
            match self.store.delete(&id) {
                Ok(existed) => {
                    self.registry.cancel(&id);
                    if existed {
                        deleted.push(id);
                    }
                }
                Err(e) => tracing::warn!("⚠️ Failed to delete hook '{}': {e}", id),
            }
        }

        tracing::info!("🗑️ Bulk delete removed {} hook(s)", deleted.len());
        Ok(BulkDeleteOutcome { count: deleted.len(), ids: deleted })
    }

    /// Every timer armed in this process, earliest first. Right after boot
    /// this can briefly lag the persisted records until restore finishes.
    pub fn list_armed(&self) -> Vec<TimerSnapshot> {
        self.registry.snapshot()
    }

    /// Rebuild timers from the store. Fire times are taken verbatim, so
    /// hooks that came due while the process was down deliver immediately.
    /// Per-record failures are skipped; only the initial scan is fatal.
    pub fn restore(&self) -> Result<usize> {
        let ids = self.store.scan_ids("")?;
        let mut restored = 0;

        for id in ids {
            let raw = match self.store.get(&id) {
                Ok(Some(raw)) => raw,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!("⚠️ Skipping hook '{}' during restore: {e}", id);
                    continue;
                }
            };
            match ScheduledHook::from_json(&raw) {
                Ok(hook) => {
                    self.registry.upsert(&hook.id, hook.fire_at);
                    tracing::info!("♻️ Restored hook '{}' firing at {}", hook.id, hook.fire_at);
                    restored += 1;
                }
                Err(e) => tracing::warn!("⚠️ Skipping undecodable record '{}': {e}", id),
            }
        }
        Ok(restored)
    }

    /// Whether the store answers a ping. Used by the health endpoint.
    pub fn store_reachable(&self) -> bool {
        self.store.ping().is_ok()
    }

    /// Stop the clock. Already-spawned dispatch tasks run to completion;
    /// nothing new fires afterwards.
    pub fn shutdown(&self) {
        self.registry.close();
        let handle = self.clock.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(handle) = handle {
            handle.abort();
        }
        tracing::info!("⏹️ Scheduler stopped");
    }
}
