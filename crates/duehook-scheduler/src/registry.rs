//! Timer registry: the in-memory map of pending fire-times.
//!
//! One live entry per hook id, plus a min-heap of deadlines for the clock.
//! Heap entries are invalidated lazily: each arming gets a fresh epoch, and
//! a heap entry whose epoch no longer matches the map is dead. The single
//! lock is held only for map work, never across I/O.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Notify;

/// One armed timer, as seen by callers. Safe to serialize and hand out.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub id: String,
    pub fire_at: DateTime<Utc>,
}

/// A timer the clock has popped as due. The epoch ties the firing to the
/// exact arming it came from.
#[derive(Debug, Clone)]
pub struct DueTimer {
    pub id: String,
    pub epoch: u64,
}

struct TimerEntry {
    fire_at: DateTime<Utc>,
    epoch: u64,
}

#[derive(PartialEq, Eq, PartialOrd, Ord)]
struct HeapEntry {
    fire_at: DateTime<Utc>,
    id: String,
    epoch: u64,
}

struct RegistryState {
    entries: HashMap<String, TimerEntry>,
    deadlines: BinaryHeap<Reverse<HeapEntry>>,
    next_epoch: u64,
    closed: bool,
}

/// In-memory registry of armed timers.
pub struct TimerRegistry {
    state: Mutex<RegistryState>,
    wake: Notify,
}

impl TimerRegistry {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RegistryState {
                entries: HashMap::new(),
                deadlines: BinaryHeap::new(),
                next_epoch: 0,
                closed: false,
            }),
            wake: Notify::new(),
        }
    }

    // Every mutation is a single insert or remove, so a poisoned guard
    // still holds structurally consistent state.
    fn lock(&self) -> std::sync::MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Arm (or re-arm) the timer for `id`. A prior entry for the same id is
    /// replaced in the same lock acquisition; its heap entry decays by
    /// epoch mismatch. Past instants arm an immediately-due timer.
    pub fn upsert(&self, id: &str, fire_at: DateTime<Utc>) {
        {
            let mut state = self.lock();
            let epoch = state.next_epoch;
            state.next_epoch += 1;
            state.entries.insert(id.to_string(), TimerEntry { fire_at, epoch });
            state.deadlines.push(Reverse(HeapEntry {
                fire_at,
                id: id.to_string(),
                epoch,
            }));
        }
        self.wake.notify_one();
    }

    /// Disarm the timer for `id`. Absence is not an error.
    pub fn cancel(&self, id: &str) -> bool {
        self.lock().entries.remove(id).is_some()
    }

    /// Armed fire time for `id`, if any.
    pub fn get(&self, id: &str) -> Option<DateTime<Utc>> {
        self.lock().entries.get(id).map(|e| e.fire_at)
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Point-in-time copy of every armed timer, earliest first.
    pub fn snapshot(&self) -> Vec<TimerSnapshot> {
        let mut items: Vec<TimerSnapshot> = {
            let state = self.lock();
            state
                .entries
                .iter()
                .map(|(id, entry)| TimerSnapshot { id: id.clone(), fire_at: entry.fire_at })
                .collect()
        };
        items.sort_by(|a, b| a.fire_at.cmp(&b.fire_at).then_with(|| a.id.cmp(&b.id)));
        items
    }

    /// Pop every timer due at `now`, discarding stale heap entries along
    /// the way. Due entries stay in the map until [`complete`] so lookups
    /// still see in-flight hooks. Also returns the next pending deadline.
    ///
    /// [`complete`]: TimerRegistry::complete
    pub fn take_due(&self, now: DateTime<Utc>) -> (Vec<DueTimer>, Option<DateTime<Utc>>) {
        let mut guard = self.lock();
        let state = &mut *guard;
        let mut due = Vec::new();

        loop {
            let (live, is_due) = match state.deadlines.peek() {
                Some(Reverse(head)) => {
                    let live = state
                        .entries
                        .get(&head.id)
                        .is_some_and(|e| e.epoch == head.epoch);
                    (live, head.fire_at <= now)
                }
                None => break,
            };
            if !live {
                state.deadlines.pop();
                continue;
            }
            if !is_due {
                break;
            }
            if let Some(Reverse(head)) = state.deadlines.pop() {
                due.push(DueTimer { id: head.id, epoch: head.epoch });
            }
        }

        // The head may itself be stale; the resulting early wake just
        // re-runs this scan.
        let next = state.deadlines.peek().map(|Reverse(head)| head.fire_at);
        (due, next)
    }

    /// Remove the entry for `id` if it still belongs to the arming that
    /// produced `epoch`. A re-upsert that raced the firing keeps its entry.
    pub fn complete(&self, id: &str, epoch: u64) -> bool {
        let mut state = self.lock();
        if state.entries.get(id).is_some_and(|e| e.epoch == epoch) {
            state.entries.remove(id);
            true
        } else {
            false
        }
    }

    /// Flag the registry as shut down and wake the clock.
    pub fn close(&self) {
        self.lock().closed = true;
        self.wake.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Wait until the set of deadlines may have changed.
    pub async fn notified(&self) {
        self.wake.notified().await;
    }
}

impl Default for TimerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
