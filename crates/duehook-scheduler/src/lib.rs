//! # Duehook Scheduler
//!
//! Delayed one-shot webhook delivery. Callers persist a hook (payload +
//! URL + instant) under an id; when the instant arrives the payload is
//! POSTed once and the hook is cleaned up. Timers are rebuilt from the
//! store at startup, so a restart never loses scheduled work.
//!
//! ## Architecture
//! ```text
//! Scheduler (facade)
//!   ├── TimerRegistry: id → (fireAt, epoch) + min-heap of deadlines
//!   ├── clock task: sleeps to the earliest deadline, pops due timers
//!   │     └── per due timer → dispatch task
//!   │           ├── store re-check (record gone? skip delivery)
//!   │           ├── POST payload → webhookUrl (once, 2xx = success)
//!   │           └── store delete + registry complete
//!   ├── restore: store scan → re-arm every persisted hook (at boot)
//!   └── search / bulk delete: prefix scan or full-scan substring match
//! ```

pub mod clock;
pub mod dispatch;
pub mod engine;
pub mod filter;
pub mod hook;
pub mod registry;

pub use engine::{BulkDeleteOutcome, Scheduler};
pub use filter::IdFilter;
pub use hook::{AnnotatedHook, ScheduledHook};
pub use registry::{DueTimer, TimerRegistry, TimerSnapshot};
