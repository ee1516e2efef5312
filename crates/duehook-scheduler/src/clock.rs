//! The scheduler clock: one task that sleeps until the earliest deadline
//! and hands each due timer to its own dispatch task.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::dispatch::{self, DispatchContext};
use crate::registry::TimerRegistry;

/// Upper bound on one wait; far-future deadlines re-check at most daily,
/// which also keeps the sleep well inside the tokio timer range.
const MAX_SLEEP: Duration = Duration::from_secs(24 * 60 * 60);

/// Spawn the clock loop. It wakes on the earliest deadline or whenever the
/// registry changes, and exits when the registry is closed.
pub fn spawn_clock(ctx: DispatchContext, registry: Arc<TimerRegistry>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!("⏰ Scheduler clock started");

        loop {
            if registry.is_closed() {
                break;
            }

            let (due, next) = registry.take_due(Utc::now());
            for timer in due {
                let ctx = ctx.clone();
                tokio::spawn(async move {
                    dispatch::run_dispatch(ctx, timer).await;
                });
            }

            let sleep_for = match next {
                Some(deadline) => {
                    let millis = (deadline - Utc::now()).num_milliseconds().max(0) as u64;
                    Duration::from_millis(millis).min(MAX_SLEEP)
                }
                None => MAX_SLEEP,
            };

            tokio::select! {
                _ = tokio::time::sleep(sleep_for) => {}
                _ = registry.notified() => {}
            }
        }

        tracing::info!("⏰ Scheduler clock stopped");
    })
}
