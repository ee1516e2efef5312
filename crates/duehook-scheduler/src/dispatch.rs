//! One-shot dispatch: fire the webhook for a due timer, then clean up.

use std::sync::Arc;
use std::time::Duration;

use duehook_core::{DuehookError, Result};
use duehook_store::ScheduleStore;

use crate::hook::ScheduledHook;
use crate::registry::{DueTimer, TimerRegistry};

/// Everything a dispatch task needs; cloned once per firing.
#[derive(Clone)]
pub struct DispatchContext {
    pub store: Arc<dyn ScheduleStore>,
    pub registry: Arc<TimerRegistry>,
    pub client: reqwest::Client,
    pub timeout: Duration,
}

/// Fire one due timer.
///
/// The record is re-checked first; a delete may have raced the firing, in
/// which case nothing is delivered. Delivery is attempted exactly once and
/// never retried. Cleanup runs regardless of the outcome: the store record
/// is removed unconditionally, the registry entry only if it still belongs
/// to this arming (a re-upsert in flight keeps its fresh timer).
pub async fn run_dispatch(ctx: DispatchContext, timer: DueTimer) {
    match ctx.store.get(&timer.id) {
        Ok(Some(raw)) => match ScheduledHook::from_json(&raw) {
            Ok(hook) => {
                if let Err(e) = deliver(&ctx, &hook).await {
                    tracing::warn!("⚠️ {e}");
                }
            }
            Err(e) => {
                tracing::warn!("⚠️ Undecodable record for hook '{}': {e}", timer.id);
            }
        },
        Ok(None) => {
            tracing::debug!("⏭️ Hook '{}' gone before firing, nothing to deliver", timer.id);
        }
        Err(e) => {
            tracing::warn!("⚠️ Store check failed for hook '{}': {e}", timer.id);
        }
    }

    // One attempt only, so the record goes away whatever happened above.
    if let Err(e) = ctx.store.delete(&timer.id) {
        tracing::warn!("⚠️ Failed to delete record for hook '{}': {e}", timer.id);
    }
    ctx.registry.complete(&timer.id, timer.epoch);
}

/// POST the payload to the hook's URL. Success is any 2xx status.
async fn deliver(ctx: &DispatchContext, hook: &ScheduledHook) -> Result<()> {
    tracing::info!("🌐 Firing hook '{}' → {}", hook.id, hook.webhook_url);

    let resp = ctx
        .client
        .post(&hook.webhook_url)
        .json(&hook.payload)
        .timeout(ctx.timeout)
        .send()
        .await
        .map_err(|e| DuehookError::Delivery(format!("hook '{}': {e}", hook.id)))?;

    if resp.status().is_success() {
        tracing::info!("✅ Hook '{}' delivered ({})", hook.id, resp.status());
        Ok(())
    } else {
        Err(DuehookError::Delivery(format!(
            "hook '{}': status {}",
            hook.id,
            resp.status()
        )))
    }
}
