//! Hook definitions: the core data model for deferred webhook delivery.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use duehook_core::{DuehookError, Result};

/// A scheduled one-shot webhook delivery.
///
/// Serialized as camelCase JSON, both on the wire and in the store.
/// `fireAt` accepts any RFC 3339 offset on input and is held as UTC.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledHook {
    /// Caller-assigned unique id. Replacing an id replaces its schedule.
    pub id: String,
    /// Instant at which the payload is delivered.
    pub fire_at: DateTime<Utc>,
    /// Opaque payload, POSTed unmodified as the request body.
    pub payload: serde_json::Value,
    /// Destination URL for the POST.
    pub webhook_url: String,
}

impl ScheduledHook {
    /// Create a new hook. Fails on an empty id or URL.
    pub fn new(
        id: impl Into<String>,
        fire_at: DateTime<Utc>,
        payload: serde_json::Value,
        webhook_url: impl Into<String>,
    ) -> Result<Self> {
        let hook = Self {
            id: id.into(),
            fire_at,
            payload,
            webhook_url: webhook_url.into(),
        };
        hook.validate()?;
        Ok(hook)
    }

    /// Check the fields a schedule call requires.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(DuehookError::InvalidArgument("hook id must not be empty".into()));
        }
        if self.webhook_url.trim().is_empty() {
            return Err(DuehookError::InvalidArgument("webhookUrl must not be empty".into()));
        }
        Ok(())
    }

    /// Serialize for storage.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode a stored record.
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// A stored hook annotated with its armed fire time in this process.
///
/// `nextFire` is absent when the record is persisted but not (or not yet)
/// armed: right after a restore begins, or on a record written by
/// another instance.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotatedHook {
    #[serde(flatten)]
    pub hook: ScheduledHook,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_fire: Option<DateTime<Utc>>,
}
