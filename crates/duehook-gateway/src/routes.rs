//! API route handlers for the gateway.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use std::sync::Arc;

use duehook_core::DuehookError;
use duehook_scheduler::{IdFilter, ScheduledHook};

use super::server::AppState;

/// What a handler can fail with, mapped onto a status code and the
/// `{"ok": false, "error": ...}` body shape.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal,
}

impl From<DuehookError> for ApiError {
    fn from(err: DuehookError) -> Self {
        match err {
            DuehookError::NotFound(_) => Self::NotFound(err.to_string()),
            DuehookError::InvalidArgument(_) => Self::BadRequest(err.to_string()),
            // Store and decode failures stay server-side; callers get a
            // generic message.
            other => {
                tracing::error!("❌ Request failed: {other}");
                Self::Internal
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string()),
        };
        (status, Json(serde_json::json!({"ok": false, "error": message}))).into_response()
    }
}

/// Query parameters shared by search and bulk delete.
#[derive(Debug, Deserialize)]
pub struct FilterParams {
    pub prefix: Option<String>,
    pub contains: Option<String>,
}

impl From<FilterParams> for IdFilter {
    fn from(params: FilterParams) -> Self {
        IdFilter {
            prefix: params.prefix,
            contains: params.contains,
        }
    }
}

/// Health check endpoint.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let store_reachable = state.scheduler.store_reachable();
    Json(serde_json::json!({
        "status": if store_reachable { "ok" } else { "degraded" },
        "service": "duehook-gateway",
        "version": env!("CARGO_PKG_VERSION"),
        "storeReachable": store_reachable,
    }))
}

/// Schedule a hook: persist it and arm its timer. Re-posting an existing
/// id replaces its schedule.
pub async fn schedule_hook(
    State(state): State<Arc<AppState>>,
    Json(req): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = req
        .get("id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ApiError::BadRequest("missing field: id".into()))?;
    let fire_at = req
        .get("fireAt")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ApiError::BadRequest("missing field: fireAt".into()))?
        .parse::<chrono::DateTime<chrono::Utc>>()
        .map_err(|e| ApiError::BadRequest(format!("invalid fireAt timestamp: {e}")))?;
    let webhook_url = req
        .get("webhookUrl")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ApiError::BadRequest("missing field: webhookUrl".into()))?;
    let payload = req
        .get("payload")
        .cloned()
        .ok_or_else(|| ApiError::BadRequest("missing field: payload".into()))?;

    let hook = ScheduledHook::new(id, fire_at, payload, webhook_url)?;
    state.scheduler.schedule(hook)?;

    Ok(Json(serde_json::json!({"status": "scheduled", "id": id})))
}

/// List every timer armed in this process, earliest first.
pub async fn list_hooks(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let scheduled = state.scheduler.list_armed();
    Json(serde_json::json!({"count": scheduled.len(), "scheduled": scheduled}))
}

/// Search persisted hooks by id prefix and/or substring.
pub async fn search_hooks(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FilterParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let hooks = state.scheduler.search(&params.into())?;
    Ok(Json(serde_json::json!({"count": hooks.len(), "hooks": hooks})))
}

/// Fetch one persisted hook by id.
pub async fn get_hook(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ScheduledHook>, ApiError> {
    Ok(Json(state.scheduler.get(&id)?))
}

/// Delete one hook and cancel its timer.
pub async fn delete_hook(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.scheduler.delete(&id)?;
    Ok(Json(serde_json::json!({"status": "deleted", "id": id})))
}

/// Delete every hook matching the filter, reporting what was removed.
pub async fn bulk_delete_hooks(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FilterParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let outcome = state.scheduler.bulk_delete(&params.into())?;
    Ok(Json(serde_json::json!({"deleted": outcome.count, "ids": outcome.ids})))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::AppState;
    use chrono::{DateTime, Duration as ChronoDuration, Utc};
    use duehook_core::Result;
    use duehook_scheduler::Scheduler;
    use duehook_store::{MemoryStore, ScheduleStore};
    use serde_json::json;
    use std::time::Duration;

    fn test_state() -> State<Arc<AppState>> {
        let store = Arc::new(MemoryStore::new());
        let scheduler = Arc::new(Scheduler::new(store, Duration::from_secs(5)));
        State(Arc::new(AppState {
            scheduler,
            api_token: None,
        }))
    }

    fn schedule_body(id: &str, fire_at: DateTime<Utc>) -> Json<serde_json::Value> {
        Json(json!({
            "id": id,
            "fireAt": fire_at.to_rfc3339(),
            "payload": {"kind": "reminder"},
            "webhookUrl": "https://example.com/hook",
        }))
    }

    fn filters(prefix: Option<&str>, contains: Option<&str>) -> Query<FilterParams> {
        Query(FilterParams {
            prefix: prefix.map(String::from),
            contains: contains.map(String::from),
        })
    }

    // ---- Health ----

    #[tokio::test]
    async fn test_health_check() {
        let result = health_check(test_state()).await;
        let json = result.0;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["storeReachable"], true);
    }

    /// Store double whose ping always fails.
    struct DownStore;

    impl ScheduleStore for DownStore {
        fn put(&self, _id: &str, _value: &str) -> Result<()> {
            Err(DuehookError::Store("down".into()))
        }
        fn get(&self, _id: &str) -> Result<Option<String>> {
            Err(DuehookError::Store("down".into()))
        }
        fn delete(&self, _id: &str) -> Result<bool> {
            Err(DuehookError::Store("down".into()))
        }
        fn scan_ids(&self, _prefix: &str) -> Result<Vec<String>> {
            Err(DuehookError::Store("down".into()))
        }
        fn ping(&self) -> Result<()> {
            Err(DuehookError::Store("down".into()))
        }
    }

    fn down_state() -> State<Arc<AppState>> {
        let scheduler = Arc::new(Scheduler::new(Arc::new(DownStore), Duration::from_secs(5)));
        State(Arc::new(AppState {
            scheduler,
            api_token: None,
        }))
    }

    #[tokio::test]
    async fn test_health_check_degraded_when_store_is_down() {
        let result = health_check(down_state()).await;
        let json = result.0;
        assert_eq!(json["status"], "degraded");
        assert_eq!(json["storeReachable"], false);
    }

    #[tokio::test]
    async fn test_store_errors_surface_as_internal() {
        let err = search_hooks(down_state(), filters(Some("acc"), None))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Internal));
    }

    // ---- Schedule ----

    #[tokio::test]
    async fn test_schedule_hook() {
        let state = test_state();
        let at = Utc::now() + ChronoDuration::hours(2);

        let result = schedule_hook(state.clone(), schedule_body("acc1_2h", at))
            .await
            .unwrap();
        assert_eq!(result.0["status"], "scheduled");
        assert_eq!(result.0["id"], "acc1_2h");

        let listed = list_hooks(state).await;
        assert_eq!(listed.0["count"], 1);
        assert_eq!(listed.0["scheduled"][0]["id"], "acc1_2h");
    }

    #[tokio::test]
    async fn test_schedule_requires_id() {
        let body = Json(json!({
            "fireAt": "2026-09-01T10:00:00Z",
            "payload": {},
            "webhookUrl": "https://example.com/hook",
        }));
        let err = schedule_hook(test_state(), body).await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_schedule_rejects_bad_timestamp() {
        let body = Json(json!({
            "id": "x",
            "fireAt": "tomorrow-ish",
            "payload": {},
            "webhookUrl": "https://example.com/hook",
        }));
        let err = schedule_hook(test_state(), body).await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_schedule_rejects_empty_webhook_url() {
        let body = Json(json!({
            "id": "x",
            "fireAt": "2026-09-01T10:00:00Z",
            "payload": {},
            "webhookUrl": "",
        }));
        let err = schedule_hook(test_state(), body).await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_schedule_normalizes_offset_timestamps() {
        let state = test_state();
        let body = Json(json!({
            "id": "tz",
            "fireAt": "2026-09-01T17:00:00+07:00",
            "payload": {},
            "webhookUrl": "https://example.com/hook",
        }));
        schedule_hook(state.clone(), body).await.unwrap();

        let fetched = get_hook(state, Path("tz".into())).await.unwrap();
        let expected: DateTime<Utc> = "2026-09-01T10:00:00Z".parse().unwrap();
        assert_eq!(fetched.0.fire_at, expected);
    }

    #[tokio::test]
    async fn test_reschedule_replaces_the_timer() {
        let state = test_state();
        let first = Utc::now() + ChronoDuration::hours(1);
        let second = Utc::now() + ChronoDuration::hours(3);

        schedule_hook(state.clone(), schedule_body("h1", first)).await.unwrap();
        schedule_hook(state.clone(), schedule_body("h1", second)).await.unwrap();

        let listed = list_hooks(state).await;
        assert_eq!(listed.0["count"], 1);
        let armed: DateTime<Utc> = listed.0["scheduled"][0]["fireAt"]
            .as_str()
            .unwrap()
            .parse()
            .unwrap();
        assert_eq!(armed, second);
    }

    // ---- List & Get ----

    #[tokio::test]
    async fn test_list_hooks_empty() {
        let listed = list_hooks(test_state()).await;
        assert_eq!(listed.0["count"], 0);
        assert_eq!(listed.0["scheduled"], json!([]));
    }

    #[tokio::test]
    async fn test_get_hook_roundtrip() {
        let state = test_state();
        let at = Utc::now() + ChronoDuration::hours(2);
        schedule_hook(state.clone(), schedule_body("g1", at)).await.unwrap();

        let fetched = get_hook(state, Path("g1".into())).await.unwrap();
        assert_eq!(fetched.0.id, "g1");
        assert_eq!(fetched.0.payload, json!({"kind": "reminder"}));
        assert_eq!(fetched.0.webhook_url, "https://example.com/hook");
    }

    #[tokio::test]
    async fn test_get_missing_hook_is_not_found() {
        let err = get_hook(test_state(), Path("nope".into())).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    // ---- Search ----

    #[tokio::test]
    async fn test_search_by_prefix() {
        let state = test_state();
        let at = Utc::now() + ChronoDuration::hours(1);
        for id in ["acc1_2h", "acc1_12h", "acc2_2h"] {
            schedule_hook(state.clone(), schedule_body(id, at)).await.unwrap();
        }

        let found = search_hooks(state, filters(Some("acc1_"), None)).await.unwrap();
        assert_eq!(found.0["count"], 2);
        let ids: Vec<&str> = found.0["hooks"]
            .as_array()
            .unwrap()
            .iter()
            .map(|h| h["id"].as_str().unwrap())
            .collect();
        assert!(ids.contains(&"acc1_2h") && ids.contains(&"acc1_12h"));
    }

    #[tokio::test]
    async fn test_search_by_contains() {
        let state = test_state();
        let at = Utc::now() + ChronoDuration::hours(1);
        for id in ["acc1_2h", "acc1_12h", "acc2_2h"] {
            schedule_hook(state.clone(), schedule_body(id, at)).await.unwrap();
        }

        let found = search_hooks(state, filters(None, Some("_2h"))).await.unwrap();
        assert_eq!(found.0["count"], 2);
    }

    #[tokio::test]
    async fn test_search_annotates_next_fire() {
        let state = test_state();
        let at = Utc::now() + ChronoDuration::hours(1);
        schedule_hook(state.clone(), schedule_body("n1", at)).await.unwrap();

        let found = search_hooks(state, filters(Some("n1"), None)).await.unwrap();
        let next_fire: DateTime<Utc> = found.0["hooks"][0]["nextFire"]
            .as_str()
            .unwrap()
            .parse()
            .unwrap();
        assert_eq!(next_fire, at);
    }

    #[tokio::test]
    async fn test_search_requires_a_filter() {
        let err = search_hooks(test_state(), filters(None, None)).await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    // ---- Delete ----

    #[tokio::test]
    async fn test_delete_hook() {
        let state = test_state();
        let at = Utc::now() + ChronoDuration::hours(1);
        schedule_hook(state.clone(), schedule_body("d1", at)).await.unwrap();

        let result = delete_hook(state.clone(), Path("d1".into())).await.unwrap();
        assert_eq!(result.0["status"], "deleted");
        assert_eq!(result.0["id"], "d1");

        let err = get_hook(state, Path("d1".into())).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_missing_hook_is_not_found() {
        let err = delete_hook(test_state(), Path("nope".into())).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_bulk_delete_by_prefix() {
        let state = test_state();
        let at = Utc::now() + ChronoDuration::hours(1);
        for id in ["acc1_2h", "acc1_12h", "acc2_2h"] {
            schedule_hook(state.clone(), schedule_body(id, at)).await.unwrap();
        }

        let result = bulk_delete_hooks(state.clone(), filters(Some("acc1_"), None))
            .await
            .unwrap();
        assert_eq!(result.0["deleted"], 2);

        let listed = list_hooks(state).await;
        assert_eq!(listed.0["count"], 1);
        assert_eq!(listed.0["scheduled"][0]["id"], "acc2_2h");
    }

    #[tokio::test]
    async fn test_bulk_delete_requires_a_filter() {
        let err = bulk_delete_hooks(test_state(), filters(None, None))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    // ---- Error mapping ----

    #[tokio::test]
    async fn test_error_response_shapes() {
        let resp = ApiError::BadRequest("bad input".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["ok"], false);
        assert_eq!(body["error"], "bad input");

        let resp = ApiError::NotFound("gone".into()).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = ApiError::Internal.into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "internal error");
    }
}
