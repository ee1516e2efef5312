//! HTTP server implementation using Axum.

use axum::{
    Router,
    extract::State,
    routing::{get, post},
};
use duehook_core::config::GatewayConfig;
use duehook_scheduler::Scheduler;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared state for the gateway server.
#[derive(Clone)]
pub struct AppState {
    /// The scheduling facade. Every route delegates to it.
    pub scheduler: Arc<Scheduler>,
    /// Expected bearer token. `None` disables auth.
    pub api_token: Option<String>,
}

/// Bearer token auth middleware. Validates the `Authorization` header.
async fn require_token(
    State(state): State<Arc<AppState>>,
    req: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> axum::response::Response {
    // If no token configured, allow all
    let Some(expected) = &state.api_token else {
        return next.run(req).await;
    };

    let presented = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or("");
    if presented == expected {
        return next.run(req).await;
    }

    axum::response::Response::builder()
        .status(axum::http::StatusCode::UNAUTHORIZED)
        .header("Content-Type", "application/json")
        .body(axum::body::Body::from(
            serde_json::json!({"ok": false, "error": "Unauthorized: invalid or missing bearer token"})
                .to_string(),
        ))
        .unwrap()
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    build_router_from_arc(Arc::new(state))
}

pub fn build_router_from_arc(shared: Arc<AppState>) -> Router {
    // Protected routes: require a valid bearer token
    let protected = Router::new()
        .route("/hooks", post(super::routes::schedule_hook))
        .route("/hooks", get(super::routes::list_hooks))
        .route("/hooks/search", get(super::routes::search_hooks))
        .route(
            "/hooks/bulk",
            axum::routing::delete(super::routes::bulk_delete_hooks),
        )
        .route("/hooks/{id}", get(super::routes::get_hook))
        .route(
            "/hooks/{id}",
            axum::routing::delete(super::routes::delete_hook),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            shared.clone(),
            require_token,
        ));

    // Public routes: no auth
    let public = Router::new().route("/health", get(super::routes::health_check));

    protected
        .merge(public)
        .layer({
            let cors = CorsLayer::new()
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::DELETE,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers(Any)
                .max_age(std::time::Duration::from_secs(3600));

            // Restrict CORS origins in production via env var
            // Example: DUEHOOK_CORS_ORIGINS=https://ops.example.com
            if let Ok(origins_str) = std::env::var("DUEHOOK_CORS_ORIGINS") {
                let origins: Vec<_> = origins_str
                    .split(',')
                    .filter_map(|s| s.trim().parse::<axum::http::HeaderValue>().ok())
                    .collect();
                cors.allow_origin(origins)
            } else {
                // Development fallback: allow all origins
                cors.allow_origin(Any)
            }
        })
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}

/// Start the HTTP server. Re-arms persisted hooks, then serves until the
/// process exits.
pub async fn start(
    config: &GatewayConfig,
    scheduler: Arc<Scheduler>,
    api_token: Option<String>,
) -> anyhow::Result<()> {
    // Rebuild timers from the store before accepting traffic
    match scheduler.restore() {
        Ok(count) => {
            if count > 0 {
                tracing::info!("♻️ Restored {} scheduled hook(s) from the store", count);
            }
        }
        Err(e) => {
            tracing::error!("❌ Restore failed, starting with an empty schedule: {e}");
        }
    }

    if api_token.is_none() {
        tracing::warn!("⚠️ No API token configured: every request is accepted");
    }

    let state = AppState {
        scheduler,
        api_token,
    };
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("🌐 Gateway listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
