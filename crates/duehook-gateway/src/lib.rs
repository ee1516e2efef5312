//! # Duehook Gateway
//!
//! Axum HTTP API over the scheduling facade. Bearer-token auth guards
//! every route except `/health`; bodies are camelCase JSON.

pub mod routes;
pub mod server;

pub use server::{AppState, build_router, start};
