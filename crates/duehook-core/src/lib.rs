//! # Duehook Core
//!
//! Shared configuration and error types for the duehook workspace.

pub mod config;
pub mod error;

pub use config::{DispatchConfig, DuehookConfig, GatewayConfig, StoreConfig};
pub use error::{DuehookError, Result};
