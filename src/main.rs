//! # Duehook: delayed one-shot webhook delivery
//!
//! Persists scheduled hooks in SQLite, arms in-memory timers, POSTs each
//! payload once at its fire time, and rebuilds timers from the store on
//! restart.
//!
//! Usage:
//!   duehook                          # Serve on 127.0.0.1:3000
//!   duehook --port 8080              # Custom port
//!   duehook --db /tmp/hooks.db       # Custom store path
//!   duehook --token s3cret           # Require a bearer token

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use duehook_core::DuehookConfig;
use duehook_scheduler::Scheduler;
use duehook_store::SqliteStore;

#[derive(Parser)]
#[command(
    name = "duehook",
    version,
    about = "⏰ Duehook: delayed one-shot webhook delivery"
)]
struct Cli {
    /// Config file path (default: ~/.duehook/config.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Bind address
    #[arg(long)]
    host: Option<String>,

    /// Gateway port
    #[arg(short, long)]
    port: Option<u16>,

    /// SQLite store path
    #[arg(long)]
    db: Option<String>,

    /// API bearer token (DUEHOOK_API_TOKEN env var takes precedence)
    #[arg(long)]
    token: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn expand_path(p: &str) -> String {
    shellexpand::tilde(p).to_string()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "duehook=debug,duehook_store=debug,duehook_scheduler=debug,duehook_gateway=debug,tower_http=debug"
    } else {
        "duehook=info,duehook_store=info,duehook_scheduler=info,duehook_gateway=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    // Load config, then apply CLI overrides
    let mut config = match &cli.config {
        Some(path) => DuehookConfig::load_from(std::path::Path::new(&expand_path(path)))?,
        None => DuehookConfig::load()?,
    };
    if let Some(host) = cli.host {
        config.gateway.host = host;
    }
    if let Some(port) = cli.port {
        config.gateway.port = port;
    }
    if let Some(db) = cli.db {
        config.store.path = db;
    }
    if let Some(token) = cli.token {
        config.api_token = Some(token);
    }
    // Env var wins over config file and CLI
    if let Ok(token) = std::env::var("DUEHOOK_API_TOKEN") {
        config.api_token = Some(token);
    }
    let api_token = config.api_token.clone().filter(|t| !t.is_empty());

    // Open the store
    let db_path = expand_path(&config.store.path);
    if let Some(parent) = std::path::Path::new(&db_path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    let store = Arc::new(SqliteStore::open(std::path::Path::new(&db_path))?);

    // Construct the scheduler; this spawns the clock task
    let scheduler = Arc::new(Scheduler::new(
        store,
        Duration::from_secs(config.dispatch.timeout_secs),
    ));

    println!("⏰ Duehook v{}", env!("CARGO_PKG_VERSION"));
    println!(
        "   🌐 API:     http://{}:{}",
        config.gateway.host, config.gateway.port
    );
    println!("   🗄️  Store:   {db_path}");
    println!("   ⏱️  Timeout: {}s", config.dispatch.timeout_secs);
    println!(
        "   🔑 Auth:    {}",
        if api_token.is_some() {
            "bearer token"
        } else {
            "disabled"
        }
    );
    println!();

    duehook_gateway::start(&config.gateway, scheduler, api_token).await
}
