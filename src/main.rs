//! Route tracking websocket server.
//!
//! Run the server with
//! ```not_rust
//! cargo run --bin route-tracker
//! ```
//!
//! and connect a client to `ws://localhost:3000/ws/session`. Pass
//! `?geolocation=false` when the client has no location sensing.

use std::net::TcpListener;
use std::sync::Arc;
use once_cell::sync::Lazy;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use route_tracker::config::ServerConfig;
use route_tracker::server::{serve, AppState};
use route_tracker::storage::kv::{FileStore, MemoryStore, SharedStore};

static CONFIG: Lazy<ServerConfig> = Lazy::new(ServerConfig::from_env);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "route_tracker=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let store: SharedStore = match &CONFIG.storage_dir {
        Some(dir) => {
            info!("Persisting records under {}", dir.display());
            Arc::new(FileStore::open(dir)?)
        }
        None => {
            info!("No TRACKER_STORAGE_DIR set, records are kept in memory");
            Arc::new(MemoryStore::new())
        }
    };

    let state = AppState::new(CONFIG.tracking.clone(), store, CONFIG.max_concurrent_sessions);
    let listener = TcpListener::bind((CONFIG.host.as_str(), CONFIG.port))?;
    if let Err(e) = serve(listener, state).await {
        error!("Server stopped: {}", e);
        return Err(e);
    }
    Ok(())
}
