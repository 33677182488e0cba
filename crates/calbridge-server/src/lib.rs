//! HTTP bridge daemon.
//!
//! Serves a small JSON API over a CalDAV calendar:
//! - `POST /get_events` lists events in a time range
//! - `POST /create_event` creates an event from local wall-clock times
//! - `POST /delete_event` deletes an event by UID
//! - `GET /health` answers `{"ok": true}`
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use calbridge_core::LocalZone;
//! use calbridge_providers::MemoryStore;
//! use calbridge_server::{AppState, EventService, SignalHandler, router, serve};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = EventService::new(Arc::new(MemoryStore::new()), LocalZone::default());
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:8000").await?;
//!     let signals = SignalHandler::new();
//!     signals.spawn_listener();
//!     serve(listener, router(AppState::new(service)), signals.shutdown()).await?;
//!     Ok(())
//! }
//! ```

pub mod cli;
mod config;
mod error;
mod routes;
mod service;
mod signals;

use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

pub use config::BridgeConfig;
pub use error::{BridgeError, BridgeResult};
pub use routes::{AppState, router};
pub use service::{DELETE_SEARCH_DAYS, EventService};
pub use signals::{ShutdownHandle, ShutdownSignal, SignalHandler};

/// Serves `app` on `listener` until `shutdown` completes.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    shutdown: ShutdownSignal,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(addr = %addr, "Listening");
    }
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.wait())
        .await?;
    info!("Server stopped");
    Ok(())
}
