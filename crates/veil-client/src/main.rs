//! Veil VPN Client entry point.
//!
//! Wires together the REST client, token store, simulated transport, and the
//! two managers, then runs the Tokio async event loop.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load_config()               -- TOML config, defaults on first run
//!  └─ RestApiClient / FileTokenStore / SimulatedTransport
//!  └─ SessionManager::new()       -- (manager, session event receiver)
//!  └─ ConnectionManager::new()    -- (manager, connection event receiver)
//!  └─ session.load_user()         -- restore a persisted session, if any
//!  └─ connection.fetch_servers()  -- initial catalog snapshot
//!  └─ event dispatch loop
//!       ├─ SessionEvent     -> log identity transitions
//!       ├─ ConnectionEvent  -> log catalog/status transitions
//!       └─ Ctrl-C           -> shut down
//! ```
//!
//! The dispatch loop is where a presentation layer would re-render from the
//! managers' snapshots; running headless, it logs the same transitions so
//! the orchestration can be observed end to end.

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use veil_client::application::connection::{CatalogApi, ConnectionManager};
use veil_client::application::session::{AuthApi, SessionManager};
use veil_client::infrastructure::{
    api::RestApiClient,
    storage::{config::load_config, FileTokenStore},
    transport::SimulatedTransport,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config()?;

    // Initialise structured logging.  RUST_LOG overrides the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.client.log_level.clone())),
        )
        .init();

    info!("Veil client starting");

    // ── Collaborators ─────────────────────────────────────────────────────────
    let api = Arc::new(RestApiClient::new(config.backend.base_url.clone()));
    let tokens = Arc::new(FileTokenStore::new()?);
    let transport = Arc::new(SimulatedTransport::from_config(&config.tunnel));

    // ── Managers ──────────────────────────────────────────────────────────────
    let (session, mut session_rx) =
        SessionManager::new(Arc::clone(&api) as Arc<dyn AuthApi>, tokens);
    let session = Arc::new(session);

    let (connection, mut connection_rx) =
        ConnectionManager::new(Arc::clone(&api) as Arc<dyn CatalogApi>, transport);
    let connection = Arc::new(connection);

    // ── Startup sequence ──────────────────────────────────────────────────────
    session.load_user().await;
    connection.fetch_servers().await;

    let snapshot = session.snapshot().await;
    info!(mode = ?snapshot.mode, "startup session state");

    // ── Event dispatch loop ───────────────────────────────────────────────────
    info!("Veil client ready");

    loop {
        tokio::select! {
            Some(event) = session_rx.recv() => {
                info!(?event, "session event");
            }
            Some(event) = connection_rx.recv() => {
                info!(?event, "connection event");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                break;
            }
        }
    }

    info!("Veil client stopped");
    Ok(())
}
