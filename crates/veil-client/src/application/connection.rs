//! ConnectionManager: server discovery, selection, and the
//! connect/disconnect state machine.
//!
//! # Connection lifecycle (for beginners)
//!
//! The logical connection progresses through four states:
//!
//! ```text
//! Disconnected ──connect()──► Connecting ──establish──► Connected
//!      ▲                          │                         │
//!      │                    disconnect()              disconnect()
//!      │                          ▼                         ▼
//!      └────────teardown─── Disconnecting ◄─────────────────┘
//! ```
//!
//! - `connect()` is accepted only while `Disconnected` (and with a server
//!   selected); repeated calls while a transition is in flight are ignored,
//!   never queued, so overlapping timers cannot produce inconsistent
//!   terminal states.
//! - `disconnect()` is accepted from `Connected` *and* from `Connecting`: a
//!   disconnect issued before the connect completes cancels it, and the
//!   stale "connected" completion is discarded.
//!
//! Every transition bumps a generation counter; a completion task only
//! commits if the generation it was spawned under is still current.  The
//! same guard serialises `fetch_servers`: only the latest in-flight fetch
//! may replace the catalog, so a slow early response can never clobber a
//! fast later one.
//!
//! The actual "establishing" is delegated to the injected [`Transport`].
//! Today that is a simulated fixed delay; swapping in a real handshake
//! changes no part of the state machine, because the machine already awaits
//! a `Result` and takes the failure edge back to `Disconnected` on `Err`.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

use veil_core::api::ApiError;
use veil_core::{ConnectionStatus, ServerEntry};

/// Error type for tunnel establishment/teardown.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("could not establish tunnel to {host}: {reason}")]
    EstablishFailed { host: String, reason: String },
    #[error("tunnel teardown failed: {0}")]
    TeardownFailed(String),
}

/// Backend catalog endpoint, as the connection layer sees it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// `GET /proxies` – the full catalog snapshot.
    async fn fetch_servers(&self) -> Result<Vec<ServerEntry>, ApiError>;
}

/// The tunnel transport: the only place where connecting takes time.
///
/// The state machine awaits these calls at its two suspend points; an
/// implementation backed by a real handshake slots in without touching the
/// machine.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn establish(&self, server: &ServerEntry) -> Result<(), TransportError>;
    async fn teardown(&self) -> Result<(), TransportError>;
}

/// Events emitted to observers whenever the connection state changes.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    StatusChanged(ConnectionStatus),
    /// The catalog snapshot was replaced by a successful fetch.
    CatalogReplaced { server_count: usize },
    ServerSelected { server_id: String },
    /// The transport failed to establish; status has returned to
    /// `Disconnected`.
    ConnectFailed { reason: String },
}

/// Read-only view of the connection state.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionSnapshot {
    pub status: ConnectionStatus,
    pub is_connected: bool,
    /// The selected entry, resolved against the current catalog.  `None`
    /// when nothing is selected or the selected id vanished on a re-fetch.
    pub selected_server: Option<ServerEntry>,
    pub servers: Vec<ServerEntry>,
    pub is_loading_servers: bool,
}

struct ConnectionState {
    status: ConnectionStatus,
    is_connected: bool,
    /// Weak reference into the catalog: an id, not an owned entry.
    selected_id: Option<String>,
    catalog: Vec<ServerEntry>,
    is_loading: bool,
    /// Bumped by every accepted connect/disconnect; stale completions
    /// compare against it and discard themselves.
    transition_gen: u64,
    /// Bumped by every fetch; only the latest fetch may commit.
    fetch_gen: u64,
}

/// The connection manager.
pub struct ConnectionManager {
    api: Arc<dyn CatalogApi>,
    transport: Arc<dyn Transport>,
    state: Arc<Mutex<ConnectionState>>,
    events: mpsc::Sender<ConnectionEvent>,
}

impl ConnectionManager {
    /// Creates a new connection manager and returns it together with the
    /// event receiver.
    pub fn new(
        api: Arc<dyn CatalogApi>,
        transport: Arc<dyn Transport>,
    ) -> (Self, mpsc::Receiver<ConnectionEvent>) {
        let (tx, rx) = mpsc::channel(64);
        let mgr = Self {
            api,
            transport,
            state: Arc::new(Mutex::new(ConnectionState {
                status: ConnectionStatus::Disconnected,
                is_connected: false,
                selected_id: None,
                catalog: Vec::new(),
                is_loading: false,
                transition_gen: 0,
                fetch_gen: 0,
            })),
            events: tx,
        };
        (mgr, rx)
    }

    /// Returns a snapshot of the current connection state.
    pub async fn snapshot(&self) -> ConnectionSnapshot {
        let state = self.state.lock().await;
        ConnectionSnapshot {
            status: state.status,
            is_connected: state.is_connected,
            selected_server: resolve_selected(&state),
            servers: state.catalog.clone(),
            is_loading_servers: state.is_loading,
        }
    }

    /// Fetches the catalog and replaces the stored snapshot atomically.
    ///
    /// On failure the previous catalog is retained and the error is logged,
    /// never surfaced.  When nothing was selected and the new catalog is
    /// non-empty, the first entry becomes selected (catalog order, not best
    /// ping or load – a deterministic default).
    pub async fn fetch_servers(&self) {
        let generation = {
            let mut state = self.state.lock().await;
            state.fetch_gen += 1;
            state.is_loading = true;
            state.fetch_gen
        };

        let result = self.api.fetch_servers().await;

        let mut state = self.state.lock().await;
        if state.fetch_gen != generation {
            // A newer fetch is in flight (or already committed); this
            // response is stale and must not touch the catalog or the
            // loading flag.
            debug!("discarding stale catalog response (gen {generation})");
            return;
        }
        state.is_loading = false;

        match result {
            Ok(servers) => {
                let count = servers.len();
                state.catalog = servers;

                let auto_selected = if state.selected_id.is_none() {
                    state.catalog.first().map(|s| s.id.clone())
                } else {
                    None
                };
                if let Some(id) = &auto_selected {
                    state.selected_id = Some(id.clone());
                }
                drop(state);

                info!(server_count = count, "catalog replaced");
                self.emit(ConnectionEvent::CatalogReplaced { server_count: count });
                if let Some(server_id) = auto_selected {
                    self.emit(ConnectionEvent::ServerSelected { server_id });
                }
            }
            Err(e) => {
                drop(state);
                error!("failed to fetch servers: {e}");
            }
        }
    }

    /// Selects a server: an unconditional overwrite of the selection.
    ///
    /// Premium gating is the calling collaborator's responsibility and has
    /// already happened by the time this is invoked.
    pub async fn select_server(&self, server: &ServerEntry) {
        let mut state = self.state.lock().await;
        state.selected_id = Some(server.id.clone());
        drop(state);

        debug!(server_id = %server.id, "server selected");
        self.emit(ConnectionEvent::ServerSelected { server_id: server.id.clone() });
    }

    /// Starts connecting to the selected server.
    ///
    /// No-op when nothing is selected or when the status is anything other
    /// than `Disconnected`.  The status flips to `Connecting` synchronously;
    /// the transition to `Connected` commits after the transport establishes,
    /// unless a disconnect superseded it in the meantime.
    pub async fn connect(&self) {
        let (generation, server) = {
            let mut state = self.state.lock().await;
            if state.status != ConnectionStatus::Disconnected {
                debug!(status = ?state.status, "connect ignored");
                return;
            }
            let Some(server) = resolve_selected(&state) else {
                debug!("connect ignored: no server selected");
                return;
            };
            state.status = ConnectionStatus::Connecting;
            state.transition_gen += 1;
            (state.transition_gen, server)
        };

        info!(server_id = %server.id, host = %server.host, "connecting");
        self.emit(ConnectionEvent::StatusChanged(ConnectionStatus::Connecting));

        let transport = Arc::clone(&self.transport);
        let state = Arc::clone(&self.state);
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = transport.establish(&server).await;

            let mut guard = state.lock().await;
            if guard.transition_gen != generation
                || guard.status != ConnectionStatus::Connecting
            {
                // A disconnect superseded this attempt; the completion is
                // stale and must not resurrect the connection.
                debug!("discarding stale connect completion (gen {generation})");
                return;
            }
            match result {
                Ok(()) => {
                    guard.status = ConnectionStatus::Connected;
                    guard.is_connected = true;
                    drop(guard);
                    info!("connected");
                    let _ = events.try_send(ConnectionEvent::StatusChanged(
                        ConnectionStatus::Connected,
                    ));
                }
                Err(e) => {
                    guard.status = ConnectionStatus::Disconnected;
                    guard.is_connected = false;
                    drop(guard);
                    warn!("connect failed: {e}");
                    let _ = events.try_send(ConnectionEvent::ConnectFailed {
                        reason: e.to_string(),
                    });
                    let _ = events.try_send(ConnectionEvent::StatusChanged(
                        ConnectionStatus::Disconnected,
                    ));
                }
            }
        });
    }

    /// Starts disconnecting.
    ///
    /// No-op when already `Disconnected` or `Disconnecting`.  Accepted from
    /// `Connecting`, in which case the pending connect is cancelled and its
    /// completion discarded.  `is_connected` clears atomically with entering
    /// `Disconnecting`, so observers never see it true outside `Connected`.
    pub async fn disconnect(&self) {
        let generation = {
            let mut state = self.state.lock().await;
            match state.status {
                ConnectionStatus::Disconnected | ConnectionStatus::Disconnecting => {
                    debug!(status = ?state.status, "disconnect ignored");
                    return;
                }
                ConnectionStatus::Connecting | ConnectionStatus::Connected => {}
            }
            state.status = ConnectionStatus::Disconnecting;
            state.is_connected = false;
            state.transition_gen += 1;
            state.transition_gen
        };

        info!("disconnecting");
        self.emit(ConnectionEvent::StatusChanged(ConnectionStatus::Disconnecting));

        let transport = Arc::clone(&self.transport);
        let state = Arc::clone(&self.state);
        let events = self.events.clone();
        tokio::spawn(async move {
            if let Err(e) = transport.teardown().await {
                // The logical session still ends; a failed teardown cannot
                // leave the machine stuck in `Disconnecting`.
                warn!("teardown reported an error: {e}");
            }

            let mut guard = state.lock().await;
            if guard.transition_gen != generation {
                debug!("discarding stale disconnect completion (gen {generation})");
                return;
            }
            guard.status = ConnectionStatus::Disconnected;
            guard.is_connected = false;
            drop(guard);
            info!("disconnected");
            let _ = events.try_send(ConnectionEvent::StatusChanged(
                ConnectionStatus::Disconnected,
            ));
        });
    }

    /// Non-blocking emit: a lagging or absent observer must never stall a
    /// state transition.
    fn emit(&self, event: ConnectionEvent) {
        if self.events.try_send(event).is_err() {
            debug!("connection event dropped (no observer or channel full)");
        }
    }
}

/// Resolves the selected id against the catalog.  A selection whose id
/// vanished on a re-fetch resolves to `None`, and `connect` then degrades to
/// its no-selection no-op.
fn resolve_selected(state: &ConnectionState) -> Option<ServerEntry> {
    let id = state.selected_id.as_deref()?;
    state.catalog.iter().find(|s| s.id == id).cloned()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::Notify;
    use tokio::time::timeout;
    use veil_core::ProtocolKind;

    /// Transport whose completions are released manually, so tests control
    /// exactly when a transition lands.
    struct GatedTransport {
        release_establish: Notify,
        release_teardown: Notify,
    }

    impl GatedTransport {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                release_establish: Notify::new(),
                release_teardown: Notify::new(),
            })
        }
    }

    #[async_trait]
    impl Transport for GatedTransport {
        async fn establish(&self, _server: &ServerEntry) -> Result<(), TransportError> {
            self.release_establish.notified().await;
            Ok(())
        }

        async fn teardown(&self) -> Result<(), TransportError> {
            self.release_teardown.notified().await;
            Ok(())
        }
    }

    /// Transport that completes immediately.
    struct InstantTransport;

    #[async_trait]
    impl Transport for InstantTransport {
        async fn establish(&self, _server: &ServerEntry) -> Result<(), TransportError> {
            Ok(())
        }
        async fn teardown(&self) -> Result<(), TransportError> {
            Ok(())
        }
    }

    /// Transport that always refuses to establish.
    struct FailingTransport;

    #[async_trait]
    impl Transport for FailingTransport {
        async fn establish(&self, server: &ServerEntry) -> Result<(), TransportError> {
            Err(TransportError::EstablishFailed {
                host: server.host.clone(),
                reason: "handshake refused".to_string(),
            })
        }
        async fn teardown(&self) -> Result<(), TransportError> {
            Ok(())
        }
    }

    fn make_server(id: &str, name: &str) -> ServerEntry {
        ServerEntry {
            id: id.to_string(),
            name: name.to_string(),
            country: "Turkey".to_string(),
            country_code: "TR".to_string(),
            city: "Istanbul".to_string(),
            protocol: ProtocolKind::Wireguard,
            host: format!("{id}.veil.example"),
            port: 51820,
            is_premium: false,
            is_online: true,
            load_percentage: 40,
            ping_ms: 25,
        }
    }

    fn make_catalog() -> Vec<ServerEntry> {
        vec![
            make_server("a", "Alpha"),
            make_server("b", "Beta"),
            make_server("c", "Gamma"),
        ]
    }

    fn make_manager_with_catalog(
        transport: Arc<dyn Transport>,
    ) -> (ConnectionManager, mpsc::Receiver<ConnectionEvent>) {
        let mut api = MockCatalogApi::new();
        api.expect_fetch_servers().returning(|| Ok(make_catalog()));
        ConnectionManager::new(Arc::new(api), transport)
    }

    /// Collects events until the given status is observed (inclusive), so a
    /// test can assert on everything that happened on the way there.
    async fn collect_until(
        rx: &mut mpsc::Receiver<ConnectionEvent>,
        wanted: ConnectionStatus,
    ) -> Vec<ConnectionEvent> {
        timeout(Duration::from_secs(2), async {
            let mut seen = Vec::new();
            while let Some(event) = rx.recv().await {
                let done = event == ConnectionEvent::StatusChanged(wanted);
                seen.push(event);
                if done {
                    return seen;
                }
            }
            panic!("event channel closed before status {wanted:?}");
        })
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for status {wanted:?}"))
    }

    fn count_status(events: &[ConnectionEvent], status: ConnectionStatus) -> usize {
        events
            .iter()
            .filter(|e| **e == ConnectionEvent::StatusChanged(status))
            .count()
    }

    // ── fetch_servers ─────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_fetch_servers_replaces_catalog_and_selects_first_entry() {
        // Arrange
        let (mgr, _rx) = make_manager_with_catalog(Arc::new(InstantTransport));

        // Act
        mgr.fetch_servers().await;

        // Assert: default selection is first by catalog order.
        let snap = mgr.snapshot().await;
        assert_eq!(snap.servers.len(), 3);
        assert_eq!(snap.selected_server.unwrap().id, "a");
        assert!(!snap.is_loading_servers);
    }

    #[tokio::test]
    async fn test_fetch_servers_keeps_existing_selection() {
        let (mgr, _rx) = make_manager_with_catalog(Arc::new(InstantTransport));
        mgr.fetch_servers().await;
        mgr.select_server(&make_server("c", "Gamma")).await;

        mgr.fetch_servers().await;

        assert_eq!(mgr.snapshot().await.selected_server.unwrap().id, "c");
    }

    #[tokio::test]
    async fn test_fetch_servers_failure_retains_prior_catalog_and_clears_loading() {
        // Arrange: first fetch succeeds, second fails.
        let mut api = MockCatalogApi::new();
        let mut calls = 0;
        api.expect_fetch_servers().returning(move || {
            calls += 1;
            if calls == 1 {
                Ok(make_catalog())
            } else {
                Err(ApiError::Transport("connection refused".to_string()))
            }
        });
        let (mgr, _rx) = ConnectionManager::new(Arc::new(api), Arc::new(InstantTransport));
        mgr.fetch_servers().await;

        // Act
        mgr.fetch_servers().await;

        // Assert: catalog survives, loading flag cleared.
        let snap = mgr.snapshot().await;
        assert_eq!(snap.servers.len(), 3);
        assert!(!snap.is_loading_servers);
    }

    #[tokio::test]
    async fn test_fetch_servers_failure_on_first_load_leaves_catalog_empty() {
        let mut api = MockCatalogApi::new();
        api.expect_fetch_servers()
            .returning(|| Err(ApiError::Transport("offline".to_string())));
        let (mgr, _rx) = ConnectionManager::new(Arc::new(api), Arc::new(InstantTransport));

        mgr.fetch_servers().await;

        let snap = mgr.snapshot().await;
        assert!(snap.servers.is_empty());
        assert!(!snap.is_loading_servers);
        assert!(snap.selected_server.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_fetch_commits_only_latest_response() {
        // Arrange: the first fetch's response is held back until after the
        // second fetch has committed.
        struct SlowThenFast {
            gate: Notify,
            calls: std::sync::atomic::AtomicU32,
        }
        #[async_trait]
        impl CatalogApi for SlowThenFast {
            async fn fetch_servers(&self) -> Result<Vec<ServerEntry>, ApiError> {
                let call = self
                    .calls
                    .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                if call == 0 {
                    self.gate.notified().await;
                    Ok(vec![make_server("stale", "Stale")])
                } else {
                    Ok(make_catalog())
                }
            }
        }
        let api = Arc::new(SlowThenFast {
            gate: Notify::new(),
            calls: std::sync::atomic::AtomicU32::new(0),
        });
        let (mgr, _rx) = ConnectionManager::new(api.clone(), Arc::new(InstantTransport));
        let mgr = Arc::new(mgr);

        // Act: start the slow fetch, let the fast one win, then release the
        // slow response.
        let slow = tokio::spawn({
            let mgr = Arc::clone(&mgr);
            async move { mgr.fetch_servers().await }
        });
        tokio::task::yield_now().await;
        mgr.fetch_servers().await;
        api.gate.notify_one();
        slow.await.unwrap();

        // Assert: the stale response did not clobber the committed catalog.
        let snap = mgr.snapshot().await;
        assert_eq!(snap.servers.len(), 3);
        assert!(snap.servers.iter().all(|s| s.id != "stale"));
        assert!(!snap.is_loading_servers);
    }

    // ── select_server ─────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_select_server_overwrites_selection_unconditionally() {
        let (mgr, _rx) = make_manager_with_catalog(Arc::new(InstantTransport));
        mgr.fetch_servers().await;

        mgr.select_server(&make_server("b", "Beta")).await;

        assert_eq!(mgr.snapshot().await.selected_server.unwrap().id, "b");
    }

    #[tokio::test]
    async fn test_selection_is_weak_reference_into_catalog() {
        // Arrange: select an id, then replace the catalog with one that no
        // longer contains it.
        let mut api = MockCatalogApi::new();
        let mut calls = 0;
        api.expect_fetch_servers().returning(move || {
            calls += 1;
            if calls == 1 {
                Ok(make_catalog())
            } else {
                Ok(vec![make_server("z", "Zeta")])
            }
        });
        let (mgr, _rx) = ConnectionManager::new(Arc::new(api), Arc::new(InstantTransport));
        mgr.fetch_servers().await;
        mgr.select_server(&make_server("b", "Beta")).await;

        // Act
        mgr.fetch_servers().await;

        // Assert: the id no longer resolves, and connect degrades to a no-op.
        let snap = mgr.snapshot().await;
        assert!(snap.selected_server.is_none());
        mgr.connect().await;
        assert_eq!(mgr.snapshot().await.status, ConnectionStatus::Disconnected);
    }

    // ── connect / disconnect ──────────────────────────────────────────────────

    #[tokio::test]
    async fn test_connect_without_selection_is_noop() {
        // Arrange: empty catalog, nothing selected.
        let mut api = MockCatalogApi::new();
        api.expect_fetch_servers().returning(|| Ok(Vec::new()));
        let (mgr, _rx) = ConnectionManager::new(Arc::new(api), Arc::new(InstantTransport));
        mgr.fetch_servers().await;

        // Act
        mgr.connect().await;

        // Assert
        let snap = mgr.snapshot().await;
        assert_eq!(snap.status, ConnectionStatus::Disconnected);
        assert!(!snap.is_connected);
    }

    #[tokio::test]
    async fn test_connect_transitions_through_connecting_to_connected() {
        // Arrange
        let (mgr, mut rx) = make_manager_with_catalog(Arc::new(InstantTransport));
        mgr.fetch_servers().await;

        // Act
        mgr.connect().await;

        // Assert: `Connecting` is the synchronous effect…
        assert_eq!(mgr.snapshot().await.status, ConnectionStatus::Connecting);
        // …and `Connected` commits once the transport establishes.
        collect_until(&mut rx, ConnectionStatus::Connected).await;
        let snap = mgr.snapshot().await;
        assert_eq!(snap.status, ConnectionStatus::Connected);
        assert!(snap.is_connected);
    }

    #[tokio::test]
    async fn test_connect_twice_while_connecting_produces_single_transition() {
        // Arrange: hold the establish so both calls land mid-transition.
        let transport = GatedTransport::new();
        let (mgr, mut rx) = make_manager_with_catalog(transport.clone());
        mgr.fetch_servers().await;

        // Act
        mgr.connect().await;
        mgr.connect().await; // ignored: already connecting
        transport.release_establish.notify_one();
        transport.release_establish.notify_one(); // would release a second timer, if one existed

        // Assert: exactly one Connecting and one Connected among the status
        // events – the second call neither queued nor restarted a timer.
        let mut events = collect_until(&mut rx, ConnectionStatus::Connected).await;
        tokio::task::yield_now().await;
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert_eq!(count_status(&events, ConnectionStatus::Connecting), 1);
        assert_eq!(count_status(&events, ConnectionStatus::Connected), 1);
        assert!(mgr.snapshot().await.is_connected);
    }

    #[tokio::test]
    async fn test_disconnect_before_connect_completes_discards_stale_connected() {
        // Arrange
        let transport = GatedTransport::new();
        let (mgr, mut rx) = make_manager_with_catalog(transport.clone());
        mgr.fetch_servers().await;

        // Act: disconnect while the connect is still in flight.
        mgr.connect().await;
        assert_eq!(mgr.snapshot().await.status, ConnectionStatus::Connecting);
        mgr.disconnect().await;
        assert_eq!(mgr.snapshot().await.status, ConnectionStatus::Disconnecting);

        // Release the (now stale) connect completion first, then the teardown.
        transport.release_establish.notify_one();
        tokio::task::yield_now().await;
        transport.release_teardown.notify_one();

        // Assert: terminal state is Disconnected, and `is_connected` was
        // never observed true – no Connected status event was ever emitted.
        let mut events = collect_until(&mut rx, ConnectionStatus::Disconnected).await;
        tokio::task::yield_now().await;
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert_eq!(count_status(&events, ConnectionStatus::Connected), 0);
        assert_eq!(count_status(&events, ConnectionStatus::Disconnecting), 1);
        let snap = mgr.snapshot().await;
        assert_eq!(snap.status, ConnectionStatus::Disconnected);
        assert!(!snap.is_connected);
    }

    #[tokio::test]
    async fn test_disconnect_from_connected_returns_to_disconnected() {
        let (mgr, mut rx) = make_manager_with_catalog(Arc::new(InstantTransport));
        mgr.fetch_servers().await;
        mgr.connect().await;
        collect_until(&mut rx, ConnectionStatus::Connected).await;

        mgr.disconnect().await;

        // is_connected clears atomically with entering Disconnecting.
        let snap = mgr.snapshot().await;
        assert_eq!(snap.status, ConnectionStatus::Disconnecting);
        assert!(!snap.is_connected);

        collect_until(&mut rx, ConnectionStatus::Disconnected).await;
        assert_eq!(mgr.snapshot().await.status, ConnectionStatus::Disconnected);
    }

    #[tokio::test]
    async fn test_disconnect_while_disconnected_is_noop() {
        let (mgr, mut rx) = make_manager_with_catalog(Arc::new(InstantTransport));
        mgr.fetch_servers().await;

        mgr.disconnect().await;

        assert_eq!(mgr.snapshot().await.status, ConnectionStatus::Disconnected);
        // Only catalog/selection events; no status transition was emitted.
        while let Ok(event) = rx.try_recv() {
            assert!(!matches!(event, ConnectionEvent::StatusChanged(_)));
        }
    }

    #[tokio::test]
    async fn test_failed_establish_returns_to_disconnected_with_event() {
        // Arrange
        let (mgr, mut rx) = make_manager_with_catalog(Arc::new(FailingTransport));
        mgr.fetch_servers().await;

        // Act
        mgr.connect().await;

        // Assert: the failure edge lands back in Disconnected and surfaces
        // a ConnectFailed event.
        let events = collect_until(&mut rx, ConnectionStatus::Disconnected).await;
        assert!(events
            .iter()
            .any(|e| matches!(e, ConnectionEvent::ConnectFailed { .. })));
        let snap = mgr.snapshot().await;
        assert_eq!(snap.status, ConnectionStatus::Disconnected);
        assert!(!snap.is_connected);
        // After the failure the machine accepts a fresh connect.
        mgr.connect().await;
        assert_eq!(mgr.snapshot().await.status, ConnectionStatus::Connecting);
    }
}
