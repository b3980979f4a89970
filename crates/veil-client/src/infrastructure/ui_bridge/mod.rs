//! UI bridge for the Veil client.
//!
//! Exposes application-layer state (session, catalog, connection status) to
//! the presentation layer through serializable snapshots and command
//! functions.  Follows Clean Architecture: only this module is allowed to
//! reference both the Application layer and the Presentation boundary.
//!
//! # The calling-collaborator contract (for beginners)
//!
//! The managers deliberately do *not* know about each other.  Rules that
//! span both – "a free-tier user may not select a premium server" – live
//! here, in the collaborator that dispatches user intents:
//!
//! ```text
//! UI                        ui_bridge                      managers
//! ──                        ─────────                      ────────
//! tap server row ─────────► select_server(id)
//!                           look up entry, check tier ───► session snapshot
//!                           premium + free tier?
//!                             yes → upgrade_required       (nothing invoked)
//!                             no  ───────────────────────► connection.select_server
//! ```
//!
//! So when a guest taps a premium server, the selection is untouched and the
//! UI routes to the upgrade flow – gating happens *before* the intent
//! reaches the ConnectionManager.
//!
//! # `CommandResult<T>`
//!
//! All commands return `CommandResult<T>` – a unified envelope:
//! ```json
//! { "success": true,  "data": {...}, "error": null  }
//! { "success": false, "data": null,  "error": "..."  }
//! ```
//! This lets the presentation side use a single error-handling pattern for
//! all commands regardless of their return type.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use veil_core::{filter_catalog, CatalogFilter, ServerEntry, User};

use crate::application::connection::ConnectionManager;
use crate::application::session::{AuthApi, SessionManager};

// ── Shared application state ──────────────────────────────────────────────────

/// Runtime state shared between UI commands.
///
/// The managers use interior locking, so commands borrow this state
/// concurrently without coordination.
pub struct AppState {
    pub session: Arc<SessionManager>,
    pub connection: Arc<ConnectionManager>,
    /// Direct API access for the calls that belong to the presentation
    /// collaborator itself (forgot-password), not to either manager.
    pub api: Arc<dyn AuthApi>,
}

impl AppState {
    pub fn new(
        session: Arc<SessionManager>,
        connection: Arc<ConnectionManager>,
        api: Arc<dyn AuthApi>,
    ) -> Arc<Self> {
        Arc::new(Self {
            session,
            connection,
            api,
        })
    }
}

// ── DTOs ──────────────────────────────────────────────────────────────────────

/// Session snapshot returned to the presentation layer.
///
/// The `mode` field is serialized as a string (e.g., `"Authenticated"`)
/// using Rust's default `Debug` formatting; the consumer treats it as a
/// discriminated union string literal type.  The bearer token never appears
/// here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDto {
    pub mode: String,
    pub user: Option<User>,
    pub is_loading: bool,
}

/// Connection snapshot returned to the presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionDto {
    pub status: String,
    pub is_connected: bool,
    pub selected_server: Option<ServerEntry>,
    pub server_count: usize,
    pub is_loading_servers: bool,
}

/// Outcome of a selection intent.
///
/// `upgrade_required` tells the UI to route to the upgrade flow instead of
/// changing the selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectOutcomeDto {
    pub selected: bool,
    pub upgrade_required: bool,
}

/// Unified response wrapper for UI commands.
#[derive(Debug, Serialize, Deserialize)]
pub struct CommandResult<T: Serialize> {
    /// `true` if the command completed successfully; `false` on error.
    pub success: bool,
    /// The command's return value, present only when `success` is `true`.
    pub data: Option<T>,
    /// A human-readable error message, present only when `success` is `false`.
    pub error: Option<String>,
}

impl<T: Serialize> CommandResult<T> {
    /// Constructs a successful result containing `data`.
    pub fn ok(data: T) -> Self {
        Self { success: true, data: Some(data), error: None }
    }

    /// Constructs an error result containing the given message.
    pub fn err(msg: impl Into<String>) -> Self {
        Self { success: false, data: None, error: Some(msg.into()) }
    }
}

// ── Session commands ──────────────────────────────────────────────────────────

/// Returns the current session snapshot.
pub async fn get_session(state: Arc<AppState>) -> CommandResult<SessionDto> {
    let snap = state.session.snapshot().await;
    CommandResult::ok(SessionDto {
        mode: format!("{:?}", snap.mode),
        user: snap.user,
        is_loading: snap.is_loading,
    })
}

/// Registers a new account.
///
/// Business-rule validation (email shape, password length) is this
/// collaborator's job; the SessionManager only defends against payloads no
/// backend call could accept.
pub async fn register(
    state: Arc<AppState>,
    email: String,
    password: String,
) -> CommandResult<User> {
    if let Err(msg) = validate_signup(&email, &password) {
        return CommandResult::err(msg);
    }
    match state.session.register(&email, &password).await {
        Ok(user) => CommandResult::ok(user),
        Err(e) => CommandResult::err(e.to_string()),
    }
}

/// Logs in to an existing account.
pub async fn login(state: Arc<AppState>, email: String, password: String) -> CommandResult<User> {
    if let Err(msg) = validate_signup(&email, &password) {
        return CommandResult::err(msg);
    }
    match state.session.login(&email, &password).await {
        Ok(user) => CommandResult::ok(user),
        Err(e) => CommandResult::err(e.to_string()),
    }
}

/// Ends the session.  Never fails.
pub async fn logout(state: Arc<AppState>) -> CommandResult<()> {
    state.session.logout().await;
    CommandResult::ok(())
}

/// Switches to guest mode.  Never fails.
pub async fn continue_as_guest(state: Arc<AppState>) -> CommandResult<()> {
    state.session.continue_as_guest().await;
    CommandResult::ok(())
}

/// Requests a password-reset email.  The response body is unused; a 2xx is
/// success.
pub async fn forgot_password(state: Arc<AppState>, email: String) -> CommandResult<()> {
    if !is_valid_email(&email) {
        return CommandResult::err("enter a valid email address");
    }
    match state.api.forgot_password(&email).await {
        Ok(()) => CommandResult::ok(()),
        Err(e) => CommandResult::err(e.to_string()),
    }
}

/// Triggers a best-effort background profile refresh.
pub async fn refresh_profile(state: Arc<AppState>) -> CommandResult<()> {
    state.session.refresh_profile().await;
    CommandResult::ok(())
}

/// Upgrades the subscription to premium.
pub async fn upgrade_subscription(state: Arc<AppState>) -> CommandResult<User> {
    match state.session.upgrade_subscription().await {
        Ok(user) => CommandResult::ok(user),
        Err(e) => CommandResult::err(e.to_string()),
    }
}

// ── Connection commands ───────────────────────────────────────────────────────

/// Returns the current connection snapshot.
pub async fn get_connection(state: Arc<AppState>) -> CommandResult<ConnectionDto> {
    let snap = state.connection.snapshot().await;
    CommandResult::ok(ConnectionDto {
        status: format!("{:?}", snap.status),
        is_connected: snap.is_connected,
        selected_server: snap.selected_server,
        server_count: snap.servers.len(),
        is_loading_servers: snap.is_loading_servers,
    })
}

/// Re-fetches the catalog.  Failures degrade silently (the previous catalog
/// is retained), so this command always succeeds.
pub async fn fetch_servers(state: Arc<AppState>) -> CommandResult<()> {
    state.connection.fetch_servers().await;
    CommandResult::ok(())
}

/// Returns the catalog filtered for display.
pub async fn list_servers(
    state: Arc<AppState>,
    search: String,
    filter: CatalogFilter,
) -> CommandResult<Vec<ServerEntry>> {
    let snap = state.connection.snapshot().await;
    let filtered = filter_catalog(&snap.servers, &search, filter)
        .into_iter()
        .cloned()
        .collect();
    CommandResult::ok(filtered)
}

/// Selects a server by id, applying the premium-gating rule first.
///
/// A premium-flagged server with anything other than a premium-tier session
/// (free tier, guest, or unauthenticated) leaves the selection unchanged and
/// reports `upgrade_required` so the UI can route to the upgrade flow.
pub async fn select_server(state: Arc<AppState>, server_id: String) -> CommandResult<SelectOutcomeDto> {
    let snap = state.connection.snapshot().await;
    let Some(server) = snap.servers.iter().find(|s| s.id == server_id) else {
        return CommandResult::err(format!("unknown server: {server_id}"));
    };

    if server.is_premium {
        let session = state.session.snapshot().await;
        let premium = session.user.as_ref().is_some_and(|u| u.is_premium());
        if !premium {
            return CommandResult::ok(SelectOutcomeDto {
                selected: false,
                upgrade_required: true,
            });
        }
    }

    state.connection.select_server(server).await;
    CommandResult::ok(SelectOutcomeDto {
        selected: true,
        upgrade_required: false,
    })
}

/// Starts connecting to the selected server.
pub async fn connect(state: Arc<AppState>) -> CommandResult<()> {
    state.connection.connect().await;
    CommandResult::ok(())
}

/// Starts disconnecting.
pub async fn disconnect(state: Arc<AppState>) -> CommandResult<()> {
    state.connection.disconnect().await;
    CommandResult::ok(())
}

// ── Validation helpers ────────────────────────────────────────────────────────

/// Signup validation owned by this collaborator: email shape and the minimum
/// password length the backend's terms require.
fn validate_signup(email: &str, password: &str) -> Result<(), &'static str> {
    if !is_valid_email(email) {
        return Err("enter a valid email address");
    }
    if password.len() < 6 {
        return Err("password must be at least 6 characters");
    }
    Ok(())
}

/// Mirror of the signup form's email check: `local@domain.tld` with no
/// whitespace.
fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
