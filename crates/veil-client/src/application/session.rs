//! SessionManager: the identity/session lifecycle.
//!
//! # Identity lifecycle (for beginners)
//!
//! The session moves between three mutually exclusive modes:
//!
//! ```text
//! Unauthenticated ──register/login/restore-ok──► Authenticated
//!        │  ▲                                        │
//!        │  └──────logout / restore-failure──────────┘
//!        ▼
//!      Guest ─────────register/login────────────► Authenticated
//! ```
//!
//! - At process start the session is `Unauthenticated`.  `load_user` then
//!   tries to restore a previous session from the persisted token; *any*
//!   restore failure (network or invalid token) clears the stored token and
//!   leaves the session logged out – a dead token is not worth retrying.
//! - `continue_as_guest` grants catalog access without credentials.  Guest
//!   mode is terminal until the user authenticates.
//! - `logout` is best-effort about persistence: even if deleting the stored
//!   token fails, the call terminates in the logged-out state.
//!
//! Only `register`, `login`, and `upgrade_subscription` surface errors to the
//! caller; every other operation either succeeds, silently degrades, or is a
//! no-op.
//!
//! # Concurrency
//!
//! The state lives behind a `tokio::sync::Mutex` that is held only across
//! synchronous reads/writes, never across a collaborator await.  Concurrent
//! operations therefore interleave with last-write-wins on the identity and
//! no partial updates, matching how a single UI issues them in practice.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use veil_core::api::{ApiError, AuthResponse, ProfileResponse};
use veil_core::{Identity, SubscriptionTier, Token, User};

/// Fixed key under which the bearer token is persisted.
pub const AUTH_TOKEN_KEY: &str = "auth_token";

/// Error type for the session operations that can fail.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The payload was rejected before any network call was made.
    #[error("{0}")]
    Validation(String),
    /// The backend rejected the request; carries its human-readable message
    /// (or a generic fallback when the payload had none).
    #[error("{message}")]
    Rejected { message: String },
    /// The request never completed.
    #[error("network error: {0}")]
    Transport(#[source] ApiError),
    /// The issued token could not be persisted.
    #[error("could not persist credential: {0}")]
    Storage(#[from] StorageError),
}

impl AuthError {
    /// Maps an [`ApiError`] onto the surfaced taxonomy: backend-provided
    /// message when present, `fallback` for message-less rejections, and
    /// `Transport` otherwise.
    fn from_api(err: ApiError, fallback: &str) -> Self {
        match err {
            ApiError::Backend { .. } => {
                let message = err
                    .backend_message()
                    .unwrap_or(fallback)
                    .to_string();
                AuthError::Rejected { message }
            }
            other => AuthError::Transport(other),
        }
    }
}

/// Error type for the persisted token store.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,
    #[error("I/O error accessing credential store: {0}")]
    Io(#[from] std::io::Error),
    #[error("credential store is malformed: {0}")]
    Malformed(String),
}

/// Backend auth endpoints, as the session layer sees them.
///
/// Credentials are explicit per call – there is no ambient default header –
/// so a logout cannot leak a stale credential into later anonymous requests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// `POST /auth/register`
    async fn register(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError>;
    /// `POST /auth/login`
    async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError>;
    /// `POST /auth/forgot-password`
    async fn forgot_password(&self, email: &str) -> Result<(), ApiError>;
    /// `GET /auth/profile` with the bearer credential attached.
    async fn profile(&self, token: &Token) -> Result<ProfileResponse, ApiError>;
    /// `POST /subscription/upgrade` with the bearer credential attached.
    async fn upgrade_subscription(&self, token: &Token) -> Result<(), ApiError>;
}

/// Persistent key-value store for the bearer token.
///
/// A single entry under [`AUTH_TOKEN_KEY`], surviving process restarts.
#[cfg_attr(test, mockall::automock)]
pub trait TokenStore: Send + Sync {
    /// Returns the persisted token, or `None` when no session was stored.
    fn load(&self) -> Result<Option<String>, StorageError>;
    fn save(&self, token: &str) -> Result<(), StorageError>;
    /// Removing an absent entry is not an error.
    fn clear(&self) -> Result<(), StorageError>;
}

/// Events emitted to observers whenever the session state changes.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Register, login, or startup restore produced an authenticated session.
    Authenticated { user: User },
    /// The session ended (logout or restore failure).
    LoggedOut,
    /// The user chose to continue without an account.
    GuestEntered,
    /// A background refresh replaced the user record.
    ProfileRefreshed { user: User },
}

/// Identity mode without the credential, for snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityMode {
    Unauthenticated,
    Guest,
    Authenticated,
}

/// Read-only view of the session state.  Never carries the token.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub mode: IdentityMode,
    pub user: Option<User>,
    pub is_loading: bool,
}

impl SessionSnapshot {
    /// Subscription tier for gating decisions; `None` while not authenticated.
    pub fn subscription_tier(&self) -> Option<SubscriptionTier> {
        self.user.as_ref().map(|u| u.subscription_tier)
    }
}

struct SessionState {
    identity: Identity,
    is_loading: bool,
}

/// The session manager.
///
/// Single writer of the persisted token and the identity state.  Constructed
/// with its collaborators injected; returns the event receiver alongside
/// itself so the presentation layer can subscribe from day one.
pub struct SessionManager {
    api: Arc<dyn AuthApi>,
    tokens: Arc<dyn TokenStore>,
    state: Mutex<SessionState>,
    events: mpsc::Sender<SessionEvent>,
}

impl SessionManager {
    /// Creates a new session manager and returns it together with the event
    /// receiver.
    pub fn new(
        api: Arc<dyn AuthApi>,
        tokens: Arc<dyn TokenStore>,
    ) -> (Self, mpsc::Receiver<SessionEvent>) {
        let (tx, rx) = mpsc::channel(64);
        let mgr = Self {
            api,
            tokens,
            state: Mutex::new(SessionState {
                identity: Identity::Unauthenticated,
                is_loading: false,
            }),
            events: tx,
        };
        (mgr, rx)
    }

    /// Returns a snapshot of the current session state.
    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.lock().await;
        SessionSnapshot {
            mode: match state.identity {
                Identity::Unauthenticated => IdentityMode::Unauthenticated,
                Identity::Guest => IdentityMode::Guest,
                Identity::Authenticated { .. } => IdentityMode::Authenticated,
            },
            user: state.identity.user().cloned(),
            is_loading: state.is_loading,
        }
    }

    /// Registers a new account.
    ///
    /// # Errors
    ///
    /// [`AuthError::Validation`] for defensively rejected payloads,
    /// [`AuthError::Rejected`] with the backend message (or the generic
    /// fallback) when the backend refuses, [`AuthError::Transport`] /
    /// [`AuthError::Storage`] for collaborator failures.  The identity is
    /// unchanged on any failure.
    pub async fn register(&self, email: &str, password: &str) -> Result<User, AuthError> {
        validate_credentials(email, password)?;
        self.set_loading(true).await;

        let result = self.api.register(email, password).await;
        match result {
            Ok(resp) => self.commit_auth(email, resp).await,
            Err(e) => {
                self.set_loading(false).await;
                Err(AuthError::from_api(e, "registration failed"))
            }
        }
    }

    /// Logs in to an existing account.  Same contract as [`register`].
    ///
    /// [`register`]: SessionManager::register
    ///
    /// # Errors
    ///
    /// See [`SessionManager::register`].
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        validate_credentials(email, password)?;
        self.set_loading(true).await;

        let result = self.api.login(email, password).await;
        match result {
            Ok(resp) => self.commit_auth(email, resp).await,
            Err(e) => {
                self.set_loading(false).await;
                Err(AuthError::from_api(e, "login failed"))
            }
        }
    }

    /// Ends the session.  Always terminates in the logged-out state: a
    /// failing persistence delete is logged and swallowed, never surfaced.
    pub async fn logout(&self) {
        if let Err(e) = self.tokens.clear() {
            warn!("failed to delete persisted token during logout: {e}");
        }

        let mut state = self.state.lock().await;
        state.identity = Identity::Unauthenticated;
        state.is_loading = false;
        drop(state);

        info!("session logged out");
        self.emit(SessionEvent::LoggedOut);
    }

    /// Restores the session persisted by a previous run.  Invoked once at
    /// process start.
    ///
    /// No stored token → stays `Unauthenticated` without any network call.
    /// A stored token that fails to produce a profile – whether the network
    /// was down or the backend said 401 – is treated as "session invalid":
    /// the token is cleared and the session reverts to `Unauthenticated`.
    pub async fn load_user(&self) {
        let stored = match self.tokens.load() {
            Ok(stored) => stored,
            Err(e) => {
                warn!("could not read persisted token: {e}");
                None
            }
        };
        let Some(raw) = stored else {
            debug!("no persisted session to restore");
            return;
        };

        self.set_loading(true).await;
        let token = Token::new(raw);

        match self.api.profile(&token).await {
            Ok(profile) => {
                let user: User = profile.into();
                let mut state = self.state.lock().await;
                state.identity = Identity::Authenticated { user: user.clone(), token };
                state.is_loading = false;
                drop(state);

                info!(user_id = %user.id, "session restored from persisted token");
                self.emit(SessionEvent::Authenticated { user });
            }
            Err(e) => {
                // Session invalid, not a retryable transient: drop the token.
                info!("session restore failed ({e}); clearing persisted token");
                if let Err(e) = self.tokens.clear() {
                    warn!("failed to clear persisted token after restore failure: {e}");
                }

                let mut state = self.state.lock().await;
                state.identity = Identity::Unauthenticated;
                state.is_loading = false;
                drop(state);

                self.emit(SessionEvent::LoggedOut);
            }
        }
    }

    /// Re-fetches the profile and replaces the user record in place.
    ///
    /// Best-effort: a no-op without a token, and failures are logged and
    /// swallowed.  The refreshed record is discarded if the identity changed
    /// while the fetch was in flight (e.g. a logout raced it).
    pub async fn refresh_profile(&self) {
        let token = {
            let state = self.state.lock().await;
            match state.identity.token() {
                Some(t) => t.clone(),
                None => return,
            }
        };

        match self.api.profile(&token).await {
            Ok(profile) => {
                let user: User = profile.into();
                let mut state = self.state.lock().await;
                match &state.identity {
                    Identity::Authenticated { token: current, .. } if *current == token => {
                        state.identity = Identity::Authenticated {
                            user: user.clone(),
                            token,
                        };
                        drop(state);
                        debug!(user_id = %user.id, "profile refreshed");
                        self.emit(SessionEvent::ProfileRefreshed { user });
                    }
                    _ => debug!("identity changed during refresh; discarding stale profile"),
                }
            }
            Err(e) => warn!("background profile refresh failed: {e}"),
        }
    }

    /// Switches to guest mode, clearing any user and token.  Always succeeds.
    pub async fn continue_as_guest(&self) {
        let mut state = self.state.lock().await;
        state.identity = Identity::Guest;
        state.is_loading = false;
        drop(state);

        info!("continuing as guest");
        self.emit(SessionEvent::GuestEntered);
    }

    /// Upgrades the subscription to premium, then re-fetches the profile so
    /// the tier change lands in the user record.
    ///
    /// # Errors
    ///
    /// [`AuthError::Validation`] when not authenticated; otherwise the same
    /// taxonomy as [`SessionManager::register`].
    pub async fn upgrade_subscription(&self) -> Result<User, AuthError> {
        let token = {
            let state = self.state.lock().await;
            match state.identity.token() {
                Some(t) => t.clone(),
                None => {
                    return Err(AuthError::Validation(
                        "an authenticated session is required to upgrade".to_string(),
                    ))
                }
            }
        };

        self.api
            .upgrade_subscription(&token)
            .await
            .map_err(|e| AuthError::from_api(e, "subscription upgrade failed"))?;

        let profile = self
            .api
            .profile(&token)
            .await
            .map_err(|e| AuthError::from_api(e, "subscription upgrade failed"))?;
        let user: User = profile.into();

        let mut state = self.state.lock().await;
        if let Identity::Authenticated { token: current, .. } = &state.identity {
            if *current == token {
                state.identity = Identity::Authenticated {
                    user: user.clone(),
                    token,
                };
            }
        }
        drop(state);

        info!(user_id = %user.id, "subscription upgraded");
        self.emit(SessionEvent::ProfileRefreshed { user: user.clone() });
        Ok(user)
    }

    /// Shared success path of register/login: persist the token, then commit
    /// the authenticated identity.  Guest mode is cleared atomically by the
    /// single identity write.
    async fn commit_auth(&self, email: &str, resp: AuthResponse) -> Result<User, AuthError> {
        if let Err(e) = self.tokens.save(&resp.access_token) {
            self.set_loading(false).await;
            return Err(AuthError::Storage(e));
        }

        let user = User {
            id: resp.user_id,
            email: email.to_string(),
            subscription_tier: resp.subscription_tier,
            subscription_expires_at: None,
        };
        let token = Token::new(resp.access_token);

        let mut state = self.state.lock().await;
        state.identity = Identity::Authenticated {
            user: user.clone(),
            token,
        };
        state.is_loading = false;
        drop(state);

        info!(user_id = %user.id, "authenticated");
        self.emit(SessionEvent::Authenticated { user: user.clone() });
        Ok(user)
    }

    async fn set_loading(&self, loading: bool) {
        self.state.lock().await.is_loading = loading;
    }

    /// Non-blocking emit: a lagging or absent observer must never stall a
    /// session operation.
    fn emit(&self, event: SessionEvent) {
        if self.events.try_send(event).is_err() {
            debug!("session event dropped (no observer or channel full)");
        }
    }
}

/// Defensive payload check.  Business-rule validation (password length,
/// email format, terms acceptance) belongs to the UI collaborator; this only
/// rejects payloads no backend call could accept.
fn validate_credentials(email: &str, password: &str) -> Result<(), AuthError> {
    if email.trim().is_empty() {
        return Err(AuthError::Validation("email must not be empty".to_string()));
    }
    if !email.contains('@') {
        return Err(AuthError::Validation("email is malformed".to_string()));
    }
    if password.is_empty() {
        return Err(AuthError::Validation("password must not be empty".to_string()));
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
