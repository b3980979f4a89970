//! Identity modes and the user/credential records.
//!
//! The client is always in exactly one of three mutually exclusive identity
//! modes.  Modelling the mode as an enum (rather than a pair of booleans the
//! way a loosely-typed store would) makes that exclusivity structural: there
//! is no representable state where the session is both guest and
//! authenticated.
//!
//! ```text
//! Unauthenticated ──register/login/restore──► Authenticated
//!        │  ▲                                      │
//!        │  └───────logout / restore-failure───────┘
//!        ▼
//!      Guest ──────────register/login─────────► Authenticated
//! ```
//!
//! Guest mode is terminal until the user authenticates: there is no
//! transition from `Guest` back to `Unauthenticated`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Subscription tier of a registered user.
///
/// Serialized lowercase to match the backend wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    Free,
    Premium,
}

/// A registered user as returned by the backend.
///
/// The record is immutable from the client's point of view: profile refresh,
/// login, and registration replace the whole value, never patch fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub subscription_tier: SubscriptionTier,
    /// ISO-8601 expiry of a premium subscription, passed through opaquely.
    /// The core never interprets this value; the presentation layer formats it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_expires_at: Option<String>,
}

impl User {
    /// Whether the user may select premium-flagged servers.
    pub fn is_premium(&self) -> bool {
        self.subscription_tier == SubscriptionTier::Premium
    }
}

/// Opaque bearer credential issued by the backend.
///
/// Owned exclusively by the session layer; never handed to the connection
/// layer or serialized into UI snapshots.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The raw credential string, for the `Authorization` header.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Token {
    // The credential must not leak into logs or panic messages.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(***)")
    }
}

/// The current identity mode of the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// Process-start default; also the post-logout and restore-failure state.
    Unauthenticated,
    /// Catalog access without credentials; terminal until authentication.
    Guest,
    /// A logged-in user together with their bearer credential.
    Authenticated { user: User, token: Token },
}

impl Identity {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Identity::Authenticated { .. })
    }

    pub fn is_guest(&self) -> bool {
        matches!(self, Identity::Guest)
    }

    /// The user record, if authenticated.
    pub fn user(&self) -> Option<&User> {
        match self {
            Identity::Authenticated { user, .. } => Some(user),
            _ => None,
        }
    }

    /// The bearer credential, if authenticated.
    pub fn token(&self) -> Option<&Token> {
        match self {
            Identity::Authenticated { token, .. } => Some(token),
            _ => None,
        }
    }
}

impl Default for Identity {
    fn default() -> Self {
        Identity::Unauthenticated
    }
}
