//! # veil-core
//!
//! Shared library for the Veil VPN client containing the domain entities
//! and the backend wire contracts.
//!
//! This crate is the foundation consumed by the client application crate.
//! It has zero dependencies on OS APIs, UI frameworks, or network sockets.
//!
//! # Architecture overview (for beginners)
//!
//! Veil is a VPN/proxy client: the user browses a catalog of remote access
//! servers, picks one, and toggles a logical connection, while separately
//! holding an authenticated or guest identity session against the backend.
//!
//! This crate (`veil-core`) defines:
//!
//! - **`domain`** – Pure business types with no infrastructure dependencies:
//!   the identity modes (`Unauthenticated` / `Guest` / `Authenticated`), the
//!   user record, the bearer token, the server catalog entry, and the
//!   connection status state machine's states.
//!
//! - **`api`** – The request and response shapes of the backend REST API.
//!   These are serde DTOs only; the HTTP plumbing lives in the client crate.

pub mod api;
pub mod domain;

// Re-export the most-used types at the crate root so callers can write
// `veil_core::Identity` instead of `veil_core::domain::identity::Identity`.
pub use api::ApiError;
pub use domain::identity::{Identity, SubscriptionTier, Token, User};
pub use domain::server::{
    filter_catalog, CatalogFilter, ConnectionStatus, ProtocolKind, ServerEntry,
};
