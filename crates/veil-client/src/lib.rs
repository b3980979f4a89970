//! veil-client library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does veil-client do? (for beginners)
//!
//! Veil is a VPN/proxy client.  The user browses a catalog of remote access
//! servers fetched from the backend, selects one, and toggles a logical
//! connection, while separately holding an authenticated or guest identity
//! session.  This crate is the orchestration layer behind that experience:
//!
//! 1. The **SessionManager** owns the identity lifecycle: register, login,
//!    logout, restoring a persisted token at startup, refreshing the profile,
//!    and the guest fallback.
//! 2. The **ConnectionManager** owns the server catalog and the
//!    connect/disconnect state machine
//!    (`disconnected → connecting → connected → disconnecting`).
//! 3. The infrastructure adapters supply the collaborators both managers are
//!    constructed with: the backend REST client, the on-disk token store,
//!    and the (currently simulated) tunnel transport.
//! 4. The `ui_bridge` module is the seam a presentation layer talks to: it
//!    reads serializable snapshots and dispatches user intents.
//!
//! The presentation layer itself (screens, styling, navigation) is not part
//! of this crate; it consumes it.

/// Application layer: the session and connection use cases.
pub mod application;

/// Infrastructure layer: REST client, storage, transport, and UI bridge.
pub mod infrastructure;
