//! Infrastructure layer for the Veil client.
//!
//! Contains the outward-facing adapters: the backend REST client, the
//! on-disk credential/config storage, the tunnel transport, and the UI
//! bridge.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `veil_core`, but MUST NOT be imported by the `application` or domain
//! layers – those only see the traits they declared.
//!
//! # Sub-modules
//!
//! - **`api`** – `RestApiClient`, the reqwest-backed implementation of the
//!   `AuthApi` and `CatalogApi` traits against the configured backend base
//!   URL.
//!
//! - **`storage`** – `FileTokenStore` (the persisted bearer token, a single
//!   fixed key in a TOML credentials file) and the `AppConfig` TOML
//!   configuration, both living in the platform config directory.
//!
//! - **`transport`** – `SimulatedTransport`, the fixed-delay stand-in for a
//!   real tunnel handshake.
//!
//! - **`ui_bridge`** – serializable snapshots and command functions for the
//!   presentation layer, including the premium-gating rule that runs before
//!   a selection intent reaches the ConnectionManager.

pub mod api;
pub mod storage;
pub mod transport;
pub mod ui_bridge;
