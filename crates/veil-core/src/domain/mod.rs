//! Domain entities for the Veil client.
//!
//! This module contains pure business types with no infrastructure
//! dependencies.
//!
//! # What is "domain" in Clean Architecture? (for beginners)
//!
//! Clean Architecture organises code into concentric layers.  The innermost
//! layer is called the **domain** (or "entities" layer).  Domain code:
//!
//! - Contains the core business rules of the application.
//! - Has **no** imports from OS APIs, network libraries, storage drivers, or
//!   UI frameworks.
//! - Can be compiled and tested on any platform without any external setup.
//!
//! For Veil the domain is small but load-bearing: the identity modes that the
//! session lifecycle transitions between, and the server catalog entry plus
//! connection status that the connect/disconnect state machine operates on.
//! Code in outer layers (infrastructure, application, UI) depends on the
//! domain, but the domain never depends on them.

/// Identity modes, the user record, and the bearer token.
pub mod identity;

/// Server catalog entries, protocol kinds, and connection status.
pub mod server;
