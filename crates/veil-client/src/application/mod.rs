//! Application layer use cases for the Veil client.
//!
//! # What use cases does the client have?
//!
//! - **`session`** – The single authority for "who is using the app and with
//!   what credential".  Owns the identity state machine
//!   (unauthenticated / guest / authenticated), the bearer token and its
//!   persistence, and every lifecycle transition: register, login, logout,
//!   startup restore, background profile refresh, and the guest fallback.
//!
//! - **`connection`** – Server discovery, selection, and the
//!   connect/disconnect state machine.  Depends on the session only through
//!   the calling collaborator (premium gating happens *before* a selection
//!   intent reaches it), which keeps the two managers decoupled.
//!
//! Both managers receive their collaborators (REST API, token store, tunnel
//! transport) by constructor injection as trait objects, so tests substitute
//! them freely, and both hand an event receiver back from their constructor
//! so observers can re-render from the latest snapshot.

pub mod connection;
pub mod session;
