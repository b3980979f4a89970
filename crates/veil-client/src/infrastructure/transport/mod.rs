//! Tunnel transport: the simulated stand-in for a real handshake.
//!
//! # Why simulated? (for beginners)
//!
//! The connection state machine only needs *something that takes time and
//! can fail* at its two suspend points.  Actual tunnel establishment
//! (key exchange, routing, interface configuration) is a separate concern
//! with heavy platform dependencies; until it lands, the
//! [`SimulatedTransport`] sleeps a configured delay and reports success,
//! which exercises every state transition the UI can observe.
//!
//! Because the application layer talks to the [`Transport`] trait and awaits
//! a `Result`, swapping this module for a real implementation changes no
//! state-machine code at all – the failure edge is already wired.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time;
use tracing::debug;

use veil_core::ServerEntry;

use crate::application::connection::{Transport, TransportError};
use crate::infrastructure::storage::config::TunnelConfig;

/// Fixed-delay transport simulating connect/disconnect latency.
pub struct SimulatedTransport {
    connect_delay: Duration,
    disconnect_delay: Duration,
}

impl SimulatedTransport {
    /// Creates a transport with the classic 2s connect / 1s disconnect feel.
    pub fn new() -> Self {
        Self::from_config(&TunnelConfig::default())
    }

    pub fn from_config(config: &TunnelConfig) -> Self {
        Self {
            connect_delay: Duration::from_millis(config.connect_delay_ms),
            disconnect_delay: Duration::from_millis(config.disconnect_delay_ms),
        }
    }
}

impl Default for SimulatedTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for SimulatedTransport {
    async fn establish(&self, server: &ServerEntry) -> Result<(), TransportError> {
        debug!(server_id = %server.id, delay = ?self.connect_delay, "simulating tunnel establishment");
        time::sleep(self.connect_delay).await;
        Ok(())
    }

    async fn teardown(&self) -> Result<(), TransportError> {
        debug!(delay = ?self.disconnect_delay, "simulating tunnel teardown");
        time::sleep(self.disconnect_delay).await;
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
