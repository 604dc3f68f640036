//! TCP transport layer.
//!
//! This module carries framed messages between the local end (Rust) and the
//! remote end (the Marionette server inside Firefox).
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Session (Rust) │                              │  Firefox        │
//! │                 │         TCP (framed)         │                 │
//! │  Client         │◄────────────────────────────►│  Marionette     │
//! │  → Connection   │      localhost:2828          │  server         │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `Connection::connect` - Dial with bounded retries, start I/O loops
//! 2. `Client::new` - Start dispatching responses and events
//! 3. `Client::send` - Correlate commands with their responses
//! 4. `Client::shutdown` - Close the socket, fail pending requests
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | TCP connection and send/receive loops |
//! | `client` | Request correlation and event dispatch |

// ============================================================================
// Submodules
// ============================================================================

/// TCP connection and I/O loops.
pub mod connection;

/// Request correlation client.
pub mod client;

#[cfg(test)]
pub(crate) mod stub;

// ============================================================================
// Re-exports
// ============================================================================

pub use client::Client;
pub use connection::{
    ConnectOptions, Connection, ConnectionState, DEFAULT_CONNECT_ATTEMPTS, DEFAULT_RETRY_DELAY,
    TransportEvent, TransportEvents,
};
