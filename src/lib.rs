//! Firefox Marionette - async client for Firefox's remote automation protocol.
//!
//! This library drives Firefox through Marionette: a length-prefixed JSON
//! protocol spoken over a raw TCP connection.
//!
//! # Architecture
//!
//! The client is layered bottom-up:
//!
//! - **Frame codec**: `"{byte length}:{json}"` framing over a byte stream
//! - **Transport connection**: TCP socket plus one send and one receive task
//! - **Correlation client**: matches `[1, id, error, result]` responses to
//!   waiting callers by command id and routes `[2, ..., payload]` events
//! - **Session driver**: navigation, element lookup with polling, scripts,
//!   frames, windows, timeouts, cookies
//! - **Event channel**: an optional second connection carrying only events
//!
//! Key design principles:
//!
//! - Many commands may be in flight on one connection; each gets its own id
//! - A dropped connection fails every pending call with a closed condition
//! - Cancellation abandons the wait for a reply; it never retracts a command
//! - Remote errors keep their payload verbatim
//!
//! # Quick Start
//!
//! ```no_run
//! use firefox_marionette::{By, Driver, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     // Connect to a browser started with --marionette
//!     let browser = Driver::builder().port(2828).build()?.connect().await?;
//!     let session = browser.session();
//!
//!     // Navigate and interact
//!     session.navigate("https://example.com").await?;
//!     let heading = session.find_element(By::css("h1")).await?;
//!     println!("Heading: {}", heading.text().await?);
//!
//!     browser.close().await;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`browser`] | Session driver: [`Session`], [`Element`], [`EventChannel`] |
//! | [`driver`] | Driver factory, configuration, collaborators |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Framing, commands, messages, events |
//! | [`transport`] | TCP connection and correlation client |

// ============================================================================
// Modules
// ============================================================================

/// Session driver: Session, Element, EventChannel.
///
/// - [`Session`] - navigation, lookups, scripts, windows
/// - [`Element`] - DOM element reference
/// - [`EventChannel`] - secondary push-event connection
pub mod browser;

/// Driver factory and configuration.
///
/// Use [`Driver::builder()`] to create a configured driver instance.
pub mod driver;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
///
/// Newtype wrappers prevent mixing incompatible IDs at compile time.
pub mod identifiers;

/// Marionette wire protocol.
///
/// Framing, the command set, and message and event types.
pub mod protocol;

/// TCP transport layer.
///
/// Connection lifecycle and request/response correlation.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Browser types
pub use browser::{
    By, Cookie, Element, EventChannel, EventChannelOptions, FindOptions, Key, Script, Session,
    TimeoutKind, Timeouts,
};

// Driver types
pub use driver::{Browser, Driver, DriverBuilder, Launcher, MemoryPreferences, PreferenceStore};

// Error types
pub use error::{Error, RemoteError, Result};

// Identifier types
pub use identifiers::{CommandId, ElementId, WindowHandle};

// Protocol types
pub use protocol::{
    Command, Context, Event, FrameTarget, Listener, Reply, Status, WindowKind, WindowRect,
};

// Transport types
pub use transport::{Client, ConnectOptions, Connection};
