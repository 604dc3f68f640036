//! Error types for the Marionette client.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use firefox_marionette::{By, Result};
//!
//! async fn example(session: &Session) -> Result<()> {
//!     let element = session.find_element(By::css("#submit")).await?;
//!     element.click().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::InvalidArgument`], [`Error::Launch`] |
//! | Connection | [`Error::ConnectFailed`], [`Error::NotConnected`], [`Error::ConnectionClosed`] |
//! | Protocol | [`Error::Protocol`] |
//! | Remote | [`Error::Remote`] |
//! | Element | [`Error::NoSuchElement`] |
//! | Execution | [`Error::Cancelled`], [`Error::Timeout`] |
//! | External | [`Error::Io`], [`Error::Json`] |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::io::Error as IoError;
use std::net::SocketAddr;
use std::result::Result as StdResult;

use serde_json::Value;
use thiserror::Error;

use crate::identifiers::CommandId;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// RemoteError
// ============================================================================

/// Error payload returned by the remote engine.
///
/// Marionette reports failures as `{"error": .., "message": .., "stacktrace": ..}`.
/// The original payload is kept verbatim in [`RemoteError::raw`].
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteError {
    /// Error code (e.g. `no such element`).
    pub error: String,
    /// Human readable message.
    pub message: String,
    /// Remote stack trace, when supplied.
    pub stacktrace: Option<String>,
    /// The untouched error payload.
    pub raw: Value,
}

impl RemoteError {
    /// Builds a remote error from the error slot of a response.
    ///
    /// Objects are read field by field; any other JSON value is used as the
    /// error code in its textual form.
    #[must_use]
    pub fn from_value(raw: Value) -> Self {
        let text = |key: &str| {
            raw.get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
        };

        let (error, message, stacktrace) = match &raw {
            Value::Object(_) => (
                text("error").unwrap_or_else(|| "unknown error".to_string()),
                text("message").unwrap_or_default(),
                text("stacktrace").filter(|s| !s.is_empty()),
            ),
            Value::String(s) => (s.clone(), String::new(), None),
            other => (other.to_string(), String::new(), None),
        };

        Self {
            error,
            message,
            stacktrace,
            raw,
        }
    }

    /// Returns `true` if the remote reported a missing element.
    #[inline]
    #[must_use]
    pub fn is_no_such_element(&self) -> bool {
        self.error == "no such element"
    }

    /// Returns `true` if the remote reported a stale element reference.
    #[inline]
    #[must_use]
    pub fn is_stale_element(&self) -> bool {
        self.error == "stale element reference"
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.error)?;
        } else {
            write!(f, "{}: {}", self.error, self.message)?;
        }
        if let Some(stack) = &self.stacktrace {
            write!(f, "\n{stack}")?;
        }
        Ok(())
    }
}

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when driver configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// An argument was rejected before anything was sent.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the rejected argument.
        message: String,
    },

    /// The browser launcher collaborator failed.
    #[error("Failed to launch browser: {message}")]
    Launch {
        /// Description of the launch failure.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// TCP connect failed after all attempts.
    ///
    /// Carries the error of the last attempt.
    #[error("Failed to connect to {addr} after {attempts} attempts: {source}")]
    ConnectFailed {
        /// Endpoint that was dialled.
        addr: SocketAddr,
        /// Number of attempts made.
        attempts: u32,
        /// Error of the final attempt.
        #[source]
        source: IoError,
    },

    /// The transport is not connected.
    ///
    /// Returned when a request is issued before connecting or after close.
    #[error("Not connected")]
    NotConnected,

    /// Connection closed while the operation was in flight.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Malformed frame, undecodable JSON or unexpected message shape.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    // ========================================================================
    // Remote Errors
    // ========================================================================
    /// The remote engine answered with an error payload.
    #[error("Remote error: {0}")]
    Remote(RemoteError),

    // ========================================================================
    // Element Errors
    // ========================================================================
    /// No element matched before the lookup deadline.
    #[error("No such element: using={strategy}, value={expression}")]
    NoSuchElement {
        /// Locator strategy used.
        strategy: String,
        /// Locator expression used.
        expression: String,
    },

    // ========================================================================
    // Execution Errors
    // ========================================================================
    /// The caller cancelled while waiting for a reply.
    #[error("Command {id} cancelled")]
    Cancelled {
        /// Id of the abandoned command.
        id: CommandId,
    },

    /// Operation timeout.
    #[error("Timeout after {timeout_ms}ms: {operation}")]
    Timeout {
        /// Description of the operation that timed out.
        operation: String,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    #[inline]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a launch error.
    #[inline]
    pub fn launch(message: impl Into<String>) -> Self {
        Self::Launch {
            message: message.into(),
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates a remote error from an error payload.
    #[inline]
    pub fn remote(raw: Value) -> Self {
        Self::Remote(RemoteError::from_value(raw))
    }

    /// Creates a no such element error.
    #[inline]
    pub fn no_such_element(strategy: impl Into<String>, expression: impl Into<String>) -> Self {
        Self::NoSuchElement {
            strategy: strategy.into(),
            expression: expression.into(),
        }
    }

    /// Creates a timeout error.
    #[inline]
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns `true` if the caller cancelled the operation.
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Returns `true` if the remote engine reported the failure.
    #[inline]
    #[must_use]
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }

    /// Returns `true` if this is a connection error.
    ///
    /// Connection errors mean the channel itself is unusable.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::ConnectFailed { .. } | Self::NotConnected | Self::ConnectionClosed
        )
    }

    /// Returns the remote error payload, if any.
    #[inline]
    #[must_use]
    pub fn remote_error(&self) -> Option<&RemoteError> {
        match self {
            Self::Remote(err) => Some(err),
            _ => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
