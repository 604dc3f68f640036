//! Marionette wire protocol.
//!
//! This module defines the framing and message shapes exchanged with the
//! remote end over a raw TCP stream.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Shape |
//! |--------------|-----------|-------|
//! | Command | Local → Remote | `[0, id, name, params]` |
//! | Response | Remote → Local | `[1, id, error, result]` |
//! | Event | Remote → Local | `[2, ..., payload]` |
//!
//! Each message body is framed as `"{byte length}:{body}"`.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `codec` | Length-prefixed framing |
//! | `command` | Command definitions |
//! | `event` | Event routing and subscriptions |
//! | `message` | Requests, responses, replies |

// ============================================================================
// Submodules
// ============================================================================

/// Length-prefixed frame codec.
pub mod codec;

/// Command definitions.
pub mod command;

/// Event routing.
pub mod event;

/// Request, response and reply types.
pub mod message;

// ============================================================================
// Re-exports
// ============================================================================

pub use codec::{FrameReader, encode};
pub use command::{
    Command, Context, Cookie, ElementRect, FrameTarget, ScriptParams, WindowKind, WindowRect,
};
pub use event::{Event, Listener, Subscriptions};
pub use message::{Handshake, Message, Reply, Request, RequestKind, Response, Status};
