//! Event routing.
//!
//! Events are unsolicited payloads pushed by the remote end. Each payload
//! names its audience in a `to` field; every [`Listener`] subscribed under
//! that key receives it.
//!
//! # Example
//!
//! ```
//! use firefox_marionette::protocol::{Event, Listener, Subscriptions};
//! use serde_json::json;
//!
//! let subscriptions = Subscriptions::new();
//! let listener = Listener::new(|event: &Event| println!("{}", event.payload));
//! subscriptions.subscribe("network", &listener);
//!
//! let event = Event::from_payload(json!({ "to": "network", "url": "/" })).unwrap();
//! assert_eq!(subscriptions.dispatch(&event), 1);
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::{trace, warn};

// ============================================================================
// Event
// ============================================================================

/// A routed event payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Routing key taken from the payload's `to` field.
    pub to: String,
    /// The full payload.
    pub payload: Value,
}

impl Event {
    /// Builds an event from a payload.
    ///
    /// Returns `None` when the payload has no string `to` field.
    #[must_use]
    pub fn from_payload(payload: Value) -> Option<Self> {
        let to = payload.get("to")?.as_str()?.to_string();
        Some(Self { to, payload })
    }

    /// Returns a field of the payload.
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }
}

// ============================================================================
// Listener
// ============================================================================

/// Callback type invoked for each routed event.
type Callback = dyn Fn(&Event) + Send + Sync;

/// A subscribable event callback.
///
/// Clones share identity: unsubscribing any clone removes them all.
#[derive(Clone)]
pub struct Listener {
    callback: Arc<Callback>,
}

impl Listener {
    /// Wraps a callback.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(callback),
        }
    }

    /// Returns `true` if both handles wrap the same callback.
    #[inline]
    #[must_use]
    pub fn same_as(&self, other: &Listener) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.callback), Arc::as_ptr(&other.callback))
    }

    fn call(&self, event: &Event) {
        (self.callback)(event);
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("callback", &Arc::as_ptr(&self.callback))
            .finish()
    }
}

// ============================================================================
// Subscriptions
// ============================================================================

/// Registry of `(routing key, listener)` pairs.
///
/// Dispatch iterates a snapshot, so listeners may subscribe or unsubscribe
/// from inside a callback.
#[derive(Debug, Default)]
pub struct Subscriptions {
    entries: RwLock<Vec<(String, Listener)>>,
}

impl Subscriptions {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener under a routing key.
    ///
    /// Returns `false` if that exact pair was already registered.
    pub fn subscribe(&self, key: impl Into<String>, listener: &Listener) -> bool {
        let key = key.into();
        let mut entries = self.entries.write();

        if entries
            .iter()
            .any(|(k, l)| *k == key && l.same_as(listener))
        {
            return false;
        }

        trace!(key = %key, "Listener subscribed");
        entries.push((key, listener.clone()));
        true
    }

    /// Removes a listener from every key it is registered under.
    ///
    /// Returns the number of removed registrations.
    pub fn unsubscribe(&self, listener: &Listener) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|(_, l)| !l.same_as(listener));
        before - entries.len()
    }

    /// Delivers an event to every listener registered under its key.
    ///
    /// A panicking listener is logged and skipped; the rest still run.
    /// Returns the number of listeners invoked.
    pub fn dispatch(&self, event: &Event) -> usize {
        let targets: Vec<Listener> = self
            .entries
            .read()
            .iter()
            .filter(|(key, _)| *key == event.to)
            .map(|(_, listener)| listener.clone())
            .collect();

        for listener in &targets {
            if catch_unwind(AssertUnwindSafe(|| listener.call(event))).is_err() {
                warn!(to = %event.to, "Event listener panicked");
            }
        }

        if targets.is_empty() {
            trace!(to = %event.to, "No listener for event");
        }

        targets.len()
    }

    /// Returns the number of registrations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================
