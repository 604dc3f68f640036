//! Connected browser handle.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::browser::{EventChannel, Session};
use crate::protocol::Listener;

use super::launcher::BrowserProcess;

// ============================================================================
// Types
// ============================================================================

struct BrowserInner {
    session: Session,
    event_channel: Option<EventChannel>,
    process: Mutex<Option<Box<dyn BrowserProcess>>>,
}

// ============================================================================
// Browser
// ============================================================================

/// A browser with an established session.
///
/// Returned by [`Driver::connect`](super::Driver::connect). Without an
/// event channel, listeners only see events sent on the primary
/// connection.
#[derive(Clone)]
pub struct Browser {
    inner: Arc<BrowserInner>,
}

impl fmt::Debug for Browser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Browser")
            .field("session", &self.inner.session)
            .field("event_channel", &self.inner.event_channel)
            .finish_non_exhaustive()
    }
}

impl Browser {
    pub(crate) fn new(
        session: Session,
        event_channel: Option<EventChannel>,
        process: Option<Box<dyn BrowserProcess>>,
    ) -> Self {
        Self {
            inner: Arc::new(BrowserInner {
                session,
                event_channel,
                process: Mutex::new(process),
            }),
        }
    }

    /// Returns the session.
    #[inline]
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    /// Returns the event channel, `None` in reduced mode.
    #[inline]
    #[must_use]
    pub fn event_channel(&self) -> Option<&EventChannel> {
        self.inner.event_channel.as_ref()
    }

    /// Registers a listener for events routed to `key`.
    ///
    /// Returns `false` if that exact pair was already registered.
    pub fn subscribe(&self, key: impl Into<String>, listener: &Listener) -> bool {
        self.inner.session.client().subscriptions().subscribe(key, listener)
    }

    /// Removes a listener from every key; returns the number removed.
    pub fn unsubscribe(&self, listener: &Listener) -> usize {
        self.inner.session.client().subscriptions().unsubscribe(listener)
    }

    /// Tears everything down.
    ///
    /// Ends the session (best effort), closes both connections, then closes
    /// the launched process. Errors are logged, not returned.
    pub async fn close(&self) {
        let session = &self.inner.session;

        if session.client().is_connected()
            && let Err(e) = session.end().await
        {
            warn!(error = %e, "Failed to end session");
        }

        if let Some(channel) = &self.inner.event_channel {
            channel.shutdown().await;
        }
        session.client().shutdown().await;

        let process = self.inner.process.lock().take();
        if let Some(mut process) = process
            && let Err(e) = process.close().await
        {
            warn!(error = %e, "Failed to close browser process");
        }

        debug!("Browser closed");
    }
}
