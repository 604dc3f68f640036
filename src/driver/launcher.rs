//! Browser process collaborators.
//!
//! This crate does not build command lines or spawn binaries itself. A
//! [`Launcher`] starts a browser listening on the given Marionette port and
//! hands back a [`BrowserProcess`] the driver closes on teardown.

use async_trait::async_trait;

use crate::error::Result;

// ============================================================================
// Traits
// ============================================================================

/// Starts a browser whose Marionette server listens on `port`.
#[async_trait]
pub trait Launcher: Send + Sync {
    /// Launches the browser.
    ///
    /// # Errors
    ///
    /// Implementations should return [`Error::Launch`](crate::Error::Launch).
    async fn launch(&self, port: u16) -> Result<Box<dyn BrowserProcess>>;
}

/// A running browser.
#[async_trait]
pub trait BrowserProcess: Send + Sync {
    /// Returns the OS process id, if known.
    fn id(&self) -> Option<u32> {
        None
    }

    /// Stops the browser.
    ///
    /// # Errors
    ///
    /// Returns an error if the process could not be stopped.
    async fn close(&mut self) -> Result<()>;
}
