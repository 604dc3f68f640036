//! Timeout configuration methods.

use std::time::Duration;

use tracing::debug;

use crate::browser::timeouts::{TimeoutKind, Timeouts};
use crate::error::Result;
use crate::protocol::Command;

use super::Session;

// ============================================================================
// Session - Timeouts
// ============================================================================

impl Session {
    /// Reads the remote timeouts.
    pub async fn timeouts(&self) -> Result<Timeouts> {
        let value = self.call(Command::GetTimeouts).await?;
        Ok(Timeouts::from_wire(&value))
    }

    /// Applies every set value of `timeouts`.
    ///
    /// A changed implicit wait also becomes the local lookup deadline, but
    /// only once the remote end accepted it.
    pub async fn set_timeouts(&self, timeouts: &Timeouts) -> Result<()> {
        if timeouts.is_empty() {
            return Ok(());
        }

        debug!(?timeouts, "Setting timeouts");
        self.call(Command::SetTimeouts {
            timeouts: timeouts.to_wire(),
        })
        .await?;

        if let Some(implicit) = timeouts.implicit {
            self.set_implicit_wait(implicit);
        }
        Ok(())
    }

    /// Applies a single timeout.
    pub async fn set_timeout(&self, kind: TimeoutKind, value: Duration) -> Result<()> {
        let mut timeouts = Timeouts::new();
        timeouts.set(kind, value);
        self.set_timeouts(&timeouts).await
    }
}

// ============================================================================
// Tests
// ============================================================================
