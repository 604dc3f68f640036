//! Screenshot capture methods.
//!
//! The remote end returns base64 PNG data; it is decoded to raw bytes but
//! never parsed as an image.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as Base64Standard;
use tracing::debug;

use crate::error::{Error, Result};
use crate::identifiers::ElementId;
use crate::protocol::Command;

use super::Session;

// ============================================================================
// Session - Screenshot
// ============================================================================

impl Session {
    /// Captures the current document as PNG bytes.
    pub async fn screenshot(&self) -> Result<Vec<u8>> {
        self.capture(None).await
    }

    pub(crate) async fn capture(&self, element: Option<ElementId>) -> Result<Vec<u8>> {
        debug!(element_id = ?element, "Capturing screenshot");

        let value = self.call(Command::TakeScreenshot { element }).await?;
        let data = value
            .as_str()
            .ok_or_else(|| Error::protocol("Screenshot payload is not a string"))?;

        Base64Standard
            .decode(data)
            .map_err(|e| Error::protocol(format!("Invalid screenshot data: {e}")))
    }
}

// ============================================================================
// Tests
// ============================================================================
