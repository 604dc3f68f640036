//! Frame and window switching methods.

use serde_json::Value;
use tracing::debug;

use crate::browser::Element;
use crate::error::{Error, Result};
use crate::identifiers::WindowHandle;
use crate::protocol::{Command, FrameTarget, WindowKind, WindowRect};

use super::Session;

// ============================================================================
// Session - Frames
// ============================================================================

impl Session {
    /// Switches to a child frame, or back to the top document.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use firefox_marionette::FrameTarget;
    ///
    /// session.switch_to_frame(FrameTarget::Index(0)).await?;
    /// // ...
    /// session.switch_to_frame(FrameTarget::Top).await?;
    /// ```
    pub async fn switch_to_frame(&self, target: FrameTarget) -> Result<()> {
        debug!(?target, "Switching frame");
        self.call(Command::SwitchToFrame { target }).await?;
        Ok(())
    }

    /// Switches to the frame owned by an `<iframe>` element.
    pub async fn switch_to_frame_element(&self, frame: &Element) -> Result<()> {
        self.switch_to_frame(FrameTarget::Element(frame.id().clone()))
            .await
    }

    /// Switches to the parent of the current frame.
    pub async fn switch_to_parent_frame(&self) -> Result<()> {
        debug!("Switching to parent frame");
        self.call(Command::SwitchToParentFrame).await?;
        Ok(())
    }
}

// ============================================================================
// Session - Windows
// ============================================================================

impl Session {
    /// Returns the handle of the current window.
    pub async fn window_handle(&self) -> Result<WindowHandle> {
        let value = self.call(Command::GetWindowHandle).await?;
        parse_handle(&value)
    }

    /// Returns the handles of all open windows.
    pub async fn window_handles(&self) -> Result<Vec<WindowHandle>> {
        let value = self.call(Command::GetWindowHandles).await?;
        match value {
            Value::Array(items) => items.iter().map(parse_handle).collect(),
            other => Err(Error::protocol(format!(
                "Expected handle array, got {other}"
            ))),
        }
    }

    /// Switches to another window.
    pub async fn switch_to_window(&self, handle: &WindowHandle) -> Result<()> {
        debug!(handle = %handle, "Switching window");
        self.call(Command::SwitchToWindow {
            handle: handle.clone(),
        })
        .await?;
        Ok(())
    }

    /// Opens a new tab or window and returns its handle.
    ///
    /// The current window stays selected.
    pub async fn new_window(&self, kind: WindowKind) -> Result<WindowHandle> {
        let value = self.call(Command::NewWindow { kind }).await?;
        let handle = value
            .get("handle")
            .map_or_else(|| parse_handle(&value), parse_handle)?;
        debug!(handle = %handle, ?kind, "Window opened");
        Ok(handle)
    }

    /// Closes the current window and returns the remaining handles.
    pub async fn close_window(&self) -> Result<Vec<WindowHandle>> {
        debug!("Closing window");
        let value = self.call(Command::CloseWindow).await?;
        Ok(value
            .as_array()
            .map(|items| items.iter().filter_map(|v| parse_handle(v).ok()).collect())
            .unwrap_or_default())
    }

    /// Returns the window position and size.
    pub async fn window_rect(&self) -> Result<WindowRect> {
        let value = self.call(Command::GetWindowRect).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Moves and resizes the window, returning the applied rect.
    pub async fn set_window_rect(&self, rect: WindowRect) -> Result<WindowRect> {
        let value = self.call(Command::SetWindowRect { rect }).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Maximizes the window, returning the resulting rect.
    pub async fn maximize_window(&self) -> Result<WindowRect> {
        let value = self.call(Command::MaximizeWindow).await?;
        Ok(serde_json::from_value(value)?)
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn parse_handle(value: &Value) -> Result<WindowHandle> {
    value
        .as_str()
        .map(WindowHandle::new)
        .ok_or_else(|| Error::protocol(format!("Expected window handle, got {value}")))
}

// ============================================================================
// Tests
// ============================================================================
