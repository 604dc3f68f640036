//! Keyboard key definitions.
//!
//! WebDriver encodes non-printable keys as Unicode private-use codepoints
//! inside the text sent with `WebDriver:ElementSendKeys`.
//!
//! # Example
//!
//! ```ignore
//! use firefox_marionette::Key;
//!
//! // Navigation keys
//! element.press(Key::Enter).await?;
//! element.press(Key::Tab).await?;
//!
//! // Chords: modifiers stay down until Key::Null
//! element.send_keys(&format!("{}a{}", Key::Control, Key::Null)).await?;
//! ```

use std::fmt;

// ============================================================================
// Key Enum
// ============================================================================

/// Common keyboard keys for navigation and control.
///
/// For typing text, pass it to `send_keys` directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    // ========================================================================
    // Navigation & Control
    // ========================================================================
    /// Releases all held modifiers.
    Null,
    /// Enter/Return key
    Enter,
    /// Tab key
    Tab,
    /// Escape key
    Escape,
    /// Backspace key
    Backspace,
    /// Delete key
    Delete,
    /// Insert key
    Insert,
    /// Space bar
    Space,

    // ========================================================================
    // Modifiers
    // ========================================================================
    /// Shift
    Shift,
    /// Control
    Control,
    /// Alt
    Alt,
    /// Meta (Command on macOS)
    Meta,

    // ========================================================================
    // Arrow Keys
    // ========================================================================
    /// Arrow Up
    ArrowUp,
    /// Arrow Down
    ArrowDown,
    /// Arrow Left
    ArrowLeft,
    /// Arrow Right
    ArrowRight,

    // ========================================================================
    // Page Navigation
    // ========================================================================
    /// Home key
    Home,
    /// End key
    End,
    /// Page Up key
    PageUp,
    /// Page Down key
    PageDown,
}

impl Key {
    /// Returns the WebDriver codepoint for this key.
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Key::Null => '\u{E000}',
            Key::Backspace => '\u{E003}',
            Key::Tab => '\u{E004}',
            Key::Enter => '\u{E007}',
            Key::Shift => '\u{E008}',
            Key::Control => '\u{E009}',
            Key::Alt => '\u{E00A}',
            Key::Escape => '\u{E00C}',
            Key::Space => '\u{E00D}',
            Key::PageUp => '\u{E00E}',
            Key::PageDown => '\u{E00F}',
            Key::End => '\u{E010}',
            Key::Home => '\u{E011}',
            Key::ArrowLeft => '\u{E012}',
            Key::ArrowUp => '\u{E013}',
            Key::ArrowRight => '\u{E014}',
            Key::ArrowDown => '\u{E015}',
            Key::Insert => '\u{E016}',
            Key::Delete => '\u{E017}',
            Key::Meta => '\u{E03D}',
        }
    }

    /// Returns whether this key is a modifier.
    #[inline]
    #[must_use]
    pub fn is_modifier(self) -> bool {
        matches!(self, Key::Shift | Key::Control | Key::Alt | Key::Meta)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl From<Key> for char {
    fn from(key: Key) -> Self {
        key.as_char()
    }
}

// ============================================================================
// Tests
// ============================================================================
