//! Browser preference store.
//!
//! The driver only needs a handful of preferences: it reads the Marionette
//! port and writes the capability flags the remote end must have set
//! before it starts. Where the values live (a profile's `user.js`, a
//! remote config service, memory) is up to the [`PreferenceStore`]
//! implementation.
//!
//! # Example
//!
//! ```
//! use firefox_marionette::driver::{MemoryPreferences, PreferenceStore, PreferenceValue};
//!
//! let prefs = MemoryPreferences::new().with("marionette.port", 2829_i32);
//! assert_eq!(prefs.get("marionette.port").unwrap(), Some(PreferenceValue::Int(2829)));
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::error::Result;

// ============================================================================
// Keys
// ============================================================================

/// Port the Marionette server listens on.
pub const MARIONETTE_PORT_PREF: &str = "marionette.port";

/// Multiprocess (e10s) content.
pub const MULTIPROCESS_PREF: &str = "browser.tabs.remote.autostart";

/// Remote debugging.
pub const REMOTE_DEBUGGING_PREF: &str = "devtools.debugger.remote-enabled";

// ============================================================================
// PreferenceValue
// ============================================================================

/// A preference value.
///
/// Firefox preferences are booleans, integers or strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PreferenceValue {
    /// Boolean value.
    Bool(bool),

    /// Integer value.
    Int(i32),

    /// String value.
    String(String),
}

impl PreferenceValue {
    /// Returns the integer value, parsing numeric strings.
    #[must_use]
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Self::Int(i) => Some(*i),
            Self::String(s) => s.trim().parse().ok(),
            Self::Bool(_) => None,
        }
    }

    /// Returns the boolean value.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for PreferenceValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::String(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<bool> for PreferenceValue {
    #[inline]
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for PreferenceValue {
    #[inline]
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<u16> for PreferenceValue {
    #[inline]
    fn from(value: u16) -> Self {
        Self::Int(i32::from(value))
    }
}

impl From<String> for PreferenceValue {
    #[inline]
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for PreferenceValue {
    #[inline]
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

// ============================================================================
// PreferenceStore
// ============================================================================

/// A string-keyed preference store.
pub trait PreferenceStore: Send + Sync {
    /// Reads a preference.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store could not be read.
    fn get(&self, key: &str) -> Result<Option<PreferenceValue>>;

    /// Writes a preference.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store could not be written.
    fn set(&self, key: &str, value: PreferenceValue) -> Result<()>;

    /// Writes several preferences.
    ///
    /// # Errors
    ///
    /// Stops at the first failed write.
    fn merge(&self, values: Vec<(String, PreferenceValue)>) -> Result<()> {
        for (key, value) in values {
            self.set(&key, value)?;
        }
        Ok(())
    }
}

// ============================================================================
// MemoryPreferences
// ============================================================================

/// In-memory [`PreferenceStore`].
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    values: RwLock<FxHashMap<String, PreferenceValue>>,
}

impl MemoryPreferences {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a value, builder style.
    #[must_use]
    pub fn with(self, key: impl Into<String>, value: impl Into<PreferenceValue>) -> Self {
        self.values.write().insert(key.into(), value.into());
        self
    }

    /// Returns the number of stored values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }
}

impl PreferenceStore for MemoryPreferences {
    fn get(&self, key: &str) -> Result<Option<PreferenceValue>> {
        Ok(self.values.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: PreferenceValue) -> Result<()> {
        self.values.write().insert(key.to_string(), value);
        Ok(())
    }

    fn merge(&self, values: Vec<(String, PreferenceValue)>) -> Result<()> {
        self.values.write().extend(values);
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
