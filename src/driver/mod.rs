//! Marionette driver module.
//!
//! This module turns configuration into a connected [`Browser`].
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Driver`] | Session factory |
//! | [`DriverBuilder`] | Fluent configuration builder |
//! | [`Browser`] | Connected session plus event channel |
//! | [`PreferenceStore`] | Port discovery and capability flags |
//! | [`Launcher`] | Starts the browser process |
//!
//! # Example
//!
//! ```no_run
//! use firefox_marionette::{Driver, Result};
//!
//! # async fn example() -> Result<()> {
//! let browser = Driver::builder().build()?.connect().await?;
//!
//! browser.session().navigate("https://example.com").await?;
//! browser.close().await;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Script assets injected into the remote runtime.
pub mod assets;

/// Connected browser handle.
pub mod browser;

/// Fluent builder pattern for driver configuration.
pub mod builder;

/// Session bootstrap.
pub mod core;

/// Browser process collaborators.
pub mod launcher;

/// Preference store.
pub mod preferences;

// ============================================================================
// Re-exports
// ============================================================================

pub use browser::Browser;
pub use builder::DriverBuilder;
pub use core::{DEFAULT_MARIONETTE_PORT, Driver};
pub use launcher::{BrowserProcess, Launcher};
pub use preferences::{MemoryPreferences, PreferenceStore, PreferenceValue};
