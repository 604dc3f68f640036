//! Browser automation module.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Session`] | Marionette session (navigation, scripts, windows) |
//! | [`Element`] | DOM element reference |
//! | [`By`] | Element locator |
//! | [`EventChannel`] | Secondary push-event connection |
//!
//! # Example
//!
//! ```no_run
//! use firefox_marionette::{By, Driver, Key, Result};
//!
//! # async fn example() -> Result<()> {
//! let browser = Driver::builder().build()?.connect().await?;
//! let session = browser.session();
//!
//! session.navigate("https://example.com").await?;
//! let search = session.find_element(By::name("q")).await?;
//! search.send_keys("marionette").await?;
//! search.press(Key::Enter).await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// DOM element interaction.
pub mod element;

/// Secondary event channel.
pub mod events;

/// WebDriver key codepoints.
pub mod keyboard;

/// Element locators.
pub mod selector;

/// Marionette session driver.
pub mod session;

/// Session timeouts.
pub mod timeouts;

/// Element lookup wait.
pub mod wait;

// ============================================================================
// Re-exports
// ============================================================================

pub use element::Element;
pub use events::{EVENT_PORT_OFFSET, EventChannel, EventChannelOptions};
pub use keyboard::Key;
pub use selector::By;
pub use session::{Script, Session};
pub use timeouts::{TimeoutKind, Timeouts};
pub use wait::{ElementLookup, FindOptions, LookupMode, POLL_INTERVAL, wait_for_elements};

// Re-export Cookie from protocol for convenience
pub use crate::protocol::Cookie;
