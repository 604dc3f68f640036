//! Marionette session driver.
//!
//! A [`Session`] wraps the correlation client with the state the remote end
//! does not report back on every call: the selected context and the
//! implicit wait used as the default element lookup deadline.
//!
//! # Module Structure
//!
//! | Module | Description |
//! |--------|-------------|
//! | `core` | Session struct, lifecycle, context, low-level sends |
//! | `navigation` | URL navigation, history |
//! | `elements` | Element search and the lookup wait |
//! | `script` | Script builder and execution |
//! | `frames` | Frame and window switching |
//! | `timeouts` | Remote timeouts |
//! | `storage` | Cookies |
//! | `screenshot` | Page screenshots |
//!
//! # Example
//!
//! ```ignore
//! session.navigate("https://example.com").await?;
//!
//! let button = session.find_element(By::css("#submit")).await?;
//! button.click().await?;
//!
//! let title = session.execute("return document.title").await?;
//! ```

// ============================================================================
// Submodules
// ============================================================================

mod core;
mod elements;
mod frames;
mod navigation;
mod screenshot;
mod script;
mod storage;
mod timeouts;

// ============================================================================
// Re-exports
// ============================================================================

pub use core::Session;
pub use script::Script;
