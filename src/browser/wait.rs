//! Element lookup with polling.
//!
//! Lookups are retried every [`POLL_INTERVAL`] until a match shows up or the
//! deadline passes. The deadline comes from [`FindOptions::timeout`], falling
//! back to the session's implicit wait; when both are zero exactly one
//! attempt is made.
//!
//! [`FindOptions::excluding`] rejects a match whose id equals a known stale
//! element, typically one left over from the page that was active before a
//! navigation that has not finished replacing the document.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{Instant, sleep};
use tracing::{debug, trace};

use crate::error::Result;
use crate::identifiers::ElementId;

use super::selector::By;

// ============================================================================
// Constants
// ============================================================================

/// Delay between two lookup attempts.
pub const POLL_INTERVAL: Duration = Duration::from_millis(50);

// ============================================================================
// FindOptions
// ============================================================================

/// Parameters of a waiting element lookup.
///
/// # Example
///
/// ```ignore
/// let options = FindOptions::new(By::css("#result"))
///     .excluding(old_result.id().clone())
///     .with_timeout(Duration::from_secs(5));
///
/// let fresh = session.find_element_with(options).await?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindOptions {
    /// Locator.
    pub by: By,
    /// Element to search beneath; the whole document when `None`.
    pub start_node: Option<ElementId>,
    /// Match to treat as "not found yet".
    pub not_element_id: Option<ElementId>,
    /// Polling deadline; the session's implicit wait when `None`.
    pub timeout: Option<Duration>,
}

impl FindOptions {
    /// Creates options for a locator.
    #[must_use]
    pub fn new(by: impl Into<By>) -> Self {
        Self {
            by: by.into(),
            start_node: None,
            not_element_id: None,
            timeout: None,
        }
    }

    /// Searches beneath `element` only.
    #[must_use]
    pub fn within(mut self, element: ElementId) -> Self {
        self.start_node = Some(element);
        self
    }

    /// Ignores matches equal to `element`.
    #[must_use]
    pub fn excluding(mut self, element: ElementId) -> Self {
        self.not_element_id = Some(element);
        self
    }

    /// Sets an explicit deadline.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

// ============================================================================
// ElementLookup
// ============================================================================

/// Cardinality of a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupMode {
    /// `WebDriver:FindElement`: at most one id.
    First,
    /// `WebDriver:FindElements`: every match.
    All,
}

/// A single, non-waiting element lookup.
///
/// "Nothing matched" is an empty vector, not an error.
#[async_trait]
pub trait ElementLookup: Send + Sync {
    /// Runs one lookup attempt.
    async fn lookup(
        &self,
        mode: LookupMode,
        by: &By,
        start_node: Option<&ElementId>,
    ) -> Result<Vec<ElementId>>;
}

// ============================================================================
// Polling
// ============================================================================

/// Polls `lookup` until it yields an acceptable match or the deadline passes.
///
/// Returns an empty vector when nothing acceptable was found in time. Errors
/// other than "nothing matched" end the wait immediately.
pub async fn wait_for_elements<L>(
    lookup: &L,
    mode: LookupMode,
    options: &FindOptions,
    implicit_wait: Duration,
) -> Result<Vec<ElementId>>
where
    L: ElementLookup + ?Sized,
{
    let excluded = options.not_element_id.as_ref();
    let mut deadline: Option<Instant> = None;
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;
        let found = lookup
            .lookup(mode, &options.by, options.start_node.as_ref())
            .await?;

        if is_acceptable(&found, mode, excluded) {
            trace!(attempts, count = found.len(), "Lookup matched");
            return Ok(found);
        }

        if deadline.is_none() {
            let timeout = options.timeout.unwrap_or(implicit_wait);
            if timeout.is_zero() {
                return Ok(Vec::new());
            }
            deadline = Some(Instant::now() + timeout);
        }

        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            debug!(
                attempts,
                strategy = options.by.strategy(),
                value = options.by.value(),
                "Lookup deadline passed"
            );
            return Ok(Vec::new());
        }

        sleep(POLL_INTERVAL).await;
    }
}

fn is_acceptable(found: &[ElementId], mode: LookupMode, excluded: Option<&ElementId>) -> bool {
    let Some(first) = found.first() else {
        return false;
    };

    match (mode, excluded) {
        (_, None) => true,
        (LookupMode::First, Some(excluded)) => first != excluded,
        (LookupMode::All, Some(excluded)) => !found.contains(excluded),
    }
}

// ============================================================================
// Tests
// ============================================================================
