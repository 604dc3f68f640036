//! Session timeouts.
//!
//! | Kind | Wire token | Governs |
//! |------|------------|---------|
//! | [`TimeoutKind::Implicit`] | `implicit` | Element lookup wait |
//! | [`TimeoutKind::Script`] | `script` | Script evaluation |
//! | [`TimeoutKind::PageLoad`] | `pageLoad` | Navigation |

use std::time::Duration;

use serde_json::{Map, Value};

// ============================================================================
// TimeoutKind
// ============================================================================

/// One of the three timeout categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeoutKind {
    /// Element lookup wait.
    Implicit,
    /// Script evaluation limit.
    Script,
    /// Navigation limit.
    PageLoad,
}

impl TimeoutKind {
    /// Returns the wire token.
    #[inline]
    #[must_use]
    pub fn as_wire(self) -> &'static str {
        match self {
            Self::Implicit => "implicit",
            Self::Script => "script",
            Self::PageLoad => "pageLoad",
        }
    }
}

// ============================================================================
// Timeouts
// ============================================================================

/// A set of timeout values. Unset entries are left untouched when applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Timeouts {
    /// Element lookup wait.
    pub implicit: Option<Duration>,
    /// Script evaluation limit.
    pub script: Option<Duration>,
    /// Navigation limit.
    pub page_load: Option<Duration>,
}

impl Timeouts {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the implicit wait.
    #[must_use]
    pub fn with_implicit(mut self, value: Duration) -> Self {
        self.implicit = Some(value);
        self
    }

    /// Sets the script timeout.
    #[must_use]
    pub fn with_script(mut self, value: Duration) -> Self {
        self.script = Some(value);
        self
    }

    /// Sets the page load timeout.
    #[must_use]
    pub fn with_page_load(mut self, value: Duration) -> Self {
        self.page_load = Some(value);
        self
    }

    /// Returns the value for one kind.
    #[must_use]
    pub fn get(&self, kind: TimeoutKind) -> Option<Duration> {
        match kind {
            TimeoutKind::Implicit => self.implicit,
            TimeoutKind::Script => self.script,
            TimeoutKind::PageLoad => self.page_load,
        }
    }

    /// Sets the value for one kind.
    pub fn set(&mut self, kind: TimeoutKind, value: Duration) {
        let slot = match kind {
            TimeoutKind::Implicit => &mut self.implicit,
            TimeoutKind::Script => &mut self.script,
            TimeoutKind::PageLoad => &mut self.page_load,
        };
        *slot = Some(value);
    }

    /// Returns `true` if no value is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.implicit.is_none() && self.script.is_none() && self.page_load.is_none()
    }

    /// Builds the `WebDriver:SetTimeouts` parameter object (milliseconds).
    #[must_use]
    pub fn to_wire(&self) -> Map<String, Value> {
        let mut map = Map::new();
        for kind in [TimeoutKind::Implicit, TimeoutKind::Script, TimeoutKind::PageLoad] {
            if let Some(value) = self.get(kind) {
                let millis = u64::try_from(value.as_millis()).unwrap_or(u64::MAX);
                map.insert(kind.as_wire().to_string(), Value::from(millis));
            }
        }
        map
    }

    /// Reads a `WebDriver:GetTimeouts` result.
    ///
    /// Missing or non-numeric entries (a `null` script timeout means
    /// "unlimited") are left unset.
    #[must_use]
    pub fn from_wire(value: &Value) -> Self {
        let read = |kind: TimeoutKind| {
            value
                .get(kind.as_wire())
                .and_then(Value::as_u64)
                .map(Duration::from_millis)
        };

        Self {
            implicit: read(TimeoutKind::Implicit),
            script: read(TimeoutKind::Script),
            page_load: read(TimeoutKind::PageLoad),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_only_set_values_are_sent() {
        let timeouts = Timeouts::new()
            .with_implicit(Duration::from_millis(1500))
            .with_page_load(Duration::from_secs(30));

        assert_eq!(
            Value::Object(timeouts.to_wire()),
            json!({ "implicit": 1500, "pageLoad": 30000 })
        );
    }

    #[test]
    fn test_from_wire_skips_unlimited_script() {
        let timeouts = Timeouts::from_wire(&json!({
            "implicit": 0,
            "script": null,
            "pageLoad": 300000
        }));

        assert_eq!(timeouts.implicit, Some(Duration::ZERO));
        assert_eq!(timeouts.script, None);
        assert_eq!(timeouts.page_load, Some(Duration::from_secs(300)));
    }

    #[test]
    fn test_set_by_kind() {
        let mut timeouts = Timeouts::new();
        assert!(timeouts.is_empty());

        timeouts.set(TimeoutKind::Script, Duration::from_secs(10));
        assert_eq!(timeouts.get(TimeoutKind::Script), Some(Duration::from_secs(10)));
        assert_eq!(TimeoutKind::PageLoad.as_wire(), "pageLoad");
    }
}
