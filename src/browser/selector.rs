//! Element locator strategies.
//!
//! Provides Selenium-like `By` selectors, mapped onto the WebDriver
//! location strategies Marionette understands.
//!
//! # Example
//!
//! ```ignore
//! use firefox_marionette::By;
//!
//! // CSS selector (default)
//! let btn = session.find_element(By::css("#submit")).await?;
//!
//! // By XPath
//! let btn = session.find_element(By::xpath("//button[@type='submit']")).await?;
//!
//! // By link text
//! let link = session.find_element(By::link_text("Sign in")).await?;
//!
//! // By tag name
//! let inputs = session.find_elements(By::tag("input")).await?;
//! ```

// ============================================================================
// By Enum
// ============================================================================

/// Element locator strategy (like Selenium's `By`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum By {
    /// CSS selector (most common).
    ///
    /// # Example
    /// ```ignore
    /// By::Css("#login-button")
    /// By::Css("[data-testid='submit']")
    /// ```
    Css(String),

    /// XPath expression.
    ///
    /// # Example
    /// ```ignore
    /// By::XPath("//div[contains(@class, 'modal')]")
    /// ```
    XPath(String),

    /// Element `id` attribute.
    Id(String),

    /// Element `name` attribute.
    Name(String),

    /// Class name (single class).
    Class(String),

    /// Tag name.
    Tag(String),

    /// Exact link text (for `<a>` elements).
    LinkText(String),

    /// Partial link text (for `<a>` elements).
    PartialLinkText(String),

    /// Any other strategy string the remote end supports
    /// (e.g. `anon attribute` in chrome context).
    Other {
        /// Wire strategy name.
        using: String,
        /// Expression.
        value: String,
    },
}

impl By {
    /// Creates a CSS selector.
    #[inline]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Creates an XPath selector.
    #[inline]
    pub fn xpath(expr: impl Into<String>) -> Self {
        Self::XPath(expr.into())
    }

    /// Creates an ID selector.
    #[inline]
    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    /// Creates a name attribute selector.
    #[inline]
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    /// Creates a class name selector.
    #[inline]
    pub fn class(class: impl Into<String>) -> Self {
        Self::Class(class.into())
    }

    /// Creates a tag name selector.
    #[inline]
    pub fn tag(tag: impl Into<String>) -> Self {
        Self::Tag(tag.into())
    }

    /// Creates a link text selector.
    #[inline]
    pub fn link_text(text: impl Into<String>) -> Self {
        Self::LinkText(text.into())
    }

    /// Creates a partial link text selector.
    #[inline]
    pub fn partial_link_text(text: impl Into<String>) -> Self {
        Self::PartialLinkText(text.into())
    }

    /// Creates a selector with an arbitrary strategy name.
    #[inline]
    pub fn other(using: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Other {
            using: using.into(),
            value: value.into(),
        }
    }

    /// Returns the wire strategy name (the `using` parameter).
    #[must_use]
    pub fn strategy(&self) -> &str {
        match self {
            Self::Css(_) => "css selector",
            Self::XPath(_) => "xpath",
            Self::Id(_) => "id",
            Self::Name(_) => "name",
            Self::Class(_) => "class name",
            Self::Tag(_) => "tag name",
            Self::LinkText(_) => "link text",
            Self::PartialLinkText(_) => "partial link text",
            Self::Other { using, .. } => using,
        }
    }

    /// Returns the selector value.
    #[must_use]
    pub fn value(&self) -> &str {
        match self {
            Self::Css(v)
            | Self::XPath(v)
            | Self::Id(v)
            | Self::Name(v)
            | Self::Class(v)
            | Self::Tag(v)
            | Self::LinkText(v)
            | Self::PartialLinkText(v)
            | Self::Other { value: v, .. } => v,
        }
    }
}

// ============================================================================
// From implementations for ergonomics
// ============================================================================

impl From<&str> for By {
    /// Converts a string to CSS selector (default).
    fn from(s: &str) -> Self {
        Self::Css(s.to_string())
    }
}

impl From<String> for By {
    /// Converts a string to CSS selector (default).
    fn from(s: String) -> Self {
        Self::Css(s)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_by_css() {
        let by = By::css("#login");
        assert_eq!(by.strategy(), "css selector");
        assert_eq!(by.value(), "#login");
    }

    #[test]
    fn test_wire_strategy_names() {
        assert_eq!(By::xpath("//a").strategy(), "xpath");
        assert_eq!(By::class("btn").strategy(), "class name");
        assert_eq!(By::tag("input").strategy(), "tag name");
        assert_eq!(By::link_text("Home").strategy(), "link text");
        assert_eq!(By::partial_link_text("Ho").strategy(), "partial link text");
    }

    #[test]
    fn test_other_strategy_passes_through() {
        let by = By::other("anon attribute", r#"{"anonid":"x"}"#);
        assert_eq!(by.strategy(), "anon attribute");
        assert_eq!(by.value(), r#"{"anonid":"x"}"#);
    }

    #[test]
    fn test_from_str() {
        let by: By = "#login".into();
        assert!(matches!(by, By::Css(_)));
    }
}
