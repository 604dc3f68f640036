//! DOM element interaction.
//!
//! An [`Element`] wraps the opaque reference returned by a lookup. The
//! reference becomes stale once the document it came from is replaced;
//! the remote end then answers with `stale element reference`.
//!
//! # Example
//!
//! ```ignore
//! use firefox_marionette::{By, Key};
//!
//! let input = session.find_element(By::css("input[name='q']")).await?;
//!
//! input.clear().await?;
//! input.send_keys("marionette").await?;
//! input.press(Key::Enter).await?;
//!
//! let value = input.property("value").await?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::error::Result;
use crate::identifiers::ElementId;
use crate::protocol::command::element_reference;
use crate::protocol::{Command, ElementRect};

use super::keyboard::Key;
use super::selector::By;
use super::session::Session;
use super::wait::FindOptions;

// ============================================================================
// Types
// ============================================================================

/// Internal shared state for an element.
pub(crate) struct ElementInner {
    /// Remote reference.
    pub id: ElementId,
    /// Session the element was found in.
    pub session: Session,
}

// ============================================================================
// Element
// ============================================================================

/// A handle to a DOM element.
#[derive(Clone)]
pub struct Element {
    /// Shared inner state.
    pub(crate) inner: Arc<ElementInner>,
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("id", &self.inner.id)
            .finish_non_exhaustive()
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Element {
    /// Creates a new element handle.
    pub(crate) fn new(id: ElementId, session: Session) -> Self {
        Self {
            inner: Arc::new(ElementInner { id, session }),
        }
    }
}

// ============================================================================
// Element - Accessors
// ============================================================================

impl Element {
    /// Returns the remote reference.
    #[inline]
    #[must_use]
    pub fn id(&self) -> &ElementId {
        &self.inner.id
    }

    /// Returns the session this element belongs to.
    #[inline]
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    /// Returns the reference in script-argument form.
    ///
    /// Pass it to [`Script::arg`](super::Script::arg) to receive the node
    /// as `arguments[i]` inside a script.
    #[must_use]
    pub fn to_script_arg(&self) -> Value {
        element_reference(&self.inner.id)
    }
}

// ============================================================================
// Element - Actions
// ============================================================================

impl Element {
    /// Clicks the element.
    pub async fn click(&self) -> Result<()> {
        debug!(element_id = %self.inner.id, "Clicking element");
        self.call(Command::ElementClick {
            id: self.inner.id.clone(),
        })
        .await?;
        Ok(())
    }

    /// Clears an editable element.
    pub async fn clear(&self) -> Result<()> {
        debug!(element_id = %self.inner.id, "Clearing element");
        self.call(Command::ElementClear {
            id: self.inner.id.clone(),
        })
        .await?;
        Ok(())
    }

    /// Types text into the element.
    ///
    /// The text may embed [`Key`] codepoints.
    pub async fn send_keys(&self, text: &str) -> Result<()> {
        debug!(element_id = %self.inner.id, text_len = text.len(), "Typing text");
        self.call(Command::ElementSendKeys {
            id: self.inner.id.clone(),
            text: text.to_string(),
        })
        .await?;
        Ok(())
    }

    /// Presses a single navigation or control key.
    pub async fn press(&self, key: Key) -> Result<()> {
        self.send_keys(&key.to_string()).await
    }
}

// ============================================================================
// Element - Properties
// ============================================================================

impl Element {
    /// Returns the rendered text.
    pub async fn text(&self) -> Result<String> {
        let value = self
            .call(Command::GetElementText {
                id: self.inner.id.clone(),
            })
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    /// Returns the lowercase tag name.
    pub async fn tag_name(&self) -> Result<String> {
        let value = self
            .call(Command::GetElementTagName {
                id: self.inner.id.clone(),
            })
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    /// Returns an attribute value, `None` if absent.
    pub async fn attribute(&self, name: &str) -> Result<Option<String>> {
        let value = self
            .call(Command::GetElementAttribute {
                id: self.inner.id.clone(),
                name: name.to_string(),
            })
            .await?;
        Ok(value.as_str().map(str::to_string))
    }

    /// Returns a DOM property value.
    pub async fn property(&self, name: &str) -> Result<Value> {
        self.call(Command::GetElementProperty {
            id: self.inner.id.clone(),
            name: name.to_string(),
        })
        .await
    }

    /// Checks whether the element is displayed.
    pub async fn is_displayed(&self) -> Result<bool> {
        let value = self
            .call(Command::IsElementDisplayed {
                id: self.inner.id.clone(),
            })
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    /// Checks whether the element is enabled.
    pub async fn is_enabled(&self) -> Result<bool> {
        let value = self
            .call(Command::IsElementEnabled {
                id: self.inner.id.clone(),
            })
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    /// Checks whether an option, checkbox or radio is selected.
    pub async fn is_selected(&self) -> Result<bool> {
        let value = self
            .call(Command::IsElementSelected {
                id: self.inner.id.clone(),
            })
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    /// Returns the element's position and size.
    pub async fn rect(&self) -> Result<ElementRect> {
        let value = self
            .call(Command::GetElementRect {
                id: self.inner.id.clone(),
            })
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Captures a PNG of just this element.
    pub async fn screenshot(&self) -> Result<Vec<u8>> {
        self.inner
            .session
            .capture(Some(self.inner.id.clone()))
            .await
    }
}

// ============================================================================
// Element - Nested Search
// ============================================================================

impl Element {
    /// Finds a descendant element, waiting up to the implicit wait.
    pub async fn find_element(&self, by: impl Into<By>) -> Result<Element> {
        self.inner
            .session
            .find_element_with(FindOptions::new(by).within(self.inner.id.clone()))
            .await
    }

    /// Finds all matching descendants.
    pub async fn find_elements(&self, by: impl Into<By>) -> Result<Vec<Element>> {
        self.inner
            .session
            .find_elements_with(FindOptions::new(by).within(self.inner.id.clone()))
            .await
    }
}

// ============================================================================
// Element - Internal
// ============================================================================

impl Element {
    async fn call(&self, command: Command) -> Result<Value> {
        self.inner.session.call(command).await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::protocol::command::ELEMENT_KEY;
    use crate::transport::stub::{
        StubServer, command_name, command_params, connect_client, reply_err, reply_ok,
    };

    async fn element_stub() -> StubServer {
        StubServer::start(|command| {
            let value = match command_name(command) {
                "WebDriver:GetElementText" => json!("Sign in"),
                "WebDriver:GetElementAttribute" => match command_params(command)["name"].as_str() {
                    Some("href") => json!("/login"),
                    _ => Value::Null,
                },
                "WebDriver:IsElementDisplayed" => json!(true),
                "WebDriver:GetElementRect" => {
                    json!({ "x": 10.0, "y": 20.0, "width": 100.0, "height": 30.5 })
                }
                "WebDriver:FindElements" => json!([{ ELEMENT_KEY: "child" }]),
                "WebDriver:ElementClick" => {
                    return vec![reply_err(command, "stale element reference", "gone")];
                }
                _ => Value::Null,
            };
            vec![reply_ok(command, json!({ "value": value }))]
        })
        .await
    }

    async fn element(server: &StubServer) -> Element {
        Element::new(
            ElementId::new("root"),
            Session::new(connect_client(server).await),
        )
    }

    #[test]
    fn test_element_is_clone_and_debug() {
        fn assert_traits<T: Clone + fmt::Debug + Send + Sync>() {}
        assert_traits::<Element>();
    }

    #[tokio::test]
    async fn test_property_reads() {
        let server = element_stub().await;
        let element = element(&server).await;

        assert_eq!(element.text().await.expect("text"), "Sign in");
        assert_eq!(
            element.attribute("href").await.expect("attr").as_deref(),
            Some("/login")
        );
        assert_eq!(element.attribute("title").await.expect("attr"), None);
        assert!(element.is_displayed().await.expect("displayed"));

        let rect = element.rect().await.expect("rect");
        assert_eq!(rect.height, 30.5);
    }

    #[tokio::test]
    async fn test_press_sends_key_codepoint() {
        let server = element_stub().await;
        let element = element(&server).await;

        element.press(Key::Enter).await.expect("press");

        let sent = &server.received()[0];
        assert_eq!(command_name(sent), "WebDriver:ElementSendKeys");
        assert_eq!(
            command_params(sent),
            &json!({ "id": "root", "text": "\u{E007}" })
        );
    }

    #[tokio::test]
    async fn test_stale_reference_is_remote_error() {
        let server = element_stub().await;
        let element = element(&server).await;

        let err = element.click().await.unwrap_err();
        assert!(err.remote_error().is_some_and(|e| e.is_stale_element()));
    }

    #[tokio::test]
    async fn test_nested_search_passes_start_node() {
        let server = element_stub().await;
        let element = element(&server).await;

        let children = element.find_elements(By::tag("li")).await.expect("children");

        assert_eq!(children.len(), 1);
        assert_eq!(command_params(&server.received()[0])["element"], json!("root"));
    }
}
