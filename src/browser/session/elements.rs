//! Element search methods.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::browser::Element;
use crate::browser::selector::By;
use crate::browser::wait::{ElementLookup, FindOptions, LookupMode, wait_for_elements};
use crate::error::{Error, Result};
use crate::identifiers::ElementId;
use crate::protocol::Command;
use crate::protocol::command::parse_element_reference;

use super::Session;

// ============================================================================
// Session - Element Search
// ============================================================================

impl Session {
    /// Finds a single element, waiting up to the implicit wait.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use firefox_marionette::By;
    ///
    /// let btn = session.find_element(By::css("#submit")).await?;
    /// let link = session.find_element(By::link_text("Sign in")).await?;
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSuchElement`] naming the locator if nothing
    /// matched in time.
    pub async fn find_element(&self, by: impl Into<By>) -> Result<Element> {
        self.find_element_with(FindOptions::new(by)).await
    }

    /// Finds all matching elements, waiting up to the implicit wait for at
    /// least one.
    ///
    /// An empty vector is a valid result.
    pub async fn find_elements(&self, by: impl Into<By>) -> Result<Vec<Element>> {
        self.find_elements_with(FindOptions::new(by)).await
    }

    /// Finds a single element with explicit wait options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSuchElement`] naming the locator if nothing
    /// acceptable matched in time.
    pub async fn find_element_with(&self, options: FindOptions) -> Result<Element> {
        debug!(
            strategy = options.by.strategy(),
            value = options.by.value(),
            timeout = ?options.timeout,
            "Finding element"
        );

        let ids = wait_for_elements(self, LookupMode::First, &options, self.implicit_wait()).await?;

        ids.into_iter()
            .next()
            .map(|id| Element::new(id, self.clone()))
            .ok_or_else(|| Error::no_such_element(options.by.strategy(), options.by.value()))
    }

    /// Finds all matching elements with explicit wait options.
    pub async fn find_elements_with(&self, options: FindOptions) -> Result<Vec<Element>> {
        debug!(
            strategy = options.by.strategy(),
            value = options.by.value(),
            "Finding elements"
        );

        let ids = wait_for_elements(self, LookupMode::All, &options, self.implicit_wait()).await?;
        Ok(self.wrap_elements(ids))
    }

    /// Runs one lookup without waiting.
    ///
    /// Returns `None` if nothing matched.
    pub async fn find_element_once(&self, by: impl Into<By>) -> Result<Option<Element>> {
        let by = by.into();
        let ids = self.lookup(LookupMode::First, &by, None).await?;
        Ok(ids.into_iter().next().map(|id| Element::new(id, self.clone())))
    }

    /// Runs one multi-element lookup without waiting.
    pub async fn find_elements_once(&self, by: impl Into<By>) -> Result<Vec<Element>> {
        let by = by.into();
        let ids = self.lookup(LookupMode::All, &by, None).await?;
        Ok(self.wrap_elements(ids))
    }

    fn wrap_elements(&self, ids: Vec<ElementId>) -> Vec<Element> {
        ids.into_iter()
            .map(|id| Element::new(id, self.clone()))
            .collect()
    }
}

// ============================================================================
// Session - Lookup
// ============================================================================

#[async_trait]
impl ElementLookup for Session {
    async fn lookup(
        &self,
        mode: LookupMode,
        by: &By,
        start_node: Option<&ElementId>,
    ) -> Result<Vec<ElementId>> {
        let using = by.strategy().to_string();
        let value = by.value().to_string();
        let element = start_node.cloned();

        let command = match mode {
            LookupMode::First => Command::FindElement {
                using,
                value,
                element,
            },
            LookupMode::All => Command::FindElements {
                using,
                value,
                element,
            },
        };

        let reply = self.send(command).await?;

        if let Some(error) = &reply.error {
            if error.is_no_such_element() {
                return Ok(Vec::new());
            }
            return Err(Error::Remote(error.clone()));
        }

        let ids = match reply.value() {
            Value::Array(items) => items.iter().filter_map(parse_element_reference).collect(),
            Value::Null => Vec::new(),
            single => parse_element_reference(single).into_iter().collect(),
        };

        Ok(ids)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use serde_json::json;

    use crate::protocol::command::ELEMENT_KEY;
    use crate::transport::stub::{
        StubServer, command_name, command_params, connect_client, reply_err, reply_ok,
    };

    fn reference(id: &str) -> Value {
        json!({ ELEMENT_KEY: id })
    }

    #[tokio::test]
    async fn test_find_element_parses_reference() {
        let server = StubServer::start(|command| {
            vec![reply_ok(command, json!({ "value": reference("el-1") }))]
        })
        .await;
        let session = Session::new(connect_client(&server).await);

        let element = session.find_element(By::css("#login")).await.expect("element");

        assert_eq!(element.id(), &ElementId::new("el-1"));
        assert_eq!(
            command_params(&server.received()[0]),
            &json!({ "using": "css selector", "value": "#login" })
        );
    }

    #[tokio::test]
    async fn test_missing_element_names_locator() {
        let server = StubServer::start(|command| {
            vec![reply_err(command, "no such element", "Unable to locate element")]
        })
        .await;
        let session = Session::new(connect_client(&server).await);

        let err = session.find_element(By::xpath("//nav")).await.unwrap_err();

        assert_eq!(err.to_string(), "No such element: using=xpath, value=//nav");
        assert_eq!(server.received().len(), 1);
    }

    #[tokio::test]
    async fn test_find_element_polls_until_match() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let server = StubServer::start(move |command| {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                vec![reply_err(command, "no such element", "not yet")]
            } else {
                vec![reply_ok(command, json!({ "value": reference("late") }))]
            }
        })
        .await;
        let session = Session::new(connect_client(&server).await);

        let options = FindOptions::new(By::id("late")).with_timeout(Duration::from_secs(3));
        let element = session.find_element_with(options).await.expect("element");

        assert_eq!(element.id().as_str(), "late");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_stale_match_is_excluded() {
        let server = StubServer::start(|command| {
            vec![reply_ok(command, json!({ "value": reference("old") }))]
        })
        .await;
        let session = Session::new(connect_client(&server).await);

        let options = FindOptions::new(By::css("main"))
            .excluding(ElementId::new("old"))
            .with_timeout(Duration::from_millis(150));
        let err = session.find_element_with(options).await.unwrap_err();

        assert!(matches!(err, Error::NoSuchElement { .. }));
        assert!(server.received().len() > 1);
    }

    #[tokio::test]
    async fn test_find_elements_empty_is_valid() {
        let server = StubServer::start(|command| vec![reply_ok(command, json!([]))]).await;
        let session = Session::new(connect_client(&server).await);

        let elements = session.find_elements(By::tag("li")).await.expect("elements");
        assert!(elements.is_empty());
        assert_eq!(server.received_names(), vec!["WebDriver:FindElements"]);
    }

    #[tokio::test]
    async fn test_find_elements_accepts_bare_array_and_legacy_keys() {
        let server = StubServer::start(|command| {
            vec![reply_ok(
                command,
                json!([reference("a"), { "ELEMENT": "b" }]),
            )]
        })
        .await;
        let session = Session::new(connect_client(&server).await);

        let ids: Vec<_> = session
            .find_elements_once(By::tag("li"))
            .await
            .expect("elements")
            .iter()
            .map(|e| e.id().as_str().to_string())
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_other_remote_errors_are_raised() {
        let server = StubServer::start(|command| {
            vec![reply_err(command, "invalid selector", "bad css")]
        })
        .await;
        let session = Session::new(connect_client(&server).await);

        let err = session.find_element_once("##").await.unwrap_err();
        assert!(err.is_remote());
        assert_eq!(command_name(&server.received()[0]), "WebDriver:FindElement");
    }
}
