//! Session navigation methods.

use tracing::debug;
use url::Url;

use crate::error::{Error, Result};
use crate::protocol::{Command, Context, Status};

use super::Session;

// ============================================================================
// Session - Navigation
// ============================================================================

impl Session {
    /// Navigates to a URL.
    ///
    /// Always switches to the content context first, even when the local
    /// flag already says content.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if `url` is not an absolute URL
    /// - [`Error::Remote`] if the load failed (full remote text included)
    pub async fn navigate(&self, url: &str) -> Result<()> {
        let url = parse_url(url)?;
        debug!(url = %url, "Navigating");

        self.enter_context(Context::Content).await?;
        self.call(Command::Navigate { url: url.into() }).await?;
        Ok(())
    }

    /// Navigates to a URL, reporting a remote failure as data.
    ///
    /// # Errors
    ///
    /// Connection failures and invalid URLs only.
    pub async fn navigate_status(&self, url: &str) -> Result<Status> {
        let url = parse_url(url)?;
        debug!(url = %url, "Navigating");

        self.enter_context(Context::Content).await?;
        self.run(Command::Navigate { url: url.into() }).await
    }

    /// Returns the URL of the current document.
    pub async fn current_url(&self) -> Result<String> {
        let value = self.call(Command::GetCurrentUrl).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    /// Returns the document title.
    pub async fn title(&self) -> Result<String> {
        let value = self.call(Command::GetTitle).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    /// Returns the serialized DOM.
    pub async fn page_source(&self) -> Result<String> {
        let value = self.call(Command::GetPageSource).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    /// Navigates back in history.
    pub async fn back(&self) -> Result<()> {
        debug!("Navigating back");
        self.call(Command::Back).await?;
        Ok(())
    }

    /// Navigates forward in history.
    pub async fn forward(&self) -> Result<()> {
        debug!("Navigating forward");
        self.call(Command::Forward).await?;
        Ok(())
    }

    /// Reloads the current document.
    pub async fn refresh(&self) -> Result<()> {
        debug!("Reloading page");
        self.call(Command::Refresh).await?;
        Ok(())
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn parse_url(url: &str) -> Result<Url> {
    Url::parse(url).map_err(|e| Error::invalid_argument(format!("Invalid URL '{url}': {e}")))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::transport::stub::{StubServer, command_name, connect_client, reply_err, reply_ok};

    async fn navigation_stub() -> StubServer {
        StubServer::start(|command| match command_name(command) {
            "WebDriver:Navigate" if command[3]["url"] == json!("https://broken.test/") => {
                vec![reply_err(command, "unknown error", "Reached error page")]
            }
            "WebDriver:GetTitle" => vec![reply_ok(command, json!({ "value": "Example" }))],
            _ => vec![reply_ok(command, json!({ "value": null }))],
        })
        .await
    }

    #[tokio::test]
    async fn test_navigate_forces_content_first() {
        let server = navigation_stub().await;
        let session = Session::new(connect_client(&server).await);

        session.navigate("https://example.com/").await.expect("navigate");

        assert_eq!(
            server.received_names(),
            vec!["Marionette:SetContext", "WebDriver:Navigate"]
        );
        assert_eq!(server.received()[0][3], json!({ "value": "content" }));
        assert_eq!(session.context(), Context::Content);
    }

    #[tokio::test]
    async fn test_navigate_switches_back_after_raw_chrome_switch() {
        let server = navigation_stub().await;
        let session = Session::new(connect_client(&server).await);

        session.navigate("https://a.test/").await.expect("navigate");
        session
            .send_raw(|id| format!(r#"[0,{id},"Marionette:SetContext",{{"value":"chrome"}}]"#))
            .await
            .expect("raw switch");
        assert_eq!(session.context(), Context::Content);

        session.navigate_status("https://b.test/").await.expect("navigate");

        assert_eq!(
            server.received_names(),
            vec![
                "Marionette:SetContext",
                "WebDriver:Navigate",
                "Marionette:SetContext",
                "Marionette:SetContext",
                "WebDriver:Navigate",
            ]
        );
        assert_eq!(server.received()[3][3], json!({ "value": "content" }));
    }

    #[tokio::test]
    async fn test_navigate_failure_is_raised_with_remote_text() {
        let server = navigation_stub().await;
        let session = Session::new(connect_client(&server).await);

        let err = session.navigate("https://broken.test/").await.unwrap_err();
        let remote = err.remote_error().expect("remote error");
        assert_eq!(remote.message, "Reached error page");
    }

    #[tokio::test]
    async fn test_navigate_status_reports_failure_as_data() {
        let server = navigation_stub().await;
        let session = Session::new(connect_client(&server).await);

        let status = session
            .navigate_status("https://broken.test/")
            .await
            .expect("status");
        assert_eq!(status, Status::Failed("unknown error: Reached error page".into()));
    }

    #[tokio::test]
    async fn test_invalid_url_sends_nothing() {
        let server = navigation_stub().await;
        let session = Session::new(connect_client(&server).await);

        let err = session.navigate("not a url").await.unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));
        assert!(server.received().is_empty());
    }

    #[tokio::test]
    async fn test_title() {
        let server = navigation_stub().await;
        let session = Session::new(connect_client(&server).await);

        assert_eq!(session.title().await.expect("title"), "Example");
    }
}
