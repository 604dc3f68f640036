//! Cookie methods.

use serde_json::Value;
use tracing::debug;

use crate::error::Result;
use crate::protocol::{Command, Cookie};

use super::Session;

// ============================================================================
// Session - Cookies
// ============================================================================

impl Session {
    /// Returns the cookies visible to the current document.
    pub async fn cookies(&self) -> Result<Vec<Cookie>> {
        let value = self.call(Command::GetCookies).await?;
        match value {
            Value::Null => Ok(Vec::new()),
            other => Ok(serde_json::from_value(other)?),
        }
    }

    /// Returns the cookie with the given name, if any.
    pub async fn cookie(&self, name: &str) -> Result<Option<Cookie>> {
        Ok(self.cookies().await?.into_iter().find(|c| c.name == name))
    }

    /// Adds a cookie for the current document's domain.
    pub async fn add_cookie(&self, cookie: Cookie) -> Result<()> {
        debug!(name = %cookie.name, "Adding cookie");
        self.call(Command::AddCookie { cookie }).await?;
        Ok(())
    }

    /// Deletes all cookies visible to the current document.
    pub async fn delete_all_cookies(&self) -> Result<()> {
        debug!("Deleting all cookies");
        self.call(Command::DeleteAllCookies).await?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::transport::stub::{StubServer, command_name, command_params, connect_client, reply_ok};

    #[tokio::test]
    async fn test_cookies_round_trip_through_remote() {
        let server = StubServer::start(|command| match command_name(command) {
            "WebDriver:GetCookies" => vec![reply_ok(
                command,
                json!([{ "name": "sid", "value": "42", "httpOnly": true, "secure": false }]),
            )],
            _ => vec![reply_ok(command, json!({ "value": null }))],
        })
        .await;
        let session = Session::new(connect_client(&server).await);

        session
            .add_cookie(Cookie {
                name: "theme".into(),
                value: "dark".into(),
                ..Cookie::default()
            })
            .await
            .expect("add");
        assert_eq!(
            command_params(&server.received()[0])["cookie"]["name"],
            json!("theme")
        );

        let sid = session.cookie("sid").await.expect("cookies").expect("sid");
        assert!(sid.http_only);
        assert_eq!(sid.value, "42");
    }
}
