//! Core Session struct, lifecycle and low-level command access.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::identifiers::CommandId;
use crate::protocol::{Command, Context, Reply, Request, Status};
use crate::transport::Client;

// ============================================================================
// Types
// ============================================================================

/// Internal shared state for a session.
pub(crate) struct SessionInner {
    /// Correlation client on the primary connection.
    pub client: Client,
    /// Context the remote end is known to be in.
    pub context: Mutex<Context>,
    /// Fallback deadline for element lookups.
    pub implicit_wait: Mutex<Duration>,
    /// Id assigned by `WebDriver:NewSession`.
    pub session_id: Mutex<Option<String>>,
    /// Capabilities returned by `WebDriver:NewSession`.
    pub capabilities: Mutex<Value>,
}

// ============================================================================
// Session
// ============================================================================

/// A handle to a Marionette session.
///
/// Every method may be called concurrently; each call gets its own command
/// id. The protocol has no page-level locking, so ordering between e.g. a
/// navigation and a lookup is up to the caller.
#[derive(Clone)]
pub struct Session {
    pub(crate) inner: Arc<SessionInner>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("session_id", &*self.inner.session_id.lock())
            .field("context", &self.context())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Wraps a client without starting a remote session.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                client,
                context: Mutex::new(Context::None),
                implicit_wait: Mutex::new(Duration::ZERO),
                session_id: Mutex::new(None),
                capabilities: Mutex::new(Value::Null),
            }),
        }
    }

    /// Wraps a client and issues `WebDriver:NewSession`.
    ///
    /// # Errors
    ///
    /// See [`Session::start_session`].
    pub async fn start(client: Client, capabilities: Value) -> Result<Self> {
        let session = Self::new(client);
        session.start_session(capabilities).await?;
        Ok(session)
    }
}

// ============================================================================
// Session - Accessors
// ============================================================================

impl Session {
    /// Returns the underlying client.
    #[inline]
    #[must_use]
    pub fn client(&self) -> &Client {
        &self.inner.client
    }

    /// Returns the remote session id, once started.
    #[must_use]
    pub fn session_id(&self) -> Option<String> {
        self.inner.session_id.lock().clone()
    }

    /// Returns the negotiated capabilities.
    #[must_use]
    pub fn capabilities(&self) -> Value {
        self.inner.capabilities.lock().clone()
    }

    /// Returns the locally tracked context.
    #[inline]
    #[must_use]
    pub fn context(&self) -> Context {
        *self.inner.context.lock()
    }

    /// Returns the fallback deadline for element lookups.
    #[inline]
    #[must_use]
    pub fn implicit_wait(&self) -> Duration {
        *self.inner.implicit_wait.lock()
    }

    /// Sets the local fallback deadline without contacting the remote end.
    pub fn set_implicit_wait(&self, wait: Duration) {
        *self.inner.implicit_wait.lock() = wait;
    }
}

// ============================================================================
// Session - Lifecycle
// ============================================================================

impl Session {
    /// Issues `WebDriver:NewSession`, retrying once on failure.
    ///
    /// Stores the returned session id and capabilities, and picks up the
    /// implicit wait from `capabilities.timeouts.implicit` when present.
    ///
    /// # Errors
    ///
    /// Returns the error of the second attempt, or [`Error::Cancelled`]
    /// without retrying.
    pub async fn start_session(&self, capabilities: Value) -> Result<()> {
        let command = Command::NewSession { capabilities };

        let value = match self.call(command.clone()).await {
            Ok(value) => value,
            Err(e) if e.is_cancelled() => return Err(e),
            Err(e) => {
                warn!(error = %e, "NewSession failed, retrying once");
                self.call(command).await?
            }
        };

        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .map(str::to_string);
        let capabilities = value.get("capabilities").cloned().unwrap_or(Value::Null);

        if let Some(implicit) = capabilities
            .pointer("/timeouts/implicit")
            .and_then(Value::as_u64)
        {
            self.set_implicit_wait(Duration::from_millis(implicit));
        }

        info!(session_id = ?session_id, "Session started");
        *self.inner.session_id.lock() = session_id;
        *self.inner.capabilities.lock() = capabilities;
        Ok(())
    }

    /// Ends the remote session (`WebDriver:DeleteSession`).
    ///
    /// # Errors
    ///
    /// Returns the remote error if the session could not be ended.
    pub async fn end(&self) -> Result<()> {
        self.call(Command::DeleteSession).await?;
        debug!("Session ended");
        *self.inner.session_id.lock() = None;
        Ok(())
    }

    /// Asks the browser to shut down (`Marionette:Quit`), then closes the
    /// connection.
    ///
    /// # Errors
    ///
    /// Returns the remote error if the browser refused.
    pub async fn quit(&self) -> Result<()> {
        let result = self.call(Command::Quit).await;
        self.inner.client.close();
        result.map(|_| ())
    }
}

// ============================================================================
// Session - Context
// ============================================================================

impl Session {
    /// Switches the remote context.
    ///
    /// The local flag changes only after the remote end accepted the switch.
    /// Switching to the context already in effect sends nothing.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] for [`Context::None`]
    /// - [`Error::Remote`] if the remote end rejected the switch
    pub async fn set_context(&self, context: Context) -> Result<()> {
        if context == Context::None {
            return Err(Error::invalid_argument("Cannot switch to the None context"));
        }
        if self.context() == context {
            return Ok(());
        }

        self.enter_context(context).await
    }

    /// Switches the remote context unconditionally.
    ///
    /// Used where the remote state may have drifted from the local flag,
    /// for example after a raw `Marionette:SetContext`.
    pub(crate) async fn enter_context(&self, context: Context) -> Result<()> {
        self.call(Command::SetContext { context }).await?;
        debug!(?context, "Context switched");
        Ok(())
    }

    /// Reads the context from the remote end and syncs the local flag.
    ///
    /// # Errors
    ///
    /// Returns the remote error, if any.
    pub async fn remote_context(&self) -> Result<Context> {
        let value = self.call(Command::GetContext).await?;
        let context = value.as_str().map(Context::from_wire).unwrap_or_default();
        *self.inner.context.lock() = context;
        Ok(context)
    }
}

// ============================================================================
// Session - Low Level
// ============================================================================

impl Session {
    /// Sends a command; a remote error is returned as data.
    ///
    /// # Errors
    ///
    /// Connection failures only.
    pub async fn send(&self, command: Command) -> Result<Reply> {
        let switch = requested_context(&command);
        let request = Request::new(self.inner.client.next_id(), command);
        let reply = self.inner.client.send(&request).await?;
        self.track_context(switch, &reply);
        Ok(reply)
    }

    /// Sends a command that can be abandoned through `cancel`.
    ///
    /// # Errors
    ///
    /// [`Error::Cancelled`] when `cancel` fires first, otherwise see
    /// [`send`](Self::send).
    pub async fn send_cancellable(&self, command: Command, cancel: &CancellationToken) -> Result<Reply> {
        let switch = requested_context(&command);
        let request = Request::new(self.inner.client.next_id(), command);
        let reply = self.inner.client.send_request(&request, cancel).await?;
        self.track_context(switch, &reply);
        Ok(reply)
    }

    /// Sends a hand-built wire string.
    ///
    /// `build` receives the id to embed as the second array element. The
    /// local context flag is not updated by raw requests.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let reply = session
    ///     .send_raw(|id| format!(r#"[0,{id},"WebDriver:GetTitle",{{}}]"#))
    ///     .await?;
    /// ```
    ///
    /// # Errors
    ///
    /// Connection failures only.
    pub async fn send_raw<F>(&self, build: F) -> Result<Reply>
    where
        F: FnOnce(CommandId) -> String,
    {
        let id = self.inner.client.next_id();
        let request = Request::raw(id, build(id));
        self.inner.client.send(&request).await
    }

    /// Sends a one-shot command and reports the outcome as data.
    ///
    /// # Errors
    ///
    /// Connection failures only; remote errors become [`Status::Failed`].
    pub async fn run(&self, command: Command) -> Result<Status> {
        Ok(self.send(command).await?.status())
    }

    /// Sends a command and returns its unwrapped value.
    pub(crate) async fn call(&self, command: Command) -> Result<Value> {
        self.send(command).await?.into_value()
    }

    /// Records an accepted `Marionette:SetContext`.
    fn track_context(&self, switch: Option<Context>, reply: &Reply) {
        if let Some(context) = switch
            && reply.error.is_none()
        {
            *self.inner.context.lock() = context;
        }
    }
}

fn requested_context(command: &Command) -> Option<Context> {
    match command {
        Command::SetContext { context } => Some(*context),
        _ => None,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use crate::transport::stub::{
        StubServer, command_name, command_params, connect_client, reply_err, reply_ok,
    };

    async fn session_for(server: &StubServer) -> Session {
        Session::new(connect_client(server).await)
    }

    #[test]
    fn test_session_is_clone_and_debug() {
        fn assert_traits<T: Clone + fmt::Debug + Send + Sync>() {}
        assert_traits::<Session>();
    }

    #[tokio::test]
    async fn test_start_stores_session_details() {
        let server = StubServer::start(|command| {
            vec![reply_ok(
                command,
                json!({
                    "sessionId": "abc-123",
                    "capabilities": { "browserName": "firefox", "timeouts": { "implicit": 250 } }
                }),
            )]
        })
        .await;
        let session = session_for(&server).await;

        session.start_session(json!({})).await.expect("start");

        assert_eq!(session.session_id().as_deref(), Some("abc-123"));
        assert_eq!(session.capabilities()["browserName"], json!("firefox"));
        assert_eq!(session.implicit_wait(), Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_new_session_retried_exactly_once() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);
        let server = StubServer::start(move |command| {
            counter.fetch_add(1, Ordering::SeqCst);
            vec![reply_err(command, "session not created", "busy")]
        })
        .await;
        let session = session_for(&server).await;

        let err = session.start_session(json!({})).await.unwrap_err();

        assert!(err.is_remote());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_new_session_succeeds_on_retry() {
        let mut first = true;
        let server = StubServer::start(move |command| {
            if std::mem::take(&mut first) {
                vec![reply_err(command, "session not created", "busy")]
            } else {
                vec![reply_ok(command, json!({ "sessionId": "s2", "capabilities": {} }))]
            }
        })
        .await;
        let session = session_for(&server).await;

        session.start_session(json!({})).await.expect("start");
        assert_eq!(session.session_id().as_deref(), Some("s2"));
    }

    #[tokio::test]
    async fn test_context_flag_follows_remote_success_only() {
        let server = StubServer::start(|command| {
            if command_params(command)["value"] == json!("chrome") {
                vec![reply_err(command, "unsupported operation", "no chrome")]
            } else {
                vec![reply_ok(command, json!({ "value": null }))]
            }
        })
        .await;
        let session = session_for(&server).await;

        session.set_context(Context::Content).await.expect("content");
        assert_eq!(session.context(), Context::Content);

        assert!(session.set_context(Context::Chrome).await.is_err());
        assert_eq!(session.context(), Context::Content);

        // Already in content: no second round trip.
        session.set_context(Context::Content).await.expect("content");
        assert_eq!(
            server
                .received_names()
                .iter()
                .filter(|name| *name == "Marionette:SetContext")
                .count(),
            2
        );
    }

    #[tokio::test]
    async fn test_low_level_set_context_updates_flag() {
        let server = StubServer::start(|command| match command_params(command)["value"].as_str() {
            Some("chrome") if command_name(command) == "Marionette:SetContext" => {
                vec![reply_err(command, "unsupported operation", "no chrome")]
            }
            _ => vec![reply_ok(command, json!({ "value": null }))],
        })
        .await;
        let session = session_for(&server).await;

        session
            .send(Command::SetContext { context: Context::Content })
            .await
            .expect("send");
        assert_eq!(session.context(), Context::Content);

        let reply = session
            .send(Command::SetContext { context: Context::Chrome })
            .await
            .expect("send");
        assert!(reply.error.is_some());
        assert_eq!(session.context(), Context::Content);
    }

    #[tokio::test]
    async fn test_run_reports_errors_as_data() {
        let server = StubServer::start(|command| match command_name(command) {
            "WebDriver:Back" => vec![reply_err(command, "no such window", "closed")],
            _ => vec![reply_ok(command, json!({ "value": null }))],
        })
        .await;
        let session = session_for(&server).await;

        assert_eq!(session.run(Command::Refresh).await.expect("run"), Status::Ok);
        assert_eq!(
            session.run(Command::Back).await.expect("run"),
            Status::Failed("no such window: closed".into())
        );
    }

    #[tokio::test]
    async fn test_send_raw_embeds_allocated_id() {
        let server = StubServer::ok().await;
        let session = session_for(&server).await;

        let reply = session
            .send_raw(|id| format!(r#"[0,{id},"WebDriver:GetTitle",{{}}]"#))
            .await
            .expect("reply");

        assert!(!reply.is_error());
        assert_eq!(server.received_names(), vec!["WebDriver:GetTitle"]);
    }
}
