//! JavaScript execution methods.

use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::browser::Element;
use crate::error::Result;
use crate::protocol::{Command, Reply, ScriptParams};

use super::Session;

// ============================================================================
// Script
// ============================================================================

/// A script to evaluate in the current context.
///
/// The body is a function body: use `return` to produce a value and
/// `arguments[i]` to read positional arguments. Asynchronous scripts
/// finish by calling the last argument (`arguments[arguments.length - 1]`).
///
/// # Example
///
/// ```ignore
/// use firefox_marionette::Script;
///
/// let sum = session
///     .execute_script(&Script::new("return arguments[0] + arguments[1]").arg(2).arg(3))
///     .await?;
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Script {
    params: ScriptParams,
    asynchronous: bool,
}

impl Script {
    /// Creates a synchronous script.
    #[must_use]
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            params: ScriptParams {
                script: body.into(),
                ..ScriptParams::default()
            },
            asynchronous: false,
        }
    }

    /// Appends a positional argument.
    #[must_use]
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.params.args.push(value.into());
        self
    }

    /// Appends several positional arguments.
    #[must_use]
    pub fn args<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.params.args.extend(values.into_iter().map(Into::into));
        self
    }

    /// Appends an element argument, received as a DOM node.
    #[must_use]
    pub fn element(mut self, element: &Element) -> Self {
        self.params.args.push(element.to_script_arg());
        self
    }

    /// Sets the source name shown in remote stack traces.
    #[must_use]
    pub fn filename(mut self, name: impl Into<String>) -> Self {
        self.params.filename = Some(name.into());
        self
    }

    /// Evaluates in a named sandbox.
    #[must_use]
    pub fn sandbox(mut self, name: impl Into<String>) -> Self {
        self.params.sandbox = Some(name.into());
        self
    }

    /// Discards any existing sandbox of the same name first.
    #[must_use]
    pub fn new_sandbox(mut self, fresh: bool) -> Self {
        self.params.new_sandbox = fresh;
        self
    }

    /// Evaluates in a freshly created sandbox with a random name.
    #[must_use]
    pub fn in_fresh_sandbox(self) -> Self {
        self.sandbox(Uuid::new_v4().to_string()).new_sandbox(true)
    }

    /// Marks the script as asynchronous.
    #[must_use]
    pub fn asynchronous(mut self) -> Self {
        self.asynchronous = true;
        self
    }

    /// Returns the function body.
    #[inline]
    #[must_use]
    pub fn body(&self) -> &str {
        &self.params.script
    }

    /// Returns `true` for asynchronous scripts.
    #[inline]
    #[must_use]
    pub fn is_async(&self) -> bool {
        self.asynchronous
    }

    fn to_command(&self) -> Command {
        if self.asynchronous {
            Command::ExecuteAsyncScript(self.params.clone())
        } else {
            Command::ExecuteScript(self.params.clone())
        }
    }
}

// ============================================================================
// Session - Script Execution
// ============================================================================

impl Session {
    /// Evaluates a script and returns the raw reply.
    ///
    /// A script error is returned as data in [`Reply::error`].
    ///
    /// # Errors
    ///
    /// Connection failures only.
    pub async fn execute_script_reply(&self, script: &Script) -> Result<Reply> {
        debug!(
            script_len = script.body().len(),
            is_async = script.is_async(),
            "Executing script"
        );
        self.send(script.to_command()).await
    }

    /// Evaluates a script and returns its value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Remote`](crate::Error::Remote) if the script threw.
    pub async fn execute_script(&self, script: &Script) -> Result<Value> {
        self.execute_script_reply(script).await?.into_value()
    }

    /// Evaluates a synchronous script body without arguments.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let title = session.execute("return document.title").await?;
    /// ```
    pub async fn execute(&self, body: &str) -> Result<Value> {
        self.execute_script(&Script::new(body)).await
    }

    /// Evaluates an asynchronous script body with arguments.
    pub async fn execute_async_script(&self, body: &str, args: Vec<Value>) -> Result<Value> {
        self.execute_script(&Script::new(body).args(args).asynchronous())
            .await
    }

    /// Checks whether a global object path resolves in the current context.
    ///
    /// Uses a guarded `typeof` probe, so a missing intermediate object reads
    /// as absent instead of raising.
    ///
    /// # Example
    ///
    /// ```ignore
    /// if session.object_exists("window.jQuery.fn").await? {
    ///     // ...
    /// }
    /// ```
    pub async fn object_exists(&self, path: &str) -> Result<bool> {
        let reply = self.execute_script_reply(&Script::new(probe_script(path))).await?;

        if reply.is_error() {
            debug!(path, "Existence probe raised");
            return Ok(false);
        }

        Ok(match reply.value() {
            Value::String(kind) => kind != "undefined",
            Value::Null => false,
            _ => true,
        })
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn probe_script(path: &str) -> String {
    format!("try {{ return typeof({path}); }} catch (e) {{ return 'undefined'; }}")
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::transport::stub::{
        StubServer, command_name, command_params, connect_client, reply_err, reply_ok,
    };

    #[test]
    fn test_fresh_sandbox_gets_unique_name() {
        let a = Script::new("return 1").in_fresh_sandbox();
        let b = Script::new("return 1").in_fresh_sandbox();

        assert!(a.params.new_sandbox);
        assert!(a.params.sandbox.is_some());
        assert_ne!(a.params.sandbox, b.params.sandbox);
    }

    #[test]
    fn test_probe_script_is_guarded() {
        assert_eq!(
            probe_script("window.foo.bar"),
            "try { return typeof(window.foo.bar); } catch (e) { return 'undefined'; }"
        );
    }

    #[tokio::test]
    async fn test_execute_script_sends_args() {
        let server = StubServer::start(|command| vec![reply_ok(command, json!({ "value": 5 }))]).await;
        let session = Session::new(connect_client(&server).await);

        let script = Script::new("return arguments[0] + arguments[1]").args([2, 3]);
        let value = session.execute_script(&script).await.expect("script");

        assert_eq!(value, json!(5));
        let sent = &server.received()[0];
        assert_eq!(command_name(sent), "WebDriver:ExecuteScript");
        assert_eq!(command_params(sent)["args"], json!([2, 3]));
    }

    #[tokio::test]
    async fn test_async_script_uses_async_command() {
        let server = StubServer::ok().await;
        let session = Session::new(connect_client(&server).await);

        session
            .execute_async_script("arguments[0]()", vec![])
            .await
            .expect("script");

        assert_eq!(server.received_names(), vec!["WebDriver:ExecuteAsyncScript"]);
    }

    #[tokio::test]
    async fn test_script_error_is_data_in_reply_form() {
        let server = StubServer::start(|command| {
            vec![reply_err(command, "javascript error", "ReferenceError: x is not defined")]
        })
        .await;
        let session = Session::new(connect_client(&server).await);

        let reply = session
            .execute_script_reply(&Script::new("return x"))
            .await
            .expect("reply");
        assert!(reply.is_error());

        let err = session.execute("return x").await.unwrap_err();
        assert!(err.is_remote());
    }

    #[tokio::test]
    async fn test_object_exists() {
        let server = StubServer::start(|command| {
            let script = command_params(command)["script"].as_str().unwrap_or_default().to_string();
            if script.contains("window.present") {
                vec![reply_ok(command, json!({ "value": "object" }))]
            } else if script.contains("window.raises") {
                vec![reply_err(command, "javascript error", "boom")]
            } else if script.contains("window.nothing") {
                vec![reply_ok(command, json!({ "value": null }))]
            } else {
                vec![reply_ok(command, json!({ "value": "undefined" }))]
            }
        })
        .await;
        let session = Session::new(connect_client(&server).await);

        assert!(session.object_exists("window.present").await.expect("probe"));
        assert!(!session.object_exists("window.absent").await.expect("probe"));
        assert!(!session.object_exists("window.raises").await.expect("probe"));
        assert!(!session.object_exists("window.nothing").await.expect("probe"));
    }
}
