//! Loopback stub of a Marionette server for tests.
//!
//! Accepts a single connection, optionally greets it with the handshake
//! object, and answers every command through a responder closure. Tests can
//! also push arbitrary frames or drop the connection at any time.

use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::protocol::Subscriptions;
use crate::protocol::codec::{FrameReader, encode};

use super::{Client, ConnectOptions};

/// Handshake sent by [`StubServer::start`] when greeting is enabled.
pub(crate) const GREETING: &str = r#"{"applicationType":"gecko","marionetteProtocol":3}"#;

enum StubAction {
    Send(String),
    Disconnect,
}

/// Running stub server.
pub(crate) struct StubServer {
    addr: SocketAddr,
    actions: mpsc::UnboundedSender<StubAction>,
    received: Arc<Mutex<Vec<Value>>>,
    _task: JoinHandle<()>,
}

impl StubServer {
    /// Starts a stub that greets and answers through `responder`.
    pub(crate) async fn start<F>(responder: F) -> Self
    where
        F: FnMut(&Value) -> Vec<String> + Send + 'static,
    {
        Self::spawn(Some(GREETING.to_string()), responder).await
    }

    /// Starts a stub that greets and never answers.
    pub(crate) async fn silent() -> Self {
        Self::start(|_| Vec::new()).await
    }

    /// Starts a stub that answers every command with `{"value": null}`.
    pub(crate) async fn ok() -> Self {
        Self::start(|command| vec![reply_ok(command, json!({ "value": null }))]).await
    }

    async fn spawn<F>(greeting: Option<String>, responder: F) -> Self
    where
        F: FnMut(&Value) -> Vec<String> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind stub");
        let addr = listener.local_addr().expect("stub addr");
        let (actions, actions_rx) = mpsc::unbounded_channel();
        let received = Arc::new(Mutex::new(Vec::new()));

        let task = tokio::spawn(run(
            listener,
            greeting,
            responder,
            actions_rx,
            Arc::clone(&received),
        ));

        Self {
            addr,
            actions,
            received,
            _task: task,
        }
    }

    pub(crate) fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Writes a raw message body to the client.
    pub(crate) fn push(&self, text: impl Into<String>) {
        let _ = self.actions.send(StubAction::Send(text.into()));
    }

    /// Drops the client connection.
    pub(crate) fn disconnect(&self) {
        let _ = self.actions.send(StubAction::Disconnect);
    }

    /// Commands received so far.
    pub(crate) fn received(&self) -> Vec<Value> {
        self.received.lock().clone()
    }

    /// Names of the commands received so far.
    pub(crate) fn received_names(&self) -> Vec<String> {
        self.received()
            .iter()
            .map(|command| command_name(command).to_string())
            .collect()
    }
}

/// Connects a fresh client to `server`.
pub(crate) async fn connect_client(server: &StubServer) -> Client {
    Client::connect(
        server.addr(),
        &ConnectOptions::default(),
        Arc::new(Subscriptions::new()),
    )
    .await
    .expect("connect to stub")
}

async fn run<F>(
    listener: TcpListener,
    greeting: Option<String>,
    mut responder: F,
    mut actions: mpsc::UnboundedReceiver<StubAction>,
    received: Arc<Mutex<Vec<Value>>>,
) where
    F: FnMut(&Value) -> Vec<String> + Send + 'static,
{
    let Ok((socket, _)) = listener.accept().await else {
        return;
    };
    let (reader, mut writer) = socket.into_split();
    let mut frames = FrameReader::new(reader);

    if let Some(greeting) = greeting {
        if write(&mut writer, &greeting).await.is_err() {
            return;
        }
    }

    loop {
        tokio::select! {
            frame = frames.read_frame() => {
                let Ok(Some(text)) = frame else { break };
                let Ok(command) = serde_json::from_str::<Value>(&text) else { continue };
                received.lock().push(command.clone());

                for reply in responder(&command) {
                    if write(&mut writer, &reply).await.is_err() {
                        return;
                    }
                }
            }
            action = actions.recv() => match action {
                Some(StubAction::Send(text)) => {
                    if write(&mut writer, &text).await.is_err() {
                        return;
                    }
                }
                Some(StubAction::Disconnect) | None => break,
            },
        }
    }
}

async fn write(writer: &mut OwnedWriteHalf, text: &str) -> std::io::Result<()> {
    writer.write_all(&encode(text)).await?;
    writer.flush().await
}

/// Id of a received `[0, id, name, params]` command.
pub(crate) fn command_id(command: &Value) -> u64 {
    command[1].as_u64().unwrap_or_default()
}

/// Name of a received command.
pub(crate) fn command_name(command: &Value) -> &str {
    command[2].as_str().unwrap_or_default()
}

/// Parameters of a received command.
pub(crate) fn command_params(command: &Value) -> &Value {
    &command[3]
}

/// Success response for a received command.
pub(crate) fn reply_ok(command: &Value, result: Value) -> String {
    json!([1, command_id(command), null, result]).to_string()
}

/// Error response for a received command.
pub(crate) fn reply_err(command: &Value, error: &str, message: &str) -> String {
    json!([
        1,
        command_id(command),
        { "error": error, "message": message, "stacktrace": "" },
        null
    ])
    .to_string()
}
