//! Wire message types.
//!
//! Every message body is a JSON array whose first element is a type tag:
//!
//! | Tag | Shape | Direction |
//! |-----|-------|-----------|
//! | `0` | `[0, id, name, params]` | Local → Remote (command) |
//! | `1` | `[1, id, error, result]` | Remote → Local (response) |
//! | `2` | `[2, ..., payload]` | Remote → Local (event) |
//!
//! Right after connecting, Marionette also sends a bare handshake object
//! (`{"applicationType":"gecko","marionetteProtocol":3}`).

// ============================================================================
// Imports
// ============================================================================

use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::{Error, RemoteError, Result};
use crate::identifiers::CommandId;

use super::Command;

// ============================================================================
// Constants
// ============================================================================

/// Type tag of a command message.
pub const COMMAND_TAG: u64 = 0;

/// Type tag of a response message.
pub const RESPONSE_TAG: u64 = 1;

/// Type tag of an event message.
pub const EVENT_TAG: u64 = 2;

// ============================================================================
// Request
// ============================================================================

/// Body of an outbound request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestKind {
    /// A typed command.
    Command(Command),
    /// A pre-built wire string, sent verbatim.
    Raw(String),
}

/// A command paired with its correlation id.
///
/// Created per call and discarded once its reply arrives.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// Correlation id, unique among in-flight requests.
    pub id: CommandId,
    /// What to send.
    pub kind: RequestKind,
}

impl Request {
    /// Creates a typed request.
    #[inline]
    #[must_use]
    pub fn new(id: CommandId, command: Command) -> Self {
        Self {
            id,
            kind: RequestKind::Command(command),
        }
    }

    /// Creates a request from a pre-built wire string.
    ///
    /// The caller is responsible for `wire` carrying the same `id`.
    #[inline]
    #[must_use]
    pub fn raw(id: CommandId, wire: impl Into<String>) -> Self {
        Self {
            id,
            kind: RequestKind::Raw(wire.into()),
        }
    }

    /// Returns the command name (`"raw"` for raw requests).
    #[must_use]
    pub fn name(&self) -> &str {
        match &self.kind {
            RequestKind::Command(command) => command.name(),
            RequestKind::Raw(_) => "raw",
        }
    }

    /// Builds the `[0, id, name, params]` array.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if a raw wire string is not valid JSON.
    pub fn to_wire_array(&self) -> Result<Value> {
        match &self.kind {
            RequestKind::Command(command) => Ok(json!([
                COMMAND_TAG,
                self.id,
                command.name(),
                command.parameters()
            ])),
            RequestKind::Raw(wire) => Ok(serde_json::from_str(wire)?),
        }
    }

    /// Serializes the request to its wire text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if serialization fails.
    pub fn to_wire(&self) -> Result<String> {
        match &self.kind {
            RequestKind::Command(_) => Ok(serde_json::to_string(&self.to_wire_array()?)?),
            RequestKind::Raw(wire) => Ok(wire.clone()),
        }
    }

    /// Applies the matching response, producing the request's reply.
    ///
    /// The error is unset unless the response carries a non-null error slot.
    #[must_use]
    pub fn apply_response(&self, response: Response) -> Reply {
        Reply {
            id: self.id,
            result: response.result,
            error: response.error.map(RemoteError::from_value),
        }
    }
}

// ============================================================================
// Response
// ============================================================================

/// A decoded `[1, id, error, result]` message.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Id of the command being answered.
    pub id: CommandId,
    /// Error payload; `None` when the slot is absent or `null`.
    pub error: Option<Value>,
    /// Result payload (`null` when absent).
    pub result: Value,
}

// ============================================================================
// Reply
// ============================================================================

/// Outcome of a request: a result payload or the remote error.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    /// Id of the answered request.
    pub id: CommandId,
    /// Result payload.
    pub result: Value,
    /// Remote error, if the engine reported one.
    pub error: Option<RemoteError>,
}

impl Reply {
    /// Returns `true` if the remote reported an error.
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Converts the reply into a result, raising the remote error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Remote`] carrying the payload verbatim.
    pub fn into_result(self) -> Result<Value> {
        match self.error {
            Some(error) => Err(Error::Remote(error)),
            None => Ok(self.result),
        }
    }

    /// Converts the reply into its unwrapped `value`, raising the remote error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Remote`] carrying the payload verbatim.
    pub fn into_value(self) -> Result<Value> {
        match self.into_result()? {
            Value::Object(mut map) if map.contains_key("value") => {
                Ok(map.remove("value").unwrap_or(Value::Null))
            }
            other => Ok(other),
        }
    }

    /// Returns the inner `value` field of the result.
    ///
    /// Marionette wraps most results as `{"value": ...}`; bare results are
    /// returned as they are.
    #[must_use]
    pub fn value(&self) -> &Value {
        match &self.result {
            Value::Object(map) if map.contains_key("value") => &map["value"],
            other => other,
        }
    }

    /// Returns the errors-as-data view of the reply.
    #[must_use]
    pub fn status(&self) -> Status {
        match &self.error {
            Some(error) => Status::Failed(error.to_string()),
            None => Status::Ok,
        }
    }
}

/// Errors-as-data outcome of a one-shot command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    /// The command succeeded.
    Ok,
    /// The command failed; holds the remote error text.
    Failed(String),
}

impl Status {
    /// Returns `true` for [`Status::Ok`].
    #[inline]
    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

// ============================================================================
// Handshake
// ============================================================================

/// Greeting sent by the server on connect.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    /// Application type (`gecko`).
    #[serde(default)]
    pub application_type: String,
    /// Protocol level.
    #[serde(default)]
    pub marionette_protocol: u32,
}

// ============================================================================
// Message
// ============================================================================

/// Any message received from the remote end.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// An answer to one of our commands.
    Response(Response),
    /// An unsolicited event; holds the payload element.
    Event(Value),
    /// A command sent by the remote; this client never serves those.
    Command(Value),
    /// The connect-time greeting.
    Handshake(Handshake),
}

impl Message {
    /// Parses message text.
    ///
    /// # Errors
    ///
    /// - [`Error::Json`] if the text is not JSON
    /// - [`Error::Protocol`] if the JSON has no recognised shape
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;

        match value {
            Value::Array(items) => Self::from_array(items),
            Value::Object(_) => Ok(Self::Handshake(serde_json::from_value(value)?)),
            other => Err(Error::protocol(format!(
                "Expected array or object message, got {other}"
            ))),
        }
    }

    fn from_array(mut items: Vec<Value>) -> Result<Self> {
        let tag = items
            .first()
            .and_then(Value::as_u64)
            .ok_or_else(|| Error::protocol("Message has no type tag"))?;

        match tag {
            RESPONSE_TAG => {
                let id = items
                    .get(1)
                    .and_then(Value::as_u64)
                    .and_then(|id| u32::try_from(id).ok())
                    .map(CommandId::new)
                    .ok_or_else(|| Error::protocol("Response has no valid id"))?;

                let result = items.get_mut(3).map(Value::take).unwrap_or(Value::Null);
                let error = items
                    .get_mut(2)
                    .map(Value::take)
                    .filter(|error| !error.is_null());

                Ok(Self::Response(Response { id, error, result }))
            }
            EVENT_TAG => {
                if items.len() < 2 {
                    return Err(Error::protocol("Event has no payload"));
                }
                let payload = items.pop().unwrap_or(Value::Null);
                Ok(Self::Event(payload))
            }
            COMMAND_TAG => Ok(Self::Command(Value::Array(items))),
            other => Err(Error::protocol(format!("Unknown message type tag {other}"))),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_array() {
        let request = Request::new(
            CommandId::new(5),
            Command::Navigate {
                url: "https://example.com/".into(),
            },
        );

        assert_eq!(
            request.to_wire().expect("wire"),
            r#"[0,5,"WebDriver:Navigate",{"url":"https://example.com/"}]"#
        );
    }

    #[test]
    fn test_raw_request_is_sent_verbatim() {
        let wire = r#"[0,9,"WebDriver:GetTitle",{}]"#;
        let request = Request::raw(CommandId::new(9), wire);

        assert_eq!(request.to_wire().expect("wire"), wire);
        assert_eq!(request.name(), "raw");
        assert_eq!(request.to_wire_array().expect("array")[1], json!(9));
    }

    #[test]
    fn test_parse_success_response() {
        let message = Message::parse(r#"[1,7,null,{"value":"ok"}]"#).expect("parse");

        let Message::Response(response) = message else {
            panic!("expected response");
        };
        assert_eq!(response.id, CommandId::new(7));
        assert_eq!(response.error, None);
        assert_eq!(response.result, json!({ "value": "ok" }));
    }

    #[test]
    fn test_null_error_slot_means_no_error() {
        let request = Request::new(CommandId::new(1), Command::GetTitle);
        let Message::Response(response) = Message::parse("[1,1,null,null]").expect("parse") else {
            panic!("expected response");
        };

        let reply = request.apply_response(response);
        assert!(!reply.is_error());
        assert_eq!(reply.status(), Status::Ok);
    }

    #[test]
    fn test_error_response_becomes_remote_error() {
        let request = Request::new(CommandId::new(2), Command::GetTitle);
        let text = r#"[1,2,{"error":"no such window","message":"gone"},null]"#;
        let Message::Response(response) = Message::parse(text).expect("parse") else {
            panic!("expected response");
        };

        let reply = request.apply_response(response);
        assert_eq!(reply.status(), Status::Failed("no such window: gone".into()));

        let err = reply.into_result().unwrap_err();
        assert!(err.is_remote());
    }

    #[test]
    fn test_parse_event_takes_last_element() {
        let message = Message::parse(r#"[2,"x",{"to":"net","data":1}]"#).expect("parse");
        assert_eq!(message, Message::Event(json!({ "to": "net", "data": 1 })));
    }

    #[test]
    fn test_parse_handshake() {
        let message =
            Message::parse(r#"{"applicationType":"gecko","marionetteProtocol":3}"#).expect("parse");
        assert_eq!(
            message,
            Message::Handshake(Handshake {
                application_type: "gecko".into(),
                marionette_protocol: 3,
            })
        );
    }

    #[test]
    fn test_parse_rejects_unknown_tag() {
        assert!(matches!(
            Message::parse("[9,1]"),
            Err(Error::Protocol { .. })
        ));
        assert!(matches!(Message::parse("42"), Err(Error::Protocol { .. })));
        assert!(matches!(Message::parse("[1"), Err(Error::Json(_))));
    }

    #[test]
    fn test_reply_value_unwraps() {
        let reply = Reply {
            id: CommandId::new(1),
            result: json!({ "value": "Title" }),
            error: None,
        };
        assert_eq!(reply.value(), &json!("Title"));
        assert_eq!(reply.into_value().expect("value"), json!("Title"));
    }

    #[test]
    fn test_bare_result_is_its_own_value() {
        let reply = Reply {
            id: CommandId::new(1),
            result: json!({ "sessionId": "abc" }),
            error: None,
        };
        assert_eq!(reply.value(), &json!({ "sessionId": "abc" }));
    }
}
