//! Marionette command definitions.
//!
//! Commands are a closed set of verbs. Each one knows its wire name and
//! builds its own parameter object; [`Request`](super::Request) pairs a
//! command with its [`CommandId`](crate::identifiers::CommandId).
//!
//! # Command Groups
//!
//! | Group | Commands |
//! |-------|----------|
//! | Session | `NewSession`, `DeleteSession`, `Quit`, context get/set |
//! | Navigation | `Navigate`, `Back`, `Forward`, `Refresh`, url, title, source |
//! | Element | find, click, clear, send keys, text, attribute, state, rect |
//! | Script | `ExecuteScript`, `ExecuteAsyncScript` |
//! | Window | frames, handles, rect, new/close window |
//! | Misc | timeouts, cookies, screenshot |

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::identifiers::{ElementId, WindowHandle};

// ============================================================================
// Constants
// ============================================================================

/// Key under which W3C element references are serialized.
pub const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Legacy element reference key still emitted by older Marionette servers.
pub const LEGACY_ELEMENT_KEY: &str = "ELEMENT";

// ============================================================================
// Supporting Types
// ============================================================================

/// Execution context for scripts and navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Context {
    /// No context selected yet.
    #[default]
    None,
    /// Privileged browser chrome.
    Chrome,
    /// Web content of the current browsing context.
    Content,
}

impl Context {
    /// Returns the wire token, or `None` for [`Context::None`].
    #[inline]
    #[must_use]
    pub fn as_wire(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Chrome => Some("chrome"),
            Self::Content => Some("content"),
        }
    }

    /// Parses a wire token.
    #[must_use]
    pub fn from_wire(value: &str) -> Self {
        match value {
            "chrome" => Self::Chrome,
            "content" => Self::Content,
            _ => Self::None,
        }
    }
}

/// Target of a frame switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameTarget {
    /// The top-level document.
    Top,
    /// Child frame by zero-based index.
    Index(u16),
    /// Frame owned by an `<iframe>`/`<frame>` element.
    Element(ElementId),
}

/// Kind of browsing context created by `NewWindow`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowKind {
    /// A new tab.
    #[default]
    Tab,
    /// A new top-level window.
    Window,
}

impl WindowKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Tab => "tab",
            Self::Window => "window",
        }
    }
}

/// Window position and size in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WindowRect {
    /// Horizontal position.
    pub x: f64,
    /// Vertical position.
    pub y: f64,
    /// Outer width.
    pub width: f64,
    /// Outer height.
    pub height: f64,
}

/// Element position and size in CSS pixels.
pub type ElementRect = WindowRect;

/// A browser cookie.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    /// Cookie name.
    pub name: String,
    /// Cookie value.
    pub value: String,
    /// Path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Domain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// Secure flag.
    #[serde(default)]
    pub secure: bool,
    /// HttpOnly flag.
    #[serde(default)]
    pub http_only: bool,
    /// Expiry as seconds since the epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<u64>,
    /// SameSite policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<String>,
}

// ============================================================================
// Command
// ============================================================================

/// All Marionette commands understood by this client.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    // ========================================================================
    // Session
    // ========================================================================
    /// Start a session with the given capabilities.
    NewSession {
        /// Requested capabilities.
        capabilities: Value,
    },
    /// End the current session.
    DeleteSession,
    /// Shut the browser down.
    Quit,
    /// Read the current context.
    GetContext,
    /// Select the context for subsequent commands.
    SetContext {
        /// Target context.
        context: Context,
    },

    // ========================================================================
    // Navigation
    // ========================================================================
    /// Load a URL in the current browsing context.
    Navigate {
        /// Absolute URL.
        url: String,
    },
    /// Read the current URL.
    GetCurrentUrl,
    /// Read the document title.
    GetTitle,
    /// History back.
    Back,
    /// History forward.
    Forward,
    /// Reload the document.
    Refresh,
    /// Serialize the current DOM.
    GetPageSource,

    // ========================================================================
    // Element Lookup
    // ========================================================================
    /// Find the first matching element.
    FindElement {
        /// Locator strategy (`css selector`, `xpath`, ...).
        using: String,
        /// Locator expression.
        value: String,
        /// Optional start node.
        element: Option<ElementId>,
    },
    /// Find all matching elements.
    FindElements {
        /// Locator strategy.
        using: String,
        /// Locator expression.
        value: String,
        /// Optional start node.
        element: Option<ElementId>,
    },

    // ========================================================================
    // Element Interaction
    // ========================================================================
    /// Click an element.
    ElementClick {
        /// Target element.
        id: ElementId,
    },
    /// Clear an editable element.
    ElementClear {
        /// Target element.
        id: ElementId,
    },
    /// Type text into an element.
    ElementSendKeys {
        /// Target element.
        id: ElementId,
        /// Text, may contain WebDriver key code points.
        text: String,
    },
    /// Read visible text.
    GetElementText {
        /// Target element.
        id: ElementId,
    },
    /// Read an attribute.
    GetElementAttribute {
        /// Target element.
        id: ElementId,
        /// Attribute name.
        name: String,
    },
    /// Read a DOM property.
    GetElementProperty {
        /// Target element.
        id: ElementId,
        /// Property name.
        name: String,
    },
    /// Read the tag name.
    GetElementTagName {
        /// Target element.
        id: ElementId,
    },
    /// Check visibility.
    IsElementDisplayed {
        /// Target element.
        id: ElementId,
    },
    /// Check enabled state.
    IsElementEnabled {
        /// Target element.
        id: ElementId,
    },
    /// Check selected state.
    IsElementSelected {
        /// Target element.
        id: ElementId,
    },
    /// Read position and size.
    GetElementRect {
        /// Target element.
        id: ElementId,
    },

    // ========================================================================
    // Script
    // ========================================================================
    /// Run a synchronous script.
    ExecuteScript(ScriptParams),
    /// Run an asynchronous script.
    ExecuteAsyncScript(ScriptParams),

    // ========================================================================
    // Timeouts
    // ========================================================================
    /// Read all timeouts.
    GetTimeouts,
    /// Set one or more timeouts.
    SetTimeouts {
        /// Object keyed by timeout token, values in milliseconds.
        timeouts: Map<String, Value>,
    },

    // ========================================================================
    // Frames and Windows
    // ========================================================================
    /// Switch to a child frame or the top document.
    SwitchToFrame {
        /// Frame to select.
        target: FrameTarget,
    },
    /// Switch to the parent frame.
    SwitchToParentFrame,
    /// Read the current window handle.
    GetWindowHandle,
    /// Read all window handles.
    GetWindowHandles,
    /// Switch to another window.
    SwitchToWindow {
        /// Target handle.
        handle: WindowHandle,
    },
    /// Open a new tab or window.
    NewWindow {
        /// Tab or window.
        kind: WindowKind,
    },
    /// Close the current window.
    CloseWindow,
    /// Read the window rect.
    GetWindowRect,
    /// Move and/or resize the window.
    SetWindowRect {
        /// New rect.
        rect: WindowRect,
    },
    /// Maximize the window.
    MaximizeWindow,

    // ========================================================================
    // Misc
    // ========================================================================
    /// Capture a PNG screenshot, optionally of one element.
    TakeScreenshot {
        /// Element to capture.
        element: Option<ElementId>,
    },
    /// Read cookies visible to the current document.
    GetCookies,
    /// Add a cookie.
    AddCookie {
        /// Cookie to add.
        cookie: Cookie,
    },
    /// Delete all cookies.
    DeleteAllCookies,
}

// ============================================================================
// ScriptParams
// ============================================================================

/// Parameters of a script execution.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScriptParams {
    /// Function body.
    pub script: String,
    /// Positional arguments (`arguments[i]` in the script).
    pub args: Vec<Value>,
    /// Source name shown in remote stack traces.
    pub filename: Option<String>,
    /// Named sandbox to evaluate in.
    pub sandbox: Option<String>,
    /// Discard any existing sandbox of that name first.
    pub new_sandbox: bool,
}

impl ScriptParams {
    fn to_value(&self) -> Value {
        let mut params = Map::new();
        params.insert("script".into(), Value::String(self.script.clone()));
        params.insert("args".into(), Value::Array(self.args.clone()));
        if let Some(filename) = &self.filename {
            params.insert("filename".into(), Value::String(filename.clone()));
        }
        if let Some(sandbox) = &self.sandbox {
            params.insert("sandbox".into(), Value::String(sandbox.clone()));
            params.insert("newSandbox".into(), Value::Bool(self.new_sandbox));
        }
        Value::Object(params)
    }
}

// ============================================================================
// Command - Wire Mapping
// ============================================================================

impl Command {
    /// Returns the wire name of the command.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::NewSession { .. } => "WebDriver:NewSession",
            Self::DeleteSession => "WebDriver:DeleteSession",
            Self::Quit => "Marionette:Quit",
            Self::GetContext => "Marionette:GetContext",
            Self::SetContext { .. } => "Marionette:SetContext",
            Self::Navigate { .. } => "WebDriver:Navigate",
            Self::GetCurrentUrl => "WebDriver:GetCurrentURL",
            Self::GetTitle => "WebDriver:GetTitle",
            Self::Back => "WebDriver:Back",
            Self::Forward => "WebDriver:Forward",
            Self::Refresh => "WebDriver:Refresh",
            Self::GetPageSource => "WebDriver:GetPageSource",
            Self::FindElement { .. } => "WebDriver:FindElement",
            Self::FindElements { .. } => "WebDriver:FindElements",
            Self::ElementClick { .. } => "WebDriver:ElementClick",
            Self::ElementClear { .. } => "WebDriver:ElementClear",
            Self::ElementSendKeys { .. } => "WebDriver:ElementSendKeys",
            Self::GetElementText { .. } => "WebDriver:GetElementText",
            Self::GetElementAttribute { .. } => "WebDriver:GetElementAttribute",
            Self::GetElementProperty { .. } => "WebDriver:GetElementProperty",
            Self::GetElementTagName { .. } => "WebDriver:GetElementTagName",
            Self::IsElementDisplayed { .. } => "WebDriver:IsElementDisplayed",
            Self::IsElementEnabled { .. } => "WebDriver:IsElementEnabled",
            Self::IsElementSelected { .. } => "WebDriver:IsElementSelected",
            Self::GetElementRect { .. } => "WebDriver:GetElementRect",
            Self::ExecuteScript(_) => "WebDriver:ExecuteScript",
            Self::ExecuteAsyncScript(_) => "WebDriver:ExecuteAsyncScript",
            Self::GetTimeouts => "WebDriver:GetTimeouts",
            Self::SetTimeouts { .. } => "WebDriver:SetTimeouts",
            Self::SwitchToFrame { .. } => "WebDriver:SwitchToFrame",
            Self::SwitchToParentFrame => "WebDriver:SwitchToParentFrame",
            Self::GetWindowHandle => "WebDriver:GetWindowHandle",
            Self::GetWindowHandles => "WebDriver:GetWindowHandles",
            Self::SwitchToWindow { .. } => "WebDriver:SwitchToWindow",
            Self::NewWindow { .. } => "WebDriver:NewWindow",
            Self::CloseWindow => "WebDriver:CloseWindow",
            Self::GetWindowRect => "WebDriver:GetWindowRect",
            Self::SetWindowRect { .. } => "WebDriver:SetWindowRect",
            Self::MaximizeWindow => "WebDriver:MaximizeWindow",
            Self::TakeScreenshot { .. } => "WebDriver:TakeScreenshot",
            Self::GetCookies => "WebDriver:GetCookies",
            Self::AddCookie { .. } => "WebDriver:AddCookie",
            Self::DeleteAllCookies => "WebDriver:DeleteAllCookies",
        }
    }

    /// Builds the parameter object sent with the command.
    ///
    /// Commands without parameters send an empty object.
    #[must_use]
    pub fn parameters(&self) -> Value {
        match self {
            Self::NewSession { capabilities } => json!({ "capabilities": capabilities }),

            Self::SetContext { context } => json!({ "value": context.as_wire() }),

            Self::Navigate { url } => json!({ "url": url }),

            Self::FindElement {
                using,
                value,
                element,
            }
            | Self::FindElements {
                using,
                value,
                element,
            } => {
                let mut params = json!({ "using": using, "value": value });
                if let Some(element) = element {
                    params["element"] = Value::String(element.as_str().to_string());
                }
                params
            }

            Self::ElementClick { id }
            | Self::ElementClear { id }
            | Self::GetElementText { id }
            | Self::GetElementTagName { id }
            | Self::IsElementDisplayed { id }
            | Self::IsElementEnabled { id }
            | Self::IsElementSelected { id }
            | Self::GetElementRect { id } => json!({ "id": id }),

            Self::ElementSendKeys { id, text } => json!({ "id": id, "text": text }),

            Self::GetElementAttribute { id, name } | Self::GetElementProperty { id, name } => {
                json!({ "id": id, "name": name })
            }

            Self::ExecuteScript(params) | Self::ExecuteAsyncScript(params) => params.to_value(),

            Self::SetTimeouts { timeouts } => Value::Object(timeouts.clone()),

            Self::SwitchToFrame { target } => match target {
                FrameTarget::Top => json!({ "id": null }),
                FrameTarget::Index(index) => json!({ "id": index }),
                FrameTarget::Element(element) => json!({ "element": element }),
            },

            Self::SwitchToWindow { handle } => json!({ "handle": handle }),

            Self::NewWindow { kind } => json!({ "type": kind.as_str() }),

            Self::SetWindowRect { rect } => json!(rect),

            Self::TakeScreenshot { element } => match element {
                Some(id) => json!({ "id": id, "full": false, "hash": false }),
                None => json!({ "full": true, "hash": false }),
            },

            Self::AddCookie { cookie } => json!({ "cookie": cookie }),

            Self::DeleteSession
            | Self::Quit
            | Self::GetContext
            | Self::GetCurrentUrl
            | Self::GetTitle
            | Self::Back
            | Self::Forward
            | Self::Refresh
            | Self::GetPageSource
            | Self::GetTimeouts
            | Self::SwitchToParentFrame
            | Self::GetWindowHandle
            | Self::GetWindowHandles
            | Self::CloseWindow
            | Self::GetWindowRect
            | Self::MaximizeWindow
            | Self::GetCookies
            | Self::DeleteAllCookies => Value::Object(Map::new()),
        }
    }
}

// ============================================================================
// Element References
// ============================================================================

/// Serializes an element reference for use as a script argument.
#[must_use]
pub fn element_reference(id: &ElementId) -> Value {
    json!({ ELEMENT_KEY: id, LEGACY_ELEMENT_KEY: id })
}

/// Extracts an element ID from a web element reference.
///
/// Accepts the W3C key, the legacy key, or a bare string.
#[must_use]
pub fn parse_element_reference(value: &Value) -> Option<ElementId> {
    match value {
        Value::String(id) => Some(ElementId::new(id)),
        Value::Object(map) => map
            .get(ELEMENT_KEY)
            .or_else(|| map.get(LEGACY_ELEMENT_KEY))
            .and_then(Value::as_str)
            .map(ElementId::new),
        _ => None,
    }
}

// ============================================================================
// Tests
// ============================================================================
