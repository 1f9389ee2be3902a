//
// protocol.rs
//
// Custom JSON-RPC messages exchanged with the editor extension and its chat
// bridge
//

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_lsp::lsp_types::notification::Notification;
use tower_lsp::lsp_types::request::Request;
use tower_lsp::lsp_types::Url;

use crate::connection::{ChatParams, ConnectionState};
use crate::highlight::RenderPayload;
use crate::projection::FileNode;

pub const ACTIVE_DOCUMENTS_CHANGED: &str = "highlighter/activeDocumentsChanged";
pub const HIGHLIGHT: &str = "highlight";
pub const UNHIGHLIGHT: &str = "unhighlight";
pub const EXITED: &str = "exited";
pub const ERROR: &str = "error";

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// Focus report from the client. URIs that fail to parse are skipped.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveDocumentsChangedParams {
    pub active_uri: Option<String>,
    #[serde(default)]
    pub visible_uris: Vec<String>,
}

impl ActiveDocumentsChangedParams {
    pub fn active(&self) -> Option<Url> {
        self.active_uri.as_deref().and_then(|s| Url::parse(s).ok())
    }

    pub fn visible(&self) -> Vec<Url> {
        self.visible_uris
            .iter()
            .filter_map(|s| Url::parse(s).ok())
            .collect()
    }
}

/// `highlight` from the chat bridge. `line` arrives as a string or a number.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightParams {
    #[serde(default)]
    pub line: Option<Value>,
    #[serde(default)]
    pub twitch_user: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnhighlightParams {
    #[serde(default)]
    pub line: Option<Value>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub twitch_user: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatErrorParams {
    pub message: String,
}

/// Text form of a `line` argument, so the dispatcher can validate it.
///
/// Anything that is not a string or number keeps its JSON text and is
/// rejected downstream as an invalid line.
pub fn line_text(line: Option<Value>) -> Option<String> {
    match line? {
        Value::Null => None,
        Value::String(text) => Some(text),
        Value::Number(number) => Some(number.to_string()),
        other => Some(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetDecorationsParams {
    pub uri: Url,
    pub decorations: Vec<RenderPayload>,
}

pub enum SetDecorations {}

impl Notification for SetDecorations {
    type Params = SetDecorationsParams;
    const METHOD: &'static str = "highlighter/setDecorations";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusParams {
    pub state: ConnectionState,
    pub label: String,
}

impl From<ConnectionState> for StatusParams {
    fn from(state: ConnectionState) -> Self {
        Self {
            state,
            label: state.label().to_string(),
        }
    }
}

pub enum Status {}

impl Notification for Status {
    type Params = StatusParams;
    const METHOD: &'static str = "highlighter/status";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeChangedParams {
    pub files: Vec<FileNode>,
}

pub enum TreeChanged {}

impl Notification for TreeChanged {
    type Params = TreeChangedParams;
    const METHOD: &'static str = "highlighter/treeChanged";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShowInputBoxParams {
    pub prompt: String,
    pub password: bool,
}

/// Free text prompt. `None` when the user dismissed it.
pub enum ShowInputBox {}

impl Request for ShowInputBox {
    type Params = ShowInputBoxParams;
    type Result = Option<String>;
    const METHOD: &'static str = "highlighter/showInputBox";
}

pub enum StartChat {}

impl Request for StartChat {
    type Params = ChatParams;
    type Result = Value;
    const METHOD: &'static str = "startchat";
}

/// Answers whether the listener was stopped.
pub enum StopChat {}

impl Request for StopChat {
    type Params = ();
    type Result = bool;
    const METHOD: &'static str = "stopchat";
}
