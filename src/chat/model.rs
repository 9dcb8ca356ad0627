//! Chat data model: error contexts, log entries, session state, and the
//! change events broadcast to observers.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::transport::protocol::QuickReply;

/// Reference to a node in the externally owned workflow graph.
///
/// Only `name` is interpreted here; anything else the editor sends along
/// (type, version, position, ...) is carried through to the assistant service
/// untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeIdentity {
    pub name: String,
    #[serde(flatten)]
    pub details: serde_json::Map<String, serde_json::Value>,
}

impl NodeIdentity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            details: serde_json::Map::new(),
        }
    }
}

/// The error a node produced, as reported by the editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeError {
    pub name: String,
    pub message: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl NodeError {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            error_type: None,
            description: None,
            line_number: None,
            stack: None,
        }
    }
}

/// The (node, error) pair a conversation is about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorContext {
    pub node: NodeIdentity,
    pub error: NodeError,
}

impl ErrorContext {
    /// Shorthand for a context with only the fields session matching looks at.
    pub fn new(node_name: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            node: NodeIdentity::new(node_name),
            error: NodeError::new("NodeOperationError", error_message),
        }
    }
}

/// Who authored a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Apply state of a code-diff suggestion.
///
/// Progresses Idle → Replacing → Replaced | Error. A failed apply may be
/// retried by the user (Error → Replacing); Replaced is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionState {
    #[default]
    Idle,
    Replacing,
    Replaced,
    Error,
}

impl SuggestionState {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: SuggestionState) -> bool {
        use SuggestionState::*;
        matches!(
            (self, target),
            (Idle, Replacing) | (Error, Replacing) | (Replacing, Replaced) | (Replacing, Error)
        )
    }

    pub fn is_replacing(&self) -> bool {
        matches!(self, Self::Replacing)
    }

    pub fn is_replaced(&self) -> bool {
        matches!(self, Self::Replaced)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error)
    }
}

impl std::fmt::Display for SuggestionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Replacing => "replacing",
            Self::Replaced => "replaced",
            Self::Error => "error",
        };
        write!(f, "{s}")
    }
}

/// Plain text from either side of the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextMessage {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub quick_replies: Vec<QuickReply>,
    /// Set on the loading placeholder while a round trip is pending.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub streaming: bool,
}

/// A proposed parameter change the user can apply to the errored node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeDiffMessage {
    pub description: String,
    pub code_diff: String,
    pub suggestion_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub quick_replies: Vec<QuickReply>,
    #[serde(default)]
    pub state: SuggestionState,
}

/// Shown in place of an answer when the assistant service could not be reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorNotice {
    pub content: String,
}

/// One entry in the conversation log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Message {
    Text(TextMessage),
    CodeDiff(CodeDiffMessage),
    #[serde(rename = "error")]
    ErrorNotice(ErrorNotice),
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self::Text(TextMessage {
            role: Role::User,
            content: content.into(),
            title: None,
            quick_replies: Vec::new(),
            streaming: false,
        })
    }

    /// An empty assistant entry standing in for a pending response.
    pub fn loading() -> Self {
        Self::Text(TextMessage {
            role: Role::Assistant,
            content: String::new(),
            title: None,
            quick_replies: Vec::new(),
            streaming: true,
        })
    }

    pub fn error_notice(content: impl Into<String>) -> Self {
        Self::ErrorNotice(ErrorNotice {
            content: content.into(),
        })
    }

    pub fn role(&self) -> Role {
        match self {
            Self::Text(text) => text.role,
            Self::CodeDiff(_) | Self::ErrorNotice(_) => Role::Assistant,
        }
    }

    /// Free-text content, if this kind of entry has any.
    pub fn content(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(&text.content),
            Self::ErrorNotice(notice) => Some(&notice.content),
            Self::CodeDiff(_) => None,
        }
    }

    pub fn is_streaming(&self) -> bool {
        matches!(self, Self::Text(text) if text.streaming)
    }

    pub fn as_code_diff(&self) -> Option<&CodeDiffMessage> {
        match self {
            Self::CodeDiff(diff) => Some(diff),
            _ => None,
        }
    }

    pub fn as_code_diff_mut(&mut self) -> Option<&mut CodeDiffMessage> {
        match self {
            Self::CodeDiff(diff) => Some(diff),
            _ => None,
        }
    }
}

/// Identity and visibility of the current conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    /// Local key, regenerated whenever the conversation is reset.
    pub local_id: Uuid,
    /// Assigned by the assistant service on the first response.
    pub session_id: Option<String>,
    pub active_error_context: Option<ErrorContext>,
    pub window_open: bool,
    /// The service sent an `end-session` message.
    pub ended: bool,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self {
            local_id: Uuid::new_v4(),
            session_id: None,
            active_error_context: None,
            window_open: false,
            ended: false,
        }
    }
}

/// Full view of the chat state, sent to observers on connect.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSnapshot {
    pub session: ChatSession,
    pub messages: Vec<Message>,
    pub chat_width: f64,
    pub open: bool,
    pub can_show_assistant: bool,
}

/// Actions a connected client can send over the WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ChatAction {
    InitErrorHelper {
        context: ErrorContext,
    },
    SendMessage {
        content: String,
        #[serde(default, rename = "quickReplyType")]
        quick_reply_type: Option<String>,
    },
    OpenChat,
    CloseChat,
    UpdateWindowWidth {
        width: f64,
    },
    ApplySuggestion {
        index: usize,
    },
    UndoSuggestion {
        index: usize,
    },
}

/// Change notifications broadcast by the coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// A new error context replaced the previous conversation.
    SessionReset {
        local_id: Uuid,
        error_context: ErrorContext,
    },
    /// The service assigned (or re-confirmed) the session id.
    SessionStarted { session_id: String },
    /// The log changed; carries the full log.
    MessagesChanged { messages: Vec<Message> },
    /// A single entry changed in place.
    MessageUpdated { index: usize, message: Message },
    WindowChanged { open: bool, width: f64 },
    SessionEnded,
    /// Full state, sent to a client when it connects or falls behind.
    Snapshot { snapshot: ChatSnapshot },
}
