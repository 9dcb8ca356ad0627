//! Wire schema of the remote assistant service.

use serde::{Deserialize, Serialize};

use crate::chat::model::{NodeError, NodeIdentity};
use crate::workflow::NodeParameters;

/// A canned reply the UI can offer as a button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickReply {
    pub label: String,
    #[serde(rename = "type")]
    pub reply_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_feedback: Option<bool>,
}

/// The user as introduced to the assistant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatUser {
    pub first_name: String,
}

/// Editor-side events the assistant can react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InteractionEvent {
    ErroredNodeExecutionSuccess,
    ErroredNodeErroredAgain,
}

/// Body of a `converse` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum RequestPayload {
    /// Opens a conversation about a node error.
    InitErrorHelp {
        user: ChatUser,
        error: NodeError,
        node: NodeIdentity,
    },
    UserMessage {
        content: String,
        #[serde(
            default,
            rename = "quickReplyType",
            skip_serializing_if = "Option::is_none"
        )]
        quick_reply_type: Option<String>,
    },
    Event { event: InteractionEvent },
}

impl RequestPayload {
    /// The `action` tag, for logging.
    pub fn action(&self) -> &'static str {
        match self {
            Self::InitErrorHelp { .. } => "init-error-help",
            Self::UserMessage { .. } => "user-message",
            Self::Event { .. } => "event",
        }
    }
}

/// One message in a `converse` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum MessageResponse {
    AssistantMessage {
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        #[serde(default, rename = "quickReplies", skip_serializing_if = "Vec::is_empty")]
        quick_replies: Vec<QuickReply>,
    },
    CodeDiff {
        description: String,
        #[serde(rename = "codeDiff")]
        code_diff: String,
        #[serde(rename = "suggestionId")]
        suggestion_id: String,
        #[serde(default)]
        solution_count: u32,
        #[serde(default, rename = "quickReplies", skip_serializing_if = "Vec::is_empty")]
        quick_replies: Vec<QuickReply>,
    },
    EndSession {
        #[serde(default, rename = "quickReplies", skip_serializing_if = "Vec::is_empty")]
        quick_replies: Vec<QuickReply>,
    },
}

/// Response to a `converse` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponsePayload {
    pub session_id: String,
    #[serde(default)]
    pub messages: Vec<MessageResponse>,
}

/// Body of an `apply_suggestion` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplySuggestionRequest {
    pub session_id: String,
    pub suggestion_id: String,
}

/// Response to an `apply_suggestion` call: the parameters to write onto the node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplySuggestionResponse {
    pub parameters: NodeParameters,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_error_help_shape() {
        let mut error = NodeError::new("NodeOperationError", "Bad input");
        error.line_number = Some(3);
        let payload = RequestPayload::InitErrorHelp {
            user: ChatUser {
                first_name: "Ada".into(),
            },
            error,
            node: NodeIdentity::new("Set1"),
        };

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["action"], "init-error-help");
        assert_eq!(json["user"]["firstName"], "Ada");
        assert_eq!(json["error"]["message"], "Bad input");
        assert_eq!(json["error"]["lineNumber"], 3);
        assert!(json["error"].get("stack").is_none());
        assert_eq!(json["node"]["name"], "Set1");
        assert_eq!(payload.action(), "init-error-help");
    }

    #[test]
    fn user_message_omits_missing_quick_reply_type() {
        let payload = RequestPayload::UserMessage {
            content: "why?".into(),
            quick_reply_type: None,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json, serde_json::json!({"action": "user-message", "content": "why?"}));

        let payload = RequestPayload::UserMessage {
            content: "yes".into(),
            quick_reply_type: Some("resolved".into()),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["quickReplyType"], "resolved");
    }

    #[test]
    fn event_payload() {
        let payload = RequestPayload::Event {
            event: InteractionEvent::ErroredNodeErroredAgain,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"action": "event", "event": "errored-node-errored-again"})
        );
    }

    #[test]
    fn parses_service_response() {
        let json = r#"{
            "sessionId": "sess-1",
            "messages": [
                {"type": "assistant-message", "content": "Looks like a typo", "title": "Diagnosis"},
                {"type": "code-diff", "description": "Fix", "codeDiff": "@@", "suggestionId": "sug-1",
                 "solution_count": 2, "quickReplies": [{"label": "Thanks", "type": "resolved", "isFeedback": true}]},
                {"type": "end-session"}
            ]
        }"#;
        let parsed: ResponsePayload = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.session_id, "sess-1");
        assert_eq!(parsed.messages.len(), 3);

        match &parsed.messages[1] {
            MessageResponse::CodeDiff {
                suggestion_id,
                solution_count,
                quick_replies,
                ..
            } => {
                assert_eq!(suggestion_id, "sug-1");
                assert_eq!(*solution_count, 2);
                assert_eq!(quick_replies[0].is_feedback, Some(true));
            }
            other => panic!("Expected CodeDiff, got {other:?}"),
        }
        assert!(matches!(parsed.messages[2], MessageResponse::EndSession { .. }));
    }

    #[test]
    fn apply_suggestion_shapes() {
        let request = ApplySuggestionRequest {
            session_id: "s".into(),
            suggestion_id: "g".into(),
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({"sessionId": "s", "suggestionId": "g"})
        );

        let response: ApplySuggestionResponse =
            serde_json::from_str(r#"{"parameters": {"jsCode": "return [];"}}"#).unwrap();
        assert_eq!(response.parameters["jsCode"], "return [];");
    }
}
