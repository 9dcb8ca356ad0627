//! Message log: the ordered conversation, plus the loading placeholder
//! lifecycle around each round trip.

use tracing::debug;

use super::model::{CodeDiffMessage, Message, Role, SuggestionState, TextMessage};
use crate::transport::protocol::MessageResponse;

/// What an appended response batch did besides adding entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Number of entries added to the log.
    pub appended: usize,
    /// The batch contained an `end-session` message.
    pub session_ended: bool,
}

/// Ordered store of conversation entries.
///
/// Entries are only ever appended; the sole removal path is
/// `finalize_streaming`, which drops unfulfilled placeholders.
#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    messages: Vec<Message>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn get(&self, index: usize) -> Option<&Message> {
        self.messages.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Message> {
        self.messages.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn append_user(&mut self, content: impl Into<String>) {
        self.messages.push(Message::user(content));
    }

    /// Push an empty streaming placeholder for a pending response.
    pub fn append_assistant_loading(&mut self) {
        self.messages.push(Message::loading());
    }

    pub fn append_error(&mut self, content: impl Into<String>) {
        self.messages.push(Message::error_notice(content));
    }

    /// Map service messages onto log entries, in order.
    ///
    /// `end-session` messages are not rendered; they only flag the outcome.
    pub fn append_assistant_batch(&mut self, responses: Vec<MessageResponse>) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();

        for response in responses {
            match response {
                MessageResponse::AssistantMessage {
                    content,
                    title,
                    quick_replies,
                } => {
                    self.messages.push(Message::Text(TextMessage {
                        role: Role::Assistant,
                        content,
                        title,
                        quick_replies,
                        streaming: false,
                    }));
                    outcome.appended += 1;
                }
                MessageResponse::CodeDiff {
                    description,
                    code_diff,
                    suggestion_id,
                    quick_replies,
                    ..
                } => {
                    self.messages.push(Message::CodeDiff(CodeDiffMessage {
                        description,
                        code_diff,
                        suggestion_id,
                        quick_replies,
                        state: SuggestionState::Idle,
                    }));
                    outcome.appended += 1;
                }
                MessageResponse::EndSession { .. } => {
                    outcome.session_ended = true;
                }
            }
        }

        outcome
    }

    /// Drop entries with empty content and clear every streaming flag.
    ///
    /// Code diffs carry no free-text content and are always kept. Returns the
    /// number of entries removed.
    pub fn finalize_streaming(&mut self) -> usize {
        let before = self.messages.len();
        self.messages
            .retain(|message| message.content().is_none_or(|content| !content.is_empty()));

        for message in &mut self.messages {
            if let Message::Text(text) = message {
                text.streaming = false;
            }
        }

        let removed = before - self.messages.len();
        if removed > 0 {
            debug!(removed, "Removed unfulfilled placeholders");
        }
        removed
    }

    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assistant(content: &str) -> MessageResponse {
        MessageResponse::AssistantMessage {
            content: content.into(),
            title: None,
            quick_replies: vec![],
        }
    }

    fn code_diff(id: &str) -> MessageResponse {
        MessageResponse::CodeDiff {
            description: "Use the right field".into(),
            code_diff: "-a\n+b".into(),
            suggestion_id: id.into(),
            solution_count: 1,
            quick_replies: vec![],
        }
    }

    #[test]
    fn round_trip_replaces_placeholder_in_place() {
        let mut log = MessageLog::new();
        log.append_user("why does this fail?");
        log.append_assistant_loading();
        assert_eq!(log.len(), 2);
        assert!(log.get(1).unwrap().is_streaming());

        let outcome = log.append_assistant_batch(vec![assistant("Because..."), code_diff("s1")]);
        assert_eq!(outcome.appended, 2);
        assert!(!outcome.session_ended);

        assert_eq!(log.finalize_streaming(), 1);
        assert_eq!(log.len(), 3);
        assert_eq!(log.get(0).unwrap().role(), Role::User);
        assert_eq!(log.get(1).unwrap().content(), Some("Because..."));
        assert!(log.get(2).unwrap().as_code_diff().is_some());
    }

    #[test]
    fn finalize_leaves_no_empty_or_streaming_entries() {
        let mut log = MessageLog::new();
        log.append_assistant_loading();
        log.append_user("");
        log.append_error("");
        log.messages.push(Message::Text(TextMessage {
            role: Role::Assistant,
            content: "partial".into(),
            title: None,
            quick_replies: vec![],
            streaming: true,
        }));

        log.finalize_streaming();

        assert_eq!(log.len(), 1);
        assert!(log
            .messages()
            .iter()
            .all(|m| m.content() != Some("") && !m.is_streaming()));
        assert_eq!(log.get(0).unwrap().content(), Some("partial"));
    }

    #[test]
    fn finalize_keeps_code_diffs() {
        let mut log = MessageLog::new();
        log.append_assistant_batch(vec![code_diff("s1")]);
        log.append_assistant_loading();
        assert_eq!(log.finalize_streaming(), 1);
        assert_eq!(log.len(), 1);
        assert!(log.get(0).unwrap().as_code_diff().is_some());
    }

    #[test]
    fn end_session_is_not_rendered() {
        let mut log = MessageLog::new();
        let outcome = log.append_assistant_batch(vec![
            assistant("Glad it worked"),
            MessageResponse::EndSession {
                quick_replies: vec![],
            },
        ]);
        assert_eq!(outcome.appended, 1);
        assert!(outcome.session_ended);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn quick_replies_are_carried() {
        let mut log = MessageLog::new();
        log.append_assistant_batch(vec![MessageResponse::AssistantMessage {
            content: "Did that help?".into(),
            title: Some("Follow-up".into()),
            quick_replies: vec![crate::transport::protocol::QuickReply {
                label: "Yes".into(),
                reply_type: "resolved".into(),
                is_feedback: Some(true),
            }],
        }]);

        match log.get(0).unwrap() {
            Message::Text(text) => {
                assert_eq!(text.title.as_deref(), Some("Follow-up"));
                assert_eq!(text.quick_replies.len(), 1);
            }
            other => panic!("Expected Text, got {other:?}"),
        }
    }

    #[test]
    fn clear_empties_log() {
        let mut log = MessageLog::new();
        log.append_user("a");
        log.append_error("b");
        log.clear();
        assert!(log.is_empty());
    }
}
