//! Session coordinator: owns the conversation state and drives round trips
//! to the assistant service.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, broadcast};
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::log::MessageLog;
use super::matcher::is_same_session;
use super::model::{
    ChatEvent, ChatSession, ChatSnapshot, ErrorContext, Message, SuggestionState,
};
use super::suggestions::{Suggestion, SuggestionTracker};
use crate::config::{DEFAULT_CHAT_WIDTH, DEFAULT_EVENT_CAPACITY, MAX_CHAT_WIDTH, MIN_CHAT_WIDTH};
use crate::error::{Error, SessionError, TransportError, WorkflowError};
use crate::settings::{SettingsProvider, UserProvider};
use crate::transport::protocol::{
    ApplySuggestionRequest, ChatUser, InteractionEvent, RequestPayload, ResponsePayload,
};
use crate::transport::AssistantTransport;
use crate::workflow::WorkflowProvider;

/// Collaborators injected into the coordinator.
#[derive(Clone)]
pub struct CoordinatorDeps {
    pub transport: Arc<dyn AssistantTransport>,
    pub workflow: Arc<dyn WorkflowProvider>,
    pub settings: Arc<dyn SettingsProvider>,
    pub users: Arc<dyn UserProvider>,
}

/// Clamp a requested chat width into the allowed range.
pub fn clamp_chat_width(width: f64) -> f64 {
    if width.is_nan() {
        return MIN_CHAT_WIDTH;
    }
    width.clamp(MIN_CHAT_WIDTH, MAX_CHAT_WIDTH)
}

struct ChatState {
    session: ChatSession,
    log: MessageLog,
    suggestions: SuggestionTracker,
    chat_width: f64,
}

impl ChatState {
    /// Start over for a new error context: fresh log, no server session yet.
    fn reset(&mut self, context: ErrorContext) {
        self.log.clear();
        self.session.local_id = Uuid::new_v4();
        self.session.session_id = None;
        self.session.ended = false;
        self.session.active_error_context = Some(context);
        self.session.window_open = true;
    }
}

/// Coordinates one assistant conversation tied to a workflow error.
///
/// Mutable state sits behind a single lock that is never held across a call
/// to the transport or the workflow. Overlapping round trips therefore
/// interleave their placeholders; nothing de-duplicates them.
pub struct SessionCoordinator {
    deps: CoordinatorDeps,
    state: RwLock<ChatState>,
    tx: broadcast::Sender<ChatEvent>,
}

impl SessionCoordinator {
    pub fn new(deps: CoordinatorDeps) -> Arc<Self> {
        Self::with_capacity(deps, DEFAULT_EVENT_CAPACITY)
    }

    pub fn with_capacity(deps: CoordinatorDeps, event_capacity: usize) -> Arc<Self> {
        let (tx, _rx) = broadcast::channel(event_capacity.max(1));
        Arc::new(Self {
            deps,
            state: RwLock::new(ChatState {
                session: ChatSession::default(),
                log: MessageLog::new(),
                suggestions: SuggestionTracker::new(),
                chat_width: DEFAULT_CHAT_WIDTH,
            }),
            tx,
        })
    }

    /// Subscribe to change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.tx.subscribe()
    }

    /// Change notifications as a stream.
    pub fn events(&self) -> BroadcastStream<ChatEvent> {
        BroadcastStream::new(self.subscribe())
    }

    fn emit(&self, event: ChatEvent) {
        // No subscribers is fine
        let _ = self.tx.send(event);
    }

    // ── Accessors ───────────────────────────────────────────────────

    pub async fn session(&self) -> ChatSession {
        self.state.read().await.session.clone()
    }

    pub async fn messages(&self) -> Vec<Message> {
        self.state.read().await.log.snapshot()
    }

    pub async fn suggestion(&self, suggestion_id: &str) -> Option<Suggestion> {
        self.state.read().await.suggestions.get(suggestion_id).cloned()
    }

    pub async fn suggestions(&self) -> HashMap<String, Suggestion> {
        self.state.read().await.suggestions.snapshot()
    }

    pub async fn chat_width(&self) -> f64 {
        self.state.read().await.chat_width
    }

    pub async fn is_window_open(&self) -> bool {
        self.state.read().await.session.window_open
    }

    /// Feature flag from settings. View gating happens elsewhere.
    pub fn can_show_assistant(&self) -> bool {
        self.deps.settings.is_assistant_enabled()
    }

    pub async fn is_assistant_open(&self) -> bool {
        self.can_show_assistant() && self.is_window_open().await
    }

    /// Whether `context` would reuse the active conversation.
    pub async fn is_node_error_active(&self, context: &ErrorContext) -> bool {
        self.state
            .read()
            .await
            .session
            .active_error_context
            .as_ref()
            .is_some_and(|active| is_same_session(context, active))
    }

    pub async fn snapshot(&self) -> ChatSnapshot {
        let can_show_assistant = self.can_show_assistant();
        let state = self.state.read().await;
        ChatSnapshot {
            session: state.session.clone(),
            messages: state.log.snapshot(),
            chat_width: state.chat_width,
            open: can_show_assistant && state.session.window_open,
            can_show_assistant,
        }
    }

    // ── Window ──────────────────────────────────────────────────────

    pub async fn open_chat(&self) {
        self.set_window_open(true).await;
    }

    pub async fn close_chat(&self) {
        self.set_window_open(false).await;
    }

    async fn set_window_open(&self, open: bool) {
        let width = {
            let mut state = self.state.write().await;
            state.session.window_open = open;
            state.chat_width
        };
        self.emit(ChatEvent::WindowChanged { open, width });
    }

    /// Resize the chat window. Returns the stored (clamped) width.
    pub async fn update_window_width(&self, width: f64) -> f64 {
        let clamped = clamp_chat_width(width);
        let open = {
            let mut state = self.state.write().await;
            state.chat_width = clamped;
            state.session.window_open
        };
        self.emit(ChatEvent::WindowChanged {
            open,
            width: clamped,
        });
        clamped
    }

    // ── Conversation ────────────────────────────────────────────────

    /// Open (or keep) the conversation for a node error.
    ///
    /// A context matching the active one is a no-op. Anything else discards
    /// the current conversation and asks the service for help with the new
    /// error.
    pub async fn init_error_helper(&self, context: ErrorContext) {
        let (local_id, messages, width) = {
            let mut state = self.state.write().await;
            if let Some(active) = &state.session.active_error_context
                && is_same_session(&context, active)
            {
                debug!(node = %context.node.name, "Error context already active, keeping session");
                return;
            }

            state.reset(context.clone());
            state.log.append_assistant_loading();
            (state.session.local_id, state.log.snapshot(), state.chat_width)
        };

        info!(
            local_id = %local_id,
            node = %context.node.name,
            error = %context.error.message,
            "Starting error help session"
        );
        self.emit(ChatEvent::SessionReset {
            local_id,
            error_context: context.clone(),
        });
        self.emit(ChatEvent::WindowChanged { open: true, width });
        self.emit(ChatEvent::MessagesChanged { messages });

        let first_name = self
            .deps
            .users
            .current_user_first_name()
            .unwrap_or_default();
        let request = RequestPayload::InitErrorHelp {
            user: ChatUser { first_name },
            error: context.error,
            node: context.node,
        };

        let result = self.deps.transport.converse(request).await;
        self.complete_round_trip(result).await;
    }

    /// Send a user message in the current conversation.
    ///
    /// Works without an active error context; the service decides what to
    /// make of it.
    pub async fn send_message(&self, content: impl Into<String>, quick_reply_type: Option<String>) {
        let content = content.into();
        let messages = {
            let mut state = self.state.write().await;
            if state.session.active_error_context.is_none() {
                debug!("Sending message without an active error context");
            }
            state.log.append_user(content.clone());
            state.log.append_assistant_loading();
            state.log.snapshot()
        };
        self.emit(ChatEvent::MessagesChanged { messages });

        let request = RequestPayload::UserMessage {
            content,
            quick_reply_type,
        };
        let result = self.deps.transport.converse(request).await;
        self.complete_round_trip(result).await;
    }

    /// Notify the service of an editor event. The log is left untouched.
    pub async fn send_event(&self, event: InteractionEvent) -> Result<ResponsePayload, Error> {
        debug!(event = ?event, "Sending interaction event");
        let response = self
            .deps
            .transport
            .converse(RequestPayload::Event { event })
            .await?;
        Ok(response)
    }

    /// Fold a finished transport call into the log.
    async fn complete_round_trip(&self, result: Result<ResponsePayload, TransportError>) {
        let mut events = Vec::new();
        {
            let mut state = self.state.write().await;
            match result {
                Ok(response) => {
                    if state.session.session_id.as_deref() != Some(response.session_id.as_str()) {
                        info!(session_id = %response.session_id, "Assistant session assigned");
                        events.push(ChatEvent::SessionStarted {
                            session_id: response.session_id.clone(),
                        });
                    }
                    state.session.session_id = Some(response.session_id);

                    let outcome = state.log.append_assistant_batch(response.messages);
                    debug!(appended = outcome.appended, "Assistant replied");
                    if outcome.session_ended && !state.session.ended {
                        info!("Assistant ended the session");
                        state.session.ended = true;
                        events.push(ChatEvent::SessionEnded);
                    }
                    state.log.finalize_streaming();
                }
                Err(e) => {
                    warn!(error = %e, "Assistant service request failed");
                    state.log.finalize_streaming();
                    state
                        .log
                        .append_error(format!("There was an error reaching the service: ({e})"));
                }
            }
            events.push(ChatEvent::MessagesChanged {
                messages: state.log.snapshot(),
            });
        }

        for event in events {
            self.emit(event);
        }
    }

    // ── Suggestions ─────────────────────────────────────────────────

    /// Apply the code-diff suggestion at `index` to the errored node.
    ///
    /// Returns `Err` only for contract violations, before anything is sent.
    /// Service or workflow failures are recorded on the message itself.
    pub async fn apply_suggestion(&self, index: usize) -> Result<(), Error> {
        let (suggestion_id, session_id, node_name) = {
            let mut state = self.state.write().await;
            let node_name = state
                .session
                .active_error_context
                .as_ref()
                .map(|ctx| ctx.node.name.clone());
            let session_id = state.session.session_id.clone();

            let message = state
                .log
                .get_mut(index)
                .ok_or(SessionError::MessageNotFound { index })?;
            let diff = message
                .as_code_diff_mut()
                .ok_or(SessionError::NotACodeDiff { index })?;
            let node_name = node_name.ok_or(SessionError::NoActiveErrorContext)?;
            let session_id = session_id.ok_or(SessionError::MissingSessionId)?;
            if !diff.state.can_transition_to(SuggestionState::Replacing) {
                return Err(SessionError::SuggestionBusy {
                    index,
                    state: diff.state,
                }
                .into());
            }

            diff.state = SuggestionState::Replacing;
            let suggestion_id = diff.suggestion_id.clone();
            let message = message.clone();
            drop(state);
            self.emit(ChatEvent::MessageUpdated { index, message });
            (suggestion_id, session_id, node_name)
        };

        info!(index, suggestion_id = %suggestion_id, node = %node_name, "Applying suggestion");

        let final_state = match self
            .write_suggestion(&session_id, &suggestion_id, &node_name)
            .await
        {
            Ok(()) => {
                info!(suggestion_id = %suggestion_id, node = %node_name, "Suggestion applied");
                SuggestionState::Replaced
            }
            Err(e) => {
                error!(suggestion_id = %suggestion_id, error = %e, "Failed to apply suggestion");
                SuggestionState::Error
            }
        };

        self.finish_apply(index, &suggestion_id, final_state).await;
        Ok(())
    }

    /// Fetch the suggested parameters, snapshot the node, and merge.
    async fn write_suggestion(
        &self,
        session_id: &str,
        suggestion_id: &str,
        node_name: &str,
    ) -> Result<(), Error> {
        let response = self
            .deps
            .transport
            .apply_suggestion(ApplySuggestionRequest {
                session_id: session_id.to_string(),
                suggestion_id: suggestion_id.to_string(),
            })
            .await?;

        let node = self
            .deps
            .workflow
            .get_node(node_name)
            .await
            .ok_or_else(|| WorkflowError::NodeNotFound {
                name: node_name.to_string(),
            })?;

        self.state.write().await.suggestions.record(
            suggestion_id,
            &node.parameters,
            response.parameters.clone(),
        );

        self.deps
            .workflow
            .merge_node_parameters(&node.name, response.parameters)
            .await?;
        Ok(())
    }

    async fn finish_apply(&self, index: usize, suggestion_id: &str, final_state: SuggestionState) {
        let message = {
            let mut state = self.state.write().await;
            let Some(message) = state.log.get_mut(index) else {
                warn!(index, "Suggestion message disappeared while applying");
                return;
            };
            match message.as_code_diff_mut() {
                Some(diff) if diff.suggestion_id == suggestion_id && diff.state.is_replacing() => {
                    diff.state = final_state;
                }
                _ => {
                    warn!(index, suggestion_id, "Log changed while applying suggestion");
                    return;
                }
            }
            message.clone()
        };
        self.emit(ChatEvent::MessageUpdated { index, message });
    }

    /// Revert an applied suggestion.
    ///
    /// No revert behaviour is defined yet: the index is validated, nothing
    /// is mutated, and `UndoNotSupported` is returned.
    pub async fn undo_suggestion(&self, index: usize) -> Result<(), Error> {
        let state = self.state.read().await;
        let message = state
            .log
            .get(index)
            .ok_or(SessionError::MessageNotFound { index })?;
        let diff = message
            .as_code_diff()
            .ok_or(SessionError::NotACodeDiff { index })?;

        warn!(index, suggestion_id = %diff.suggestion_id, "Undo requested but not supported");
        Err(SessionError::UndoNotSupported {
            suggestion_id: diff.suggestion_id.clone(),
        }
        .into())
    }
}
