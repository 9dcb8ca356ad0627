//! Error types for the assistant chat core.

use crate::chat::model::SuggestionState;

/// Top-level error type for the chat core.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Failures talking to the remote assistant service.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Request to {endpoint} failed: {reason}")]
    RequestFailed { endpoint: String, reason: String },

    #[error("{endpoint} returned {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("Invalid response from {endpoint}: {reason}")]
    InvalidResponse { endpoint: String, reason: String },
}

/// Failures reading or writing the externally owned workflow.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Node {name} not found in workflow")]
    NodeNotFound { name: String },

    #[error("Failed to update parameters of node {name}: {reason}")]
    UpdateFailed { name: String, reason: String },
}

/// Contract violations on a single coordinator action.
///
/// These abort the triggering call only; the session stays usable.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("No message at index {index}")]
    MessageNotFound { index: usize },

    #[error("Message at index {index} is not a code diff")]
    NotACodeDiff { index: usize },

    #[error("No active error context")]
    NoActiveErrorContext,

    #[error("No session id has been assigned yet")]
    MissingSessionId,

    #[error("Suggestion at index {index} is {state}, cannot apply")]
    SuggestionBusy {
        index: usize,
        state: SuggestionState,
    },

    #[error("Undo is not supported for suggestion {suggestion_id}")]
    UndoNotSupported { suggestion_id: String },
}

/// Result type alias for the chat core.
pub type Result<T> = std::result::Result<T, Error>;
