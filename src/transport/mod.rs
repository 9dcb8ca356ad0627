//! Transport to the remote assistant service.
//!
//! The coordinator only sees the `AssistantTransport` trait; `HttpTransport`
//! talks to the editor REST API with reqwest.

pub mod http;
pub mod protocol;

pub use http::HttpTransport;
pub use protocol::{
    ApplySuggestionRequest, ApplySuggestionResponse, ChatUser, InteractionEvent, MessageResponse,
    QuickReply, RequestPayload, ResponsePayload,
};

use async_trait::async_trait;

use crate::error::TransportError;

/// The two remote operations the chat core depends on.
#[async_trait]
pub trait AssistantTransport: Send + Sync {
    /// Send a chat request and wait for the assistant's reply.
    async fn converse(&self, request: RequestPayload) -> Result<ResponsePayload, TransportError>;

    /// Ask the service for the parameters behind a suggestion.
    async fn apply_suggestion(
        &self,
        request: ApplySuggestionRequest,
    ) -> Result<ApplySuggestionResponse, TransportError>;
}
