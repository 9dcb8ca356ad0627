//! Assistant chat: one conversation about one workflow error.
//!
//! The coordinator owns the session and mediates between editor actions and
//! the remote assistant service. It keeps the ordered message log (with a
//! loading placeholder per pending round trip) and tracks code-diff
//! suggestions as they are applied to the errored node.

pub mod coordinator;
pub mod log;
pub mod matcher;
pub mod model;
pub mod suggestions;
pub mod ws;

pub use coordinator::{CoordinatorDeps, SessionCoordinator, clamp_chat_width};
pub use log::{BatchOutcome, MessageLog};
pub use matcher::is_same_session;
pub use model::{
    ChatAction, ChatEvent, ChatSession, ChatSnapshot, CodeDiffMessage, ErrorContext, ErrorNotice,
    Message, NodeError, NodeIdentity, Role, SuggestionState, TextMessage,
};
pub use suggestions::{Suggestion, SuggestionTracker};
pub use ws::chat_routes;
