//! WebSocket + REST surface for the chat coordinator.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Path, State,
        ws::{Message as WsFrame, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

use super::coordinator::SessionCoordinator;
use super::model::{ChatAction, ChatEvent, ErrorContext};
use crate::error::{Error, SessionError};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<SessionCoordinator>,
}

/// Build the Axum router with chat WebSocket and REST routes.
pub fn chat_routes(coordinator: Arc<SessionCoordinator>) -> Router {
    let state = AppState { coordinator };

    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .route("/api/chat", get(get_chat))
        .route("/api/chat/error", post(init_error_helper))
        .route("/api/chat/messages", post(send_message))
        .route("/api/chat/open", post(open_chat))
        .route("/api/chat/close", post(close_chat))
        .route("/api/chat/width", post(update_width))
        .route("/api/chat/suggestions/{index}/apply", post(apply_suggestion))
        .route("/api/chat/suggestions/{index}/undo", post(undo_suggestion))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "assist-chat"
    }))
}

// ── WebSocket ───────────────────────────────────────────────────────────

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    info!("WebSocket client connecting");
    ws.on_upgrade(|socket| handle_socket(socket, state.coordinator))
}

async fn send_snapshot(socket: &mut WebSocket, coordinator: &SessionCoordinator) -> bool {
    let snapshot = ChatEvent::Snapshot {
        snapshot: coordinator.snapshot().await,
    };
    match serde_json::to_string(&snapshot) {
        Ok(json) => socket.send(WsFrame::Text(json.into())).await.is_ok(),
        Err(e) => {
            warn!(error = %e, "Failed to serialize chat snapshot");
            true
        }
    }
}

async fn handle_socket(mut socket: WebSocket, coordinator: Arc<SessionCoordinator>) {
    info!("WebSocket client connected");

    // Subscribe before the snapshot so nothing falls in between
    let mut rx = coordinator.subscribe();

    if !send_snapshot(&mut socket, &coordinator).await {
        warn!("Failed to send initial snapshot, client disconnected");
        return;
    }

    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(event) => {
                        if let Ok(json) = serde_json::to_string(&event) {
                            if socket.send(WsFrame::Text(json.into())).await.is_err() {
                                debug!("Client disconnected during send");
                                break;
                            }
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        warn!(missed = n, "WS client lagged behind chat events");
                        if !send_snapshot(&mut socket, &coordinator).await {
                            break;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                        debug!("Chat event channel closed");
                        break;
                    }
                }
            }

            result = socket.recv() => {
                match result {
                    Some(Ok(WsFrame::Text(text))) => {
                        handle_client_message(&text, &coordinator);
                    }
                    Some(Ok(WsFrame::Ping(data))) => {
                        if socket.send(WsFrame::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(WsFrame::Close(_))) | None => {
                        info!("WebSocket client disconnected");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    info!("WebSocket connection closed");
}

/// Dispatch a client action. Round trips run in their own task so this
/// socket keeps forwarding events while they are pending.
fn handle_client_message(text: &str, coordinator: &Arc<SessionCoordinator>) {
    let action = match serde_json::from_str::<ChatAction>(text) {
        Ok(action) => action,
        Err(e) => {
            debug!(error = %e, text = text, "Unrecognized WS message from client");
            return;
        }
    };

    let coordinator = Arc::clone(coordinator);
    tokio::spawn(async move {
        match action {
            ChatAction::InitErrorHelper { context } => coordinator.init_error_helper(context).await,
            ChatAction::SendMessage {
                content,
                quick_reply_type,
            } => coordinator.send_message(content, quick_reply_type).await,
            ChatAction::OpenChat => coordinator.open_chat().await,
            ChatAction::CloseChat => coordinator.close_chat().await,
            ChatAction::UpdateWindowWidth { width } => {
                coordinator.update_window_width(width).await;
            }
            ChatAction::ApplySuggestion { index } => {
                if let Err(e) = coordinator.apply_suggestion(index).await {
                    warn!(index, error = %e, "Apply failed via WS");
                }
            }
            ChatAction::UndoSuggestion { index } => {
                if let Err(e) = coordinator.undo_suggestion(index).await {
                    warn!(index, error = %e, "Undo failed via WS");
                }
            }
        }
    });
}

// ── REST Endpoints ──────────────────────────────────────────────────────

fn error_status(error: &Error) -> StatusCode {
    match error {
        Error::Session(SessionError::MessageNotFound { .. }) => StatusCode::NOT_FOUND,
        Error::Session(SessionError::UndoNotSupported { .. }) => StatusCode::NOT_IMPLEMENTED,
        Error::Session(_) => StatusCode::CONFLICT,
        Error::Transport(_) => StatusCode::BAD_GATEWAY,
        Error::Workflow(_) | Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(error: &Error) -> (StatusCode, Json<serde_json::Value>) {
    (
        error_status(error),
        Json(serde_json::json!({"error": error.to_string()})),
    )
}

async fn snapshot_response(coordinator: &SessionCoordinator) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(serde_json::json!(coordinator.snapshot().await)),
    )
}

async fn get_chat(State(state): State<AppState>) -> impl IntoResponse {
    snapshot_response(&state.coordinator).await
}

async fn init_error_helper(
    State(state): State<AppState>,
    Json(context): Json<ErrorContext>,
) -> impl IntoResponse {
    state.coordinator.init_error_helper(context).await;
    snapshot_response(&state.coordinator).await
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendMessageBody {
    content: String,
    #[serde(default)]
    quick_reply_type: Option<String>,
}

async fn send_message(
    State(state): State<AppState>,
    Json(body): Json<SendMessageBody>,
) -> impl IntoResponse {
    if body.content.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "Message content is empty"})),
        );
    }
    state
        .coordinator
        .send_message(body.content, body.quick_reply_type)
        .await;
    snapshot_response(&state.coordinator).await
}

async fn open_chat(State(state): State<AppState>) -> impl IntoResponse {
    state.coordinator.open_chat().await;
    snapshot_response(&state.coordinator).await
}

async fn close_chat(State(state): State<AppState>) -> impl IntoResponse {
    state.coordinator.close_chat().await;
    snapshot_response(&state.coordinator).await
}

#[derive(Debug, Deserialize)]
struct WidthBody {
    width: f64,
}

async fn update_width(
    State(state): State<AppState>,
    Json(body): Json<WidthBody>,
) -> impl IntoResponse {
    let width = state.coordinator.update_window_width(body.width).await;
    Json(serde_json::json!({"chatWidth": width}))
}

async fn apply_suggestion(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> impl IntoResponse {
    match state.coordinator.apply_suggestion(index).await {
        Ok(()) => snapshot_response(&state.coordinator).await,
        Err(e) => {
            warn!(index, error = %e, "Apply suggestion rejected");
            error_response(&e)
        }
    }
}

async fn undo_suggestion(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> impl IntoResponse {
    match state.coordinator.undo_suggestion(index).await {
        Ok(()) => snapshot_response(&state.coordinator).await,
        Err(e) => error_response(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use crate::chat::coordinator::CoordinatorDeps;
    use crate::error::{TransportError, WorkflowError};
    use crate::settings::StaticSettings;
    use crate::transport::{
        ApplySuggestionRequest, ApplySuggestionResponse, AssistantTransport, RequestPayload,
        ResponsePayload,
    };
    use crate::workflow::InMemoryWorkflow;

    /// Transport for a service that is never reachable.
    struct Offline;

    #[async_trait]
    impl AssistantTransport for Offline {
        async fn converse(&self, _request: RequestPayload) -> Result<ResponsePayload, TransportError> {
            Err(TransportError::RequestFailed {
                endpoint: "/ai/chat".into(),
                reason: "offline".into(),
            })
        }

        async fn apply_suggestion(
            &self,
            _request: ApplySuggestionRequest,
        ) -> Result<ApplySuggestionResponse, TransportError> {
            Err(TransportError::RequestFailed {
                endpoint: "/ai/chat/apply-suggestion".into(),
                reason: "offline".into(),
            })
        }
    }

    fn router() -> Router {
        let settings = Arc::new(StaticSettings::new(true, None));
        chat_routes(SessionCoordinator::new(CoordinatorDeps {
            transport: Arc::new(Offline),
            workflow: Arc::new(InMemoryWorkflow::new()),
            settings: settings.clone(),
            users: settings,
        }))
    }

    async fn call(router: Router, method: &str, uri: &str, body: &str) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn get_chat_returns_snapshot() {
        let (status, body) = call(router(), "GET", "/api/chat", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["chatWidth"], 275.0);
        assert!(body["messages"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unreachable_service_shows_error_notice() {
        let (status, body) = call(
            router(),
            "POST",
            "/api/chat/messages",
            r#"{"content": "anyone there?"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1]["type"], "error");
        assert!(messages[1]["content"].as_str().unwrap().contains("offline"));
    }

    #[tokio::test]
    async fn apply_on_empty_log_is_not_found() {
        let (status, body) = call(router(), "POST", "/api/chat/suggestions/0/apply", "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Session error: No message at index 0");
    }

    #[test]
    fn session_errors_map_to_client_statuses() {
        let not_found = Error::Session(SessionError::MessageNotFound { index: 1 });
        assert_eq!(error_status(&not_found), StatusCode::NOT_FOUND);

        let not_diff = Error::Session(SessionError::NotACodeDiff { index: 0 });
        assert_eq!(error_status(&not_diff), StatusCode::CONFLICT);

        let undo = Error::Session(SessionError::UndoNotSupported {
            suggestion_id: "s".into(),
        });
        assert_eq!(error_status(&undo), StatusCode::NOT_IMPLEMENTED);
    }

    #[test]
    fn other_errors_map_to_server_statuses() {
        let transport = Error::Transport(TransportError::InvalidResponse {
            endpoint: "/ai/chat".into(),
            reason: "eof".into(),
        });
        assert_eq!(error_status(&transport), StatusCode::BAD_GATEWAY);

        let workflow = Error::Workflow(WorkflowError::NodeNotFound { name: "X".into() });
        assert_eq!(error_status(&workflow), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
