//! HTTP transport: posts chat requests to the editor REST API.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::AssistantTransport;
use super::protocol::{
    ApplySuggestionRequest, ApplySuggestionResponse, RequestPayload, ResponsePayload,
};
use crate::config::AssistConfig;
use crate::error::TransportError;

/// Path of the chat endpoint, relative to the REST base URL.
pub const CHAT_PATH: &str = "/ai/chat";
/// Path of the suggestion endpoint, relative to the REST base URL.
pub const APPLY_SUGGESTION_PATH: &str = "/ai/chat/apply-suggestion";

/// Assistant transport backed by reqwest.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    auth_cookie: Option<SecretString>,
    push_ref: Option<String>,
}

impl HttpTransport {
    pub fn new(config: &AssistConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| TransportError::RequestFailed {
                endpoint: config.base_url.clone(),
                reason: format!("Failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_cookie: config.auth_cookie.clone(),
            push_ref: config.push_ref.clone(),
        })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, TransportError>
    where
        B: Serialize + Sync + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.api_url(path);
        let mut request = self.client.post(&url).json(body);
        if let Some(cookie) = &self.auth_cookie {
            request = request.header(reqwest::header::COOKIE, cookie.expose_secret());
        }
        if let Some(push_ref) = &self.push_ref {
            request = request.header("push-ref", push_ref);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| TransportError::RequestFailed {
                endpoint: path.to_string(),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| TransportError::RequestFailed {
                endpoint: path.to_string(),
                reason: e.to_string(),
            })?;

        if !status.is_success() {
            tracing::warn!(endpoint = path, status = %status, "Assistant service returned an error");
            return Err(TransportError::Status {
                endpoint: path.to_string(),
                status: status.as_u16(),
                body: text,
            });
        }

        let value: serde_json::Value =
            serde_json::from_str(&text).map_err(|e| TransportError::InvalidResponse {
                endpoint: path.to_string(),
                reason: e.to_string(),
            })?;

        serde_json::from_value(unwrap_envelope(value)).map_err(|e| {
            TransportError::InvalidResponse {
                endpoint: path.to_string(),
                reason: e.to_string(),
            }
        })
    }
}

/// The REST API wraps payloads as `{"data": ...}`; bare payloads pass through.
fn unwrap_envelope(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(mut obj) if obj.len() == 1 && obj.contains_key("data") => {
            obj.remove("data").unwrap_or(serde_json::Value::Null)
        }
        other => other,
    }
}

#[async_trait]
impl AssistantTransport for HttpTransport {
    async fn converse(&self, request: RequestPayload) -> Result<ResponsePayload, TransportError> {
        tracing::debug!(action = request.action(), "Posting chat request");
        self.post(CHAT_PATH, &request).await
    }

    async fn apply_suggestion(
        &self,
        request: ApplySuggestionRequest,
    ) -> Result<ApplySuggestionResponse, TransportError> {
        tracing::debug!(
            session_id = %request.session_id,
            suggestion_id = %request.suggestion_id,
            "Requesting suggestion parameters"
        );
        self.post(APPLY_SUGGESTION_PATH, &request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_is_unwrapped() {
        let wrapped = serde_json::json!({"data": {"sessionId": "s", "messages": []}});
        assert_eq!(
            unwrap_envelope(wrapped),
            serde_json::json!({"sessionId": "s", "messages": []})
        );
    }

    #[test]
    fn bare_payload_passes_through() {
        let bare = serde_json::json!({"parameters": {"data": 1}});
        assert_eq!(unwrap_envelope(bare.clone()), bare);

        let extra = serde_json::json!({"data": 1, "sessionId": "s"});
        assert_eq!(unwrap_envelope(extra.clone()), extra);
    }

    #[test]
    fn api_url_strips_trailing_slash() {
        let config = AssistConfig {
            base_url: "http://editor.local/rest/".into(),
            ..AssistConfig::default()
        };
        let transport = HttpTransport::new(&config).unwrap();
        assert_eq!(transport.api_url(CHAT_PATH), "http://editor.local/rest/ai/chat");
    }
}
