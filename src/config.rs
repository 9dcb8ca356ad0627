//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Narrowest width the chat window may be resized to, in pixels.
pub const MIN_CHAT_WIDTH: f64 = 250.0;
/// Widest the chat window may be resized to, in pixels.
pub const MAX_CHAT_WIDTH: f64 = 425.0;
/// Width of a freshly created chat window.
pub const DEFAULT_CHAT_WIDTH: f64 = 275.0;

/// Default broadcast channel capacity for chat events.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Assistant chat configuration.
#[derive(Debug, Clone)]
pub struct AssistConfig {
    /// Base URL of the editor REST API (the `/ai/chat` routes hang off it).
    pub base_url: String,
    /// Session cookie forwarded to the REST API.
    pub auth_cookie: Option<SecretString>,
    /// Push connection reference sent as the `push-ref` header.
    pub push_ref: Option<String>,
    /// Feature flag: whether the assistant is offered at all.
    pub enabled: bool,
    /// First name reported to the assistant when opening an error session.
    pub user_first_name: String,
    /// Port the chat server listens on.
    pub listen_port: u16,
    /// Timeout for a single request to the assistant service.
    pub request_timeout: Duration,
    /// Capacity of the change-notification channel.
    pub event_capacity: usize,
    /// JSON file with the workflow nodes to serve (array of nodes).
    pub workflow_path: Option<PathBuf>,
}

impl Default for AssistConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5678/rest".to_string(),
            auth_cookie: None,
            push_ref: None,
            enabled: true,
            user_first_name: String::new(),
            listen_port: 8090,
            request_timeout: Duration::from_secs(60),
            event_capacity: DEFAULT_EVENT_CAPACITY,
            workflow_path: None,
        }
    }
}

impl AssistConfig {
    /// Build configuration from `ASSIST_*` environment variables, falling back
    /// to defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let base_url = std::env::var("ASSIST_BASE_URL")
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or(defaults.base_url);
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue {
                key: "ASSIST_BASE_URL".into(),
                message: format!("expected an http(s) URL, got {base_url}"),
            });
        }

        let enabled = match std::env::var("ASSIST_ENABLED") {
            Ok(v) => parse_bool("ASSIST_ENABLED", &v)?,
            Err(_) => defaults.enabled,
        };

        let listen_port: u16 = std::env::var("ASSIST_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.listen_port);

        let request_timeout = std::env::var("ASSIST_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout);

        Ok(Self {
            base_url,
            auth_cookie: std::env::var("ASSIST_AUTH_COOKIE")
                .ok()
                .filter(|s| !s.is_empty())
                .map(SecretString::from),
            push_ref: std::env::var("ASSIST_PUSH_REF").ok().filter(|s| !s.is_empty()),
            enabled,
            user_first_name: std::env::var("ASSIST_USER_FIRST_NAME").unwrap_or_default(),
            listen_port,
            request_timeout,
            event_capacity: defaults.event_capacity,
            workflow_path: std::env::var("ASSIST_WORKFLOW_PATH").ok().map(PathBuf::from),
        })
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected a boolean, got {other}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_bounds_are_ordered() {
        assert!(MIN_CHAT_WIDTH <= DEFAULT_CHAT_WIDTH);
        assert!(DEFAULT_CHAT_WIDTH <= MAX_CHAT_WIDTH);
    }

    #[test]
    fn parse_bool_accepts_common_spellings() {
        assert!(parse_bool("K", "true").unwrap());
        assert!(parse_bool("K", " YES ").unwrap());
        assert!(!parse_bool("K", "0").unwrap());
        assert!(!parse_bool("K", "off").unwrap());
        assert!(parse_bool("K", "maybe").is_err());
    }

    #[test]
    fn default_config() {
        let config = AssistConfig::default();
        assert!(config.enabled);
        assert!(config.auth_cookie.is_none());
        assert_eq!(config.event_capacity, DEFAULT_EVENT_CAPACITY);
        assert_eq!(config.request_timeout, Duration::from_secs(60));
    }
}
