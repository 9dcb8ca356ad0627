//! Settings and user collaborators.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::AssistConfig;

/// Instance settings relevant to the assistant.
pub trait SettingsProvider: Send + Sync {
    /// Feature flag: whether the assistant is offered at all.
    fn is_assistant_enabled(&self) -> bool;
}

/// The signed-in editor user.
pub trait UserProvider: Send + Sync {
    fn current_user_first_name(&self) -> Option<String>;
}

/// Settings fixed at startup, with a switchable feature flag.
pub struct StaticSettings {
    enabled: AtomicBool,
    first_name: Option<String>,
}

impl StaticSettings {
    pub fn new(enabled: bool, first_name: Option<String>) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
            first_name,
        }
    }

    pub fn from_config(config: &AssistConfig) -> Self {
        let first_name = Some(config.user_first_name.clone()).filter(|n| !n.is_empty());
        Self::new(config.enabled, first_name)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }
}

impl SettingsProvider for StaticSettings {
    fn is_assistant_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }
}

impl UserProvider for StaticSettings {
    fn current_user_first_name(&self) -> Option<String> {
        self.first_name.clone()
    }
}
