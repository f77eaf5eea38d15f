//! Application configuration (config.toml).

use serde::{Deserialize, Serialize};

pub const DEFAULT_NAMESPACE: &str = "ghost-pixel-ia-prod";
pub const DEFAULT_WORKSPACE_NAME: &str = "My Workspace";
pub const DEFAULT_COMPLETION_MODEL: &str = "gemini-2.5-flash-preview-09-2025";
pub const DEFAULT_COMPLETION_BASE_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_FALLBACK_REPLY: &str = "Error: check your API key.";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    /// Fixed namespace every store path is scoped under.
    pub namespace: String,
    /// Name of the workspace created for an identity with none.
    pub default_workspace_name: String,
    pub completion: CompletionConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            default_workspace_name: DEFAULT_WORKSPACE_NAME.to_string(),
            completion: CompletionConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CompletionConfig {
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
    /// Reply written to the log when the provider fails or returns nothing usable.
    pub fallback_reply: String,
    /// Send the active log as prior turns instead of only the latest input.
    pub forward_history: bool,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_COMPLETION_MODEL.to_string(),
            base_url: DEFAULT_COMPLETION_BASE_URL.to_string(),
            timeout_secs: 60,
            fallback_reply: DEFAULT_FALLBACK_REPLY.to_string(),
            forward_history: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            default_workspace_name = "Inbox"

            [completion]
            forward_history = true
            "#,
        )
        .unwrap();

        assert_eq!(config.namespace, DEFAULT_NAMESPACE);
        assert_eq!(config.default_workspace_name, "Inbox");
        assert!(config.completion.forward_history);
        assert_eq!(config.completion.model, DEFAULT_COMPLETION_MODEL);
        assert_eq!(config.completion.fallback_reply, DEFAULT_FALLBACK_REPLY);
    }

    #[test]
    fn empty_file_is_default() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config, AppConfig::default());
    }
}
