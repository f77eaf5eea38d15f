//! Application state domain models.
//!
//! Contains state that lives outside the document store and persists across restarts.

use serde::{Deserialize, Serialize};

/// Application state that persists across restarts.
///
/// # Fields
///
/// * `last_selected_workspace_id` - The active selection. If it no longer references
///   an existing workspace, the directory falls back to the most recent one.
/// * `anonymous_subject_id` - The subject id handed out by the local identity
///   provider on first sign-in, reused on every later run.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct AppState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_selected_workspace_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anonymous_subject_id: Option<String>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_last_selected_workspace(&mut self, workspace_id: String) {
        self.last_selected_workspace_id = Some(workspace_id);
    }

    pub fn last_selected_workspace_id(&self) -> Option<&str> {
        self.last_selected_workspace_id.as_deref()
    }
}

/// Secret configuration (secret.json).
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct SecretConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gemini: Option<GeminiConfig>,
}

/// Gemini API configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GeminiConfig {
    pub api_key: String,
}

impl SecretConfig {
    /// Returns the stored credential, ignoring blank placeholders.
    pub fn gemini_api_key(&self) -> Option<&str> {
        self.gemini
            .as_ref()
            .map(|gemini| gemini.api_key.as_str())
            .filter(|key| !key.trim().is_empty())
    }

    pub fn set_gemini_api_key(&mut self, api_key: String) {
        match self.gemini.as_mut() {
            Some(gemini) => gemini.api_key = api_key,
            None => self.gemini = Some(GeminiConfig { api_key }),
        }
    }
}
