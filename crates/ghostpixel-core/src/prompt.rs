//! Interactive request/response capability.
//!
//! Core logic never blocks on an input widget directly; it asks a [`Prompter`]
//! and gets back either a value or a cancellation.

use async_trait::async_trait;

/// What the user is being asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptKind {
    /// The completion-provider credential.
    Credential,
    /// Name for a new workspace.
    NewWorkspaceName,
    /// New name for an existing workspace.
    RenameWorkspace { current_name: String },
}

impl PromptKind {
    pub fn label(&self) -> String {
        match self {
            PromptKind::Credential => "Enter your Gemini API key".to_string(),
            PromptKind::NewWorkspaceName => "New workspace name".to_string(),
            PromptKind::RenameWorkspace { current_name } => {
                format!("Rename workspace '{current_name}'")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptResponse {
    Value(String),
    Cancelled,
}

impl PromptResponse {
    /// Returns the trimmed value, treating blank input as cancellation.
    pub fn into_value(self) -> Option<String> {
        match self {
            PromptResponse::Value(value) => {
                let trimmed = value.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            PromptResponse::Cancelled => None,
        }
    }
}

#[async_trait]
pub trait Prompter: Send + Sync {
    async fn request(&self, kind: PromptKind) -> PromptResponse;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_value_counts_as_cancelled() {
        assert_eq!(PromptResponse::Value("   ".to_string()).into_value(), None);
        assert_eq!(PromptResponse::Cancelled.into_value(), None);
        assert_eq!(
            PromptResponse::Value(" key ".to_string()).into_value(),
            Some("key".to_string())
        );
    }
}
