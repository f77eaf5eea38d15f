//! Completion provider trait.

use async_trait::async_trait;

use crate::error::Result;
use crate::message::MessageRole;

/// One prior turn forwarded as context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationTurn {
    pub role: MessageRole,
    pub text: String,
}

/// Request sent to a completion provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub credential: String,
    /// The latest user text.
    pub prompt: String,
    /// Prior turns, oldest first. Empty unless history forwarding is enabled.
    pub history: Vec<ConversationTurn>,
}

impl CompletionRequest {
    pub fn new(credential: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            credential: credential.into(),
            prompt: prompt.into(),
            history: Vec::new(),
        }
    }

    pub fn with_history(mut self, history: Vec<ConversationTurn>) -> Self {
        self.history = history;
        self
    }
}

/// Candidate texts returned by the provider, best first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionResponse {
    pub candidates: Vec<String>,
}

impl CompletionResponse {
    /// First candidate, if it carries any non-blank text.
    pub fn first_text(&self) -> Option<&str> {
        self.candidates
            .first()
            .map(String::as_str)
            .filter(|text| !text.trim().is_empty())
    }
}

/// External generative-text service.
///
/// Failures are reported as `GhostError::Provider`.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;
}
