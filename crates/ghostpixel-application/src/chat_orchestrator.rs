//! ChatOrchestrator - one user submission in, two log entries out.

use ghostpixel_core::completion::{CompletionProvider, CompletionRequest, ConversationTurn};
use ghostpixel_core::config::CompletionConfig;
use ghostpixel_core::error::{GhostError, Result};
use ghostpixel_core::message::{Message, MessageRole};
use ghostpixel_core::prompt::{PromptKind, Prompter};
use ghostpixel_core::session::Session;
use ghostpixel_core::state::LocalPreferences;
use ghostpixel_core::ui::UiSurface;
use std::sync::Arc;

use crate::conversation_log::ConversationLog;
use crate::workspace_directory::WorkspaceDirectory;

/// Why a submission was dropped without touching the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    EmptyInput,
    NoActiveWorkspace,
    CredentialDeclined,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatOutcome {
    Ignored(IgnoreReason),
    Completed {
        user: Message,
        reply: Message,
        /// The reply is the configured fallback text, not provider output.
        used_fallback: bool,
    },
}

/// Turns the busy indicator off when dropped.
struct BusyGuard<'a> {
    ui: &'a dyn UiSurface,
}

impl<'a> BusyGuard<'a> {
    fn new(ui: &'a dyn UiSurface) -> Self {
        ui.set_busy(true);
        Self { ui }
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.ui.set_busy(false);
    }
}

pub struct ChatOrchestrator {
    log: Arc<ConversationLog>,
    directory: Arc<WorkspaceDirectory>,
    preferences: Arc<dyn LocalPreferences>,
    provider: Arc<dyn CompletionProvider>,
    prompter: Arc<dyn Prompter>,
    ui: Arc<dyn UiSurface>,
    config: CompletionConfig,
}

impl ChatOrchestrator {
    pub fn new(
        log: Arc<ConversationLog>,
        directory: Arc<WorkspaceDirectory>,
        preferences: Arc<dyn LocalPreferences>,
        provider: Arc<dyn CompletionProvider>,
        prompter: Arc<dyn Prompter>,
        ui: Arc<dyn UiSurface>,
        config: CompletionConfig,
    ) -> Self {
        Self {
            log,
            directory,
            preferences,
            provider,
            prompter,
            ui,
            config,
        }
    }

    /// Runs one exchange: the user entry, a provider call, then the reply entry.
    ///
    /// The user entry holds the input without surrounding whitespace, the same
    /// text the provider is asked. Both entries go to the workspace that was
    /// active when the submission arrived. A provider failure never leaves the exchange half-done: the
    /// fallback reply is written instead.
    ///
    /// # Errors
    ///
    /// Returns `GhostError::Write` if either entry cannot be stored, and
    /// `GhostError::Config` if a newly supplied credential cannot be saved.
    /// Provider errors are not returned.
    pub async fn handle_chat_submission(&self, session: &Session, input: &str) -> Result<ChatOutcome> {
        let prompt = input.trim();
        if prompt.is_empty() {
            return Ok(ChatOutcome::Ignored(IgnoreReason::EmptyInput));
        }

        let Some(workspace_id) = self.directory.active_workspace_id() else {
            tracing::debug!("Submission ignored: no active workspace");
            return Ok(ChatOutcome::Ignored(IgnoreReason::NoActiveWorkspace));
        };

        let Some(credential) = self.resolve_credential().await? else {
            tracing::info!("Submission dropped: no credential supplied");
            return Ok(ChatOutcome::Ignored(IgnoreReason::CredentialDeclined));
        };

        let history = if self.config.forward_history {
            self.history_for(&workspace_id)
        } else {
            Vec::new()
        };

        let user = self
            .log
            .append(session, &workspace_id, MessageRole::User, prompt)
            .await?;

        let _busy = BusyGuard::new(self.ui.as_ref());
        let request = CompletionRequest::new(credential, prompt).with_history(history);
        let (reply_text, used_fallback) = match self.provider.complete(request).await {
            Ok(response) => match response.first_text() {
                Some(text) => (text.to_string(), false),
                None => {
                    tracing::warn!(workspace_id = %workspace_id, "Provider returned no usable candidate; writing fallback reply");
                    (self.config.fallback_reply.clone(), true)
                }
            },
            Err(e) => {
                tracing::warn!(workspace_id = %workspace_id, error = %e, "Provider call failed; writing fallback reply");
                (self.config.fallback_reply.clone(), true)
            }
        };

        let reply = self
            .log
            .append(session, &workspace_id, MessageRole::Assistant, &reply_text)
            .await?;

        Ok(ChatOutcome::Completed {
            user,
            reply,
            used_fallback,
        })
    }

    /// Stored credential, or one requested from the user and saved.
    async fn resolve_credential(&self) -> Result<Option<String>> {
        if let Some(credential) = self.preferences.credential().await {
            return Ok(Some(credential));
        }

        let Some(credential) = self.prompter.request(PromptKind::Credential).await.into_value() else {
            return Ok(None);
        };

        self.preferences
            .set_credential(&credential)
            .await
            .map_err(|e| GhostError::config(format!("Failed to store credential: {e}")))?;
        Ok(Some(credential))
    }

    /// Prior turns from the followed log, when it is showing this workspace.
    fn history_for(&self, workspace_id: &str) -> Vec<ConversationTurn> {
        if self.log.current_workspace_id().as_deref() != Some(workspace_id) {
            return Vec::new();
        }
        self.log
            .snapshot()
            .into_iter()
            .map(|message| ConversationTurn {
                role: message.role,
                text: message.content,
            })
            .collect()
    }
}
