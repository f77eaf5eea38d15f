//! GhostPixelApp - owns the engine's components and their lifecycle.

use ghostpixel_core::completion::CompletionProvider;
use ghostpixel_core::config::AppConfig;
use ghostpixel_core::error::{GhostError, Result};
use ghostpixel_core::message::Message;
use ghostpixel_core::prompt::{PromptKind, Prompter};
use ghostpixel_core::session::{IdentityProvider, Session};
use ghostpixel_core::state::LocalPreferences;
use ghostpixel_core::store::DocumentStore;
use ghostpixel_core::ui::UiSurface;
use ghostpixel_core::workspace::{Workspace, WorkspaceEntry};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

use crate::chat_orchestrator::{ChatOrchestrator, ChatOutcome};
use crate::conversation_log::ConversationLog;
use crate::session_service::SessionService;
use crate::workspace_directory::WorkspaceDirectory;

/// External collaborators the engine is wired to.
pub struct AppDependencies {
    pub identity: Arc<dyn IdentityProvider>,
    pub store: Arc<dyn DocumentStore>,
    pub preferences: Arc<dyn LocalPreferences>,
    pub provider: Arc<dyn CompletionProvider>,
    pub prompter: Arc<dyn Prompter>,
    pub ui: Arc<dyn UiSurface>,
}

/// Application state object for one run.
///
/// Constructed at startup, [`start`](Self::start)ed once the front-end is
/// ready, and [`shutdown`](Self::shutdown) before exit. Front-ends call the
/// user-action methods; everything else happens in the background tasks
/// spawned by `start`.
pub struct GhostPixelApp {
    sessions: SessionService,
    directory: Arc<WorkspaceDirectory>,
    log: Arc<ConversationLog>,
    orchestrator: ChatOrchestrator,
    preferences: Arc<dyn LocalPreferences>,
    prompter: Arc<dyn Prompter>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl GhostPixelApp {
    pub fn new(config: AppConfig, deps: AppDependencies) -> Self {
        let directory = Arc::new(WorkspaceDirectory::new(
            deps.store.clone(),
            deps.preferences.clone(),
            deps.ui.clone(),
            &config,
        ));
        let log = Arc::new(ConversationLog::new(deps.store, deps.ui.clone(), &config));
        let orchestrator = ChatOrchestrator::new(
            log.clone(),
            directory.clone(),
            deps.preferences.clone(),
            deps.provider,
            deps.prompter.clone(),
            deps.ui,
            config.completion,
        );

        Self {
            sessions: SessionService::new(deps.identity),
            directory,
            log,
            orchestrator,
            preferences: deps.preferences,
            prompter: deps.prompter,
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Authenticates and starts live synchronization.
    ///
    /// # Errors
    ///
    /// Only `GhostError::Auth` is returned; it is fatal to the run. A failure
    /// to open the workspace subscription is logged and can be retried with
    /// [`reconnect`](Self::reconnect).
    pub async fn start(&self) -> Result<Session> {
        let session = self.sessions.authenticate().await?;
        if let Err(e) = self.spawn_sync(&session).await {
            tracing::warn!(error = %e, "Live synchronization not started");
        }
        Ok(session)
    }

    /// Drops the current subscriptions and opens fresh ones.
    pub async fn reconnect(&self) -> Result<()> {
        let session = self.session()?;
        self.stop_tasks();
        self.log.detach();
        self.spawn_sync(&session).await
    }

    pub async fn submit(&self, input: &str) -> Result<ChatOutcome> {
        let session = self.session()?;
        self.orchestrator
            .handle_chat_submission(&session, input)
            .await
    }

    /// Creates a workspace, asking for the name when none is given.
    ///
    /// Returns `None` if the prompt was cancelled.
    pub async fn create_workspace(&self, name: Option<&str>) -> Result<Option<Workspace>> {
        let session = self.session()?;
        let name = match name {
            Some(name) => name.to_string(),
            None => match self.prompter.request(PromptKind::NewWorkspaceName).await.into_value() {
                Some(name) => name,
                None => return Ok(None),
            },
        };
        self.directory.create(&session, &name).await.map(Some)
    }

    /// Renames a workspace, asking for the new name when none is given.
    pub async fn rename_workspace(&self, workspace_id: &str, name: Option<&str>) -> Result<()> {
        let session = self.session()?;
        let name = match name {
            Some(name) => name.to_string(),
            None => {
                let current_name = self
                    .directory
                    .entries()
                    .into_iter()
                    .find(|entry| entry.workspace.id == workspace_id)
                    .map(|entry| entry.workspace.name)
                    .ok_or_else(|| GhostError::not_found("workspace", workspace_id))?;
                match self
                    .prompter
                    .request(PromptKind::RenameWorkspace { current_name })
                    .await
                    .into_value()
                {
                    Some(name) => name,
                    None => return Ok(()),
                }
            }
        };
        self.directory.rename(&session, workspace_id, &name).await
    }

    pub async fn select_workspace(&self, workspace_id: &str) -> Result<()> {
        self.directory.select(workspace_id).await
    }

    /// Replaces the stored completion credential.
    pub async fn set_credential(&self, credential: &str) -> Result<()> {
        let credential = credential.trim();
        if credential.is_empty() {
            return Err(GhostError::validation("credential cannot be empty"));
        }
        self.preferences.set_credential(credential).await
    }

    pub fn workspaces(&self) -> Vec<WorkspaceEntry> {
        self.directory.entries()
    }

    pub fn active_workspace_id(&self) -> Option<String> {
        self.directory.active_workspace_id()
    }

    /// The workspace whose log is currently followed.
    pub fn followed_workspace_id(&self) -> Option<String> {
        self.log.current_workspace_id()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.log.snapshot()
    }

    pub fn session(&self) -> Result<Session> {
        self.sessions
            .current()
            .ok_or_else(|| GhostError::auth("not authenticated"))
    }

    pub fn sessions(&self) -> &SessionService {
        &self.sessions
    }

    /// Stops every subscription and background task.
    pub fn shutdown(&self) {
        self.stop_tasks();
        self.log.detach();
        tracing::info!("GhostPixel engine stopped");
    }

    async fn spawn_sync(&self, session: &Session) -> Result<()> {
        let subscription = self.directory.subscribe(session).await?;

        let directory = self.directory.clone();
        let directory_task = tokio::spawn(directory.run(session.clone(), subscription));

        let mut active = self.directory.watch_active();
        let log = self.log.clone();
        let follower_session = session.clone();
        let follower_task = tokio::spawn(async move {
            loop {
                let current = active.borrow_and_update().clone();
                if let Some(workspace_id) = current {
                    if log.current_workspace_id().as_deref() != Some(workspace_id.as_str()) {
                        if let Err(e) = log.switch_to(&follower_session, &workspace_id).await {
                            tracing::warn!(workspace_id = %workspace_id, error = %e, "Failed to follow active workspace");
                        }
                    }
                }
                if active.changed().await.is_err() {
                    break;
                }
            }
        });

        let mut tasks = self.lock_tasks();
        tasks.push(directory_task);
        tasks.push(follower_task);
        tracing::info!(subject_id = %session.subject_id, "Live synchronization started");
        Ok(())
    }

    fn stop_tasks(&self) {
        for task in self.lock_tasks().drain(..) {
            task.abort();
        }
    }

    fn lock_tasks(&self) -> std::sync::MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.tasks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for GhostPixelApp {
    fn drop(&mut self) {
        self.stop_tasks();
    }
}
