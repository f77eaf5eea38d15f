//! ConversationLog - live message history of the active workspace.

use ghostpixel_core::config::AppConfig;
use ghostpixel_core::error::Result;
use ghostpixel_core::message::{Message, MessageRole};
use ghostpixel_core::session::Session;
use ghostpixel_core::store::DocumentStore;
use ghostpixel_core::subscription::{StopHandle, Subscription};
use ghostpixel_core::ui::UiSurface;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;

struct ActiveLog {
    workspace_id: String,
    stop: StopHandle,
    task: JoinHandle<()>,
}

#[derive(Default)]
struct LogState {
    /// Bumped on every switch or detach; a render task only draws while its
    /// generation is current.
    generation: u64,
    active: Option<ActiveLog>,
    messages: Vec<Message>,
}

/// Follows exactly one workspace's messages at a time.
///
/// Every emission replaces the rendered history wholesale (clear, then append
/// each message). Switching stops the previous subscription before the new
/// one is opened, so nothing from the old workspace is drawn afterwards.
pub struct ConversationLog {
    store: Arc<dyn DocumentStore>,
    ui: Arc<dyn UiSurface>,
    namespace: String,
    state: Mutex<LogState>,
}

impl ConversationLog {
    pub fn new(store: Arc<dyn DocumentStore>, ui: Arc<dyn UiSurface>, config: &AppConfig) -> Self {
        Self {
            store,
            ui,
            namespace: config.namespace.clone(),
            state: Mutex::new(LogState::default()),
        }
    }

    /// Opens a live stream of one workspace's messages, oldest first.
    pub async fn subscribe(
        &self,
        session: &Session,
        workspace_id: &str,
    ) -> Result<Subscription<Vec<Message>>> {
        self.store
            .watch_messages(&session.scope(&self.namespace), workspace_id)
            .await
    }

    /// Writes one message. The store assigns its ordering key.
    pub async fn append(
        &self,
        session: &Session,
        workspace_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<Message> {
        let message = self
            .store
            .add_message(&session.scope(&self.namespace), workspace_id, role, content)
            .await
            .inspect_err(|e| {
                tracing::warn!(workspace_id, role = %role, error = %e, "Failed to append message");
            })?;

        tracing::debug!(workspace_id, role = %role, "Message appended");
        Ok(message)
    }

    /// Replaces the followed workspace.
    ///
    /// The previous subscription is stopped and the rendered log cleared
    /// before the new subscription is opened.
    pub async fn switch_to(self: &Arc<Self>, session: &Session, workspace_id: &str) -> Result<()> {
        let generation = {
            let mut state = self.lock();
            let generation = Self::retire(&mut state);
            self.ui.clear_messages();
            generation
        };

        let subscription = self
            .subscribe(session, workspace_id)
            .await
            .inspect_err(|e| {
                tracing::warn!(workspace_id, error = %e, "Cannot open message subscription");
            })?;

        let mut state = self.lock();
        if state.generation != generation {
            tracing::debug!(workspace_id, "Switch superseded before subscription opened");
            subscription.stop();
            return Ok(());
        }

        let stop = subscription.stop_handle();
        let log = Arc::clone(self);
        let id = workspace_id.to_string();
        let task = tokio::spawn(async move { log.pump(generation, id, subscription).await });
        state.active = Some(ActiveLog {
            workspace_id: workspace_id.to_string(),
            stop,
            task,
        });

        tracing::info!(workspace_id, "Following conversation log");
        Ok(())
    }

    /// Stops following any workspace.
    pub fn detach(&self) {
        let mut state = self.lock();
        Self::retire(&mut state);
    }

    pub fn current_workspace_id(&self) -> Option<String> {
        self.lock()
            .active
            .as_ref()
            .map(|active| active.workspace_id.clone())
    }

    /// The most recently rendered history.
    pub fn snapshot(&self) -> Vec<Message> {
        self.lock().messages.clone()
    }

    async fn pump(
        self: Arc<Self>,
        generation: u64,
        workspace_id: String,
        mut subscription: Subscription<Vec<Message>>,
    ) {
        while let Some(item) = subscription.next().await {
            match item {
                Ok(messages) => {
                    let mut state = self.lock();
                    if state.generation != generation {
                        return;
                    }
                    self.ui.clear_messages();
                    for message in &messages {
                        self.ui.append_message(message);
                    }
                    tracing::debug!(workspace_id = %workspace_id, count = messages.len(), "Rendered conversation log");
                    state.messages = messages;
                }
                Err(e) => {
                    tracing::warn!(workspace_id = %workspace_id, error = %e, "Message subscription failed; log stops updating");
                    return;
                }
            }
        }
    }

    /// Stops the current subscription and returns the new generation.
    fn retire(state: &mut LogState) -> u64 {
        state.generation += 1;
        state.messages.clear();
        if let Some(active) = state.active.take() {
            active.stop.stop();
            active.task.abort();
            tracing::debug!(workspace_id = %active.workspace_id, "Stopped conversation log");
        }
        state.generation
    }

    fn lock(&self) -> MutexGuard<'_, LogState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
