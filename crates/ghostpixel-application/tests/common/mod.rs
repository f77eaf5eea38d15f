//! Shared fakes for the application scenario tests.

#![allow(dead_code)]

use async_trait::async_trait;
use ghostpixel_application::{AppDependencies, GhostPixelApp};
use ghostpixel_core::completion::{CompletionProvider, CompletionRequest, CompletionResponse};
use ghostpixel_core::config::AppConfig;
use ghostpixel_core::error::{GhostError, Result};
use ghostpixel_core::message::{Message, MessageRole};
use ghostpixel_core::prompt::{PromptKind, PromptResponse, Prompter};
use ghostpixel_core::ui::UiSurface;
use ghostpixel_core::workspace::WorkspaceEntry;
use ghostpixel_infrastructure::{InMemoryPreferences, LocalDocumentStore, LocalIdentityProvider};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Notify;

#[derive(Default)]
pub struct UiRecord {
    pub workspace_renders: Vec<Vec<WorkspaceEntry>>,
    pub messages: Vec<Message>,
    pub busy: Vec<bool>,
}

/// `UiSurface` that records what the engine drew.
#[derive(Default)]
pub struct RecordingUi {
    record: Mutex<UiRecord>,
}

impl RecordingUi {
    pub fn messages(&self) -> Vec<(MessageRole, String)> {
        self.record
            .lock()
            .unwrap()
            .messages
            .iter()
            .map(|m| (m.role, m.content.clone()))
            .collect()
    }

    pub fn workspace_names(&self) -> Vec<String> {
        self.last_entries()
            .into_iter()
            .map(|entry| entry.workspace.name)
            .collect()
    }

    pub fn last_entries(&self) -> Vec<WorkspaceEntry> {
        self.record
            .lock()
            .unwrap()
            .workspace_renders
            .last()
            .cloned()
            .unwrap_or_default()
    }

    pub fn render_count(&self) -> usize {
        self.record.lock().unwrap().workspace_renders.len()
    }

    pub fn busy_history(&self) -> Vec<bool> {
        self.record.lock().unwrap().busy.clone()
    }
}

impl UiSurface for RecordingUi {
    fn render_workspaces(&self, entries: &[WorkspaceEntry]) {
        self.record
            .lock()
            .unwrap()
            .workspace_renders
            .push(entries.to_vec());
    }

    fn clear_messages(&self) {
        self.record.lock().unwrap().messages.clear();
    }

    fn append_message(&self, message: &Message) {
        self.record.lock().unwrap().messages.push(message.clone());
    }

    fn set_busy(&self, busy: bool) {
        self.record.lock().unwrap().busy.push(busy);
    }
}

/// `Prompter` answering from a script; cancels once the script runs out.
#[derive(Default)]
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<PromptResponse>>,
    asked: Mutex<Vec<PromptKind>>,
}

impl ScriptedPrompter {
    pub fn answer(&self, value: &str) {
        self.answers
            .lock()
            .unwrap()
            .push_back(PromptResponse::Value(value.to_string()));
    }

    pub fn cancel(&self) {
        self.answers
            .lock()
            .unwrap()
            .push_back(PromptResponse::Cancelled);
    }

    pub fn asked(&self) -> Vec<PromptKind> {
        self.asked.lock().unwrap().clone()
    }
}

#[async_trait]
impl Prompter for ScriptedPrompter {
    async fn request(&self, kind: PromptKind) -> PromptResponse {
        self.asked.lock().unwrap().push(kind);
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(PromptResponse::Cancelled)
    }
}

/// `CompletionProvider` replaying scripted results.
///
/// When gated, each call parks until [`release`](Self::release) is called.
#[derive(Default)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<CompletionResponse>>>,
    requests: Mutex<Vec<CompletionRequest>>,
    gated: Mutex<bool>,
    started: Notify,
    gate: Notify,
}

impl ScriptedProvider {
    pub fn reply(&self, text: &str) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Ok(CompletionResponse {
                candidates: vec![text.to_string()],
            }));
    }

    pub fn reply_empty(&self) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Ok(CompletionResponse::default()));
    }

    pub fn fail(&self, message: &str) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(GhostError::provider(message)));
    }

    pub fn gate(&self) {
        *self.gated.lock().unwrap() = true;
    }

    pub async fn wait_started(&self) {
        self.started.notified().await;
    }

    pub fn release(&self) {
        self.gate.notify_one();
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        self.requests.lock().unwrap().push(request);
        self.started.notify_one();
        let gated = *self.gated.lock().unwrap();
        if gated {
            self.gate.notified().await;
        }
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GhostError::provider("no scripted reply")))
    }
}

pub struct Harness {
    pub app: GhostPixelApp,
    pub store: Arc<LocalDocumentStore>,
    pub preferences: Arc<InMemoryPreferences>,
    pub identity: Arc<LocalIdentityProvider>,
    pub ui: Arc<RecordingUi>,
    pub prompter: Arc<ScriptedPrompter>,
    pub provider: Arc<ScriptedProvider>,
    pub config: AppConfig,
    _home: TempDir,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(AppConfig::default(), InMemoryPreferences::with_credential("K"))
    }

    pub fn with(config: AppConfig, preferences: InMemoryPreferences) -> Self {
        let home = TempDir::new().unwrap();
        let store = Arc::new(LocalDocumentStore::in_memory());
        let preferences = Arc::new(preferences);
        let identity = Arc::new(LocalIdentityProvider::with_path(
            home.path().join("state.toml"),
        ));
        let ui = Arc::new(RecordingUi::default());
        let prompter = Arc::new(ScriptedPrompter::default());
        let provider = Arc::new(ScriptedProvider::default());

        let app = GhostPixelApp::new(
            config.clone(),
            AppDependencies {
                identity: identity.clone(),
                store: store.clone(),
                preferences: preferences.clone(),
                provider: provider.clone(),
                prompter: prompter.clone(),
                ui: ui.clone(),
            },
        );

        Self {
            app,
            store,
            preferences,
            identity,
            ui,
            prompter,
            provider,
            config,
            _home: home,
        }
    }

    /// Starts the app and waits until a workspace is active and followed.
    pub async fn started(self) -> Self {
        self.app.start().await.unwrap();
        let app = &self.app;
        wait_until(|| {
            app.active_workspace_id().is_some()
                && app.active_workspace_id() == self.followed_workspace()
        })
        .await;
        self
    }

    pub fn scope(&self) -> ghostpixel_core::store::StoreScope {
        self.app.session().unwrap().scope(&self.config.namespace)
    }

    pub fn followed_workspace(&self) -> Option<String> {
        self.app.followed_workspace_id()
    }
}

/// Polls `condition` until it holds, failing the test after two seconds.
pub async fn wait_until<F>(condition: F)
where
    F: Fn() -> bool,
{
    tokio::time::timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached within timeout");
}

/// Lets spawned tasks drain whatever is already queued.
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
    tokio::time::sleep(Duration::from_millis(20)).await;
}
