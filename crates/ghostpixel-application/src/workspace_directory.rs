//! WorkspaceDirectory - the session's live, ordered set of workspaces.

use ghostpixel_core::config::AppConfig;
use ghostpixel_core::error::{GhostError, Result};
use ghostpixel_core::session::Session;
use ghostpixel_core::state::LocalPreferences;
use ghostpixel_core::store::DocumentStore;
use ghostpixel_core::subscription::Subscription;
use ghostpixel_core::ui::UiSurface;
use ghostpixel_core::workspace::model::sort_newest_first;
use ghostpixel_core::workspace::{Workspace, WorkspaceEntry};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;

#[derive(Default)]
struct DirectoryState {
    /// Latest snapshot, newest first.
    workspaces: Vec<Workspace>,
    /// Selected before the store echoed it back (a freshly created workspace).
    pending_selection: Option<String>,
}

/// Maintains the workspace list and the single active selection.
///
/// One live subscription feeds [`apply_snapshot`](Self::apply_snapshot). The
/// active id is derived from that snapshot and the persisted selection; it is
/// published through a `watch` channel so the conversation log can follow it
/// without re-issuing the directory subscription.
pub struct WorkspaceDirectory {
    store: Arc<dyn DocumentStore>,
    preferences: Arc<dyn LocalPreferences>,
    ui: Arc<dyn UiSurface>,
    namespace: String,
    default_name: String,
    state: Mutex<DirectoryState>,
    active: watch::Sender<Option<String>>,
    creating_default: AtomicBool,
    /// Held while the persisted selection is read or written.
    selection_lock: tokio::sync::Mutex<()>,
}

impl WorkspaceDirectory {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        preferences: Arc<dyn LocalPreferences>,
        ui: Arc<dyn UiSurface>,
        config: &AppConfig,
    ) -> Self {
        let (active, _) = watch::channel(None);
        Self {
            store,
            preferences,
            ui,
            namespace: config.namespace.clone(),
            default_name: config.default_workspace_name.clone(),
            state: Mutex::new(DirectoryState::default()),
            active,
            creating_default: AtomicBool::new(false),
            selection_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Opens the live workspace stream for the session, newest first.
    pub async fn subscribe(&self, session: &Session) -> Result<Subscription<Vec<Workspace>>> {
        self.store
            .watch_workspaces(&session.scope(&self.namespace))
            .await
            .inspect_err(|e| {
                tracing::warn!(subject_id = %session.subject_id, error = %e, "Cannot open workspace subscription");
            })
    }

    /// Consumes the live stream until it ends or fails.
    ///
    /// A failed stream is logged and the directory stops updating; a fresh
    /// subscription has to be opened to resume.
    pub async fn run(self: Arc<Self>, session: Session, mut subscription: Subscription<Vec<Workspace>>) {
        while let Some(item) = subscription.next().await {
            match item {
                Ok(workspaces) => {
                    if let Err(e) = self.apply_snapshot(&session, workspaces).await {
                        tracing::warn!(error = %e, "Failed to apply workspace snapshot");
                    }
                }
                Err(e) => {
                    tracing::warn!(subject_id = %session.subject_id, error = %e, "Workspace subscription failed; directory stops updating");
                    return;
                }
            }
        }
        tracing::debug!(subject_id = %session.subject_id, "Workspace subscription ended");
    }

    /// Reconciles one emission of the live stream.
    ///
    /// An empty set triggers creation of the default workspace and is never
    /// rendered. Otherwise the persisted selection is checked against this
    /// snapshot and falls back to the most recent workspace when it is unset
    /// or gone.
    pub async fn apply_snapshot(&self, session: &Session, mut workspaces: Vec<Workspace>) -> Result<()> {
        if workspaces.is_empty() {
            return self.create_default(session).await;
        }

        sort_newest_first(&mut workspaces);
        self.creating_default.store(false, Ordering::SeqCst);

        let _guard = self.selection_lock.lock().await;
        let persisted = self.preferences.active_workspace_id().await;
        let (kept, most_recent) = {
            let mut state = self.lock();
            let pending = state.pending_selection.take();
            state.workspaces = workspaces;

            let listed = persisted
                .as_ref()
                .is_some_and(|id| state.workspaces.iter().any(|w| &w.id == id));
            // Freshly created and not yet echoed by the store.
            let awaiting_echo = !listed && persisted.is_some() && pending == persisted;
            if awaiting_echo {
                state.pending_selection = pending;
            }
            let kept = if listed || awaiting_echo { persisted } else { None };
            (kept, state.workspaces.first().map(|w| w.id.clone()))
        };

        let active_id = match (kept, most_recent) {
            (Some(id), _) => id,
            (None, Some(first)) => {
                tracing::debug!(workspace_id = %first, "Selection unset or gone; selecting most recent workspace");
                if let Err(e) = self.preferences.set_active_workspace_id(&first).await {
                    tracing::warn!(error = %e, "Failed to persist active workspace");
                }
                first
            }
            (None, None) => return Ok(()),
        };

        self.publish_active(&active_id);
        drop(_guard);
        self.render();
        Ok(())
    }

    /// Makes a listed workspace the active one.
    ///
    /// The selection is persisted before anything else happens, then published
    /// to followers and the list is re-rendered from the current snapshot.
    pub async fn select(&self, workspace_id: &str) -> Result<()> {
        let known = self.lock().workspaces.iter().any(|w| w.id == workspace_id);
        if !known {
            return Err(GhostError::not_found("workspace", workspace_id));
        }
        self.activate(workspace_id, false).await
    }

    /// Creates a workspace and selects it.
    ///
    /// # Errors
    ///
    /// Returns `GhostError::Validation` if `name` trims to empty, or the
    /// store's `Write` error.
    pub async fn create(&self, session: &Session, name: &str) -> Result<Workspace> {
        let name = name.trim();
        if name.is_empty() {
            return Err(GhostError::validation("workspace name cannot be empty"));
        }

        let workspace = self
            .store
            .add_workspace(&session.scope(&self.namespace), name)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "Failed to create workspace"))?;

        tracing::info!(workspace_id = %workspace.id, "Workspace created");
        self.activate(&workspace.id, true).await?;
        Ok(workspace)
    }

    /// Renames a workspace in place. A name that trims to empty is ignored.
    pub async fn rename(&self, session: &Session, workspace_id: &str, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            tracing::debug!(workspace_id, "Ignoring rename to an empty name");
            return Ok(());
        }

        self.store
            .update_workspace_name(&session.scope(&self.namespace), workspace_id, name)
            .await
            .inspect_err(|e| tracing::warn!(workspace_id, error = %e, "Failed to rename workspace"))
    }

    pub fn active_workspace_id(&self) -> Option<String> {
        self.active.borrow().clone()
    }

    /// Follows the derived active id.
    pub fn watch_active(&self) -> watch::Receiver<Option<String>> {
        self.active.subscribe()
    }

    /// The latest snapshot with the active entry marked.
    pub fn entries(&self) -> Vec<WorkspaceEntry> {
        let active = self.active_workspace_id();
        self.lock()
            .workspaces
            .iter()
            .map(|workspace| WorkspaceEntry {
                is_active: active.as_deref() == Some(workspace.id.as_str()),
                workspace: workspace.clone(),
            })
            .collect()
    }

    async fn create_default(&self, session: &Session) -> Result<()> {
        if self.creating_default.swap(true, Ordering::SeqCst) {
            tracing::debug!("Default workspace creation already in flight");
            return Ok(());
        }

        tracing::info!(subject_id = %session.subject_id, name = %self.default_name, "Directory is empty; creating default workspace");
        match self
            .store
            .add_workspace(&session.scope(&self.namespace), &self.default_name)
            .await
        {
            Ok(workspace) => {
                tracing::debug!(workspace_id = %workspace.id, "Default workspace created");
                Ok(())
            }
            Err(e) => {
                self.creating_default.store(false, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    async fn activate(&self, workspace_id: &str, pending: bool) -> Result<()> {
        let _guard = self.selection_lock.lock().await;
        self.preferences
            .set_active_workspace_id(workspace_id)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "Failed to persist active workspace"))?;
        if pending {
            self.lock().pending_selection = Some(workspace_id.to_string());
        }
        self.publish_active(workspace_id);
        drop(_guard);

        tracing::info!(workspace_id, "Workspace selected");
        self.render();
        Ok(())
    }

    fn publish_active(&self, workspace_id: &str) {
        self.active.send_if_modified(|current| {
            if current.as_deref() == Some(workspace_id) {
                false
            } else {
                *current = Some(workspace_id.to_string());
                true
            }
        });
    }

    fn render(&self) {
        let entries = self.entries();
        if !entries.is_empty() {
            self.ui.render_workspaces(&entries);
        }
    }

    fn lock(&self) -> MutexGuard<'_, DirectoryState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ghostpixel_core::message::{Message, MessageRole};
    use ghostpixel_core::session::Identity;
    use ghostpixel_core::store::StoreScope;
    use ghostpixel_core::timestamp::StoreTimestamp;
    use std::sync::atomic::AtomicUsize;

    /// Store double that only counts workspace creations.
    #[derive(Default)]
    struct CountingStore {
        created: AtomicUsize,
    }

    #[async_trait]
    impl DocumentStore for CountingStore {
        async fn watch_workspaces(&self, _: &StoreScope) -> Result<Subscription<Vec<Workspace>>> {
            Err(GhostError::store_read("not supported"))
        }

        async fn add_workspace(&self, _: &StoreScope, name: &str) -> Result<Workspace> {
            let n = self.created.fetch_add(1, Ordering::SeqCst) as u64 + 1;
            Ok(workspace(&format!("ws-{n}"), name, n))
        }

        async fn update_workspace_name(&self, _: &StoreScope, _: &str, _: &str) -> Result<()> {
            Ok(())
        }

        async fn watch_messages(&self, _: &StoreScope, _: &str) -> Result<Subscription<Vec<Message>>> {
            Err(GhostError::store_read("not supported"))
        }

        async fn add_message(&self, _: &StoreScope, _: &str, _: MessageRole, _: &str) -> Result<Message> {
            Err(GhostError::write("not supported"))
        }
    }

    #[derive(Default)]
    struct NullUi {
        renders: AtomicUsize,
    }

    impl UiSurface for NullUi {
        fn render_workspaces(&self, _: &[WorkspaceEntry]) {
            self.renders.fetch_add(1, Ordering::SeqCst);
        }
        fn clear_messages(&self) {}
        fn append_message(&self, _: &Message) {}
        fn set_busy(&self, _: bool) {}
    }

    #[derive(Default)]
    struct MemoryPreferences {
        active: Mutex<Option<String>>,
    }

    #[async_trait]
    impl LocalPreferences for MemoryPreferences {
        async fn active_workspace_id(&self) -> Option<String> {
            self.active.lock().unwrap().clone()
        }
        async fn set_active_workspace_id(&self, workspace_id: &str) -> Result<()> {
            *self.active.lock().unwrap() = Some(workspace_id.to_string());
            Ok(())
        }
        async fn credential(&self) -> Option<String> {
            None
        }
        async fn set_credential(&self, _: &str) -> Result<()> {
            Ok(())
        }
    }

    fn workspace(id: &str, name: &str, sequence: u64) -> Workspace {
        Workspace {
            id: id.to_string(),
            name: name.to_string(),
            created_at: StoreTimestamp::new(
                chrono::DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
                sequence,
            ),
        }
    }

    fn session() -> Session {
        Session::from_identity(Identity {
            subject_id: "uid-1".to_string(),
            is_anonymous: true,
        })
    }

    struct Fixture {
        directory: WorkspaceDirectory,
        store: Arc<CountingStore>,
        preferences: Arc<MemoryPreferences>,
        ui: Arc<NullUi>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(CountingStore::default());
        let preferences = Arc::new(MemoryPreferences::default());
        let ui = Arc::new(NullUi::default());
        let directory = WorkspaceDirectory::new(
            store.clone(),
            preferences.clone(),
            ui.clone(),
            &AppConfig::default(),
        );
        Fixture {
            directory,
            store,
            preferences,
            ui,
        }
    }

    #[tokio::test]
    async fn test_empty_snapshots_create_one_default() {
        let f = fixture();
        f.directory.apply_snapshot(&session(), vec![]).await.unwrap();
        f.directory.apply_snapshot(&session(), vec![]).await.unwrap();

        assert_eq!(f.store.created.load(Ordering::SeqCst), 1);
        assert_eq!(f.ui.renders.load(Ordering::SeqCst), 0);
        assert!(f.directory.active_workspace_id().is_none());
    }

    #[tokio::test]
    async fn test_unset_selection_falls_back_to_most_recent() {
        let f = fixture();
        let snapshot = vec![workspace("old", "Old", 1), workspace("new", "New", 2)];
        f.directory.apply_snapshot(&session(), snapshot).await.unwrap();

        assert_eq!(f.directory.active_workspace_id().as_deref(), Some("new"));
        assert_eq!(f.preferences.active_workspace_id().await.as_deref(), Some("new"));
        assert_eq!(f.directory.entries()[0].workspace.id, "new");
        assert!(f.directory.entries()[0].is_active);
    }

    #[tokio::test]
    async fn test_persisted_selection_is_kept() {
        let f = fixture();
        f.preferences.set_active_workspace_id("old").await.unwrap();

        let snapshot = vec![workspace("new", "New", 2), workspace("old", "Old", 1)];
        f.directory.apply_snapshot(&session(), snapshot).await.unwrap();

        assert_eq!(f.directory.active_workspace_id().as_deref(), Some("old"));
    }

    #[tokio::test]
    async fn test_stale_selection_is_replaced() {
        let f = fixture();
        f.preferences.set_active_workspace_id("deleted").await.unwrap();

        f.directory
            .apply_snapshot(&session(), vec![workspace("only", "Only", 1)])
            .await
            .unwrap();

        assert_eq!(f.directory.active_workspace_id().as_deref(), Some("only"));
        assert_eq!(f.preferences.active_workspace_id().await.as_deref(), Some("only"));
    }

    #[tokio::test]
    async fn test_created_workspace_survives_stale_snapshot() {
        let f = fixture();
        let stale = vec![workspace("old", "Old", 1)];
        f.directory.apply_snapshot(&session(), stale.clone()).await.unwrap();

        let created = f.directory.create(&session(), "  Fresh  ").await.unwrap();
        assert_eq!(created.name, "Fresh");

        // A snapshot taken before the creation landed must not undo the selection.
        f.directory.apply_snapshot(&session(), stale).await.unwrap();
        assert_eq!(f.directory.active_workspace_id(), Some(created.id.clone()));

        let fresh = vec![created.clone(), workspace("old", "Old", 1)];
        f.directory.apply_snapshot(&session(), fresh).await.unwrap();
        assert_eq!(f.directory.active_workspace_id(), Some(created.id));
    }

    #[tokio::test]
    async fn test_select_unknown_workspace_fails() {
        let f = fixture();
        f.directory
            .apply_snapshot(&session(), vec![workspace("a", "A", 1)])
            .await
            .unwrap();

        let err = f.directory.select("missing").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(f.directory.active_workspace_id().as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn test_create_rejects_blank_name() {
        let f = fixture();
        let err = f.directory.create(&session(), "   ").await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(f.store.created.load(Ordering::SeqCst), 0);
    }
}
