//! In-process document store with live push updates.
//!
//! `LocalDocumentStore` implements the [`DocumentStore`] contract without a
//! network: documents live in memory (optionally mirrored to store.toml),
//! ordering keys are assigned at write time, and every committed write pushes
//! a fresh ordered snapshot to the watchers of the affected collection.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::paths::{GhostPaths, ServiceType};
use crate::storage::AtomicTomlFile;
use ghostpixel_core::error::{GhostError, Result};
use ghostpixel_core::message::{Message, MessageRole};
use ghostpixel_core::store::{DocumentStore, StoreScope};
use ghostpixel_core::subscription::{self, Subscription, SubscriptionSink};
use ghostpixel_core::timestamp::StoreTimestamp;
use ghostpixel_core::workspace::{Workspace, model::sort_newest_first};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreData {
    #[serde(default)]
    next_sequence: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_at: Option<DateTime<Utc>>,
    /// Keyed by the scope's workspaces path.
    #[serde(default)]
    scopes: BTreeMap<String, ScopeDocuments>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ScopeDocuments {
    #[serde(default)]
    workspaces: Vec<WorkspaceDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceDocument {
    id: String,
    name: String,
    created_at: StoreTimestamp,
    #[serde(default)]
    messages: Vec<Message>,
}

impl WorkspaceDocument {
    fn to_workspace(&self) -> Workspace {
        Workspace {
            id: self.id.clone(),
            name: self.name.clone(),
            created_at: self.created_at,
        }
    }
}

impl StoreData {
    /// Assigns the next ordering key. The clock never runs backwards.
    fn next_timestamp(&mut self) -> StoreTimestamp {
        let now = Utc::now();
        let at = match self.last_at {
            Some(last) if last > now => last,
            _ => now,
        };
        self.last_at = Some(at);
        self.next_sequence += 1;
        StoreTimestamp::new(at, self.next_sequence)
    }

    fn workspaces(&self, scope: &StoreScope) -> Vec<Workspace> {
        let mut workspaces: Vec<Workspace> = self
            .scopes
            .get(&scope.workspaces_path())
            .map(|docs| docs.workspaces.iter().map(WorkspaceDocument::to_workspace).collect())
            .unwrap_or_default();
        sort_newest_first(&mut workspaces);
        workspaces
    }

    fn messages(&self, scope: &StoreScope, workspace_id: &str) -> Vec<Message> {
        let mut messages = self
            .workspace(scope, workspace_id)
            .map(|doc| doc.messages.clone())
            .unwrap_or_default();
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        messages
    }

    fn workspace(&self, scope: &StoreScope, workspace_id: &str) -> Option<&WorkspaceDocument> {
        self.scopes
            .get(&scope.workspaces_path())?
            .workspaces
            .iter()
            .find(|doc| doc.id == workspace_id)
    }

    fn workspace_mut(
        &mut self,
        scope: &StoreScope,
        workspace_id: &str,
    ) -> Option<&mut WorkspaceDocument> {
        self.scopes
            .get_mut(&scope.workspaces_path())?
            .workspaces
            .iter_mut()
            .find(|doc| doc.id == workspace_id)
    }
}

type SinkMap<T> = HashMap<String, Vec<SubscriptionSink<T>>>;

#[derive(Default)]
struct Watchers {
    workspaces: SinkMap<Vec<Workspace>>,
    messages: SinkMap<Vec<Message>>,
}

/// Adds a sink under `path`, first dropping sinks whose consumer is gone and
/// paths left without any.
fn register<T>(map: &mut SinkMap<T>, path: String, sink: SubscriptionSink<T>) {
    map.retain(|_, sinks| {
        sinks.retain(|sink| !sink.is_closed());
        !sinks.is_empty()
    });
    map.entry(path).or_default().push(sink);
}

struct Inner {
    data: StoreData,
    watchers: Watchers,
}

impl Inner {
    fn notify_workspaces(&mut self, scope: &StoreScope) {
        let path = scope.workspaces_path();
        let snapshot = self.data.workspaces(scope);
        if let Some(sinks) = self.watchers.workspaces.get_mut(&path) {
            sinks.retain(|sink| sink.emit(snapshot.clone()));
            tracing::debug!(path = %path, count = snapshot.len(), watchers = sinks.len(), "Pushed workspace snapshot");
            if sinks.is_empty() {
                self.watchers.workspaces.remove(&path);
            }
        }
    }

    fn notify_messages(&mut self, scope: &StoreScope, workspace_id: &str) {
        let path = scope.messages_path(workspace_id);
        let snapshot = self.data.messages(scope, workspace_id);
        if let Some(sinks) = self.watchers.messages.get_mut(&path) {
            sinks.retain(|sink| sink.emit(snapshot.clone()));
            tracing::debug!(path = %path, count = snapshot.len(), watchers = sinks.len(), "Pushed message snapshot");
            if sinks.is_empty() {
                self.watchers.messages.remove(&path);
            }
        }
    }
}

pub struct LocalDocumentStore {
    inner: Mutex<Inner>,
    /// Serializes writers so persisted snapshots are never reordered.
    write_lock: tokio::sync::Mutex<()>,
    file: Option<AtomicTomlFile<StoreData>>,
    available: AtomicBool,
}

impl LocalDocumentStore {
    /// A store that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self::from_parts(StoreData::default(), None)
    }

    /// A store mirrored to the given TOML file, loading existing documents.
    pub fn open(path: PathBuf) -> Result<Self> {
        let file = AtomicTomlFile::new(path);
        let data = file.load_or_default()?;
        Ok(Self::from_parts(data, Some(file)))
    }

    pub fn open_default(paths: &GhostPaths) -> Result<Self> {
        Self::open(paths.get_path(ServiceType::Store)?)
    }

    fn from_parts(data: StoreData, file: Option<AtomicTomlFile<StoreData>>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                data,
                watchers: Watchers::default(),
            }),
            write_lock: tokio::sync::Mutex::new(()),
            file,
            available: AtomicBool::new(true),
        }
    }

    /// Toggles availability. While unavailable, writes fail with `Write` and
    /// new watches fail with `StoreRead`.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Fails every open watch with `StoreRead` and drops it, the way a revoked
    /// listener would.
    pub fn interrupt_watchers(&self, reason: &str) {
        let mut inner = self.lock();
        let watchers = std::mem::take(&mut inner.watchers);
        for sink in watchers.workspaces.into_values().flatten() {
            sink.fail(GhostError::store_read(reason));
        }
        for sink in watchers.messages.into_values().flatten() {
            sink.fail(GhostError::store_read(reason));
        }
        tracing::warn!(reason, "Interrupted all store watchers");
    }

    /// Current workspaces of a scope, newest first.
    pub fn workspaces(&self, scope: &StoreScope) -> Vec<Workspace> {
        self.lock().data.workspaces(scope)
    }

    /// Current messages of a workspace, oldest first.
    pub fn messages(&self, scope: &StoreScope, workspace_id: &str) -> Vec<Message> {
        self.lock().data.messages(scope, workspace_id)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    /// Applies `f` to a draft copy, persists the draft, then commits it.
    async fn write<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut StoreData) -> Result<R>,
    {
        if !self.is_available() {
            return Err(GhostError::write("store unavailable"));
        }

        let _guard = self.write_lock.lock().await;
        let mut draft = self.lock().data.clone();
        let result = f(&mut draft)?;

        if let Some(file) = &self.file {
            let file = file.clone();
            let to_save = draft.clone();
            tokio::task::spawn_blocking(move || file.save(&to_save))
                .await
                .map_err(|e| GhostError::write(format!("persist task failed: {}", e)))?
                .map_err(|e| GhostError::write(format!("cannot persist store: {}", e)))?;
        }

        self.lock().data = draft;
        Ok(result)
    }
}

#[async_trait]
impl DocumentStore for LocalDocumentStore {
    async fn watch_workspaces(&self, scope: &StoreScope) -> Result<Subscription<Vec<Workspace>>> {
        if !self.is_available() {
            return Err(GhostError::store_read(format!(
                "cannot watch {}: store unavailable",
                scope.workspaces_path()
            )));
        }

        let (sink, subscription) = subscription::channel();
        let mut inner = self.lock();
        sink.emit(inner.data.workspaces(scope));
        register(&mut inner.watchers.workspaces, scope.workspaces_path(), sink);
        Ok(subscription)
    }

    async fn add_workspace(&self, scope: &StoreScope, name: &str) -> Result<Workspace> {
        let name = name.to_string();
        let workspace = self
            .write(|data| {
                let created_at = data.next_timestamp();
                let document = WorkspaceDocument {
                    id: uuid::Uuid::new_v4().simple().to_string(),
                    name,
                    created_at,
                    messages: Vec::new(),
                };
                let workspace = document.to_workspace();
                data.scopes
                    .entry(scope.workspaces_path())
                    .or_default()
                    .workspaces
                    .push(document);
                Ok(workspace)
            })
            .await?;

        tracing::info!(workspace_id = %workspace.id, path = %scope.workspaces_path(), "Workspace document created");
        self.lock().notify_workspaces(scope);
        Ok(workspace)
    }

    async fn update_workspace_name(
        &self,
        scope: &StoreScope,
        workspace_id: &str,
        name: &str,
    ) -> Result<()> {
        self.write(|data| {
            let document = data.workspace_mut(scope, workspace_id).ok_or_else(|| {
                GhostError::write(format!("workspace '{}' does not exist", workspace_id))
            })?;
            document.name = name.to_string();
            Ok(())
        })
        .await?;

        self.lock().notify_workspaces(scope);
        Ok(())
    }

    async fn watch_messages(
        &self,
        scope: &StoreScope,
        workspace_id: &str,
    ) -> Result<Subscription<Vec<Message>>> {
        if !self.is_available() {
            return Err(GhostError::store_read(format!(
                "cannot watch {}: store unavailable",
                scope.messages_path(workspace_id)
            )));
        }

        let (sink, subscription) = subscription::channel();
        let mut inner = self.lock();
        sink.emit(inner.data.messages(scope, workspace_id));
        register(
            &mut inner.watchers.messages,
            scope.messages_path(workspace_id),
            sink,
        );
        Ok(subscription)
    }

    async fn add_message(
        &self,
        scope: &StoreScope,
        workspace_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<Message> {
        let content = content.to_string();
        let message = self
            .write(|data| {
                if data.workspace(scope, workspace_id).is_none() {
                    return Err(GhostError::write(format!(
                        "workspace '{}' does not exist",
                        workspace_id
                    )));
                }
                let message = Message {
                    role,
                    content,
                    created_at: data.next_timestamp(),
                };
                if let Some(document) = data.workspace_mut(scope, workspace_id) {
                    document.messages.push(message.clone());
                }
                Ok(message)
            })
            .await?;

        self.lock().notify_messages(scope, workspace_id);
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn scope() -> StoreScope {
        StoreScope::new("ghost-pixel-ia-test", "uid-1")
    }

    #[tokio::test]
    async fn test_watch_pushes_current_snapshot_first() {
        let store = LocalDocumentStore::in_memory();
        let mut watch = store.watch_workspaces(&scope()).await.unwrap();
        assert!(watch.next().await.unwrap().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_workspaces_are_newest_first() {
        let store = LocalDocumentStore::in_memory();
        let first = store.add_workspace(&scope(), "First").await.unwrap();
        let second = store.add_workspace(&scope(), "Second").await.unwrap();

        let listed = store.workspaces(&scope());
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);
        assert!(second.created_at > first.created_at);
    }

    #[tokio::test]
    async fn test_scopes_are_isolated() {
        let store = LocalDocumentStore::in_memory();
        store.add_workspace(&scope(), "Mine").await.unwrap();

        let other = StoreScope::new("ghost-pixel-ia-test", "uid-2");
        assert!(store.workspaces(&other).is_empty());
    }

    #[tokio::test]
    async fn test_rename_pushes_update_and_keeps_order() {
        let store = LocalDocumentStore::in_memory();
        let draft = store.add_workspace(&scope(), "Draft").await.unwrap();
        store.add_workspace(&scope(), "Newer").await.unwrap();

        let mut watch = store.watch_workspaces(&scope()).await.unwrap();
        watch.next().await.unwrap().unwrap();

        store
            .update_workspace_name(&scope(), &draft.id, "Research")
            .await
            .unwrap();

        let snapshot = watch.next().await.unwrap().unwrap();
        assert_eq!(snapshot[1].id, draft.id);
        assert_eq!(snapshot[1].name, "Research");
        assert_eq!(snapshot[1].created_at, draft.created_at);
    }

    #[tokio::test]
    async fn test_rename_unknown_workspace_is_write_error() {
        let store = LocalDocumentStore::in_memory();
        let err = store
            .update_workspace_name(&scope(), "missing", "Name")
            .await
            .unwrap_err();
        assert!(err.is_write());
    }

    #[tokio::test]
    async fn test_appended_messages_are_pushed_in_order() {
        let store = LocalDocumentStore::in_memory();
        let workspace = store.add_workspace(&scope(), "Chat").await.unwrap();
        let mut watch = store.watch_messages(&scope(), &workspace.id).await.unwrap();
        assert!(watch.next().await.unwrap().unwrap().is_empty());

        store
            .add_message(&scope(), &workspace.id, MessageRole::User, "hello")
            .await
            .unwrap();
        store
            .add_message(&scope(), &workspace.id, MessageRole::Assistant, "hi there")
            .await
            .unwrap();

        watch.next().await.unwrap().unwrap();
        let snapshot = watch.next().await.unwrap().unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].content, "hello");
        assert_eq!(snapshot[1].role, MessageRole::Assistant);
        assert!(snapshot[0].created_at < snapshot[1].created_at);
    }

    #[tokio::test]
    async fn test_unavailable_store() {
        let store = LocalDocumentStore::in_memory();
        let workspace = store.add_workspace(&scope(), "Chat").await.unwrap();
        store.set_available(false);

        let err = store
            .add_message(&scope(), &workspace.id, MessageRole::User, "hello")
            .await
            .unwrap_err();
        assert!(err.is_write());

        let err = store.watch_workspaces(&scope()).await.err().unwrap();
        assert!(err.is_store_read());
        assert!(store.messages(&scope(), &workspace.id).is_empty());
    }

    #[tokio::test]
    async fn test_interrupt_fails_open_watches() {
        let store = LocalDocumentStore::in_memory();
        let mut watch = store.watch_workspaces(&scope()).await.unwrap();
        watch.next().await.unwrap().unwrap();

        store.interrupt_watchers("listener revoked");

        assert!(watch.next().await.unwrap().unwrap_err().is_store_read());
        assert!(watch.next().await.is_none());
    }

    #[tokio::test]
    async fn test_stopped_watches_are_released_without_writes() {
        let store = LocalDocumentStore::in_memory();
        let first = store.add_workspace(&scope(), "First").await.unwrap();
        let second = store.add_workspace(&scope(), "Second").await.unwrap();

        for _ in 0..1000 {
            let watch = store.watch_messages(&scope(), &first.id).await.unwrap();
            watch.stop();
        }
        let first_path = scope().messages_path(&first.id);
        assert_eq!(store.lock().watchers.messages[&first_path].len(), 1);

        let _current = store.watch_messages(&scope(), &second.id).await.unwrap();
        let inner = store.lock();
        assert!(!inner.watchers.messages.contains_key(&first_path));
        assert_eq!(inner.watchers.messages.len(), 1);
    }

    #[tokio::test]
    async fn test_dropped_watches_are_released_without_writes() {
        let store = LocalDocumentStore::in_memory();
        for _ in 0..100 {
            drop(store.watch_workspaces(&scope()).await.unwrap());
        }
        let _open = store.watch_workspaces(&scope()).await.unwrap();

        let inner = store.lock();
        assert_eq!(inner.watchers.workspaces[&scope().workspaces_path()].len(), 1);
    }

    #[tokio::test]
    async fn test_persistent_store_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("store.toml");

        let workspace = {
            let store = LocalDocumentStore::open(path.clone()).unwrap();
            let workspace = store.add_workspace(&scope(), "Kept").await.unwrap();
            store
                .add_message(&scope(), &workspace.id, MessageRole::User, "remember me")
                .await
                .unwrap();
            workspace
        };

        let reopened = LocalDocumentStore::open(path).unwrap();
        assert_eq!(reopened.workspaces(&scope()), vec![workspace.clone()]);
        assert_eq!(
            reopened.messages(&scope(), &workspace.id)[0].content,
            "remember me"
        );

        let next = reopened.add_workspace(&scope(), "After").await.unwrap();
        assert!(next.created_at > workspace.created_at);
    }
}
