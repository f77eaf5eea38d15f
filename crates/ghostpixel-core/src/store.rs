//! Document store trait.
//!
//! The remote store holds, per identity, an ordered collection of workspaces
//! and, per workspace, an ordered collection of messages. Both collections can
//! be watched: the store pushes a full, ordered snapshot on every change.

use async_trait::async_trait;

use crate::error::Result;
use crate::message::{Message, MessageRole};
use crate::subscription::Subscription;
use crate::workspace::Workspace;

/// Scope of every store access: a fixed application namespace plus the session identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreScope {
    pub namespace: String,
    pub subject_id: String,
}

impl StoreScope {
    pub fn new(namespace: impl Into<String>, subject_id: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            subject_id: subject_id.into(),
        }
    }

    /// Collection path of the workspace documents.
    pub fn workspaces_path(&self) -> String {
        format!(
            "artifacts/{}/users/{}/projects",
            self.namespace, self.subject_id
        )
    }

    /// Collection path of the message documents of one workspace.
    pub fn messages_path(&self, workspace_id: &str) -> String {
        format!("{}/{}/messages", self.workspaces_path(), workspace_id)
    }
}

/// Remote, eventually-consistent document store with live push updates.
///
/// Error contract:
/// - opening a watch fails with `GhostError::StoreRead`
/// - writes fail with `GhostError::Write`
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Watches the workspaces of a scope, ordered by `created_at` descending.
    ///
    /// The current snapshot is pushed immediately, then again after every change.
    async fn watch_workspaces(&self, scope: &StoreScope) -> Result<Subscription<Vec<Workspace>>>;

    /// Creates a workspace. The store assigns `id` and `created_at`.
    async fn add_workspace(&self, scope: &StoreScope, name: &str) -> Result<Workspace>;

    /// Merges a new name into an existing workspace. Nothing else changes.
    async fn update_workspace_name(
        &self,
        scope: &StoreScope,
        workspace_id: &str,
        name: &str,
    ) -> Result<()>;

    /// Watches the messages of a workspace, ordered by `created_at` ascending.
    ///
    /// The current snapshot is pushed immediately, then again after every change.
    async fn watch_messages(
        &self,
        scope: &StoreScope,
        workspace_id: &str,
    ) -> Result<Subscription<Vec<Message>>>;

    /// Appends a message. The store assigns `created_at` at write time.
    async fn add_message(
        &self,
        scope: &StoreScope,
        workspace_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<Message>;
}
