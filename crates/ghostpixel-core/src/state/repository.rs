//! Local preferences trait.

use async_trait::async_trait;

use crate::error::Result;

/// Durable local key/value slots that survive process restarts.
///
/// Holds the active workspace selection and the completion-provider credential.
/// Setters must persist before returning so that a selection is durable before
/// any remote operation that follows it.
#[async_trait]
pub trait LocalPreferences: Send + Sync {
    async fn active_workspace_id(&self) -> Option<String>;

    async fn set_active_workspace_id(&self, workspace_id: &str) -> Result<()>;

    async fn credential(&self) -> Option<String>;

    async fn set_credential(&self, credential: &str) -> Result<()>;
}
