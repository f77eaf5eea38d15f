//! Local preferences backed by state.toml and secret.json.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::paths::{GhostPaths, ServiceType};
use crate::storage::{AtomicTomlFile, SecretStorage};
use ghostpixel_core::error::{GhostError, Result};
use ghostpixel_core::state::{AppState, LocalPreferences, SecretConfig};

/// File-backed [`LocalPreferences`].
///
/// Both files are loaded once and cached. Every setter writes through to disk
/// before returning; state.toml writes are locked read-modify-write so fields
/// owned by other writers (the anonymous identity) are preserved.
#[derive(Clone)]
pub struct FilePreferences {
    state: Arc<Mutex<AppState>>,
    secrets: Arc<Mutex<SecretConfig>>,
    state_file: AtomicTomlFile<AppState>,
    secret_storage: SecretStorage,
}

impl FilePreferences {
    pub fn new(paths: &GhostPaths) -> Result<Self> {
        Self::open(
            paths.get_path(ServiceType::AppState)?,
            paths.get_path(ServiceType::Secret)?,
        )
    }

    pub fn open(state_path: PathBuf, secret_path: PathBuf) -> Result<Self> {
        let state_file = AtomicTomlFile::new(state_path);
        let secret_storage = SecretStorage::with_path(secret_path);

        let state = state_file.load_or_default()?;
        let secrets = secret_storage.load()?;

        Ok(Self {
            state: Arc::new(Mutex::new(state)),
            secrets: Arc::new(Mutex::new(secrets)),
            state_file,
            secret_storage,
        })
    }

    async fn update_state<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut AppState) + Send + 'static,
    {
        let mut cached = self.state.lock().await;
        let file = self.state_file.clone();
        let written = tokio::task::spawn_blocking(move || file.update(f))
            .await
            .map_err(|e| GhostError::internal(format!("Failed to join task: {}", e)))??;
        *cached = written;
        Ok(())
    }
}

#[async_trait]
impl LocalPreferences for FilePreferences {
    async fn active_workspace_id(&self) -> Option<String> {
        self.state.lock().await.last_selected_workspace_id.clone()
    }

    async fn set_active_workspace_id(&self, workspace_id: &str) -> Result<()> {
        let workspace_id = workspace_id.to_string();
        self.update_state(move |state| state.set_last_selected_workspace(workspace_id))
            .await
    }

    async fn credential(&self) -> Option<String> {
        self.secrets
            .lock()
            .await
            .gemini_api_key()
            .map(str::to_string)
    }

    async fn set_credential(&self, credential: &str) -> Result<()> {
        let mut cached = self.secrets.lock().await;
        let mut updated = cached.clone();
        updated.set_gemini_api_key(credential.to_string());

        let storage = self.secret_storage.clone();
        let to_save = updated.clone();
        tokio::task::spawn_blocking(move || storage.save(&to_save))
            .await
            .map_err(|e| GhostError::internal(format!("Failed to join task: {}", e)))??;

        *cached = updated;
        Ok(())
    }
}

/// Non-durable [`LocalPreferences`] for tests and ephemeral runs.
#[derive(Default)]
pub struct InMemoryPreferences {
    active_workspace_id: std::sync::Mutex<Option<String>>,
    credential: std::sync::Mutex<Option<String>>,
}

impl InMemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(credential: impl Into<String>) -> Self {
        Self {
            credential: std::sync::Mutex::new(Some(credential.into())),
            ..Self::default()
        }
    }

    pub fn with_active_workspace(self, workspace_id: impl Into<String>) -> Self {
        *lock(&self.active_workspace_id) = Some(workspace_id.into());
        self
    }
}

fn lock<T>(mutex: &std::sync::Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl LocalPreferences for InMemoryPreferences {
    async fn active_workspace_id(&self) -> Option<String> {
        lock(&self.active_workspace_id).clone()
    }

    async fn set_active_workspace_id(&self, workspace_id: &str) -> Result<()> {
        *lock(&self.active_workspace_id) = Some(workspace_id.to_string());
        Ok(())
    }

    async fn credential(&self) -> Option<String> {
        lock(&self.credential).clone()
    }

    async fn set_credential(&self, credential: &str) -> Result<()> {
        *lock(&self.credential) = Some(credential.to_string());
        Ok(())
    }
}
