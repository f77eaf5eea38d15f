//! Local anonymous identity provider.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::paths::{GhostPaths, ServiceType};
use crate::storage::AtomicTomlFile;
use ghostpixel_core::error::{GhostError, Result};
use ghostpixel_core::session::{Identity, IdentityProvider};
use ghostpixel_core::state::AppState;

/// Anonymous sign-in backed by state.toml.
///
/// The first sign-in generates a UUID v4 subject id and persists it; later
/// runs get the same identity back, so their workspaces stay reachable.
pub struct LocalIdentityProvider {
    state_file: AtomicTomlFile<AppState>,
    reachable: AtomicBool,
}

impl LocalIdentityProvider {
    pub fn new(paths: &GhostPaths) -> Result<Self> {
        Ok(Self::with_path(paths.get_path(ServiceType::AppState)?))
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self {
            state_file: AtomicTomlFile::new(path),
            reachable: AtomicBool::new(true),
        }
    }

    /// Simulates the provider going offline; sign-in then fails with `Auth`.
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    async fn sign_in_anonymous(&self) -> Result<Identity> {
        if !self.reachable.load(Ordering::SeqCst) {
            return Err(GhostError::auth("identity provider unreachable"));
        }

        let file = self.state_file.clone();
        let state = tokio::task::spawn_blocking(move || {
            file.update(|state| {
                if state.anonymous_subject_id.is_none() {
                    state.anonymous_subject_id = Some(uuid::Uuid::new_v4().to_string());
                }
            })
        })
        .await
        .map_err(|e| GhostError::auth(format!("sign-in task failed: {}", e)))?
        .map_err(|e| GhostError::auth(format!("cannot persist identity: {}", e)))?;

        let subject_id = state
            .anonymous_subject_id
            .ok_or_else(|| GhostError::auth("identity was not assigned"))?;

        tracing::debug!(subject_id = %subject_id, "Anonymous sign-in succeeded");
        Ok(Identity {
            subject_id,
            is_anonymous: true,
        })
    }
}
