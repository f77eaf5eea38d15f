//! Identity provider trait.

use async_trait::async_trait;

use super::model::Identity;
use crate::error::Result;

/// External identity provider.
///
/// Implementations return `GhostError::Auth` when the provider is unreachable
/// or rejects anonymous sign-in.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in_anonymous(&self) -> Result<Identity>;
}
