//! Session domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::StoreScope;

/// Identity returned by an identity provider after sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Opaque subject id used to scope all data access.
    pub subject_id: String,
    pub is_anonymous: bool,
}

/// An authenticated session.
///
/// Created once per run on successful anonymous sign-in and never refreshed.
/// Every store access is scoped under `subject_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub subject_id: String,
    pub authenticated_at: DateTime<Utc>,
}

impl Session {
    pub fn from_identity(identity: Identity) -> Self {
        Self {
            subject_id: identity.subject_id,
            authenticated_at: Utc::now(),
        }
    }

    /// Returns the store scope for this session under the given application namespace.
    pub fn scope(&self, namespace: &str) -> StoreScope {
        StoreScope::new(namespace, &self.subject_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_uses_subject_id() {
        let session = Session::from_identity(Identity {
            subject_id: "uid-1".to_string(),
            is_anonymous: true,
        });
        let scope = session.scope("ghost-pixel-ia-prod");
        assert_eq!(
            scope.workspaces_path(),
            "artifacts/ghost-pixel-ia-prod/users/uid-1/projects"
        );
    }
}
