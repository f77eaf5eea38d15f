use serde::{Deserialize, Serialize};

use crate::timestamp::StoreTimestamp;

/// A named, independent conversation context owned by one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    /// Stable for the lifetime of the workspace.
    pub id: String,
    pub name: String,
    /// Assigned by the store on creation; rename never touches it.
    pub created_at: StoreTimestamp,
}

/// A workspace as shown in the directory list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceEntry {
    pub workspace: Workspace,
    pub is_active: bool,
}

/// Sorts workspaces most recent first.
pub fn sort_newest_first(workspaces: &mut [Workspace]) {
    workspaces.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}
