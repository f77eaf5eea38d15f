//! UI surface the engine renders into.

use crate::message::Message;
use crate::workspace::WorkspaceEntry;

/// Narrow rendering contract.
///
/// The engine only ever replaces the whole workspace list, clears and
/// repopulates the message log one entry at a time, and toggles the busy
/// indicator. Calls are synchronous and must not block.
pub trait UiSurface: Send + Sync {
    fn render_workspaces(&self, entries: &[WorkspaceEntry]);

    fn clear_messages(&self);

    fn append_message(&self, message: &Message);

    fn set_busy(&self, busy: bool);
}
