pub mod model;

pub use model::{Workspace, WorkspaceEntry};
