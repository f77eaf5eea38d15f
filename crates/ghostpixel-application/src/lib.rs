//! Application layer for GhostPixel.
//!
//! This crate holds the synchronization engine: the services that keep the
//! UI surface consistent with the live document store while the user
//! switches workspaces and exchanges messages with the completion provider.

pub mod app;
pub mod chat_orchestrator;
pub mod conversation_log;
pub mod session_service;
pub mod workspace_directory;

pub use app::{AppDependencies, GhostPixelApp};
pub use chat_orchestrator::{ChatOrchestrator, ChatOutcome, IgnoreReason};
pub use conversation_log::ConversationLog;
pub use session_service::SessionService;
pub use workspace_directory::WorkspaceDirectory;
