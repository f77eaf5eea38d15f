//! Error types for GhostPixel.

use thiserror::Error;

/// A shared error type for the entire GhostPixel workspace.
///
/// The first four variants are the synchronization taxonomy: only `Auth` is
/// fatal to a run, everything else is recovered locally by the component that
/// observes it.
#[derive(Error, Debug, Clone)]
pub enum GhostError {
    /// Identity provider unreachable or anonymous sign-in rejected.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// A live subscription could not be opened or failed while streaming.
    #[error("Store read error: {0}")]
    StoreRead(String),

    /// Create, append or rename could not be written to the store.
    #[error("Write error: {0}")]
    Write(String),

    /// The completion provider failed or answered with something unusable.
    #[error("Provider error: {message}")]
    Provider {
        status_code: Option<u16>,
        message: String,
    },

    /// Caller supplied invalid input (e.g. an empty workspace name)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GhostError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }

    pub fn store_read(message: impl Into<String>) -> Self {
        Self::StoreRead(message.into())
    }

    pub fn write(message: impl Into<String>) -> Self {
        Self::Write(message.into())
    }

    /// Creates a Provider error without an HTTP status.
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            status_code: None,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Only authentication failures halt the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Auth(_))
    }

    pub fn is_store_read(&self) -> bool {
        matches!(self, Self::StoreRead(_))
    }

    pub fn is_write(&self) -> bool {
        matches!(self, Self::Write(_))
    }

    pub fn is_provider(&self) -> bool {
        matches!(self, Self::Provider { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for GhostError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for GhostError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for GhostError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for GhostError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<anyhow::Error> for GhostError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A type alias for `Result<T, GhostError>`.
pub type Result<T> = std::result::Result<T, GhostError>;
