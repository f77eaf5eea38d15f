//! Concrete adapters for the GhostPixel engine: files, local store, identity.

pub mod config_service;
pub mod identity;
pub mod local_store;
pub mod paths;
pub mod preferences;
pub mod storage;

pub use config_service::ConfigService;
pub use identity::LocalIdentityProvider;
pub use local_store::LocalDocumentStore;
pub use paths::{GhostPaths, ServiceType};
pub use preferences::{FilePreferences, InMemoryPreferences};
