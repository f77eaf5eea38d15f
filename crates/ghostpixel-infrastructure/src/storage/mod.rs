//! Storage layer for atomic file operations.

mod atomic_toml;
mod secret_storage;

pub use atomic_toml::{AtomicTomlFile, StorageError};
pub use secret_storage::{SecretStorage, SecretStorageError};
