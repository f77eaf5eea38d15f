//! Secret configuration file storage (secret.json).

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use ghostpixel_core::GhostError;
use ghostpixel_core::state::SecretConfig;

#[derive(Debug, Error)]
pub enum SecretStorageError {
    #[error("I/O error on secret file: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error in secret file: {0}")]
    Parse(#[from] serde_json::Error),
}

impl From<SecretStorageError> for GhostError {
    fn from(err: SecretStorageError) -> Self {
        GhostError::config(err.to_string())
    }
}

/// Reads and writes secret.json.
///
/// A missing file is the same as an empty configuration. The file is written
/// with mode 600 on Unix. Contents are never logged.
#[derive(Debug, Clone)]
pub struct SecretStorage {
    path: PathBuf,
}

impl SecretStorage {
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<SecretConfig, SecretStorageError> {
        if !self.path.exists() {
            return Ok(SecretConfig::default());
        }

        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(SecretConfig::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, config: &SecretConfig) -> Result<(), SecretStorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(config)?;
        fs::write(&self.path, json)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_nonexistent_file_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let storage = SecretStorage::with_path(temp_dir.path().join("secret.json"));
        assert!(storage.load().unwrap().gemini_api_key().is_none());
    }

    #[test]
    fn test_load_ignores_unknown_keys() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("secret.json");
        fs::write(
            &path,
            r#"{ "gemini": { "api_key": "test-key-123", "model_name": "gemini-pro" } }"#,
        )
        .unwrap();

        let config = SecretStorage::with_path(path).load().unwrap();
        assert_eq!(config.gemini_api_key(), Some("test-key-123"));
    }

    #[test]
    fn test_load_invalid_json() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("secret.json");
        fs::write(&path, "{ invalid json").unwrap();

        let result = SecretStorage::with_path(path).load();
        assert!(matches!(result, Err(SecretStorageError::Parse(_))));
    }

    #[test]
    fn test_save_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let storage = SecretStorage::with_path(temp_dir.path().join("config").join("secret.json"));

        let mut config = SecretConfig::default();
        config.set_gemini_api_key("saved-key".to_string());
        storage.save(&config).unwrap();

        assert_eq!(storage.load().unwrap(), config);
    }

    #[cfg(unix)]
    #[test]
    fn test_save_restricts_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let storage = SecretStorage::with_path(temp_dir.path().join("secret.json"));
        storage.save(&SecretConfig::default()).unwrap();

        let mode = fs::metadata(storage.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
