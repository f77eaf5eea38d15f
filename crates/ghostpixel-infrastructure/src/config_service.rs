//! Configuration service.
//!
//! Loads [`AppConfig`] from config.toml, writing the defaults on first run.

use std::path::PathBuf;

use crate::paths::{GhostPaths, ServiceType};
use crate::storage::AtomicTomlFile;
use ghostpixel_core::config::AppConfig;
use ghostpixel_core::error::Result;

#[derive(Debug, Clone)]
pub struct ConfigService {
    file: AtomicTomlFile<AppConfig>,
}

impl ConfigService {
    pub fn new(paths: &GhostPaths) -> Result<Self> {
        Ok(Self::with_path(paths.get_path(ServiceType::Config)?))
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self {
            file: AtomicTomlFile::new(path),
        }
    }

    /// Loads the configuration. A missing file is created with defaults.
    pub fn load(&self) -> Result<AppConfig> {
        match self.file.load()? {
            Some(config) => Ok(config),
            None => {
                let config = AppConfig::default();
                self.file.save(&config)?;
                tracing::info!(path = %self.file.path().display(), "Created default config");
                Ok(config)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_first_load_writes_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        let service = ConfigService::with_path(path.clone());

        assert_eq!(service.load().unwrap(), AppConfig::default());
        assert!(path.exists());
    }

    #[test]
    fn test_existing_file_is_respected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "namespace = \"ghost-pixel-ia-dev\"\n").unwrap();

        let config = ConfigService::with_path(path).load().unwrap();
        assert_eq!(config.namespace, "ghost-pixel-ia-dev");
        assert_eq!(config.default_workspace_name, "My Workspace");
    }
}
