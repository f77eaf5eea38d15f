//! Unified path management for GhostPixel files.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/ghostpixel/        # Config directory
//! ├── config.toml              # Application configuration
//! ├── state.toml               # Active selection + anonymous identity
//! ├── secret.json              # Completion-provider credential
//! └── logs/                    # Application logs
//!     └── ghostpixel.log.YYYY-MM-DD
//!
//! ~/.local/share/ghostpixel/   # Data directory
//! └── store.toml               # Local document store
//! ```
//!
//! Setting `GHOSTPIXEL_HOME` (or passing a base path) puts both directories
//! under that single base.

use std::path::{Path, PathBuf};
use thiserror::Error;

use ghostpixel_core::GhostError;

const APP_DIR: &str = "ghostpixel";
pub const HOME_ENV: &str = "GHOSTPIXEL_HOME";

#[derive(Debug, Error)]
pub enum PathError {
    #[error("Cannot find home directory")]
    HomeDirNotFound,
}

impl From<PathError> for GhostError {
    fn from(err: PathError) -> Self {
        GhostError::config(err.to_string())
    }
}

/// Files managed by GhostPaths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceType {
    Config,
    AppState,
    Secret,
    Store,
    Logs,
}

#[derive(Debug, Clone)]
pub struct GhostPaths {
    base: Option<PathBuf>,
}

impl GhostPaths {
    /// Creates path management rooted at `base`, or at the platform
    /// directories (respecting `GHOSTPIXEL_HOME`) when `None`.
    pub fn new(base: Option<&Path>) -> Self {
        let base = base
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(HOME_ENV).map(PathBuf::from));
        Self { base }
    }

    pub fn config_dir(&self) -> Result<PathBuf, PathError> {
        match &self.base {
            Some(base) => Ok(base.join("config")),
            None => dirs::config_dir()
                .map(|dir| dir.join(APP_DIR))
                .ok_or(PathError::HomeDirNotFound),
        }
    }

    pub fn data_dir(&self) -> Result<PathBuf, PathError> {
        match &self.base {
            Some(base) => Ok(base.join("data")),
            None => dirs::data_dir()
                .map(|dir| dir.join(APP_DIR))
                .ok_or(PathError::HomeDirNotFound),
        }
    }

    pub fn get_path(&self, service: ServiceType) -> Result<PathBuf, PathError> {
        Ok(match service {
            ServiceType::Config => self.config_dir()?.join("config.toml"),
            ServiceType::AppState => self.config_dir()?.join("state.toml"),
            ServiceType::Secret => self.config_dir()?.join("secret.json"),
            ServiceType::Store => self.data_dir()?.join("store.toml"),
            ServiceType::Logs => self.config_dir()?.join("logs"),
        })
    }
}

impl Default for GhostPaths {
    fn default() -> Self {
        Self::new(None)
    }
}
