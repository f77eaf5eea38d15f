//! Atomic TOML files.
//!
//! Every GhostPixel file that is rewritten while the app runs (state, store)
//! goes through [`AtomicTomlFile`], so a crash mid-write leaves the previous
//! contents intact.

use serde::{Serialize, de::DeserializeOwned};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use thiserror::Error;

use ghostpixel_core::GhostError;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("TOML parse error in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("TOML serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Lock error on {path}: {message}")]
    Lock { path: PathBuf, message: String },
}

impl From<StorageError> for GhostError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Parse { .. } | StorageError::Serialize(_) => GhostError::Serialization {
                format: "TOML".to_string(),
                message: err.to_string(),
            },
            _ => GhostError::io(err.to_string()),
        }
    }
}

/// A TOML file written via temp file + fsync + rename.
///
/// `update` additionally holds an exclusive `fs2` lock for the whole
/// read-modify-write cycle.
#[derive(Debug, Clone)]
pub struct AtomicTomlFile<T> {
    path: PathBuf,
    _phantom: PhantomData<fn() -> T>,
}

impl<T> AtomicTomlFile<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _phantom: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the file. Missing or blank files yield `None`.
    pub fn load(&self) -> Result<Option<T>, StorageError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path).map_err(|source| self.io(source))?;
        if content.trim().is_empty() {
            return Ok(None);
        }

        toml::from_str(&content)
            .map(Some)
            .map_err(|source| StorageError::Parse {
                path: self.path.clone(),
                source,
            })
    }

    pub fn load_or_default(&self) -> Result<T, StorageError>
    where
        T: Default,
    {
        Ok(self.load()?.unwrap_or_default())
    }

    pub fn save(&self, data: &T) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| self.io(source))?;
        }

        let serialized = toml::to_string_pretty(data)?;

        let tmp_path = self.temp_path();
        let mut tmp_file = File::create(&tmp_path).map_err(|source| self.io(source))?;
        tmp_file
            .write_all(serialized.as_bytes())
            .and_then(|_| tmp_file.sync_all())
            .map_err(|source| self.io(source))?;
        drop(tmp_file);

        fs::rename(&tmp_path, &self.path).map_err(|source| self.io(source))
    }

    /// Locked read-modify-write. Returns the value that was written.
    pub fn update<F>(&self, f: F) -> Result<T, StorageError>
    where
        T: Default,
        F: FnOnce(&mut T),
    {
        let _lock = FileLock::acquire(&self.path)?;
        let mut data = self.load_or_default()?;
        f(&mut data);
        self.save(&data)?;
        Ok(data)
    }

    fn temp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "ghostpixel".to_string());
        self.path.with_file_name(format!(".{file_name}.tmp"))
    }

    fn io(&self, source: std::io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

/// Exclusive lock on `<file>.lock`, released on drop.
struct FileLock {
    file: File,
    lock_path: PathBuf,
}

impl FileLock {
    fn acquire(path: &Path) -> Result<Self, StorageError> {
        let lock_path = path.with_extension("lock");
        let lock_error = |message: String| StorageError::Lock {
            path: lock_path.clone(),
            message,
        };

        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent).map_err(|e| lock_error(e.to_string()))?;
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| lock_error(e.to_string()))?;

        fs2::FileExt::lock_exclusive(&file).map_err(|e| lock_error(e.to_string()))?;

        Ok(FileLock { file, lock_path })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
        let _ = fs::remove_file(&self.lock_path);
    }
}
