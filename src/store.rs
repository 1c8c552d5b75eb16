use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization failure: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Where a loaded value came from. `Recovered` means the file existed but
/// did not parse; the on-disk bytes are left untouched in that case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    File,
    Seeded,
    Recovered,
}

/// Persists one value per named JSON file under a root directory.
/// Pretty-printed on disk so the files stay hand-editable.
#[derive(Debug, Clone)]
pub struct JsonStore {
    root: PathBuf,
}

impl JsonStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Reads `name`, seeding it with `default` on first access. A file that
    /// fails to parse yields the default without overwriting the file.
    pub fn load<T>(&self, name: &str, default: T) -> Result<(T, LoadSource), StoreError>
    where
        T: Serialize + DeserializeOwned,
    {
        let path = self.path(name);
        if !path.exists() {
            write_pretty(&path, &default)?;
            return Ok((default, LoadSource::Seeded));
        }

        let raw = fs::read_to_string(&path)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Ok((value, LoadSource::File)),
            Err(e) => {
                warn!("failed to parse {}, serving default: {e}", path.display());
                Ok((default, LoadSource::Recovered))
            }
        }
    }

    pub fn save<T: Serialize>(&self, name: &str, value: &T) -> Result<(), StoreError> {
        write_pretty(&self.path(name), value)
    }
}

fn write_pretty<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}
