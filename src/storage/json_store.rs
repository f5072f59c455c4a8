//! JSON file storage implementation
//!
//! Each document lives in its own pretty-printed JSON file. Writes go to a
//! sibling `.tmp` file first and are renamed into place, so an interrupted
//! write never leaves a half-written dataset behind.

use crate::state::CrawlState;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::OutputDataset;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// File-backed storage for the dataset and crawl state
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    dataset_path: PathBuf,
    state_path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(dataset_path: impl Into<PathBuf>, state_path: impl Into<PathBuf>) -> Self {
        Self {
            dataset_path: dataset_path.into(),
            state_path: state_path.into(),
        }
    }

    pub fn dataset_path(&self) -> &Path {
        &self.dataset_path
    }

    pub fn state_path(&self) -> &Path {
        &self.state_path
    }
}

impl Storage for JsonFileStorage {
    fn load_dataset(&self) -> StorageResult<Option<OutputDataset>> {
        read_json(&self.dataset_path)
    }

    fn save_dataset(&self, dataset: &OutputDataset) -> StorageResult<()> {
        write_json_atomic(&self.dataset_path, dataset)
    }

    fn load_state(&self) -> StorageResult<Option<CrawlState>> {
        read_json(&self.state_path)
    }

    fn save_state(&self, state: &CrawlState) -> StorageResult<()> {
        write_json_atomic(&self.state_path, state)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> StorageResult<Option<T>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StorageError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| StorageError::Corrupt {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> StorageResult<()> {
    let io_err = |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let mut json = serde_json::to_string_pretty(value)?;
    json.push('\n');

    let tmp = tmp_path(path);
    fs::write(&tmp, json).map_err(io_err)?;
    fs::rename(&tmp, path).map_err(io_err)?;

    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}
