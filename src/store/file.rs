//! Snapshot file backend
//!
//! The whole map lives in memory and is written as one bincode snapshot on
//! `save`. This is the default layout: `<prefix>.hashes` and `<prefix>.tree`
//! are plain files in the storage directory.

use crate::error::StorageError;
use crate::store::memory::InMemoryMap;
use crate::store::MapStorage;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Map persisted as a single snapshot file
pub struct FileMap<V> {
    path: PathBuf,
    inner: InMemoryMap<V>,
}

impl<V> FileMap<V> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            inner: InMemoryMap::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<V> MapStorage<V> for FileMap<V>
where
    V: Clone + Serialize + DeserializeOwned,
{
    fn get(&self, key: &str) -> Result<Option<V>, StorageError> {
        self.inner.get(key)
    }

    fn put(&mut self, key: &str, value: V) -> Result<(), StorageError> {
        self.inner.put(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.inner.remove(key)
    }

    fn contains_key(&self, key: &str) -> Result<bool, StorageError> {
        self.inner.contains_key(key)
    }

    fn modify(&mut self, key: &str, f: &mut dyn FnMut(&mut V)) -> Result<bool, StorageError> {
        self.inner.modify(key, f)
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn clear(&mut self) -> Result<(), StorageError> {
        self.inner.clear()
    }

    fn load(&mut self) -> Result<(), StorageError> {
        let file = match fs::File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(self.path.clone()));
            }
            Err(e) => return Err(StorageError::IoError(e)),
        };

        let entries: HashMap<String, V> =
            bincode::deserialize_from(BufReader::new(file)).map_err(|e| {
                StorageError::Serialization {
                    path: self.path.clone(),
                    message: e.to_string(),
                }
            })?;
        self.inner = InMemoryMap::from_entries(entries);
        Ok(())
    }

    fn save(&mut self) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write next to the target and rename so a failed save never truncates the old snapshot
        let mut temp_name = self.path.as_os_str().to_owned();
        temp_name.push(".tmp");
        let temp_path = PathBuf::from(temp_name);
        let mut writer = BufWriter::new(fs::File::create(&temp_path)?);
        bincode::serialize_into(&mut writer, self.inner.entries()).map_err(|e| {
            StorageError::Serialization {
                path: self.path.clone(),
                message: e.to_string(),
            }
        })?;
        writer.flush()?;
        drop(writer);
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}
