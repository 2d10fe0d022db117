//! Durable sled backend for path maps

use crate::error::StorageError;
use crate::store::MapStorage;
use bincode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sled;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// Sled-based implementation of MapStorage
///
/// Writes go straight to the database; `save` flushes them to disk.
pub struct SledMap<V> {
    path: PathBuf,
    db: sled::Db,
    /// Whether anything was persisted before this handle was opened (or saved since)
    persisted: bool,
    _value: PhantomData<V>,
}

fn database_error(context: &str, e: sled::Error) -> StorageError {
    StorageError::Database(format!("{}: {}", context, e))
}

impl<V> SledMap<V> {
    /// Open (or create) the sled database at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let persisted = path.exists();
        let db = sled::open(&path).map_err(|e| database_error("Failed to open sled database", e))?;
        Ok(Self {
            path,
            db,
            persisted,
            _value: PhantomData,
        })
    }

    /// Get the underlying sled database (for advanced operations)
    pub fn db(&self) -> &sled::Db {
        &self.db
    }

    fn encode(&self, value: &V) -> Result<Vec<u8>, StorageError>
    where
        V: Serialize,
    {
        bincode::serialize(value).map_err(|e| StorageError::Serialization {
            path: self.path.clone(),
            message: e.to_string(),
        })
    }

    fn decode(&self, bytes: &[u8]) -> Result<V, StorageError>
    where
        V: DeserializeOwned,
    {
        bincode::deserialize(bytes).map_err(|e| StorageError::Serialization {
            path: self.path.clone(),
            message: e.to_string(),
        })
    }
}

impl<V> MapStorage<V> for SledMap<V>
where
    V: Serialize + DeserializeOwned,
{
    fn get(&self, key: &str) -> Result<Option<V>, StorageError> {
        match self
            .db
            .get(key.as_bytes())
            .map_err(|e| database_error("Failed to get value", e))?
        {
            Some(bytes) => Ok(Some(self.decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn put(&mut self, key: &str, value: V) -> Result<(), StorageError> {
        let bytes = self.encode(&value)?;
        self.db
            .insert(key.as_bytes(), bytes)
            .map_err(|e| database_error("Failed to put value", e))?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.db
            .remove(key.as_bytes())
            .map_err(|e| database_error("Failed to remove value", e))?;
        Ok(())
    }

    fn contains_key(&self, key: &str) -> Result<bool, StorageError> {
        self.db
            .contains_key(key.as_bytes())
            .map_err(|e| database_error("Failed to check key existence", e))
    }

    fn modify(&mut self, key: &str, f: &mut dyn FnMut(&mut V)) -> Result<bool, StorageError> {
        match self.get(key)? {
            Some(mut value) => {
                f(&mut value);
                self.put(key, value)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn len(&self) -> usize {
        self.db.len()
    }

    fn clear(&mut self) -> Result<(), StorageError> {
        self.db
            .clear()
            .map_err(|e| database_error("Failed to clear database", e))
    }

    fn load(&mut self) -> Result<(), StorageError> {
        if self.persisted {
            Ok(())
        } else {
            Err(StorageError::NotFound(self.path.clone()))
        }
    }

    fn save(&mut self) -> Result<(), StorageError> {
        self.db
            .flush()
            .map_err(|e| database_error("Failed to flush database", e))?;
        self.persisted = true;
        Ok(())
    }
}
