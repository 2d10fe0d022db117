//! In-memory map backend

use crate::error::StorageError;
use crate::store::MapStorage;
use std::collections::HashMap;

/// Map kept only in memory; `load` and `save` are no-ops
#[derive(Debug, Clone)]
pub struct InMemoryMap<V> {
    entries: HashMap<String, V>,
}

impl<V> Default for InMemoryMap<V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<V> InMemoryMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_entries(entries: HashMap<String, V>) -> Self {
        Self { entries }
    }

    pub(crate) fn entries(&self) -> &HashMap<String, V> {
        &self.entries
    }
}

impl<V: Clone> MapStorage<V> for InMemoryMap<V> {
    fn get(&self, key: &str) -> Result<Option<V>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: V) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }

    fn contains_key(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.entries.contains_key(key))
    }

    fn modify(&mut self, key: &str, f: &mut dyn FnMut(&mut V)) -> Result<bool, StorageError> {
        match self.entries.get_mut(key) {
            Some(value) => {
                f(value);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn clear(&mut self) -> Result<(), StorageError> {
        self.entries.clear();
        Ok(())
    }

    fn load(&mut self) -> Result<(), StorageError> {
        Ok(())
    }

    fn save(&mut self) -> Result<(), StorageError> {
        Ok(())
    }
}
