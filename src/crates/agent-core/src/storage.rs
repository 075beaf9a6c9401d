//! Run-local typed storage (C1).
//!
//! A single mutex-guarded `HashMap<String, serde_json::Value>` backs every
//! run, the same shape as the teacher's `InMemoryStore`. The difference is
//! the access surface: keys are reified as a typed [`StorageKey<T>`]
//! descriptor so `get`/`set` are checked against the declared value type at
//! the call site, while the map itself stays untyped for uniform
//! snapshot/restore and checkpointing.
//!
//! [`StateManager::update`] layers a mutually-exclusive critical section on
//! top: the lock is held for the whole user-supplied closure rather than a
//! single map access, so the closure cannot re-enter the same run's storage.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::error::{GraphError, Result};

/// A typed handle to a storage slot. Carries no data itself — just a name
/// and a phantom type parameter that statically pins the value type every
/// `get`/`set` through this key must agree on.
pub struct StorageKey<T> {
    name: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> StorageKey<T> {
    /// Create a key under the given name.
    pub fn new(name: impl Into<String>) -> Self {
        StorageKey {
            name: name.into(),
            _marker: PhantomData,
        }
    }

    /// The key's name, as stored in the underlying map.
    pub fn name(&self) -> &str {
        &self.name
    }
}

// Manual impls: `T` never appears by value, so these shouldn't require `T: Clone`/`T: Debug`.
impl<T> Clone for StorageKey<T> {
    fn clone(&self) -> Self {
        StorageKey::new(self.name.clone())
    }
}

impl<T> std::fmt::Debug for StorageKey<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageKey").field("name", &self.name).finish()
    }
}

/// Run-local typed key-value storage. All operations acquire the run's
/// mutex and release it immediately after the single map access.
#[derive(Clone)]
pub struct Storage {
    data: Arc<Mutex<HashMap<String, Value>>>,
}

impl Storage {
    /// An empty store.
    pub fn new() -> Self {
        Storage {
            data: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Value>> {
        self.data.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Store a value under `key`, overwriting any previous value.
    pub fn set<T: Serialize>(&self, key: &StorageKey<T>, value: &T) -> Result<()> {
        let json = serde_json::to_value(value)?;
        self.lock().insert(key.name.clone(), json);
        Ok(())
    }

    /// Fetch the value at `key`, if present. Returns `Ok(None)` rather than
    /// an error when the key is absent.
    pub fn get<T: DeserializeOwned>(&self, key: &StorageKey<T>) -> Result<Option<T>> {
        match self.lock().get(&key.name) {
            Some(v) => Ok(Some(serde_json::from_value(v.clone())?)),
            None => Ok(None),
        }
    }

    /// Fetch the value at `key`, failing with [`GraphError::KeyNotFound`]
    /// when it is absent.
    pub fn get_value<T: DeserializeOwned>(&self, key: &StorageKey<T>) -> Result<T> {
        self.get(key)?
            .ok_or_else(|| GraphError::KeyNotFound(key.name.clone()))
    }

    /// Remove the value at `key`. Returns whether it existed.
    pub fn remove<T>(&self, key: &StorageKey<T>) -> bool {
        self.lock().remove(&key.name).is_some()
    }

    /// A snapshot of the entire store as a plain JSON map.
    pub fn snapshot(&self) -> HashMap<String, Value> {
        self.lock().clone()
    }

    /// Bulk-insert entries, overwriting any existing keys of the same name.
    pub fn put_all(&self, entries: HashMap<String, Value>) {
        self.lock().extend(entries);
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// A deep copy of this store under a single lock acquisition, used when
    /// a run forks (e.g. a parallel node cloning context for each branch).
    pub fn copy(&self) -> Storage {
        let snapshot = self.lock().clone();
        Storage {
            data: Arc::new(Mutex::new(snapshot)),
        }
    }
}

impl Default for Storage {
    fn default() -> Self {
        Self::new()
    }
}

/// Wraps [`Storage`] with a mutually-exclusive `update` critical section.
///
/// `update` holds the run's lock for the entire duration of the supplied
/// closure, not just a single map access — so a closure that tries to call
/// `update` again on the same manager deadlocks rather than silently
/// re-entering, which is the point: blocks within the same run never
/// observe a torn intermediate state from a concurrent update.
#[derive(Clone)]
pub struct StateManager {
    storage: Storage,
    update_lock: Arc<Mutex<()>>,
}

impl StateManager {
    pub fn new() -> Self {
        StateManager {
            storage: Storage::new(),
            update_lock: Arc::new(Mutex::new(())),
        }
    }

    /// The underlying typed storage, for direct `get`/`set`/etc.
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Run `block` with exclusive access to this run's storage. `block`
    /// receives the storage handle and returns whatever the caller needs.
    pub fn update<F, R>(&self, block: F) -> Result<R>
    where
        F: FnOnce(&Storage) -> Result<R>,
    {
        let _guard = self
            .update_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        block(&self.storage)
    }

    /// Deep-copy both the storage and a fresh update lock, for forking a run.
    pub fn copy(&self) -> StateManager {
        StateManager {
            storage: self.storage.copy(),
            update_lock: Arc::new(Mutex::new(())),
        }
    }
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_round_trips() {
        let storage = Storage::new();
        let key: StorageKey<i32> = StorageKey::new("counter");
        storage.set(&key, &42).unwrap();
        assert_eq!(storage.get(&key).unwrap(), Some(42));
    }

    #[test]
    fn get_value_fails_on_missing_key() {
        let storage = Storage::new();
        let key: StorageKey<String> = StorageKey::new("missing");
        let err = storage.get_value(&key).unwrap_err();
        assert!(matches!(err, GraphError::KeyNotFound(ref k) if k == "missing"));
    }

    #[test]
    fn remove_reports_whether_key_existed() {
        let storage = Storage::new();
        let key: StorageKey<bool> = StorageKey::new("flag");
        assert!(!storage.remove(&key));
        storage.set(&key, &true).unwrap();
        assert!(storage.remove(&key));
        assert!(!storage.remove(&key));
    }

    #[test]
    fn snapshot_reflects_put_all_and_clear() {
        let storage = Storage::new();
        let mut entries = HashMap::new();
        entries.insert("a".to_string(), serde_json::json!(1));
        entries.insert("b".to_string(), serde_json::json!(2));
        storage.put_all(entries);
        assert_eq!(storage.snapshot().len(), 2);
        storage.clear();
        assert!(storage.snapshot().is_empty());
    }

    #[test]
    fn copy_is_independent_of_the_original() {
        let storage = Storage::new();
        let key: StorageKey<i32> = StorageKey::new("x");
        storage.set(&key, &1).unwrap();
        let copy = storage.copy();
        storage.set(&key, &2).unwrap();
        assert_eq!(copy.get(&key).unwrap(), Some(1));
        assert_eq!(storage.get(&key).unwrap(), Some(2));
    }

    #[test]
    fn state_manager_update_runs_closure_with_exclusive_access() {
        let manager = StateManager::new();
        let key: StorageKey<i32> = StorageKey::new("n");
        manager
            .update(|storage| {
                storage.set(&key, &1)?;
                let current = storage.get_value(&key)?;
                storage.set(&key, &(current + 1))
            })
            .unwrap();
        assert_eq!(manager.storage().get(&key).unwrap(), Some(2));
    }
}
