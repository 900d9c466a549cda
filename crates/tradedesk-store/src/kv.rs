//! The key-value seam under the session store.
//!
//! Browsers give you `localStorage`; native consoles get a file; tests get
//! a `HashMap`. [`KeyValueStore`] is the smallest interface all three can
//! satisfy: string keys, string values, and a batch write.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::StoreError;

/// One mutation inside a batch passed to [`KeyValueStore::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Write<'a> {
    Set(&'a str, &'a str),
    Remove(&'a str),
}

/// String-keyed persistence for session artifacts.
///
/// # Trait bounds
///
/// - `Send + Sync` → one store is shared by the controller, the route
///   guard, and the background refresh task.
/// - `'static` → lives as long as the console.
///
/// # Atomicity
///
/// [`apply`](Self::apply) has a default implementation that performs the
/// writes one at a time. Backends that can make the batch atomic (all
/// writes visible at once, or none) should override it; the session store
/// relies on this so a half-cleared session is never observable.
pub trait KeyValueStore: Send + Sync + 'static {
    /// Reads a value. `Ok(None)` means the key isn't set.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Writes a value, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Deletes a key. Deleting a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Applies a batch of writes in order.
    fn apply(&self, writes: &[Write<'_>]) -> Result<(), StoreError> {
        for write in writes {
            match *write {
                Write::Set(key, value) => self.set(key, value)?,
                Write::Remove(key) => self.remove(key)?,
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// A [`KeyValueStore`] held entirely in memory.
///
/// Used as the test fake and for consoles that shouldn't remember anything
/// across restarts. Batches run under a single lock, so they're atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently set.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.lock().remove(key);
        Ok(())
    }

    fn apply(&self, writes: &[Write<'_>]) -> Result<(), StoreError> {
        let mut entries = self.entries.lock();
        for write in writes {
            match *write {
                Write::Set(key, value) => {
                    entries.insert(key.to_string(), value.to_string());
                }
                Write::Remove(key) => {
                    entries.remove(key);
                }
            }
        }
        Ok(())
    }
}
