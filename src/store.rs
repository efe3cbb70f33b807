//! Shared key-value store: the mailbox between page, relay, and panel
//!
//! The only cross-context mutable resource. Writes are last-writer-wins with
//! no versioning; readers either take a one-shot read or subscribe to change
//! notifications, and both paths see the same keys and shapes. Lifetime is
//! the process (extension session); nothing is persisted to disk.

use crate::error::Result;
use crate::serialize::ElementPayload;
use crate::snapshot::PageSnapshot;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

/// Store key of the current selection ([`ElementPayload`] or absent)
pub const SELECTED_ELEMENT_KEY: &str = "selectedElement";

/// Store key of the current page snapshot ([`PageSnapshot`] or absent)
pub const PAGE_SNAPSHOT_KEY: &str = "currentPageHTML";

/// A change notification emitted on every write or removal
#[derive(Debug, Clone)]
pub struct StoreChange {
    pub key: String,
    /// The value after the change; `None` means the key was removed
    pub new_value: Option<Value>,
}

/// Process-wide shared store with change notifications
#[derive(Clone)]
pub struct SharedStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    values: Mutex<HashMap<String, Value>>,
    changes: broadcast::Sender<StoreChange>,
}

impl Default for SharedStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(64);
        Self {
            inner: Arc::new(StoreInner { values: Mutex::new(HashMap::new()), changes }),
        }
    }

    /// One-shot read of a raw value
    pub fn get(&self, key: &str) -> Option<Value> {
        self.lock().get(key).cloned()
    }

    /// One-shot read deserialized into a concrete type
    ///
    /// A value that no longer matches the expected shape reads as absent
    /// (logged), not as a failure; stale data degrades to "no data".
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get(key)?;
        match serde_json::from_value(value) {
            Ok(typed) => Some(typed),
            Err(e) => {
                log::debug!("Stored value under '{}' has unexpected shape: {}", key, e);
                None
            }
        }
    }

    /// Write a value, overwriting any prior one (last writer wins)
    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.lock().insert(key.to_string(), value.clone());
        self.notify(StoreChange { key: key.to_string(), new_value: Some(value) });
        Ok(())
    }

    /// Remove a key; returns whether it was present
    pub fn remove(&self, key: &str) -> bool {
        let removed = self.lock().remove(key).is_some();
        if removed {
            self.notify(StoreChange { key: key.to_string(), new_value: None });
        }
        removed
    }

    /// Subscribe to change notifications for all keys
    pub fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.inner.changes.subscribe()
    }

    /// The current selection, if any
    pub fn selected_element(&self) -> Option<ElementPayload> {
        self.get_as(SELECTED_ELEMENT_KEY)
    }

    /// Replace the current selection
    pub fn set_selected_element(&self, payload: &ElementPayload) -> Result<()> {
        self.set(SELECTED_ELEMENT_KEY, payload)
    }

    /// Clear the current selection; returns whether one existed
    pub fn remove_selected_element(&self) -> bool {
        self.remove(SELECTED_ELEMENT_KEY)
    }

    /// The current page snapshot, if any
    pub fn page_snapshot(&self) -> Option<PageSnapshot> {
        self.get_as(PAGE_SNAPSHOT_KEY)
    }

    /// Replace the current page snapshot
    pub fn set_page_snapshot(&self, snapshot: &PageSnapshot) -> Result<()> {
        self.set(PAGE_SNAPSHOT_KEY, snapshot)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Value>> {
        // A poisoned lock still holds usable data; keep serving it
        match self.inner.values.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn notify(&self, change: StoreChange) {
        // No subscribers is not an error
        let _ = self.inner.changes.send(change);
    }
}

impl std::fmt::Debug for SharedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let keys: Vec<String> = self.lock().keys().cloned().collect();
        f.debug_struct("SharedStore").field("keys", &keys).finish()
    }
}
