//! crates/apex_access_core/src/memory.rs
//!
//! In-memory implementations of the storage ports. Used by tests and by
//! hosts that do not need anything to survive a restart.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::{Mutex, RwLock};

use crate::domain::AccessLedger;
use crate::ports::{AccessRepository, Notifier, PortResult, SessionStorage};

/// A single tab's ephemeral storage.
#[derive(Debug, Default)]
pub struct MemorySessionStorage {
    items: RwLock<HashMap<String, String>>,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }
}

#[async_trait]
impl SessionStorage for MemorySessionStorage {
    async fn get_item(&self, key: &str) -> PortResult<Option<String>> {
        Ok(self.items.read().await.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> PortResult<()> {
        self.items.write().await.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> PortResult<()> {
        self.items.write().await.remove(key);
        Ok(())
    }
}

/// Keeps the ledger as serialized JSON, like the browser's durable store,
/// so every load goes through a real decode.
#[derive(Debug, Default)]
pub struct MemoryAccessRepository {
    blob: RwLock<Option<String>>,
}

impl MemoryAccessRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ledger(ledger: &AccessLedger) -> PortResult<Self> {
        Ok(Self {
            blob: RwLock::new(Some(serde_json::to_string(ledger)?)),
        })
    }

    /// The raw stored value, if anything has been written.
    pub async fn raw(&self) -> Option<String> {
        self.blob.read().await.clone()
    }
}

#[async_trait]
impl AccessRepository for MemoryAccessRepository {
    async fn load(&self) -> PortResult<AccessLedger> {
        match self.blob.read().await.as_deref() {
            Some(json) => Ok(serde_json::from_str(json)?),
            None => Ok(AccessLedger::default()),
        }
    }

    async fn store(&self, ledger: &AccessLedger) -> PortResult<()> {
        let json = serde_json::to_string(ledger)?;
        *self.blob.write().await = Some(json);
        Ok(())
    }
}

/// Records every notice it receives.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn messages(&self) -> Vec<String> {
        self.messages.lock().await.clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, message: &str) {
        self.messages.lock().await.push(message.to_string());
    }
}
