//! services/portal/src/adapters/tab_store.rs
//!
//! Ephemeral per-tab session storage. Each browser tab is identified by the
//! `tab` cookie and owns its own scalar key/value space, the same way each
//! tab owns its own `sessionStorage`. Nothing here survives a restart.

use apex_access_core::memory::MemorySessionStorage;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

/// The periodic session check running for a tab.
struct Watch {
    id: u64,
    cancel: CancellationToken,
}

#[derive(Default)]
struct Tab {
    storage: Arc<MemorySessionStorage>,
    watch: Option<Watch>,
}

#[derive(Default)]
pub struct TabStore {
    tabs: RwLock<HashMap<String, Tab>>,
    next_watch: AtomicU64,
}

impl TabStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generates a fresh tab id.
    pub fn new_tab_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// The storage of `tab_id`, created empty on first use.
    pub async fn storage(&self, tab_id: &str) -> Arc<MemorySessionStorage> {
        if let Some(tab) = self.tabs.read().await.get(tab_id) {
            return tab.storage.clone();
        }
        self.tabs
            .write()
            .await
            .entry(tab_id.to_string())
            .or_default()
            .storage
            .clone()
    }

    /// Registers the watch token for `tab_id`, cancelling any previous one.
    ///
    /// Returns the id that [`close_watched`](Self::close_watched) expects.
    pub async fn set_watch(&self, tab_id: &str, cancel: CancellationToken) -> u64 {
        let id = self.next_watch.fetch_add(1, Ordering::Relaxed);
        let mut tabs = self.tabs.write().await;
        let tab = tabs.entry(tab_id.to_string()).or_default();
        if let Some(previous) = tab.watch.replace(Watch { id, cancel }) {
            previous.cancel.cancel();
        }
        id
    }

    /// Forgets `tab_id` entirely and stops its watch.
    pub async fn close(&self, tab_id: &str) {
        if let Some(tab) = self.tabs.write().await.remove(tab_id) {
            if let Some(watch) = tab.watch {
                watch.cancel.cancel();
            }
            debug!("Closed tab {}", tab_id);
        }
    }

    /// Closes `tab_id` only while `watch_id` is still its current watch.
    ///
    /// A tab that was logged into again since keeps its new session.
    pub async fn close_watched(&self, tab_id: &str, watch_id: u64) -> bool {
        let mut tabs = self.tabs.write().await;
        let current = tabs
            .get(tab_id)
            .and_then(|tab| tab.watch.as_ref())
            .map(|watch| watch.id);
        if current != Some(watch_id) {
            debug!("Tab {} has a newer watch; leaving it open", tab_id);
            return false;
        }
        if let Some(watch) = tabs.remove(tab_id).and_then(|tab| tab.watch) {
            watch.cancel.cancel();
        }
        debug!("Closed tab {}", tab_id);
        true
    }

    pub async fn len(&self) -> usize {
        self.tabs.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apex_access_core::ports::SessionStorage;

    #[tokio::test]
    async fn tabs_do_not_share_keys() {
        let store = TabStore::new();
        store.storage("one").await.set_item("username", "A").await.unwrap();

        let other = store.storage("two").await;
        assert_eq!(other.get_item("username").await.unwrap(), None);

        let same = store.storage("one").await;
        assert_eq!(same.get_item("username").await.unwrap().as_deref(), Some("A"));
    }

    #[tokio::test]
    async fn closing_cancels_the_watch() {
        let store = TabStore::new();
        let first = CancellationToken::new();
        let second = CancellationToken::new();

        store.set_watch("tab", first.clone()).await;
        store.set_watch("tab", second.clone()).await;
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());

        store.close("tab").await;
        assert!(second.is_cancelled());
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn stale_watch_does_not_close_a_fresh_login() {
        let store = TabStore::new();
        let stale = store.set_watch("tab", CancellationToken::new()).await;
        store.storage("tab").await.set_item("isLoggedIn", "true").await.unwrap();
        let fresh = store.set_watch("tab", CancellationToken::new()).await;

        assert!(!store.close_watched("tab", stale).await);
        let storage = store.storage("tab").await;
        assert_eq!(storage.get_item("isLoggedIn").await.unwrap().as_deref(), Some("true"));

        assert!(store.close_watched("tab", fresh).await);
        assert_eq!(store.len().await, 0);
    }
}
