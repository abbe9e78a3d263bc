//! services/portal/src/web/state.rs
//!
//! Defines the application's shared state and the per-tab gate wiring.

use crate::adapters::TabStore;
use crate::config::Config;
use apex_access_core::{AccessRegistry, AuthGate, SessionStore};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<AccessRegistry>,
    pub tabs: Arc<TabStore>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(registry: Arc<AccessRegistry>, config: Arc<Config>) -> Self {
        Self {
            registry,
            tabs: Arc::new(TabStore::new()),
            config,
        }
    }

    /// The session store scoped to one tab.
    pub async fn sessions_for(&self, tab_id: &str) -> SessionStore {
        SessionStore::new(self.tabs.storage(tab_id).await, &self.config.auth)
    }

    /// A gate evaluating one tab's session against the shared registry.
    pub async fn gate_for(&self, tab_id: &str) -> AuthGate {
        AuthGate::new(
            self.sessions_for(tab_id).await,
            self.registry.clone(),
            &self.config.auth,
        )
    }
}
