//! crates/apex_access_core/src/ports.rs
//!
//! Defines the service contracts (traits) the access components depend on.
//! These traits keep the core independent of where sessions and the access
//! ledger actually live (browser-like tab storage, a JSON file, a database).

use async_trait::async_trait;
use crate::domain::AccessLedger;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Storage failure: {0}")]
    Storage(String),
    #[error("Stored value could not be (de)serialized: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Storage Ports
//=========================================================================================

/// Ephemeral, per-tab scalar storage holding the session keys.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    async fn get_item(&self, key: &str) -> PortResult<Option<String>>;

    async fn set_item(&self, key: &str, value: &str) -> PortResult<()>;

    async fn remove_item(&self, key: &str) -> PortResult<()>;
}

/// Durable storage for the access ledger.
///
/// `store` must persist both collections as one write.
#[async_trait]
pub trait AccessRepository: Send + Sync {
    async fn load(&self) -> PortResult<AccessLedger>;

    async fn store(&self, ledger: &AccessLedger) -> PortResult<()>;
}

//=========================================================================================
// User-facing Ports
//=========================================================================================

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Surfaces a blocking notice to whoever owns the session.
    async fn notify(&self, message: &str);
}

/// Interactive confirmation for destructive operations.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

impl Confirm for bool {
    fn confirm(&self, _prompt: &str) -> bool {
        *self
    }
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}
