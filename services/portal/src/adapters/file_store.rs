//! services/portal/src/adapters/file_store.rs
//!
//! A durable `AccessRepository` backed by one JSON document on disk:
//! `{"apex_access_requests": [...], "apex_approved_users": [...]}`.
//! Writes go to a sibling temp file that is renamed over the target, so a
//! crash leaves either the old ledger or the new one.

use apex_access_core::domain::AccessLedger;
use apex_access_core::ports::{AccessRepository, PortError, PortResult};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Clone, Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "apex_store.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

fn storage_error(path: &Path, e: std::io::Error) -> PortError {
    PortError::Storage(format!("{}: {}", path.display(), e))
}

#[async_trait]
impl AccessRepository for JsonFileStore {
    async fn load(&self) -> PortResult<AccessLedger> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(json) if json.trim().is_empty() => Ok(AccessLedger::default()),
            Ok(json) => Ok(serde_json::from_str(&json)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(AccessLedger::default()),
            Err(e) => Err(storage_error(&self.path, e)),
        }
    }

    async fn store(&self, ledger: &AccessLedger) -> PortResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| storage_error(parent, e))?;
        }

        let json = serde_json::to_string_pretty(ledger)?;
        let temp = self.temp_path();
        tokio::fs::write(&temp, json)
            .await
            .map_err(|e| storage_error(&temp, e))?;
        tokio::fs::rename(&temp, &self.path)
            .await
            .map_err(|e| storage_error(&self.path, e))?;

        debug!(
            "Stored {} request(s) and {} approved user(s) to {}",
            ledger.requests.len(),
            ledger.approved_users.len(),
            self.path.display()
        );
        Ok(())
    }
}
