//! crates/apex_access_core/src/registry.rs
//!
//! The access registry: pending requests and approved users, and the admin
//! operations that move an email between them.
//!
//! Every mutation goes through [`AccessRegistry::update`], which loads the
//! whole ledger, applies the change in memory and stores it back as one
//! value. Calls within a process are serialized by an async mutex. Writers
//! in other processes sharing the same store are still last-write-wins.

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::domain::{
    same_email, AccessLedger, AccessRequest, AccessType, ApprovedUser, IssuedCredentials,
    RequestStatus,
};
use crate::ports::{AccessRepository, Confirm, PortError, PortResult};

/// Whether a mutation should be written back.
enum Change<T> {
    Commit(T),
    Discard(T),
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("Email and full name are required")]
    MissingField,
    #[error("A request for {0} is already pending")]
    AlreadyPending(String),
    #[error("{0} already has access")]
    AlreadyApproved(String),
    #[error(transparent)]
    Port(#[from] PortError),
}

pub struct AccessRegistry {
    repo: Arc<dyn AccessRepository>,
    write_lock: Mutex<()>,
}

impl AccessRegistry {
    pub fn new(repo: Arc<dyn AccessRepository>) -> Self {
        Self {
            repo,
            write_lock: Mutex::new(()),
        }
    }

    async fn update<T, F>(&self, apply: F) -> PortResult<T>
    where
        F: FnOnce(&mut AccessLedger) -> Change<T>,
    {
        let _guard = self.write_lock.lock().await;
        let mut ledger = self.repo.load().await?;
        match apply(&mut ledger) {
            Change::Commit(value) => {
                self.repo.store(&ledger).await?;
                Ok(value)
            }
            Change::Discard(value) => Ok(value),
        }
    }

    //=====================================================================================
    // Queries
    //=====================================================================================

    pub async fn is_approved(&self, email: &str) -> PortResult<bool> {
        Ok(self.repo.load().await?.approved(email).is_some())
    }

    pub async fn find_approved(&self, email: &str) -> PortResult<Option<ApprovedUser>> {
        Ok(self.repo.load().await?.approved(email).cloned())
    }

    pub async fn view_requests(&self) -> PortResult<Vec<AccessRequest>> {
        Ok(self.repo.load().await?.requests)
    }

    pub async fn view_approved_users(&self) -> PortResult<Vec<ApprovedUser>> {
        Ok(self.repo.load().await?.approved_users)
    }

    //=====================================================================================
    // Mutations
    //=====================================================================================

    /// Records a new pending request for `email`.
    pub async fn submit_request(
        &self,
        email: &str,
        full_name: &str,
    ) -> Result<AccessRequest, SubmitError> {
        if email.trim().is_empty() || full_name.trim().is_empty() {
            return Err(SubmitError::MissingField);
        }

        let outcome = self
            .update(|ledger| {
                if ledger.approved(email).is_some() {
                    return Change::Discard(Err(SubmitError::AlreadyApproved(email.to_string())));
                }
                let pending = ledger
                    .requests
                    .iter()
                    .any(|r| same_email(&r.email, email) && r.status == RequestStatus::Pending);
                if pending {
                    return Change::Discard(Err(SubmitError::AlreadyPending(email.to_string())));
                }
                let request = AccessRequest::pending(email, full_name, Utc::now());
                ledger.requests.push(request.clone());
                Change::Commit(Ok(request))
            })
            .await??;

        info!("Access request {} recorded for {}", outcome.request_id, outcome.email);
        Ok(outcome)
    }

    /// Grants access to the holder of a pending request.
    ///
    /// Returns `false` without touching storage when no pending request
    /// matches `email`.
    pub async fn approve_user(
        &self,
        email: &str,
        full_name: &str,
        access_type: AccessType,
        password: &str,
    ) -> PortResult<bool> {
        let approved = self
            .update(|ledger| {
                let now = Utc::now();
                let Some(request) = ledger.pending_request_mut(email) else {
                    return Change::Discard(false);
                };

                request.status = RequestStatus::Approved;
                request.approved_at = Some(now);
                request.credentials = Some(IssuedCredentials {
                    access_type: access_type.clone(),
                    password: password.to_string(),
                });

                let full_name = if full_name.trim().is_empty() {
                    request.full_name.clone()
                } else {
                    full_name.trim().to_string()
                };
                let user = ApprovedUser {
                    email: request.email.clone(),
                    full_name,
                    access_type,
                    password: password.to_string(),
                    approved_at: now,
                    request_id: request.request_id.clone(),
                };
                ledger.upsert_approved(user);
                Change::Commit(true)
            })
            .await?;

        if approved {
            info!("Approved access for {}", email);
        } else {
            warn!("No pending access request found for {}", email);
        }
        Ok(approved)
    }

    /// Marks the latest pending request for `email` as rejected.
    ///
    /// Requests that were already decided are left alone; an approved user
    /// loses access through [`revoke_access`](Self::revoke_access) instead.
    pub async fn reject_user(&self, email: &str, reason: &str) -> PortResult<bool> {
        let rejected = self
            .update(|ledger| match ledger.pending_request_mut(email) {
                Some(request) => {
                    request.status = RequestStatus::Rejected;
                    request.rejected_at = Some(Utc::now());
                    request.rejection_reason = Some(reason.to_string());
                    Change::Commit(true)
                }
                None => Change::Discard(false),
            })
            .await?;

        if rejected {
            info!("Rejected access request for {}: {}", email, reason);
        } else {
            warn!("No pending access request found for {}", email);
        }
        Ok(rejected)
    }

    /// Removes `email` from the approved users and marks its request revoked.
    ///
    /// Succeeds even when there is nothing to revoke.
    pub async fn revoke_access(&self, email: &str) -> PortResult<bool> {
        let removed = self
            .update(|ledger| {
                let removed = ledger.remove_approved(email);
                let marked = match ledger.request_mut(email) {
                    Some(request) => {
                        request.status = RequestStatus::Revoked;
                        request.revoked_at = Some(Utc::now());
                        true
                    }
                    None => false,
                };
                if removed > 0 || marked {
                    Change::Commit(removed)
                } else {
                    Change::Discard(removed)
                }
            })
            .await?;

        info!("Revoked access for {} ({} record(s) removed)", email, removed);
        Ok(true)
    }

    /// Wipes both collections once `confirm` agrees.
    pub async fn clear_all(&self, confirm: &impl Confirm) -> PortResult<bool> {
        if !confirm.confirm("Clear ALL access requests and approved users?") {
            info!("Clearing access data cancelled");
            return Ok(false);
        }
        self.update(|ledger| {
            *ledger = AccessLedger::default();
            Change::Commit(())
        })
        .await?;
        warn!("All access requests and approved users were cleared");
        Ok(true)
    }
}
