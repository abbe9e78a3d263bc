//! crates/apex_access_core/src/gate.rs
//!
//! The auth gate guarding protected pages.
//!
//! A page load calls [`AuthGate::enter`]. While the page stays open,
//! [`AuthGate::watch`] re-checks on a fixed period and ends the session the
//! first time a check fails. There is no retry: an invalid state is terminal.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::AuthConfig;
use crate::domain::{Redirect, Session};
use crate::ports::{Notifier, PortResult};
use crate::registry::AccessRegistry;
use crate::session::{SessionCheck, SessionStore};

pub const SESSION_EXPIRED_NOTICE: &str = "Your session has expired. Please login again.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateState {
    Authenticated(Session),
    Unauthenticated(Redirect),
}

impl GateState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, GateState::Authenticated(_))
    }
}

pub struct AuthGate {
    sessions: SessionStore,
    registry: Arc<AccessRegistry>,
    check_interval: Duration,
}

impl AuthGate {
    pub fn new(sessions: SessionStore, registry: Arc<AccessRegistry>, config: &AuthConfig) -> Self {
        Self {
            sessions,
            registry,
            check_interval: config.check_interval,
        }
    }

    /// Decides whether the current session may see a protected page.
    ///
    /// The session must be unexpired and its email must still be approved.
    /// Any other outcome clears the session and yields the login redirect.
    pub async fn enter(&self) -> PortResult<GateState> {
        match self.admit().await? {
            Some(session) => Ok(GateState::Authenticated(session)),
            None => Ok(GateState::Unauthenticated(self.sessions.logout().await?)),
        }
    }

    /// The session that may pass, or `None`. Leaves storage untouched.
    async fn admit(&self) -> PortResult<Option<Session>> {
        let session = match self.sessions.check().await? {
            SessionCheck::Valid(session) => session,
            other => {
                debug!("Gate refused entry: {:?}", other);
                return Ok(None);
            }
        };

        if !self.registry.is_approved(&session.email).await? {
            info!("{} is no longer approved; ending session", session.email);
            return Ok(None);
        }

        Ok(Some(session))
    }

    /// Re-validates every `check_interval` until a check fails or `cancel` fires.
    ///
    /// A check that cannot be completed counts as failed. Returns the login
    /// redirect after a failed check, or `None` when cancelled.
    pub async fn watch(
        &self,
        notifier: &dyn Notifier,
        cancel: CancellationToken,
    ) -> PortResult<Option<Redirect>> {
        let mut ticker = tokio::time::interval(self.check_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; the page load already checked.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Session watch cancelled");
                    return Ok(None);
                }
                _ = ticker.tick() => {
                    let admitted = match self.admit().await {
                        Ok(session) => session.is_some(),
                        Err(e) => {
                            warn!("Periodic session check could not complete: {}", e);
                            false
                        }
                    };
                    if !admitted {
                        warn!("Periodic session check failed; forcing logout");
                        // Notice first, then the keys go.
                        notifier.notify(SESSION_EXPIRED_NOTICE).await;
                        return Ok(Some(self.sessions.logout().await?));
                    }
                }
            }
        }
    }

    /// Runs [`watch`](Self::watch) on its own task.
    pub fn spawn_watch(
        self: Arc<Self>,
        notifier: Arc<dyn Notifier>,
        cancel: CancellationToken,
    ) -> JoinHandle<PortResult<Option<Redirect>>> {
        tokio::spawn(async move { self.watch(notifier.as_ref(), cancel).await })
    }
}
