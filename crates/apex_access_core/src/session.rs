//! crates/apex_access_core/src/session.rs
//!
//! The session store: reads and writes the five scalar session keys held in
//! a tab's ephemeral storage and decides whether the session is still good.
//!
//! Checking is pure. Logging out an expired session is a separate, explicit
//! step (`ensure_valid`), so a read never has hidden effects.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::AuthConfig;
use crate::domain::{AccessType, Redirect, Session};
use crate::ports::{PortResult, SessionStorage};

pub const KEY_LOGGED_IN: &str = "isLoggedIn";
pub const KEY_USERNAME: &str = "username";
pub const KEY_EMAIL: &str = "userEmail";
pub const KEY_ACCESS_TYPE: &str = "accessType";
pub const KEY_LOGIN_TIME: &str = "loginTime";

pub const SESSION_KEYS: [&str; 5] = [
    KEY_LOGGED_IN,
    KEY_USERNAME,
    KEY_EMAIL,
    KEY_ACCESS_TYPE,
    KEY_LOGIN_TIME,
];

pub const GUEST_USERNAME: &str = "Guest";

/// Outcome of inspecting the stored session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCheck {
    Valid(Session),
    /// The login flag is absent or not `"true"`.
    NotLoggedIn,
    /// Flag is set but username, email or a parsable login time is missing.
    Incomplete,
    Expired { age: Duration },
}

impl SessionCheck {
    pub fn is_valid(&self) -> bool {
        matches!(self, SessionCheck::Valid(_))
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionCheck::Valid(session) => Some(session),
            _ => None,
        }
    }
}

pub struct SessionStore {
    storage: Arc<dyn SessionStorage>,
    login_page: String,
    timeout: Duration,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn SessionStorage>, config: &AuthConfig) -> Self {
        Self {
            storage,
            login_page: config.login_page.clone(),
            timeout: config.session_timeout,
        }
    }

    pub fn login_page(&self) -> Redirect {
        Redirect(self.login_page.clone())
    }

    /// Writes every session key. Called once a login has succeeded.
    pub async fn begin(&self, session: &Session) -> PortResult<()> {
        self.storage
            .set_item(KEY_LOGGED_IN, if session.logged_in { "true" } else { "false" })
            .await?;
        self.storage.set_item(KEY_USERNAME, &session.username).await?;
        self.storage.set_item(KEY_EMAIL, &session.email).await?;
        self.storage
            .set_item(KEY_ACCESS_TYPE, session.access_type.as_str())
            .await?;
        self.storage
            .set_item(KEY_LOGIN_TIME, &session.login_time.to_rfc3339())
            .await?;
        debug!("Session started for {}", session.email);
        Ok(())
    }

    /// Inspects the stored session as of `now`. Never mutates storage.
    pub async fn check_at(&self, now: DateTime<Utc>) -> PortResult<SessionCheck> {
        let logged_in = self.storage.get_item(KEY_LOGGED_IN).await?;
        if logged_in.as_deref() != Some("true") {
            return Ok(SessionCheck::NotLoggedIn);
        }

        let username = non_empty(self.storage.get_item(KEY_USERNAME).await?);
        let email = non_empty(self.storage.get_item(KEY_EMAIL).await?);
        let login_time = self
            .storage
            .get_item(KEY_LOGIN_TIME)
            .await?
            .and_then(|raw| DateTime::parse_from_rfc3339(raw.trim()).ok())
            .map(|t| t.with_timezone(&Utc));

        let (Some(username), Some(email), Some(login_time)) = (username, email, login_time) else {
            return Ok(SessionCheck::Incomplete);
        };

        // A login time in the future counts as age zero.
        let age = (now - login_time).to_std().unwrap_or(Duration::ZERO);
        if age > self.timeout {
            return Ok(SessionCheck::Expired { age });
        }

        let access_type = self
            .storage
            .get_item(KEY_ACCESS_TYPE)
            .await?
            .map(AccessType::from)
            .unwrap_or_default();

        Ok(SessionCheck::Valid(Session::new(
            &username,
            &email,
            access_type,
            login_time,
        )))
    }

    pub async fn check(&self) -> PortResult<SessionCheck> {
        self.check_at(Utc::now()).await
    }

    pub async fn is_valid(&self) -> PortResult<bool> {
        Ok(self.check().await?.is_valid())
    }

    /// Checks the session and logs it out if it has expired.
    pub async fn ensure_valid_at(&self, now: DateTime<Utc>) -> PortResult<SessionCheck> {
        let check = self.check_at(now).await?;
        if let SessionCheck::Expired { age } = &check {
            info!("Session expired after {}s; logging out", age.as_secs());
            self.logout().await?;
        }
        Ok(check)
    }

    pub async fn ensure_valid(&self) -> PortResult<SessionCheck> {
        self.ensure_valid_at(Utc::now()).await
    }

    /// Clears every session key and returns where to navigate next.
    pub async fn logout(&self) -> PortResult<Redirect> {
        for key in SESSION_KEYS {
            self.storage.remove_item(key).await?;
        }
        Ok(self.login_page())
    }

    pub async fn current_user(&self) -> PortResult<String> {
        Ok(non_empty(self.storage.get_item(KEY_USERNAME).await?)
            .unwrap_or_else(|| GUEST_USERNAME.to_string()))
    }

    pub async fn current_email(&self) -> PortResult<String> {
        Ok(self.storage.get_item(KEY_EMAIL).await?.unwrap_or_default())
    }

    pub async fn access_type(&self) -> PortResult<AccessType> {
        Ok(non_empty(self.storage.get_item(KEY_ACCESS_TYPE).await?)
            .map(AccessType::from)
            .unwrap_or_default())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemorySessionStorage;
    use chrono::Duration as ChronoDuration;

    fn store_with(storage: Arc<MemorySessionStorage>) -> SessionStore {
        SessionStore::new(storage, &AuthConfig::default())
    }

    fn sample(login_time: DateTime<Utc>) -> Session {
        Session::new("Ada", "ada@x.com", AccessType::Student, login_time)
    }

    #[tokio::test]
    async fn fresh_session_is_valid() {
        let storage = Arc::new(MemorySessionStorage::new());
        let store = store_with(storage.clone());
        let now = Utc::now();
        store.begin(&sample(now)).await.unwrap();

        let check = store.check_at(now + ChronoDuration::hours(1)).await.unwrap();
        let session = check.session().expect("session should be valid");
        assert_eq!(session.email, "ada@x.com");
        assert_eq!(session.access_type, AccessType::Student);
        assert!(store.is_valid().await.unwrap());
    }

    #[tokio::test]
    async fn expired_session_is_invalid_and_cleared_on_ensure() {
        let storage = Arc::new(MemorySessionStorage::new());
        let store = store_with(storage.clone());
        let now = Utc::now();
        store.begin(&sample(now - ChronoDuration::hours(25))).await.unwrap();

        // Checking alone leaves storage untouched.
        let check = store.check_at(now).await.unwrap();
        assert!(matches!(check, SessionCheck::Expired { .. }));
        assert_eq!(storage.len().await, SESSION_KEYS.len());

        let check = store.ensure_valid_at(now).await.unwrap();
        assert!(!check.is_valid());
        assert_eq!(storage.len().await, 0);
        for key in SESSION_KEYS {
            assert_eq!(storage.get_item(key).await.unwrap(), None);
        }
    }

    #[tokio::test]
    async fn missing_fields_make_the_session_incomplete() {
        let storage = Arc::new(MemorySessionStorage::new());
        let store = store_with(storage.clone());
        assert_eq!(store.check().await.unwrap(), SessionCheck::NotLoggedIn);

        storage.set_item(KEY_LOGGED_IN, "true").await.unwrap();
        storage.set_item(KEY_USERNAME, "Ada").await.unwrap();
        storage.set_item(KEY_LOGIN_TIME, &Utc::now().to_rfc3339()).await.unwrap();
        assert_eq!(store.check().await.unwrap(), SessionCheck::Incomplete);

        storage.set_item(KEY_EMAIL, "ada@x.com").await.unwrap();
        storage.set_item(KEY_LOGIN_TIME, "yesterday-ish").await.unwrap();
        assert_eq!(store.check().await.unwrap(), SessionCheck::Incomplete);
    }

    #[tokio::test]
    async fn logout_is_idempotent_and_points_at_login() {
        let storage = Arc::new(MemorySessionStorage::new());
        let store = store_with(storage.clone());
        store.begin(&sample(Utc::now())).await.unwrap();

        let first = store.logout().await.unwrap();
        let second = store.logout().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.location(), "login.html");
        assert_eq!(storage.len().await, 0);
    }

    #[tokio::test]
    async fn reads_fall_back_when_unset() {
        let store = store_with(Arc::new(MemorySessionStorage::new()));
        assert_eq!(store.current_user().await.unwrap(), "Guest");
        assert_eq!(store.current_email().await.unwrap(), "");
        assert_eq!(store.access_type().await.unwrap(), AccessType::User);
    }
}
