//! crates/apex_access_core/src/config.rs
//!
//! Tunables shared by the session store and the gate.

use std::time::Duration;

pub const DEFAULT_LOGIN_PAGE: &str = "login.html";
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    /// Where logout and failed checks navigate to.
    pub login_page: String,
    /// Maximum session age measured from the login timestamp.
    pub session_timeout: Duration,
    /// Period of the background re-validation while authenticated.
    pub check_interval: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            login_page: DEFAULT_LOGIN_PAGE.to_string(),
            session_timeout: DEFAULT_SESSION_TIMEOUT,
            check_interval: DEFAULT_CHECK_INTERVAL,
        }
    }
}
