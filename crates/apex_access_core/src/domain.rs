//! crates/apex_access_core/src/domain.rs
//!
//! Defines the core data structures for the access gate.
//! The serde field names match the persisted JSON layout, so these structs
//! are also the wire shape of the two durable collections.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

//=========================================================================================
// Labels
//=========================================================================================

/// Coarse role label attached to an approved user and to a session.
///
/// Unknown labels read back from storage are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AccessType {
    #[default]
    User,
    Student,
    Admin,
    Other(String),
}

impl AccessType {
    pub fn as_str(&self) -> &str {
        match self {
            AccessType::User => "user",
            AccessType::Student => "student",
            AccessType::Admin => "admin",
            AccessType::Other(label) => label,
        }
    }
}

impl From<String> for AccessType {
    fn from(label: String) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "user" => AccessType::User,
            "student" => AccessType::Student,
            "admin" => AccessType::Admin,
            _ => AccessType::Other(label),
        }
    }
}

impl From<&str> for AccessType {
    fn from(label: &str) -> Self {
        AccessType::from(label.to_string())
    }
}

impl From<AccessType> for String {
    fn from(access_type: AccessType) -> Self {
        access_type.as_str().to_string()
    }
}

impl fmt::Display for AccessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of an access request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
    Revoked,
}

//=========================================================================================
// Durable records
//=========================================================================================

/// Credentials stamped onto a request when it is approved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedCredentials {
    pub access_type: AccessType,
    pub password: String,
}

/// A user's application for access, awaiting an admin decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessRequest {
    pub email: String,
    pub full_name: String,
    pub request_id: String,
    pub status: RequestStatus,
    pub requested_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<IssuedCredentials>,
}

impl AccessRequest {
    /// Creates a fresh `pending` request with a random request id.
    pub fn pending(email: &str, full_name: &str, requested_at: DateTime<Utc>) -> Self {
        Self {
            email: email.trim().to_string(),
            full_name: full_name.trim().to_string(),
            request_id: uuid::Uuid::new_v4().to_string(),
            status: RequestStatus::Pending,
            requested_at,
            approved_at: None,
            rejected_at: None,
            revoked_at: None,
            rejection_reason: None,
            credentials: None,
        }
    }
}

/// A granted credential record permitting login.
///
/// The password is stored as given. This mirrors the behavior being
/// reproduced and is not a credential system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovedUser {
    pub email: String,
    pub full_name: String,
    pub access_type: AccessType,
    pub password: String,
    pub approved_at: DateTime<Utc>,
    pub request_id: String,
}

//=========================================================================================
// The aggregate
//=========================================================================================

/// Durable storage key of the request collection.
pub const REQUESTS_KEY: &str = "apex_access_requests";
/// Durable storage key of the approved-user collection.
pub const APPROVED_USERS_KEY: &str = "apex_approved_users";

/// Case-insensitive email comparison used by every registry lookup.
pub fn same_email(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// Both durable collections held as one value.
///
/// Repositories load and store the ledger as a whole, so a mutation touching
/// both collections is persisted by a single write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessLedger {
    #[serde(rename = "apex_access_requests", default)]
    pub requests: Vec<AccessRequest>,
    #[serde(rename = "apex_approved_users", default)]
    pub approved_users: Vec<ApprovedUser>,
}

impl AccessLedger {
    /// The most recent request for `email`.
    pub fn request_mut(&mut self, email: &str) -> Option<&mut AccessRequest> {
        self.requests
            .iter_mut()
            .rev()
            .find(|r| same_email(&r.email, email))
    }

    /// The most recent request for `email` still awaiting a decision.
    pub fn pending_request_mut(&mut self, email: &str) -> Option<&mut AccessRequest> {
        self.requests
            .iter_mut()
            .rev()
            .find(|r| same_email(&r.email, email) && r.status == RequestStatus::Pending)
    }

    pub fn approved(&self, email: &str) -> Option<&ApprovedUser> {
        self.approved_users.iter().find(|u| same_email(&u.email, email))
    }

    /// Inserts `user`, replacing any record with the same email.
    pub fn upsert_approved(&mut self, user: ApprovedUser) {
        self.approved_users.retain(|u| !same_email(&u.email, &user.email));
        self.approved_users.push(user);
    }

    /// Removes every approved record for `email`, returning how many were dropped.
    pub fn remove_approved(&mut self, email: &str) -> usize {
        let before = self.approved_users.len();
        self.approved_users.retain(|u| !same_email(&u.email, email));
        before - self.approved_users.len()
    }
}

//=========================================================================================
// Ephemeral session
//=========================================================================================

/// Transient proof of a completed login, held for the life of a tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub logged_in: bool,
    pub username: String,
    pub email: String,
    pub access_type: AccessType,
    pub login_time: DateTime<Utc>,
}

impl Session {
    pub fn new(username: &str, email: &str, access_type: AccessType, login_time: DateTime<Utc>) -> Self {
        Self {
            logged_in: true,
            username: username.to_string(),
            email: email.to_string(),
            access_type,
            login_time,
        }
    }
}

/// A navigation target, produced by logout and by a failed gate check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Redirect(pub String);

impl Redirect {
    pub fn location(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approved(email: &str) -> ApprovedUser {
        ApprovedUser {
            email: email.to_string(),
            full_name: "A".to_string(),
            access_type: AccessType::Student,
            password: "pw".to_string(),
            approved_at: Utc::now(),
            request_id: "r1".to_string(),
        }
    }

    #[test]
    fn access_type_keeps_unknown_labels() {
        let parsed: AccessType = serde_json::from_str("\"mentor\"").unwrap();
        assert_eq!(parsed, AccessType::Other("mentor".to_string()));
        assert_eq!(serde_json::to_string(&parsed).unwrap(), "\"mentor\"");
        assert_eq!(AccessType::from("ADMIN"), AccessType::Admin);
    }

    #[test]
    fn upsert_keeps_one_record_per_email() {
        let mut ledger = AccessLedger::default();
        ledger.upsert_approved(approved("a@x.com"));
        ledger.upsert_approved(approved("A@X.COM"));
        assert_eq!(ledger.approved_users.len(), 1);
        assert_eq!(ledger.approved_users[0].email, "A@X.COM");
    }

    #[test]
    fn ledger_uses_storage_key_names() {
        let mut ledger = AccessLedger::default();
        ledger.requests.push(AccessRequest::pending("a@x.com", "A", Utc::now()));
        let value = serde_json::to_value(&ledger).unwrap();
        assert!(value.get("apex_access_requests").is_some());
        assert!(value.get("apex_approved_users").is_some());
        assert_eq!(value["apex_access_requests"][0]["status"], "pending");
        assert_eq!(value["apex_access_requests"][0]["fullName"], "A");
    }
}
