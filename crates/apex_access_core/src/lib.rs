pub mod config;
pub mod domain;
pub mod gate;
pub mod memory;
pub mod ports;
pub mod registry;
pub mod session;

pub use config::AuthConfig;
pub use domain::{
    AccessLedger, AccessRequest, AccessType, ApprovedUser, IssuedCredentials, Redirect,
    RequestStatus, Session,
};
pub use gate::{AuthGate, GateState, SESSION_EXPIRED_NOTICE};
pub use ports::{AccessRepository, Confirm, Notifier, PortError, PortResult, SessionStorage};
pub use registry::{AccessRegistry, SubmitError};
pub use session::{SessionCheck, SessionStore};
