//! Client-side session lifecycle for the pdfly auth service
//!
//! [`SessionManager`] is the only component that reads or writes the stored
//! credential. Everything else observes it through [`Session`] snapshots,
//! [`SessionEvent`] broadcasts and the route guards in [`guard`].

pub mod backend;
pub mod config;
pub mod credential;
pub mod error;
pub mod guard;
pub mod manager;
pub mod token;

pub use backend::{AuthBackend, HttpAuthBackend};
pub use config::ClientConfig;
pub use credential::{CookieAttributes, CredentialStore, FileCredentialStore, MemoryCookieJar};
pub use error::SessionError;
pub use guard::{optional_route, protected_route, public_route, RouteDecision};
pub use manager::{AuthState, Session, SessionEvent, SessionManager, User};
