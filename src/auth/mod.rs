//! Authentication module
//!
//! Obtains bearer tokens from the upstream `token/` endpoint.
//!
//! The `CredentialManager` keeps no token cache: every `acquire()` is an
//! independent login, so concurrent fetch tasks can each re-authenticate
//! when their own copy of the token is rejected with a 401.

mod manager;
mod types;

pub use manager::CredentialManager;
pub use types::{AuthRetryConfig, AuthToken, Credentials};
