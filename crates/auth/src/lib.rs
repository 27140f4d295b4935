//! `stockroom-auth`: identity, credentials and sessions.
//!
//! This crate is intentionally decoupled from HTTP and storage.

pub mod authorize;
pub mod claims;
pub mod password;
pub mod session;
pub mod user;

pub use authorize::{AuthzError, Principal, authorize_user_deletion, require_admin};
pub use claims::{SessionClaims, TokenError, validate_claims};
pub use password::{Argon2PasswordHasher, PasswordError, PasswordHasher};
pub use session::{Hs256SessionTokens, SessionTokens};
pub use user::{Credentials, Registration, User};
