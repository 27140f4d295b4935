//! User accounts.
//!
//! Usernames are globally unique and double as the [`Owner`] of every item,
//! vendor and warehouse the user creates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, DomainResult, Owner, UserId};

pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 30;
pub const PASSWORD_MIN_LEN: usize = 6;

// ─────────────────────────────────────────────────────────────────────────────
// User
// ─────────────────────────────────────────────────────────────────────────────

/// A registered account.
///
/// # Invariants
/// - `username` matches `[A-Za-z0-9_]{3,30}` and is unique.
/// - Only the very first registered account starts as admin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub password_hash: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn owner(&self) -> Owner {
        Owner::new(self.username.clone())
    }

    /// Flip the admin flag (any admin may promote or demote any account).
    pub fn toggled_admin(&self) -> Self {
        Self {
            is_admin: !self.is_admin,
            ..self.clone()
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Credentials
// ─────────────────────────────────────────────────────────────────────────────

/// Username/password pair as submitted to register or login.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(password.into()),
        }
    }

    /// Both fields must be present and non-empty.
    pub fn require_present(&self) -> DomainResult<(&str, &str)> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(u), Some(p)) if !u.is_empty() && !p.is_empty() => Ok((u, p)),
            _ => Err(DomainError::validation("Username and password are required")),
        }
    }

    /// Registration policy: presence, username length, password length,
    /// then username charset.
    pub fn validate_registration(&self) -> DomainResult<(&str, &str)> {
        let (username, password) = self.require_present()?;

        let len = username.chars().count();
        if !(USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&len) {
            return Err(DomainError::validation(format!(
                "Username must be between {USERNAME_MIN_LEN} and {USERNAME_MAX_LEN} characters"
            )));
        }

        if password.chars().count() < PASSWORD_MIN_LEN {
            return Err(DomainError::validation(format!(
                "Password must be at least {PASSWORD_MIN_LEN} characters"
            )));
        }

        if !username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(DomainError::validation(
                "Username can only contain letters, numbers, and underscores",
            ));
        }

        Ok((username, password))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Registration
// ─────────────────────────────────────────────────────────────────────────────

/// A validated, hashed registration waiting to be stored.
///
/// The admin flag is decided by the store, inside the same critical section
/// that inserts the row, from the number of users that already exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub id: UserId,
    pub username: String,
    pub password_hash: String,
    pub registered_at: DateTime<Utc>,
}

impl Registration {
    pub fn into_user(self, existing_users: u64) -> User {
        User {
            id: self.id,
            username: self.username,
            password_hash: self.password_hash,
            is_admin: existing_users == 0,
            created_at: self.registered_at,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
