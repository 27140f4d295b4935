use thiserror::Error;

use stockroom_core::{DomainError, Owner, UserId};

use crate::user::User;

/// A resolved, authenticated identity for authorization decisions.
///
/// Construction is decoupled from storage and transport: the API derives it
/// from a verified session and the current user record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub username: String,
    pub is_admin: bool,
}

impl Principal {
    pub fn from_user(user: &User) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            is_admin: user.is_admin,
        }
    }

    /// Ownership scope for every item/vendor/warehouse query.
    pub fn owner(&self) -> Owner {
        Owner::new(self.username.clone())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("Unauthorized - Admin access required")]
    AdminRequired,

    #[error("Cannot delete admin users")]
    ProtectedAccount,
}

impl From<AuthzError> for DomainError {
    fn from(value: AuthzError) -> Self {
        DomainError::forbidden(value.to_string())
    }
}

/// Admin-only gate.
///
/// - No IO
/// - No panics
pub fn require_admin(principal: &Principal) -> Result<(), AuthzError> {
    if principal.is_admin {
        Ok(())
    } else {
        Err(AuthzError::AdminRequired)
    }
}

/// Admins may delete non-admin accounts only.
pub fn authorize_user_deletion(actor: &Principal, target: &User) -> Result<(), AuthzError> {
    require_admin(actor)?;
    if target.is_admin {
        return Err(AuthzError::ProtectedAccount);
    }
    Ok(())
}
