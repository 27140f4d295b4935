use stockroom_auth::{Principal, User};

/// Authenticated identity for a request.
///
/// Inserted by the auth middleware after the session's user has been
/// re-loaded, so the admin flag is always current.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    principal: Principal,
}

impl PrincipalContext {
    pub fn new(principal: Principal) -> Self {
        Self { principal }
    }

    pub fn from_user(user: &User) -> Self {
        Self::new(Principal::from_user(user))
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }
}
