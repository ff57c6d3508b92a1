//! Signed-in user context passed explicitly to services.

use super::{Error, UserId};

/// The signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    user_id: UserId,
}

impl Session {
    /// Session for `user_id`.
    #[must_use]
    pub const fn new(user_id: UserId) -> Self {
        Self { user_id }
    }

    /// Signed-in user.
    #[must_use]
    pub const fn user_id(&self) -> &UserId {
        &self.user_id
    }
}

/// Resolve an optional session, failing with `Unauthorized` when absent.
pub fn require_session(session: Option<&Session>) -> Result<&Session, Error> {
    session.ok_or_else(|| Error::unauthorized("sign in to continue"))
}
