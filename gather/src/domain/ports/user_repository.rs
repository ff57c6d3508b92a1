//! Port abstraction for user profile storage.

use async_trait::async_trait;

use crate::domain::{Handle, RelationField, User, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by user repository adapters.
    pub enum UserRepositoryError {
        /// Backend could not be reached.
        Connection { message: String } => "user repository connection failed: {message}",
        /// Read or write was rejected.
        Query { message: String } => "user repository query failed: {message}",
    }
}

/// Profile documents keyed by [`UserId`].
///
/// `add_to_set` and `remove_from_set` are single-document set primitives;
/// the backend offers no transaction spanning two profiles.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fetch a profile.
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserRepositoryError>;

    /// First profile whose handle equals `handle`.
    async fn find_by_handle(&self, handle: &Handle) -> Result<Option<User>, UserRepositoryError>;

    /// Every profile, in id order.
    async fn list(&self) -> Result<Vec<User>, UserRepositoryError>;

    /// Create or replace a profile.
    async fn upsert(&self, user: &User) -> Result<(), UserRepositoryError>;

    /// Set-union `member` into one relation set of `owner`.
    async fn add_to_set(
        &self,
        owner: &UserId,
        field: RelationField,
        member: &UserId,
    ) -> Result<(), UserRepositoryError>;

    /// Remove `member` from one relation set of `owner`.
    async fn remove_from_set(
        &self,
        owner: &UserId,
        field: RelationField,
        member: &UserId,
    ) -> Result<(), UserRepositoryError>;
}
