//! Port abstraction for event records.

use async_trait::async_trait;

use crate::domain::{Event, EventId, IdempotencyKey, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by event repository adapters.
    pub enum EventRepositoryError {
        /// Backend could not be reached.
        Connection { message: String } => "event repository connection failed: {message}",
        /// Read or write was rejected.
        Query { message: String } => "event repository query failed: {message}",
        /// A record with the same id already exists.
        Duplicate { id: String } => "event {id} already exists",
    }
}

/// Event documents keyed by [`EventId`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Fetch an event.
    async fn find_by_id(&self, id: &EventId) -> Result<Option<Event>, EventRepositoryError>;

    /// Event previously published from the draft carrying `token`.
    async fn find_by_publish_token(
        &self,
        token: &IdempotencyKey,
    ) -> Result<Option<Event>, EventRepositoryError>;

    /// Every event in storage order.
    async fn list(&self) -> Result<Vec<Event>, EventRepositoryError>;

    /// Store a new event.
    async fn create(&self, event: &Event) -> Result<(), EventRepositoryError>;

    /// Set-union `user` into the participants of `event`.
    async fn add_participant(
        &self,
        event: &EventId,
        user: &UserId,
    ) -> Result<(), EventRepositoryError>;

    /// Events whose participants contain `user`.
    async fn list_joined_by(&self, user: &UserId) -> Result<Vec<Event>, EventRepositoryError>;
}
