//! Port abstraction for per-event chat messages.

use async_trait::async_trait;

use crate::domain::{ChatMessage, EventId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by chat repository adapters.
    pub enum ChatRepositoryError {
        /// Backend could not be reached.
        Connection { message: String } => "chat repository connection failed: {message}",
        /// Read or write was rejected.
        Query { message: String } => "chat repository query failed: {message}",
    }
}

/// Append-only message sub-collection of an event.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatRepository: Send + Sync {
    /// Append a message.
    async fn append(&self, message: &ChatMessage) -> Result<(), ChatRepositoryError>;

    /// Messages for `event`, oldest first.
    async fn list_for_event(
        &self,
        event: &EventId,
    ) -> Result<Vec<ChatMessage>, ChatRepositoryError>;

    /// Newest message for `event`, if any.
    async fn latest_for_event(
        &self,
        event: &EventId,
    ) -> Result<Option<ChatMessage>, ChatRepositoryError>;
}
