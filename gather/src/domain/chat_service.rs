//! Group chat for joined events.

use std::sync::Arc;

use mockable::Clock;
use tracing::{debug, info};

use super::ports::{ChatRepository, UserRepository};
use super::service_support::{map_chat_error, map_user_error};
use super::{ChatMessage, Error, EventId, MessageText, Session, order_messages, require_session};

/// Sends and lists chat messages.
#[derive(Clone)]
pub struct ChatService<M, U> {
    messages: Arc<M>,
    users: Arc<U>,
    clock: Arc<dyn Clock>,
}

impl<M, U> ChatService<M, U> {
    /// Create a service with the given ports and clock.
    #[must_use]
    pub const fn new(messages: Arc<M>, users: Arc<U>, clock: Arc<dyn Clock>) -> Self {
        Self {
            messages,
            users,
            clock,
        }
    }
}

impl<M, U> ChatService<M, U>
where
    M: ChatRepository,
    U: UserRepository,
{
    /// Send `text` to the chat of `event` as the signed-in user.
    pub async fn send(
        &self,
        session: Option<&Session>,
        event: &EventId,
        text: &str,
    ) -> Result<ChatMessage, Error> {
        let sender = require_session(session)?.user_id();
        let body = MessageText::new(text).map_err(|err| Error::invalid_request(err.to_string()))?;
        let profile = self.users.find_by_id(sender).await.map_err(map_user_error)?;
        if profile.is_none() {
            debug!(%sender, "sender profile missing; using fallback name");
        }

        let message = ChatMessage::compose(
            event.clone(),
            sender.clone(),
            profile.as_ref(),
            body,
            self.clock.utc(),
        );
        self.messages
            .append(&message)
            .await
            .map_err(map_chat_error)?;
        info!(%event, %sender, message = %message.id, "chat message sent");
        Ok(message)
    }

    /// Messages for `event`, oldest first.
    pub async fn history(&self, event: &EventId) -> Result<Vec<ChatMessage>, Error> {
        let mut messages = self
            .messages
            .list_for_event(event)
            .await
            .map_err(map_chat_error)?;
        order_messages(&mut messages);
        Ok(messages)
    }
}
