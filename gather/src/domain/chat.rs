//! Per-event group chat messages.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use super::{EventId, User, UserId};

/// Name used when a sender has neither handle nor display name.
pub const FALLBACK_SENDER_NAME: &str = "User";

/// Validation errors for chat input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatValidationError {
    /// Message text was blank after trimming.
    EmptyText,
}

impl fmt::Display for ChatValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyText => write!(f, "message must not be empty"),
        }
    }
}

impl std::error::Error for ChatValidationError {}

/// Trimmed, non-empty message body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MessageText(String);

impl MessageText {
    /// Trim and validate.
    pub fn new(text: impl AsRef<str>) -> Result<Self, ChatValidationError> {
        let trimmed = text.as_ref().trim();
        if trimmed.is_empty() {
            return Err(ChatValidationError::EmptyText);
        }
        Ok(Self(trimmed.to_owned()))
    }
}

impl AsRef<str> for MessageText {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl From<MessageText> for String {
    fn from(value: MessageText) -> Self {
        value.0
    }
}

impl TryFrom<String> for MessageText {
    type Error = ChatValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Name shown next to a message: handle, then display name, then
/// [`FALLBACK_SENDER_NAME`].
#[must_use]
pub fn sender_name(handle: Option<&str>, display_name: Option<&str>) -> String {
    [handle, display_name]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|name| !name.is_empty())
        .unwrap_or(FALLBACK_SENDER_NAME)
        .to_owned()
}

/// Chat message with a snapshot of the sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Message id.
    pub id: String,
    /// Owning event.
    pub event_id: EventId,
    /// Author.
    pub sender_id: UserId,
    /// Author name at send time.
    pub sender_name: String,
    /// Author avatar at send time.
    #[serde(default)]
    pub sender_photo: Option<Url>,
    /// Body.
    pub text: MessageText,
    /// Server timestamp.
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    /// Compose a message, snapshotting the sender's name and photo from
    /// `profile` when it could be read.
    #[must_use]
    pub fn compose(
        event_id: EventId,
        sender_id: UserId,
        profile: Option<&User>,
        text: MessageText,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().simple().to_string(),
            event_id,
            sender_id,
            sender_name: sender_name(
                profile.map(|user| user.handle().as_ref()),
                profile.map(|user| user.display_name().as_ref()),
            ),
            sender_photo: profile.and_then(User::photo_url).cloned(),
            text,
            timestamp,
        }
    }
}

/// Sort ascending by timestamp; ties keep their stored order.
pub fn order_messages(messages: &mut [ChatMessage]) {
    messages.sort_by_key(|message| message.timestamp);
}

/// Id of the newest message sent by `sender`.
#[must_use]
pub fn latest_from<'a>(messages: &'a [ChatMessage], sender: &UserId) -> Option<&'a str> {
    messages
        .iter()
        .filter(|message| &message.sender_id == sender)
        .max_by_key(|message| message.timestamp)
        .map(|message| message.id.as_str())
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn sender() -> User {
        User::try_from_strings("uid-ada", "Ada Lovelace").expect("valid user")
    }

    fn message(id: &str, sender: &str, minutes: i64) -> ChatMessage {
        let base = Utc
            .with_ymd_and_hms(2026, 3, 1, 10, 0, 0)
            .single()
            .expect("valid date");
        ChatMessage {
            id: id.to_owned(),
            event_id: EventId::new("evt-1").expect("valid id"),
            sender_id: UserId::new(sender).expect("valid id"),
            sender_name: sender.to_owned(),
            sender_photo: None,
            text: MessageText::new("hi").expect("valid text"),
            timestamp: base + Duration::minutes(minutes),
        }
    }

    #[rstest]
    #[case("  hello  ", Ok("hello"))]
    #[case("   ", Err(ChatValidationError::EmptyText))]
    #[case("", Err(ChatValidationError::EmptyText))]
    fn message_text_is_trimmed(
        #[case] raw: &str,
        #[case] expected: Result<&str, ChatValidationError>,
    ) {
        let parsed = MessageText::new(raw).map(String::from);
        assert_eq!(parsed, expected.map(str::to_owned));
    }

    #[rstest]
    #[case(Some("ada"), Some("Ada"), "ada")]
    #[case(None, Some("Ada"), "Ada")]
    #[case(Some("  "), Some("Ada"), "Ada")]
    #[case(None, None, FALLBACK_SENDER_NAME)]
    fn sender_name_falls_back(
        #[case] handle: Option<&str>,
        #[case] display: Option<&str>,
        #[case] expected: &str,
    ) {
        assert_eq!(sender_name(handle, display), expected);
    }

    #[rstest]
    fn compose_snapshots_handle(sender: User) {
        let message = ChatMessage::compose(
            EventId::new("evt-1").expect("valid id"),
            sender.id().clone(),
            Some(&sender),
            MessageText::new("hello").expect("valid text"),
            Utc::now(),
        );
        assert_eq!(message.sender_name, "adalovelace");
        assert_eq!(&message.sender_id, sender.id());
    }

    #[rstest]
    fn compose_without_profile_uses_fallback_name() {
        let message = ChatMessage::compose(
            EventId::new("evt-1").expect("valid id"),
            UserId::new("uid-ghost").expect("valid id"),
            None,
            MessageText::new("boo").expect("valid text"),
            Utc::now(),
        );
        assert_eq!(message.sender_name, FALLBACK_SENDER_NAME);
        assert!(message.sender_photo.is_none());
    }

    #[rstest]
    fn messages_order_ascending() {
        let mut messages = vec![message("b", "uid-a", 5), message("a", "uid-a", 1)];
        order_messages(&mut messages);
        let ids: Vec<_> = messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[rstest]
    fn latest_from_picks_newest_by_sender() {
        let messages = vec![
            message("m1", "uid-a", 1),
            message("m2", "uid-b", 9),
            message("m3", "uid-a", 4),
        ];
        let sender = UserId::new("uid-a").expect("valid id");
        assert_eq!(latest_from(&messages, &sender), Some("m3"));
        let stranger = UserId::new("uid-z").expect("valid id");
        assert_eq!(latest_from(&messages, &stranger), None);
    }
}
