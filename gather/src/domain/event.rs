//! Event records and their validated fields.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use super::{Coordinate, Handle, IdempotencyKey, User, UserId};

/// Maximum title length accepted by the creation wizard.
pub const TITLE_MAX: usize = 32;

/// Validation errors raised by event field constructors.
#[derive(Debug, Clone, PartialEq)]
pub enum EventValidationError {
    /// Event id was blank.
    EmptyId,
    /// Title was blank.
    EmptyTitle,
    /// Title exceeded [`TITLE_MAX`] characters.
    TitleTooLong {
        /// Maximum permitted characters.
        max: usize,
    },
    /// Description was blank.
    EmptyDescription,
    /// Location text was blank.
    EmptyLocation,
    /// Price was negative or non-finite.
    InvalidPrice {
        /// Rejected value.
        value: f64,
    },
    /// Image or avatar reference was not an absolute URL.
    InvalidUrl,
    /// A nested identifier or coordinate failed validation.
    InvalidField {
        /// Description of the failure.
        message: String,
    },
}

impl fmt::Display for EventValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyId => write!(f, "event id must not be empty"),
            Self::EmptyTitle => write!(f, "event title must not be empty"),
            Self::TitleTooLong { max } => {
                write!(f, "event title must be at most {max} characters")
            }
            Self::EmptyDescription => write!(f, "event description must not be empty"),
            Self::EmptyLocation => write!(f, "event location must not be empty"),
            Self::InvalidPrice { value } => {
                write!(f, "event price must be finite and non-negative (got {value})")
            }
            Self::InvalidUrl => write!(f, "event image must be an absolute URL"),
            Self::InvalidField { message } => write!(f, "invalid event field: {message}"),
        }
    }
}

impl std::error::Error for EventValidationError {}

/// Event document identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EventId(String);

impl EventId {
    /// Validate and construct an [`EventId`].
    pub fn new(id: impl Into<String>) -> Result<Self, EventValidationError> {
        let raw = id.into();
        if raw.trim().is_empty() {
            return Err(EventValidationError::EmptyId);
        }
        Ok(Self(raw))
    }

    /// Generate a new random identifier.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }
}

impl AsRef<str> for EventId {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<EventId> for String {
    fn from(value: EventId) -> Self {
        value.0
    }
}

impl TryFrom<String> for EventId {
    type Error = EventValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Short event title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Title(String);

impl Title {
    /// Validate a title: non-blank and at most [`TITLE_MAX`] characters.
    pub fn new(title: impl Into<String>) -> Result<Self, EventValidationError> {
        let text = title.into();
        if text.trim().is_empty() {
            return Err(EventValidationError::EmptyTitle);
        }
        if text.chars().count() > TITLE_MAX {
            return Err(EventValidationError::TitleTooLong { max: TITLE_MAX });
        }
        Ok(Self(text))
    }
}

impl AsRef<str> for Title {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl From<Title> for String {
    fn from(value: Title) -> Self {
        value.0
    }
}

impl TryFrom<String> for Title {
    type Error = EventValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Non-negative ticket price.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Price(f64);

impl Price {
    /// Validate a price.
    pub fn new(value: f64) -> Result<Self, EventValidationError> {
        if !value.is_finite() || value < 0.0 {
            return Err(EventValidationError::InvalidPrice { value });
        }
        Ok(Self(value))
    }

    /// Free entry.
    #[must_use]
    pub const fn free() -> Self {
        Self(0.0)
    }

    /// Amount as a float.
    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }
}

impl From<Price> for f64 {
    fn from(value: Price) -> Self {
        value.0
    }
}

impl TryFrom<f64> for Price {
    type Error = EventValidationError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Denormalised copy of the host's profile taken at publish time.
///
/// The snapshot is never refreshed; readers that need current values
/// re-read the profile and fall back to the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatorSnapshot {
    /// Host account id.
    pub uid: UserId,
    /// Host handle when the event was published.
    #[serde(default)]
    pub handle: Option<Handle>,
    /// Host avatar when the event was published.
    #[serde(rename = "photoURL", default)]
    pub photo_url: Option<Url>,
}

impl CreatorSnapshot {
    /// Snapshot the current profile.
    #[must_use]
    pub fn of(user: &User) -> Self {
        Self {
            uid: user.id().clone(),
            handle: Some(user.handle().clone()),
            photo_url: user.photo_url().cloned(),
        }
    }
}

/// Fields collected by the creation wizard and stored on publish.
#[derive(Debug, Clone, PartialEq)]
pub struct EventDetails {
    /// Event title.
    pub title: Title,
    /// Free-form description.
    pub description: String,
    /// Human-readable place name.
    pub location_text: String,
    /// Optional coordinate; legacy events may lack one.
    pub coordinates: Option<Coordinate>,
    /// Scheduled start.
    pub date: DateTime<Utc>,
    /// Uploaded image reference.
    pub image: Option<Url>,
    /// Ticket price.
    pub price: Price,
}

/// Event record.
///
/// ## Invariants
/// - `participants` never contains duplicates.
/// - `description` and `location_text` are non-blank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "EventDto", into = "EventDto")]
pub struct Event {
    id: EventId,
    details: EventDetails,
    created_by: CreatorSnapshot,
    participants: BTreeSet<UserId>,
    publish_token: Option<IdempotencyKey>,
}

impl Event {
    /// Build a freshly published event whose only participant is the host.
    pub fn new(
        id: EventId,
        details: EventDetails,
        created_by: CreatorSnapshot,
        publish_token: Option<IdempotencyKey>,
    ) -> Result<Self, EventValidationError> {
        validate_details(&details)?;
        let participants = BTreeSet::from([created_by.uid.clone()]);
        Ok(Self {
            id,
            details,
            created_by,
            participants,
            publish_token,
        })
    }

    /// Replace the participant set, deduplicating the input.
    #[must_use]
    pub fn with_participants(mut self, participants: impl IntoIterator<Item = UserId>) -> Self {
        self.participants = participants.into_iter().collect();
        self
    }

    /// Event identifier.
    #[must_use]
    pub const fn id(&self) -> &EventId {
        &self.id
    }

    /// Stored fields.
    #[must_use]
    pub const fn details(&self) -> &EventDetails {
        &self.details
    }

    /// Event title.
    #[must_use]
    pub const fn title(&self) -> &Title {
        &self.details.title
    }

    /// Coordinate, if the event has one.
    #[must_use]
    pub const fn coordinates(&self) -> Option<Coordinate> {
        self.details.coordinates
    }

    /// Scheduled start.
    #[must_use]
    pub const fn date(&self) -> DateTime<Utc> {
        self.details.date
    }

    /// Host snapshot.
    #[must_use]
    pub const fn created_by(&self) -> &CreatorSnapshot {
        &self.created_by
    }

    /// Users who joined.
    #[must_use]
    pub const fn participants(&self) -> &BTreeSet<UserId> {
        &self.participants
    }

    /// Idempotency key of the draft that produced this event.
    #[must_use]
    pub const fn publish_token(&self) -> Option<&IdempotencyKey> {
        self.publish_token.as_ref()
    }

    /// Whether `user` has joined.
    #[must_use]
    pub fn has_participant(&self, user: &UserId) -> bool {
        self.participants.contains(user)
    }

    /// Overlay the host's current profile on the stored snapshot. Profiles
    /// for anyone other than the host are ignored.
    pub fn refresh_creator(&mut self, host: &User) {
        if host.id() == &self.created_by.uid {
            self.created_by = CreatorSnapshot::of(host);
        }
    }

    /// Set-union of `user` into the participants. Returns `false` when the
    /// user had already joined.
    pub fn add_participant(&mut self, user: UserId) -> bool {
        self.participants.insert(user)
    }
}

fn validate_details(details: &EventDetails) -> Result<(), EventValidationError> {
    if details.description.trim().is_empty() {
        return Err(EventValidationError::EmptyDescription);
    }
    if details.location_text.trim().is_empty() {
        return Err(EventValidationError::EmptyLocation);
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventDto {
    id: String,
    title: String,
    desc: String,
    location_text: String,
    #[serde(default)]
    location_coords: Option<Coordinate>,
    date: DateTime<Utc>,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    price: f64,
    created_by: CreatorSnapshot,
    #[serde(default)]
    participants: Vec<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    publish_token: Option<IdempotencyKey>,
}

impl From<Event> for EventDto {
    fn from(value: Event) -> Self {
        let Event {
            id,
            details,
            created_by,
            participants,
            publish_token,
        } = value;
        Self {
            id: id.into(),
            title: details.title.into(),
            desc: details.description,
            location_text: details.location_text,
            location_coords: details.coordinates,
            date: details.date,
            image: details.image.map(String::from),
            price: details.price.into(),
            created_by,
            participants: participants.into_iter().collect(),
            publish_token,
        }
    }
}

impl TryFrom<EventDto> for Event {
    type Error = EventValidationError;

    fn try_from(value: EventDto) -> Result<Self, Self::Error> {
        let image = match value.image.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(Url::parse(raw).map_err(|_| EventValidationError::InvalidUrl)?),
        };
        let details = EventDetails {
            title: Title::new(value.title)?,
            description: value.desc,
            location_text: value.location_text,
            coordinates: value.location_coords,
            date: value.date,
            image,
            price: Price::new(value.price)?,
        };
        validate_details(&details)?;
        Ok(Self {
            id: EventId::new(value.id)?,
            details,
            created_by: value.created_by,
            participants: value.participants.into_iter().collect(),
            publish_token: value.publish_token,
        })
    }
}
