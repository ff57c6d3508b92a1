//! Event creation wizard.
//!
//! A draft walks six stages in order. Each stage validates only its own
//! field; going back keeps everything already entered. Only the publish
//! service moves a draft out of [`DraftStage::Review`].

use std::fmt;

use chrono::{DateTime, Utc};
use tracing::debug;

use super::{Coordinate, EventId, EventValidationError, IdempotencyKey, Title};

/// Wizard stages in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DraftStage {
    /// Stage 1.
    Title,
    /// Stage 2.
    Description,
    /// Stage 3.
    Location,
    /// Stage 4.
    DateTime,
    /// Stage 5.
    Photo,
    /// Stage 6.
    Review,
}

impl DraftStage {
    /// One-based position in the wizard.
    #[must_use]
    pub const fn number(self) -> u8 {
        match self {
            Self::Title => 1,
            Self::Description => 2,
            Self::Location => 3,
            Self::DateTime => 4,
            Self::Photo => 5,
            Self::Review => 6,
        }
    }

    /// Following stage, `None` after Review.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Title => Some(Self::Description),
            Self::Description => Some(Self::Location),
            Self::Location => Some(Self::DateTime),
            Self::DateTime => Some(Self::Photo),
            Self::Photo => Some(Self::Review),
            Self::Review => None,
        }
    }

    /// Preceding stage, `None` before Title.
    #[must_use]
    pub const fn previous(self) -> Option<Self> {
        match self {
            Self::Title => None,
            Self::Description => Some(Self::Title),
            Self::Location => Some(Self::Description),
            Self::DateTime => Some(Self::Location),
            Self::Photo => Some(Self::DateTime),
            Self::Review => Some(Self::Photo),
        }
    }
}

impl fmt::Display for DraftStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Title => "title",
            Self::Description => "description",
            Self::Location => "location",
            Self::DateTime => "date and time",
            Self::Photo => "photo",
            Self::Review => "review",
        };
        f.write_str(name)
    }
}

/// Where a draft currently is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftStatus {
    /// Collecting fields at the given stage.
    Editing(DraftStage),
    /// Published as the given event.
    Published(EventId),
    /// Discarded by the user.
    Abandoned,
}

/// Local image picked in the photo stage, uploaded on publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoUpload {
    /// Original file name.
    pub file_name: String,
    /// MIME type such as `image/jpeg`.
    pub content_type: String,
    /// Raw bytes.
    pub bytes: Vec<u8>,
}

/// Input for the current stage.
#[derive(Debug, Clone, PartialEq)]
pub enum StageInput {
    /// Event title.
    Title(String),
    /// Event description.
    Description(String),
    /// Place name and pin.
    Location {
        /// Human-readable place name.
        text: String,
        /// Pin position.
        coordinates: Coordinate,
    },
    /// Scheduled start.
    DateTime(DateTime<Utc>),
    /// Chosen image.
    Photo(PhotoUpload),
}

impl StageInput {
    const fn stage(&self) -> DraftStage {
        match self {
            Self::Title(_) => DraftStage::Title,
            Self::Description(_) => DraftStage::Description,
            Self::Location { .. } => DraftStage::Location,
            Self::DateTime(_) => DraftStage::DateTime,
            Self::Photo(_) => DraftStage::Photo,
        }
    }
}

/// Errors raised by draft transitions.
#[derive(Debug, Clone, PartialEq)]
pub enum DraftError {
    /// Input belonged to a different stage.
    WrongStage {
        /// Stage the draft is at.
        current: DraftStage,
        /// Stage the input was for.
        received: DraftStage,
    },
    /// Field failed validation.
    Invalid(EventValidationError),
    /// Photo had no bytes or no name.
    EmptyPhoto,
    /// Review can only be left by publishing.
    PastReview,
    /// The draft is published or abandoned.
    Closed,
    /// Publishing needs the named field.
    Incomplete {
        /// First stage whose field is missing.
        missing: DraftStage,
    },
}

impl fmt::Display for DraftError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WrongStage { current, received } => {
                write!(f, "expected {current} input but got {received}")
            }
            Self::Invalid(err) => write!(f, "{err}"),
            Self::EmptyPhoto => write!(f, "please select a photo"),
            Self::PastReview => write!(f, "review is the last step; publish to finish"),
            Self::Closed => write!(f, "draft is no longer editable"),
            Self::Incomplete { missing } => write!(f, "draft is missing its {missing}"),
        }
    }
}

impl std::error::Error for DraftError {}

impl From<EventValidationError> for DraftError {
    fn from(value: EventValidationError) -> Self {
        Self::Invalid(value)
    }
}

/// Fields of a draft that is ready to publish.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishRequest {
    /// Draft idempotency key.
    pub publish_token: IdempotencyKey,
    /// Event title.
    pub title: Title,
    /// Event description.
    pub description: String,
    /// Place name.
    pub location_text: String,
    /// Pin.
    pub coordinates: Coordinate,
    /// Scheduled start.
    pub date: DateTime<Utc>,
    /// Image to upload.
    pub photo: PhotoUpload,
}

/// In-progress event.
#[derive(Debug, Clone, PartialEq)]
pub struct EventDraft {
    key: IdempotencyKey,
    status: DraftStatus,
    title: Option<Title>,
    description: Option<String>,
    location: Option<(String, Coordinate)>,
    date: Option<DateTime<Utc>>,
    photo: Option<PhotoUpload>,
}

impl EventDraft {
    /// Start a draft at stage 1 with a fresh idempotency key.
    #[must_use]
    pub fn start() -> Self {
        Self::with_key(IdempotencyKey::random())
    }

    /// Start a draft with a known key.
    #[must_use]
    pub fn with_key(key: IdempotencyKey) -> Self {
        Self {
            key,
            status: DraftStatus::Editing(DraftStage::Title),
            title: None,
            description: None,
            location: None,
            date: None,
            photo: None,
        }
    }

    /// Idempotency key minted at start.
    #[must_use]
    pub const fn key(&self) -> &IdempotencyKey {
        &self.key
    }

    /// Current status.
    #[must_use]
    pub const fn status(&self) -> &DraftStatus {
        &self.status
    }

    /// Current stage while editing.
    #[must_use]
    pub const fn stage(&self) -> Option<DraftStage> {
        match self.status {
            DraftStatus::Editing(stage) => Some(stage),
            _ => None,
        }
    }

    /// Title entered so far.
    #[must_use]
    pub const fn title(&self) -> Option<&Title> {
        self.title.as_ref()
    }

    /// Description entered so far.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Location entered so far.
    #[must_use]
    pub fn location(&self) -> Option<(&str, Coordinate)> {
        self.location
            .as_ref()
            .map(|(text, coordinates)| (text.as_str(), *coordinates))
    }

    /// Date entered so far.
    #[must_use]
    pub const fn date(&self) -> Option<DateTime<Utc>> {
        self.date
    }

    /// Photo chosen so far.
    #[must_use]
    pub const fn photo(&self) -> Option<&PhotoUpload> {
        self.photo.as_ref()
    }

    /// Validate `input` for the current stage, store it, and move on.
    pub fn advance(&mut self, input: StageInput) -> Result<DraftStage, DraftError> {
        let current = self.stage().ok_or(DraftError::Closed)?;
        if current == DraftStage::Review {
            return Err(DraftError::PastReview);
        }
        let received = input.stage();
        if received != current {
            return Err(DraftError::WrongStage { current, received });
        }

        match input {
            StageInput::Title(raw) => self.title = Some(Title::new(raw)?),
            StageInput::Description(raw) => {
                self.description = Some(non_blank(raw, EventValidationError::EmptyDescription)?);
            }
            StageInput::Location { text, coordinates } => {
                let text = non_blank(text, EventValidationError::EmptyLocation)?;
                self.location = Some((text, coordinates));
            }
            StageInput::DateTime(date) => self.date = Some(date),
            StageInput::Photo(photo) => {
                if photo.bytes.is_empty() || photo.file_name.trim().is_empty() {
                    return Err(DraftError::EmptyPhoto);
                }
                self.photo = Some(photo);
            }
        }

        let next = current.next().ok_or(DraftError::PastReview)?;
        self.status = DraftStatus::Editing(next);
        debug!(key = %self.key, stage = next.number(), "draft advanced");
        Ok(next)
    }

    /// Step back one stage, keeping every field. Backing out of the first
    /// stage abandons the draft.
    pub fn back(&mut self) -> &DraftStatus {
        if let DraftStatus::Editing(stage) = self.status {
            self.status = stage
                .previous()
                .map_or(DraftStatus::Abandoned, DraftStatus::Editing);
        }
        &self.status
    }

    /// Discard the draft from any stage.
    pub fn abandon(&mut self) {
        if matches!(self.status, DraftStatus::Editing(_)) {
            self.status = DraftStatus::Abandoned;
        }
    }

    /// Collect the fields for publishing. The draft must be at Review with
    /// every field present.
    pub fn ready_for_publish(&self) -> Result<PublishRequest, DraftError> {
        match self.stage() {
            Some(DraftStage::Review) => {}
            Some(current) => {
                return Err(DraftError::Incomplete { missing: current });
            }
            None => return Err(DraftError::Closed),
        }
        let missing = |stage| DraftError::Incomplete { missing: stage };
        let title = self.title.clone().ok_or_else(|| missing(DraftStage::Title))?;
        let description = self
            .description
            .clone()
            .ok_or_else(|| missing(DraftStage::Description))?;
        let (location_text, coordinates) = self
            .location
            .clone()
            .ok_or_else(|| missing(DraftStage::Location))?;
        let date = self.date.ok_or_else(|| missing(DraftStage::DateTime))?;
        let photo = self.photo.clone().ok_or_else(|| missing(DraftStage::Photo))?;
        Ok(PublishRequest {
            publish_token: self.key.clone(),
            title,
            description,
            location_text,
            coordinates,
            date,
            photo,
        })
    }

    /// Record the terminal published state.
    pub(crate) fn mark_published(&mut self, id: EventId) {
        self.status = DraftStatus::Published(id);
    }
}

fn non_blank(raw: String, error: EventValidationError) -> Result<String, DraftError> {
    if raw.trim().is_empty() {
        return Err(DraftError::Invalid(error));
    }
    Ok(raw)
}

#[cfg(test)]
#[path = "draft_tests.rs"]
mod tests;
