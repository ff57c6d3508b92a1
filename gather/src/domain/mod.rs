//! Domain primitives, aggregates and services.
//!
//! Purpose: Model the Gather social graph, events, contributions and chat as
//! strongly typed values, and drive them through the outbound ports in
//! [`ports`]. Services hold their adapters behind `Arc` and never reach a
//! backend directly.
//!
//! Public surface:
//! - Error (alias to `error::DomainError`): caller-facing error payload.
//! - ErrorCode (alias to `error::ErrorCode`): stable error identifier.
//! - User, Event, Contribution, ChatMessage: stored records.
//! - EventDraft: six-stage event creation flow ending in review.
//! - NearbyEventsService, SocialService, PublishService, ProfileService,
//!   ContributionService, ChatService: use cases over the ports.
//! - SubscriptionScope: screen-lifetime ownership of live listeners.

pub mod chat;
pub mod contribution;
pub mod draft;
pub mod error;
pub mod event;
pub mod geo;
pub mod idempotency;
pub mod membership;
pub mod ports;
pub mod ranking;
pub mod session;
pub mod subscription;
pub mod user;

mod chat_service;
mod contribution_service;
mod discovery_service;
mod profile_service;
mod publish_service;
mod service_support;
mod social_service;

#[cfg(test)]
mod test_support;

pub use self::chat::{
    ChatMessage, ChatValidationError, FALLBACK_SENDER_NAME, MessageText, latest_from,
    order_messages, sender_name,
};
pub use self::chat_service::ChatService;
pub use self::contribution::{
    Amount, Contribution, ContributionSummary, ContributionValidationError, format_amount,
};
pub use self::contribution_service::{ContributionLedger, ContributionService};
pub use self::discovery_service::NearbyEventsService;
pub use self::draft::{
    DraftError, DraftStage, DraftStatus, EventDraft, PhotoUpload, PublishRequest, StageInput,
};
pub use self::error::{DomainError, DomainError as Error, ErrorCode, ErrorValidationError};
pub use self::event::{
    CreatorSnapshot, Event, EventDetails, EventId, EventValidationError, Price, TITLE_MAX, Title,
};
pub use self::geo::{
    Coordinate, DistanceFormula, EARTH_RADIUS_KM, GeoValidationError, format_distance,
};
pub use self::idempotency::{IdempotencyKey, IdempotencyKeyValidationError};
pub use self::membership::{
    OptimisticToggle, RelationWrite, SetOp, ToggleError, follow_writes, is_member,
    repair_follow_edge,
};
pub use self::profile_service::{ProfileService, ProfileSetup};
pub use self::publish_service::{PublishOutcome, PublishService};
pub use self::ranking::{
    MissingCoordinatePolicy, NearbyEvents, RankedEvent, RankingOptions, mappable_events,
    rank_events, within_radius,
};
pub use self::session::{Session, require_session};
pub use self::social_service::{
    DEFAULT_RECENT_JOINED_LIMIT, DEFAULT_SEARCH_LIMIT, JoinedEvent, ProfileView, SocialLimits,
    SocialService,
};
pub use self::subscription::{Cancelled, Subscription, SubscriptionScope};
pub use self::user::{
    DISPLAY_NAME_MAX, DisplayName, Handle, RelationField, User, UserId, UserValidationError,
    parse_photo_url,
};

/// Convenient result alias for domain operations.
///
/// # Examples
/// ```
/// use gather::domain::{DomainResult, Error};
///
/// fn guard() -> DomainResult<()> {
///     Err(Error::unauthorized("sign in first"))
/// }
///
/// assert!(guard().is_err());
/// ```
pub type DomainResult<T> = Result<T, Error>;
