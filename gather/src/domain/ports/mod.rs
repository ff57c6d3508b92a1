//! Driven ports for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod blob_store;
mod chat_repository;
mod contribution_repository;
mod event_repository;
mod live_feed;
mod location_provider;
mod user_repository;

#[cfg(test)]
pub use blob_store::MockBlobStore;
pub use blob_store::{BlobStore, BlobStoreError, StoredBlob};
#[cfg(test)]
pub use chat_repository::MockChatRepository;
pub use chat_repository::{ChatRepository, ChatRepositoryError};
#[cfg(test)]
pub use contribution_repository::MockContributionRepository;
pub use contribution_repository::{ContributionRepository, ContributionRepositoryError};
#[cfg(test)]
pub use event_repository::MockEventRepository;
pub use event_repository::{EventRepository, EventRepositoryError};
#[cfg(test)]
pub use live_feed::MockLiveFeed;
pub use live_feed::{FeedRegistration, FeedTopic, LiveFeed, LiveFeedError, SubscriptionId};
#[cfg(test)]
pub use location_provider::MockLocationProvider;
pub use location_provider::{FixedLocation, LocationProvider, LocationProviderError};
#[cfg(test)]
pub use user_repository::MockUserRepository;
pub use user_repository::{UserRepository, UserRepositoryError};
