//! Port abstraction for live change notifications.
//!
//! A feed subscription delivers the topic each time its underlying data
//! changes; readers then re-query the relevant repository. Every successful
//! `subscribe` must be paired with exactly one `unsubscribe`.

use std::fmt;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::EventId;

use super::define_port_error;

define_port_error! {
    /// Errors raised by live feed adapters.
    pub enum LiveFeedError {
        /// Backend could not be reached.
        Connection { message: String } => "live feed connection failed: {message}",
        /// Listener registration was rejected.
        Rejected { message: String } => "live feed subscription rejected: {message}",
    }
}

/// Data a listener can watch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FeedTopic {
    /// The full event list.
    Events,
    /// One event's chat messages.
    Chat(EventId),
    /// One event's contributions.
    Contributions(EventId),
}

impl fmt::Display for FeedTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Events => f.write_str("events"),
            Self::Chat(event) => write!(f, "events/{event}/messages"),
            Self::Contributions(event) => write!(f, "events/{event}/contributions"),
        }
    }
}

/// Adapter-assigned listener id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// A registered listener and its change stream.
#[derive(Debug)]
pub struct FeedRegistration {
    /// Listener id to pass to [`LiveFeed::unsubscribe`].
    pub id: SubscriptionId,
    /// Receives the topic on every change.
    pub changes: mpsc::UnboundedReceiver<FeedTopic>,
}

/// Push transport for live data.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LiveFeed: Send + Sync {
    /// Register a listener for `topic`.
    async fn subscribe(&self, topic: &FeedTopic) -> Result<FeedRegistration, LiveFeedError>;

    /// Detach a listener. Synchronous so handles can release it on drop.
    fn unsubscribe(&self, id: SubscriptionId);
}
