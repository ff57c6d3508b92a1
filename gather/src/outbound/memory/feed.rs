//! In-process change feed.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tracing::debug;

use crate::domain::ports::{FeedRegistration, FeedTopic, SubscriptionId};

/// Fan-out of topic notifications to registered listeners.
#[derive(Debug, Default)]
pub(super) struct FeedHub {
    next_id: AtomicU64,
    listeners: Mutex<HashMap<SubscriptionId, Listener>>,
}

#[derive(Debug)]
struct Listener {
    topic: FeedTopic,
    sender: mpsc::UnboundedSender<FeedTopic>,
}

impl FeedHub {
    fn listeners(&self) -> MutexGuard<'_, HashMap<SubscriptionId, Listener>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(super) fn register(&self, topic: &FeedTopic) -> FeedRegistration {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let (sender, changes) = mpsc::unbounded_channel();
        self.listeners().insert(
            id,
            Listener {
                topic: topic.clone(),
                sender,
            },
        );
        debug!(%id, %topic, "feed listener registered");
        FeedRegistration { id, changes }
    }

    pub(super) fn release(&self, id: SubscriptionId) -> bool {
        let removed = self.listeners().remove(&id).is_some();
        if removed {
            debug!(%id, "feed listener released");
        }
        removed
    }

    /// Deliver `topic` to every matching listener, pruning closed ones.
    pub(super) fn notify(&self, topic: &FeedTopic) {
        self.listeners().retain(|_, listener| {
            listener.topic != *topic || listener.sender.send(topic.clone()).is_ok()
        });
    }

    pub(super) fn active(&self) -> usize {
        self.listeners().len()
    }
}
