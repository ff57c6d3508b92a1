//! Screen-scoped ownership of live feed listeners.
//!
//! A [`Subscription`] has a single owner and releases its listener exactly
//! once, either through [`Subscription::close`] or on drop. A
//! [`SubscriptionScope`] ties a set of subscriptions and any in-flight
//! requests to one screen; tearing it down cancels the requests and closes
//! every subscription.

use std::future::Future;
use std::sync::Arc;

use futures_util::future::select_all;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::Error;
use super::ports::{FeedTopic, LiveFeed, LiveFeedError, SubscriptionId};

/// Returned by [`SubscriptionScope::run`] when the scope was torn down
/// before the request finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

impl std::fmt::Display for Cancelled {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("screen closed before the request finished")
    }
}

impl std::error::Error for Cancelled {}

/// Owned live feed listener.
pub struct Subscription {
    id: SubscriptionId,
    topic: FeedTopic,
    feed: Arc<dyn LiveFeed>,
    changes: mpsc::UnboundedReceiver<FeedTopic>,
    open: bool,
}

impl Subscription {
    /// Register a listener for `topic`.
    pub async fn open(feed: Arc<dyn LiveFeed>, topic: FeedTopic) -> Result<Self, Error> {
        let registration = feed.subscribe(&topic).await.map_err(map_feed_error)?;
        debug!(id = %registration.id, %topic, "subscribed");
        Ok(Self {
            id: registration.id,
            topic,
            feed,
            changes: registration.changes,
            open: true,
        })
    }

    /// Listener id.
    #[must_use]
    pub const fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Watched topic.
    #[must_use]
    pub const fn topic(&self) -> &FeedTopic {
        &self.topic
    }

    /// Whether the listener is still attached.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.open
    }

    /// Wait for the next change. Returns `None` once closed or when the
    /// feed ends.
    pub async fn changed(&mut self) -> Option<FeedTopic> {
        if !self.open {
            return None;
        }
        self.changes.recv().await
    }

    /// Detach the listener. Later calls do nothing.
    pub fn close(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        self.changes.close();
        self.feed.unsubscribe(self.id);
        debug!(id = %self.id, topic = %self.topic, "unsubscribed");
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("topic", &self.topic)
            .field("open", &self.open)
            .finish_non_exhaustive()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.close();
    }
}

/// Subscriptions and in-flight work owned by one screen.
#[derive(Debug, Default)]
pub struct SubscriptionScope {
    token: CancellationToken,
    subscriptions: Vec<Subscription>,
}

impl SubscriptionScope {
    /// Fresh scope.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Token cancelled on teardown, for work spawned outside the scope.
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.token.child_token()
    }

    /// Handle that tears the scope down from outside, for example when the
    /// screen is dismissed while a request is pending in [`Self::run`].
    ///
    /// Cancelling it aborts in-flight [`Self::run`] calls at once; owned
    /// subscriptions are released on the next call into the scope or when
    /// it is dropped.
    #[must_use]
    pub fn teardown_handle(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Whether the scope has been torn down.
    #[must_use]
    pub fn is_torn_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Open a subscription owned by this scope.
    pub async fn subscribe(
        &mut self,
        feed: Arc<dyn LiveFeed>,
        topic: FeedTopic,
    ) -> Result<(), Error> {
        self.release_if_cancelled();
        if self.is_torn_down() {
            return Err(Error::conflict("screen already closed"));
        }
        let subscription = Subscription::open(feed, topic).await?;
        self.subscriptions.push(subscription);
        Ok(())
    }

    /// Number of attached subscriptions.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.subscriptions.len()
    }

    /// Whether no subscriptions are attached.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Wait for a change on any owned subscription.
    ///
    /// A subscription whose feed ends is released and the wait continues on
    /// the rest. Returns `None` only after teardown.
    pub async fn next_change(&mut self) -> Option<FeedTopic> {
        loop {
            self.release_if_cancelled();
            let token = self.token.clone();
            if self.subscriptions.is_empty() {
                token.cancelled().await;
                self.release_if_cancelled();
                return None;
            }
            let waits = self
                .subscriptions
                .iter_mut()
                .map(|subscription| Box::pin(subscription.changed()));
            let ended = tokio::select! {
                biased;
                () = token.cancelled() => None,
                (change, index, _) = select_all(waits) => match change {
                    Some(topic) => return Some(topic),
                    None => Some(index),
                },
            };
            if let Some(index) = ended
                && index < self.subscriptions.len()
            {
                let mut finished = self.subscriptions.remove(index);
                debug!(id = %finished.id(), "feed ended");
                finished.close();
            }
        }
    }

    /// Run `request` unless the scope is torn down first.
    ///
    /// # Examples
    ///
    /// ```
    /// use gather::domain::{Cancelled, SubscriptionScope};
    ///
    /// # let runtime = tokio::runtime::Builder::new_current_thread()
    /// #     .build()
    /// #     .expect("runtime");
    /// # runtime.block_on(async {
    /// let mut scope = SubscriptionScope::new();
    /// assert_eq!(scope.run(async { 7 }).await, Ok(7));
    /// scope.teardown();
    /// assert_eq!(scope.run(async { 7 }).await, Err(Cancelled));
    /// # });
    /// ```
    pub async fn run<F>(&self, request: F) -> Result<F::Output, Cancelled>
    where
        F: Future,
    {
        tokio::select! {
            biased;
            () = self.token.cancelled() => Err(Cancelled),
            output = request => Ok(output),
        }
    }

    /// Cancel in-flight work and close every subscription once.
    pub fn teardown(&mut self) {
        self.token.cancel();
        self.release_if_cancelled();
    }

    fn release_if_cancelled(&mut self) {
        if !self.token.is_cancelled() || self.subscriptions.is_empty() {
            return;
        }
        debug!(
            subscriptions = self.subscriptions.len(),
            "tearing down screen scope"
        );
        for mut subscription in self.subscriptions.drain(..) {
            subscription.close();
        }
    }
}

impl Drop for SubscriptionScope {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn map_feed_error(error: LiveFeedError) -> Error {
    match error {
        LiveFeedError::Connection { message } => Error::service_unavailable(message),
        LiveFeedError::Rejected { message } => Error::internal(message),
    }
}
