//! Process-local backend implementing every domain port.
//!
//! [`InMemoryBackend`] keeps users, events, contributions, chat messages and
//! blobs behind one lock and mirrors the document store's semantics:
//! set fields use union and remove, event ids are unique, and writes to a
//! missing document fail. Writes publish the matching [`FeedTopic`] to live
//! listeners.
//!
//! [`FailPoint`]s make the next matching call fail with a connection error,
//! which lets callers exercise compensation and cleanup paths.

mod feed;

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::domain::ports::{
    BlobStore, BlobStoreError, ChatRepository, ChatRepositoryError, ContributionRepository,
    ContributionRepositoryError, EventRepository, EventRepositoryError, FeedRegistration,
    FeedTopic, LiveFeed, LiveFeedError, StoredBlob, SubscriptionId, UserRepository,
    UserRepositoryError,
};
use crate::domain::{
    ChatMessage, Contribution, Event, EventId, Handle, IdempotencyKey, RelationField, SetOp, User,
    UserId,
};

use self::feed::FeedHub;

const DEFAULT_BLOB_BASE: &str = "https://blobs.gather.invalid/";
const INJECTED: &str = "injected failure";

/// Port call that can be made to fail once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailPoint {
    /// Set-union on `owner`'s `field`.
    AddToSet {
        /// Document owner.
        owner: UserId,
        /// Relation field.
        field: RelationField,
    },
    /// Set-remove on `owner`'s `field`.
    RemoveFromSet {
        /// Document owner.
        owner: UserId,
        /// Relation field.
        field: RelationField,
    },
    /// Profile document write.
    UpsertUser,
    /// Event record creation.
    CreateEvent,
    /// Event record creation that stores the record but loses the response.
    CreateEventResponse,
    /// Participant set-union on an event.
    AddParticipant,
    /// Contribution append.
    AppendContribution,
    /// Chat message append.
    AppendMessage,
    /// Blob upload.
    UploadBlob,
    /// Blob delete.
    DeleteBlob,
    /// Live feed subscribe.
    Subscribe,
}

/// Initial contents, usually read from JSON.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Seed {
    /// User profiles.
    #[serde(default)]
    pub users: Vec<User>,
    /// Event records.
    #[serde(default)]
    pub events: Vec<Event>,
}

#[derive(Debug, Default)]
struct State {
    users: BTreeMap<UserId, User>,
    events: Vec<Event>,
    contributions: HashMap<EventId, Vec<Contribution>>,
    messages: HashMap<EventId, Vec<ChatMessage>>,
    blobs: BTreeMap<String, StoredObject>,
}

#[derive(Debug)]
struct StoredObject {
    content_type: String,
    bytes: Vec<u8>,
}

/// In-process adapter for all ports.
#[derive(Debug)]
pub struct InMemoryBackend {
    state: Mutex<State>,
    faults: Mutex<Vec<FailPoint>>,
    feed: FeedHub,
    blob_base: String,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    /// Empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::default(),
            faults: Mutex::default(),
            feed: FeedHub::default(),
            blob_base: DEFAULT_BLOB_BASE.to_owned(),
        }
    }

    /// Backend pre-populated from `seed`. Later duplicates of an event id
    /// are ignored.
    #[must_use]
    pub fn from_seed(seed: Seed) -> Self {
        let backend = Self::new();
        {
            let mut state = backend.state();
            for user in seed.users {
                state.users.insert(user.id().clone(), user);
            }
            for event in seed.events {
                if !state.events.iter().any(|known| known.id() == event.id()) {
                    state.events.push(event);
                }
            }
        }
        backend
    }

    /// Backend pre-populated from a JSON [`Seed`] document.
    ///
    /// # Examples
    /// ```
    /// use gather::outbound::memory::InMemoryBackend;
    ///
    /// let backend = InMemoryBackend::from_json(r#"{"users": [], "events": []}"#)?;
    /// assert_eq!(backend.active_subscriptions(), 0);
    /// # Ok::<(), serde_json::Error>(())
    /// ```
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<Seed>(json).map(Self::from_seed)
    }

    /// Use `base` when building download URLs for uploaded blobs.
    #[must_use]
    pub fn with_blob_base(mut self, base: &Url) -> Self {
        self.blob_base = base.to_string();
        self
    }

    /// Make the next call matching `point` fail.
    pub fn fail_next(&self, point: FailPoint) {
        self.faults().push(point);
    }

    /// Listeners registered and not yet released.
    #[must_use]
    pub fn active_subscriptions(&self) -> usize {
        self.feed.active()
    }

    /// Paths of stored blobs, sorted.
    #[must_use]
    pub fn blob_paths(&self) -> Vec<String> {
        self.state().blobs.keys().cloned().collect()
    }

    /// Content type and size of the blob at `path`.
    #[must_use]
    pub fn blob_info(&self, path: &str) -> Option<(String, usize)> {
        self.state()
            .blobs
            .get(path)
            .map(|object| (object.content_type.clone(), object.bytes.len()))
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn faults(&self) -> MutexGuard<'_, Vec<FailPoint>> {
        self.faults.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Consume an armed fail point equal to `point`.
    fn tripped(&self, point: &FailPoint) -> bool {
        let mut faults = self.faults();
        let Some(index) = faults.iter().position(|armed| armed == point) else {
            return false;
        };
        faults.remove(index);
        debug!(?point, "fail point tripped");
        true
    }

    fn write_set(
        &self,
        owner: &UserId,
        field: RelationField,
        member: &UserId,
        op: SetOp,
    ) -> Result<(), UserRepositoryError> {
        let point = match op {
            SetOp::Add => FailPoint::AddToSet {
                owner: owner.clone(),
                field,
            },
            SetOp::Remove => FailPoint::RemoveFromSet {
                owner: owner.clone(),
                field,
            },
        };
        if self.tripped(&point) {
            return Err(UserRepositoryError::connection(INJECTED));
        }
        let mut state = self.state();
        let user = state
            .users
            .get_mut(owner)
            .ok_or_else(|| UserRepositoryError::query(format!("user {owner} not found")))?;
        op.apply(user.relation_mut(field), member.clone());
        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryBackend {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserRepositoryError> {
        Ok(self.state().users.get(id).cloned())
    }

    async fn find_by_handle(&self, handle: &Handle) -> Result<Option<User>, UserRepositoryError> {
        Ok(self
            .state()
            .users
            .values()
            .find(|user| user.handle() == handle)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<User>, UserRepositoryError> {
        Ok(self.state().users.values().cloned().collect())
    }

    async fn upsert(&self, user: &User) -> Result<(), UserRepositoryError> {
        if self.tripped(&FailPoint::UpsertUser) {
            return Err(UserRepositoryError::connection(INJECTED));
        }
        self.state().users.insert(user.id().clone(), user.clone());
        Ok(())
    }

    async fn add_to_set(
        &self,
        owner: &UserId,
        field: RelationField,
        member: &UserId,
    ) -> Result<(), UserRepositoryError> {
        self.write_set(owner, field, member, SetOp::Add)
    }

    async fn remove_from_set(
        &self,
        owner: &UserId,
        field: RelationField,
        member: &UserId,
    ) -> Result<(), UserRepositoryError> {
        self.write_set(owner, field, member, SetOp::Remove)
    }
}

#[async_trait]
impl EventRepository for InMemoryBackend {
    async fn find_by_id(&self, id: &EventId) -> Result<Option<Event>, EventRepositoryError> {
        Ok(self
            .state()
            .events
            .iter()
            .find(|event| event.id() == id)
            .cloned())
    }

    async fn find_by_publish_token(
        &self,
        token: &IdempotencyKey,
    ) -> Result<Option<Event>, EventRepositoryError> {
        Ok(self
            .state()
            .events
            .iter()
            .find(|event| event.publish_token() == Some(token))
            .cloned())
    }

    async fn list(&self) -> Result<Vec<Event>, EventRepositoryError> {
        Ok(self.state().events.clone())
    }

    async fn create(&self, event: &Event) -> Result<(), EventRepositoryError> {
        if self.tripped(&FailPoint::CreateEvent) {
            return Err(EventRepositoryError::connection(INJECTED));
        }
        {
            let mut state = self.state();
            let clash = state.events.iter().find(|known| {
                known.id() == event.id()
                    || (event.publish_token().is_some()
                        && known.publish_token() == event.publish_token())
            });
            if let Some(existing) = clash {
                return Err(EventRepositoryError::duplicate(existing.id().to_string()));
            }
            state.events.push(event.clone());
        }
        self.feed.notify(&FeedTopic::Events);
        if self.tripped(&FailPoint::CreateEventResponse) {
            return Err(EventRepositoryError::connection(INJECTED));
        }
        Ok(())
    }

    async fn add_participant(
        &self,
        event: &EventId,
        user: &UserId,
    ) -> Result<(), EventRepositoryError> {
        if self.tripped(&FailPoint::AddParticipant) {
            return Err(EventRepositoryError::connection(INJECTED));
        }
        let added = {
            let mut state = self.state();
            let record = state
                .events
                .iter_mut()
                .find(|known| known.id() == event)
                .ok_or_else(|| EventRepositoryError::query(format!("event {event} not found")))?;
            record.add_participant(user.clone())
        };
        if added {
            self.feed.notify(&FeedTopic::Events);
        }
        Ok(())
    }

    async fn list_joined_by(&self, user: &UserId) -> Result<Vec<Event>, EventRepositoryError> {
        Ok(self
            .state()
            .events
            .iter()
            .filter(|event| event.has_participant(user))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ContributionRepository for InMemoryBackend {
    async fn append(&self, contribution: &Contribution) -> Result<(), ContributionRepositoryError> {
        if self.tripped(&FailPoint::AppendContribution) {
            return Err(ContributionRepositoryError::connection(INJECTED));
        }
        self.state()
            .contributions
            .entry(contribution.event_id.clone())
            .or_default()
            .push(contribution.clone());
        self.feed
            .notify(&FeedTopic::Contributions(contribution.event_id.clone()));
        Ok(())
    }

    async fn list_for_event(
        &self,
        event: &EventId,
    ) -> Result<Vec<Contribution>, ContributionRepositoryError> {
        Ok(self
            .state()
            .contributions
            .get(event)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl ChatRepository for InMemoryBackend {
    async fn append(&self, message: &ChatMessage) -> Result<(), ChatRepositoryError> {
        if self.tripped(&FailPoint::AppendMessage) {
            return Err(ChatRepositoryError::connection(INJECTED));
        }
        self.state()
            .messages
            .entry(message.event_id.clone())
            .or_default()
            .push(message.clone());
        self.feed.notify(&FeedTopic::Chat(message.event_id.clone()));
        Ok(())
    }

    async fn list_for_event(
        &self,
        event: &EventId,
    ) -> Result<Vec<ChatMessage>, ChatRepositoryError> {
        Ok(self.state().messages.get(event).cloned().unwrap_or_default())
    }

    async fn latest_for_event(
        &self,
        event: &EventId,
    ) -> Result<Option<ChatMessage>, ChatRepositoryError> {
        Ok(self.state().messages.get(event).and_then(|messages| {
            messages
                .iter()
                .max_by_key(|message| message.timestamp)
                .cloned()
        }))
    }
}

#[async_trait]
impl BlobStore for InMemoryBackend {
    async fn upload(
        &self,
        path: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<StoredBlob, BlobStoreError> {
        if self.tripped(&FailPoint::UploadBlob) {
            return Err(BlobStoreError::connection(INJECTED));
        }
        let url = Url::parse(&self.blob_base)
            .and_then(|base| base.join(path))
            .map_err(|err| BlobStoreError::upload(format!("invalid path {path}: {err}")))?;
        self.state().blobs.insert(
            path.to_owned(),
            StoredObject {
                content_type: content_type.to_owned(),
                bytes: bytes.to_vec(),
            },
        );
        Ok(StoredBlob {
            path: path.to_owned(),
            url,
        })
    }

    async fn delete(&self, path: &str) -> Result<(), BlobStoreError> {
        if self.tripped(&FailPoint::DeleteBlob) {
            return Err(BlobStoreError::connection(INJECTED));
        }
        self.state().blobs.remove(path);
        Ok(())
    }
}

#[async_trait]
impl LiveFeed for InMemoryBackend {
    async fn subscribe(&self, topic: &FeedTopic) -> Result<FeedRegistration, LiveFeedError> {
        if self.tripped(&FailPoint::Subscribe) {
            return Err(LiveFeedError::connection(INJECTED));
        }
        Ok(self.feed.register(topic))
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.feed.release(id);
    }
}
