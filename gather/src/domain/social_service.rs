//! Social graph and membership service.
//!
//! Follow and unfollow touch two profiles with independent writes. The
//! follower side is written first; if the followee side fails, the first
//! write is reverted. A failed revert leaves the relation desynchronised
//! until the next profile view repairs it from the viewer's `following` set.

use std::cmp::Reverse;
use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};

use super::ports::{ChatRepository, EventRepository, UserRepository, UserRepositoryError};
use super::service_support::{map_chat_error, map_event_error, map_user_error};
use super::{
    ChatMessage, Error, Event, EventId, Handle, OptimisticToggle, RelationField, RelationWrite,
    Session, SetOp, User, UserId, follow_writes, is_member, repair_follow_edge, require_session,
};

/// Default number of events in a profile's "recently joined" strip.
pub const DEFAULT_RECENT_JOINED_LIMIT: usize = 3;
/// Default cap on user search results.
pub const DEFAULT_SEARCH_LIMIT: usize = 20;

/// Result-size limits for profile and search screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocialLimits {
    /// Events shown under "recently joined".
    pub recent_joined: usize,
    /// Maximum search results.
    pub search: usize,
}

impl Default for SocialLimits {
    fn default() -> Self {
        Self {
            recent_joined: DEFAULT_RECENT_JOINED_LIMIT,
            search: DEFAULT_SEARCH_LIMIT,
        }
    }
}

/// Profile screen model.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    /// Profile owner, with follower set repaired where possible.
    pub user: User,
    /// Size of `followers`.
    pub followers_count: usize,
    /// Size of `following`.
    pub following_count: usize,
    /// Followers plus following.
    pub total_friends: usize,
    /// Whether the viewer follows this profile. `None` for the viewer's own
    /// profile or when nobody is signed in.
    pub is_following: Option<bool>,
    /// Latest events the owner joined, newest first.
    pub recently_joined: Vec<Event>,
}

/// Joined event with its newest chat message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinedEvent {
    /// The event.
    pub event: Event,
    /// Latest message preview.
    pub latest_message: Option<ChatMessage>,
}

/// Follow, join, profile and search operations.
#[derive(Clone)]
pub struct SocialService<U, E, C> {
    users: Arc<U>,
    events: Arc<E>,
    chat: Arc<C>,
    limits: SocialLimits,
}

impl<U, E, C> SocialService<U, E, C> {
    /// Create a service with the given ports.
    #[must_use]
    pub const fn new(users: Arc<U>, events: Arc<E>, chat: Arc<C>, limits: SocialLimits) -> Self {
        Self {
            users,
            events,
            chat,
            limits,
        }
    }
}

impl<U, E, C> SocialService<U, E, C>
where
    U: UserRepository,
    E: EventRepository,
    C: ChatRepository,
{
    /// Follow `target`. Following twice is a no-op.
    pub async fn follow(&self, session: Option<&Session>, target: &UserId) -> Result<(), Error> {
        self.apply_follow(session, target, SetOp::Add).await
    }

    /// Stop following `target`.
    pub async fn unfollow(&self, session: Option<&Session>, target: &UserId) -> Result<(), Error> {
        self.apply_follow(session, target, SetOp::Remove).await
    }

    /// Flip `toggle` optimistically, write the change, then confirm or roll
    /// back. Returns the settled value.
    pub async fn toggle_follow(
        &self,
        session: Option<&Session>,
        target: &UserId,
        toggle: &mut OptimisticToggle,
    ) -> Result<bool, Error> {
        let wanted = toggle
            .begin()
            .map_err(|err| Error::conflict(err.to_string()))?;
        let op = if wanted { SetOp::Add } else { SetOp::Remove };
        match self.apply_follow(session, target, op).await {
            Ok(()) => toggle
                .confirm()
                .map_err(|err| Error::internal(err.to_string())),
            Err(err) => {
                toggle
                    .roll_back()
                    .map_err(|rollback| Error::internal(rollback.to_string()))?;
                Err(err)
            }
        }
    }

    async fn apply_follow(
        &self,
        session: Option<&Session>,
        target: &UserId,
        op: SetOp,
    ) -> Result<(), Error> {
        let viewer = require_session(session)?.user_id();
        if viewer == target {
            return Err(Error::invalid_request("you cannot follow yourself"));
        }
        self.load_user(target).await?;

        let [first, second] = follow_writes(viewer, target, op);
        self.write(&first).await.map_err(map_user_error)?;
        if let Err(err) = self.write(&second).await {
            return Err(self.compensate(&first, map_user_error(err)).await);
        }
        info!(follower = %viewer, followee = %target, ?op, "follow relation updated");
        Ok(())
    }

    async fn compensate(&self, first: &RelationWrite, cause: Error) -> Error {
        let undo = first.compensation();
        match self.write(&undo).await {
            Ok(()) => {
                warn!(
                    owner = %undo.owner,
                    member = %undo.member,
                    error = %cause,
                    "second follow write failed; first write reverted"
                );
                cause
            }
            Err(err) => {
                warn!(
                    owner = %undo.owner,
                    member = %undo.member,
                    error = %err,
                    "follow relation desynchronised; will repair on next profile view"
                );
                cause.with_details(json!({
                    "desynchronised": true,
                    "owner": undo.owner,
                    "member": undo.member,
                }))
            }
        }
    }

    async fn write(&self, write: &RelationWrite) -> Result<(), UserRepositoryError> {
        match write.op {
            SetOp::Add => {
                self.users
                    .add_to_set(&write.owner, write.field, &write.member)
                    .await
            }
            SetOp::Remove => {
                self.users
                    .remove_from_set(&write.owner, write.field, &write.member)
                    .await
            }
        }
    }

    /// Join `event`. Returns `false` when the user had already joined.
    pub async fn join(&self, session: Option<&Session>, event: &EventId) -> Result<bool, Error> {
        let user = require_session(session)?.user_id();
        let record = self.load_event(event).await?;
        if record.has_participant(user) {
            return Ok(false);
        }
        self.events
            .add_participant(event, user)
            .await
            .map_err(map_event_error)?;
        info!(%user, %event, "joined event");
        Ok(true)
    }

    /// Profiles of everyone who joined `event`, in participant order.
    ///
    /// Participants whose profile is missing or fails to load are skipped
    /// so one bad record does not hide the rest of the list.
    pub async fn participants(&self, event: &EventId) -> Result<Vec<User>, Error> {
        let record = self.load_event(event).await?;
        let mut profiles = Vec::with_capacity(record.participants().len());
        for id in record.participants() {
            match self.users.find_by_id(id).await {
                Ok(Some(profile)) => profiles.push(profile),
                Ok(None) => debug!(user = %id, %event, "participant has no profile"),
                Err(err) => {
                    warn!(user = %id, %event, error = %err, "participant profile unavailable");
                }
            }
        }
        Ok(profiles)
    }

    /// Profile screen for `target`, repairing the follow edge from the
    /// viewer's side.
    pub async fn profile(
        &self,
        session: Option<&Session>,
        target: &UserId,
    ) -> Result<ProfileView, Error> {
        let user = self.load_user(target).await?;
        self.profile_view(session, user).await
    }

    /// Profile screen looked up by handle.
    pub async fn profile_by_handle(
        &self,
        session: Option<&Session>,
        handle: &Handle,
    ) -> Result<ProfileView, Error> {
        let user = self
            .users
            .find_by_handle(handle)
            .await
            .map_err(map_user_error)?
            .ok_or_else(|| Error::not_found(format!("no user with handle {handle}")))?;
        self.profile_view(session, user).await
    }

    async fn profile_view(
        &self,
        session: Option<&Session>,
        mut user: User,
    ) -> Result<ProfileView, Error> {
        let is_following = match session.map(Session::user_id) {
            Some(viewer) if viewer != user.id() => self.reconcile(viewer, &mut user).await?,
            _ => None,
        };
        let recently_joined = self.recently_joined(user.id()).await?;
        let followers_count = user.followers().len();
        let following_count = user.following().len();
        Ok(ProfileView {
            user,
            followers_count,
            following_count,
            total_friends: followers_count + following_count,
            is_following,
            recently_joined,
        })
    }

    async fn reconcile(&self, viewer: &UserId, target: &mut User) -> Result<Option<bool>, Error> {
        let found = self.users.find_by_id(viewer).await.map_err(map_user_error)?;
        let Some(viewer_profile) = found else {
            return Ok(None);
        };
        if let Some(repair) = repair_follow_edge(&viewer_profile, target) {
            match self.write(&repair).await {
                Ok(()) => info!(
                    owner = %repair.owner,
                    member = %repair.member,
                    op = ?repair.op,
                    "follow edge repaired"
                ),
                Err(err) => warn!(
                    owner = %repair.owner,
                    member = %repair.member,
                    error = %err,
                    "follow edge repair failed"
                ),
            }
            repair
                .op
                .apply(target.relation_mut(RelationField::Followers), repair.member);
        }
        Ok(Some(is_member(viewer_profile.following(), target.id())))
    }

    /// Events `user` joined, newest date first, capped by the configured
    /// limit.
    pub async fn recently_joined(&self, user: &UserId) -> Result<Vec<Event>, Error> {
        let mut events = self
            .events
            .list_joined_by(user)
            .await
            .map_err(map_event_error)?;
        events.sort_by_key(|event| Reverse(event.date()));
        events.truncate(self.limits.recent_joined);
        Ok(events)
    }

    /// Events the signed-in user joined, each with its latest message.
    pub async fn joined_events(
        &self,
        session: Option<&Session>,
    ) -> Result<Vec<JoinedEvent>, Error> {
        let user = require_session(session)?.user_id();
        let events = self
            .events
            .list_joined_by(user)
            .await
            .map_err(map_event_error)?;
        let mut joined = Vec::with_capacity(events.len());
        for event in events {
            let latest_message = self
                .chat
                .latest_for_event(event.id())
                .await
                .map_err(map_chat_error)?;
            joined.push(JoinedEvent {
                event,
                latest_message,
            });
        }
        Ok(joined)
    }

    /// Users whose handle or display name contains `term`, ignoring case.
    /// A blank term returns nothing.
    pub async fn search(&self, term: &str) -> Result<Vec<User>, Error> {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        let users = self.users.list().await.map_err(map_user_error)?;
        Ok(users
            .into_iter()
            .filter(|user| user.matches_search(&needle))
            .take(self.limits.search)
            .collect())
    }

    async fn load_event(&self, id: &EventId) -> Result<Event, Error> {
        self.events
            .find_by_id(id)
            .await
            .map_err(map_event_error)?
            .ok_or_else(|| Error::not_found(format!("event {id} not found")))
    }

    async fn load_user(&self, id: &UserId) -> Result<User, Error> {
        self.users
            .find_by_id(id)
            .await
            .map_err(map_user_error)?
            .ok_or_else(|| Error::not_found(format!("user {id} not found")))
    }
}

#[cfg(test)]
#[path = "social_service_tests.rs"]
mod tests;
