//! Event publication from a completed draft.
//!
//! Publishing uploads the cover image and then creates the event record.
//! The draft's idempotency key is stored on the record, so a retry after a
//! lost response returns the event already created. If the record write
//! reports an error the key is looked up again: the image is deleted only
//! when no record was stored.

use std::sync::Arc;

use tracing::{info, warn};

use super::ports::{BlobStore, EventRepository, UserRepository};
use super::service_support::{map_blob_error, map_event_error, map_user_error};
use super::{
    CreatorSnapshot, DraftError, Error, Event, EventDetails, EventDraft, EventId, IdempotencyKey,
    Price, PublishRequest, Session, require_session,
};

/// Result of a publish call.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishOutcome {
    /// The stored event.
    pub event: Event,
    /// `true` when the event was found by the draft's key rather than
    /// confirmed by this call's write.
    pub replayed: bool,
}

/// Publishes event drafts.
#[derive(Clone)]
pub struct PublishService<E, U, B> {
    events: Arc<E>,
    users: Arc<U>,
    blobs: Arc<B>,
}

impl<E, U, B> PublishService<E, U, B> {
    /// Create a service with the given ports.
    #[must_use]
    pub const fn new(events: Arc<E>, users: Arc<U>, blobs: Arc<B>) -> Self {
        Self {
            events,
            users,
            blobs,
        }
    }
}

impl<E, U, B> PublishService<E, U, B>
where
    E: EventRepository,
    U: UserRepository,
    B: BlobStore,
{
    /// Publish `draft`, marking it published on success.
    pub async fn publish(
        &self,
        session: Option<&Session>,
        draft: &mut EventDraft,
    ) -> Result<PublishOutcome, Error> {
        let creator = require_session(session)?.user_id();
        let request = draft.ready_for_publish().map_err(map_draft_error)?;

        if let Some(existing) = self
            .events
            .find_by_publish_token(&request.publish_token)
            .await
            .map_err(map_event_error)?
        {
            info!(event = %existing.id(), key = %request.publish_token, "publish replayed");
            draft.mark_published(existing.id().clone());
            return Ok(PublishOutcome {
                event: existing,
                replayed: true,
            });
        }

        let profile = self
            .users
            .find_by_id(creator)
            .await
            .map_err(map_user_error)?
            .ok_or_else(|| Error::not_found(format!("user {creator} not found")))?;

        let id = EventId::random();
        let path = blob_path(&id, &request);
        let blob = self
            .blobs
            .upload(&path, &request.photo.content_type, &request.photo.bytes)
            .await
            .map_err(map_blob_error)?;

        let key = request.publish_token.clone();
        let event = build_event(id, request, blob.url, CreatorSnapshot::of(&profile))?;
        if let Err(err) = self.events.create(&event).await {
            let stored = self.recover_after_failed_write(&key, &blob.path).await;
            let Some(existing) = stored else {
                return Err(map_event_error(err));
            };
            info!(event = %existing.id(), %key, "event stored despite write error");
            draft.mark_published(existing.id().clone());
            return Ok(PublishOutcome {
                event: existing,
                replayed: true,
            });
        }

        info!(event = %event.id(), creator = %creator, "event published");
        draft.mark_published(event.id().clone());
        Ok(PublishOutcome {
            event,
            replayed: false,
        })
    }

    /// Decide what a failed record write left behind.
    ///
    /// The write may have been committed with only the response lost, so
    /// the key is checked first. The image is deleted only when no record
    /// references it; if the check itself fails the image is kept.
    async fn recover_after_failed_write(&self, key: &IdempotencyKey, path: &str) -> Option<Event> {
        match self.events.find_by_publish_token(key).await {
            Ok(Some(existing)) => Some(existing),
            Ok(None) => {
                self.discard_blob(path).await;
                None
            }
            Err(err) => {
                warn!(%path, error = %err, "event record state unknown; image kept");
                None
            }
        }
    }

    async fn discard_blob(&self, path: &str) {
        match self.blobs.delete(path).await {
            Ok(()) => warn!(%path, "event record write failed; uploaded image deleted"),
            Err(err) => {
                warn!(%path, error = %err, "event record write failed; image left orphaned");
            }
        }
    }
}

fn blob_path(id: &EventId, request: &PublishRequest) -> String {
    format!("events/{id}/{}", request.photo.file_name)
}

fn build_event(
    id: EventId,
    request: PublishRequest,
    image: url::Url,
    creator: CreatorSnapshot,
) -> Result<Event, Error> {
    let details = EventDetails {
        title: request.title,
        description: request.description,
        location_text: request.location_text,
        coordinates: Some(request.coordinates),
        date: request.date,
        image: Some(image),
        price: Price::free(),
    };
    Event::new(id, details, creator, Some(request.publish_token))
        .map_err(|err| Error::invalid_request(err.to_string()))
}

fn map_draft_error(error: DraftError) -> Error {
    match error {
        DraftError::Closed => Error::conflict(error.to_string()),
        other => Error::invalid_request(other.to_string()),
    }
}

#[cfg(test)]
#[path = "publish_service_tests.rs"]
mod tests;
