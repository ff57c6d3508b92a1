//! Profile setup after signup.
//!
//! The avatar is uploaded first and the profile document written second.
//! A failed profile write deletes the avatar again. Existing follow sets
//! survive a repeated setup.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use super::ports::{BlobStore, StoredBlob, UserRepository};
use super::service_support::{map_blob_error, map_user_error};
use super::{DisplayName, Error, Handle, PhotoUpload, Session, User, require_session};

/// Fields collected by the onboarding screens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileSetup {
    /// Name shown to other users.
    pub display_name: String,
    /// Chosen handle. Blank or absent derives one from the display name.
    pub handle: Option<String>,
    /// Biography text, trimmed before storing.
    pub bio: String,
    /// New avatar; `None` keeps the current one.
    pub photo: Option<PhotoUpload>,
}

/// Creates and updates the signed-in user's profile.
#[derive(Clone)]
pub struct ProfileService<U, B> {
    users: Arc<U>,
    blobs: Arc<B>,
}

impl<U, B> ProfileService<U, B> {
    /// Create a service with the given ports.
    #[must_use]
    pub const fn new(users: Arc<U>, blobs: Arc<B>) -> Self {
        Self { users, blobs }
    }
}

impl<U, B> ProfileService<U, B>
where
    U: UserRepository,
    B: BlobStore,
{
    /// Validate `setup`, upload its avatar and write the profile.
    pub async fn complete_profile(
        &self,
        session: Option<&Session>,
        setup: ProfileSetup,
    ) -> Result<User, Error> {
        let id = require_session(session)?.user_id();
        let display_name = DisplayName::new(setup.display_name)
            .map_err(|err| Error::invalid_request(err.to_string()))?;
        let handle = choose_handle(setup.handle.as_deref(), &display_name)?;

        let existing = self.users.find_by_id(id).await.map_err(map_user_error)?;
        let avatar = match &setup.photo {
            Some(photo) => Some(self.upload_avatar(photo).await?),
            None => None,
        };

        let base =
            existing.unwrap_or_else(|| User::signup(id.clone(), display_name.clone(), None));
        let mut profile = base
            .with_display_name(display_name)
            .with_handle(handle)
            .with_bio(setup.bio.trim());
        if let Some(blob) = &avatar {
            profile = profile.with_photo_url(blob.url.clone());
        }

        if let Err(err) = self.users.upsert(&profile).await {
            if let Some(blob) = &avatar {
                self.discard_avatar(&blob.path).await;
            }
            return Err(map_user_error(err));
        }
        info!(user = %id, handle = %profile.handle(), "profile saved");
        Ok(profile)
    }

    async fn upload_avatar(&self, photo: &PhotoUpload) -> Result<StoredBlob, Error> {
        let path = format!("profile_photos/{}", Uuid::new_v4());
        self.blobs
            .upload(&path, &photo.content_type, &photo.bytes)
            .await
            .map_err(map_blob_error)
    }

    async fn discard_avatar(&self, path: &str) {
        match self.blobs.delete(path).await {
            Ok(()) => warn!(%path, "profile write failed; uploaded avatar deleted"),
            Err(err) => {
                warn!(%path, error = %err, "profile write failed; avatar left orphaned");
            }
        }
    }
}

fn choose_handle(chosen: Option<&str>, display_name: &DisplayName) -> Result<Handle, Error> {
    match chosen.map(str::trim) {
        None | Some("") => Ok(Handle::derive_from(display_name)),
        Some(handle) => Handle::new(handle).map_err(|err| Error::invalid_request(err.to_string())),
    }
}
