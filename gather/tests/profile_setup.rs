//! Behavioural tests for onboarding and participant lists against the
//! in-memory backend.

#![expect(
    clippy::expect_used,
    clippy::indexing_slicing,
    reason = "test code uses expect and indexing for clear failure messages"
)]

use std::sync::Arc;

use gather::domain::ports::UserRepository;
use gather::domain::{
    ErrorCode, EventId, Handle, PhotoUpload, ProfileService, ProfileSetup, Session, SocialLimits,
    SocialService, UserId,
};
use gather::outbound::memory::{FailPoint, InMemoryBackend};
use rstest::{fixture, rstest};

const SEED: &str = include_str!("../fixtures/seed.json");

#[fixture]
fn backend() -> Arc<InMemoryBackend> {
    Arc::new(InMemoryBackend::from_json(SEED).expect("seed parses"))
}

fn newcomer() -> Session {
    Session::new(UserId::new("uid-katherine").expect("valid id"))
}

#[fixture]
fn setup() -> ProfileSetup {
    ProfileSetup {
        display_name: "Katherine Johnson".to_owned(),
        handle: None,
        bio: "Orbital mechanics".to_owned(),
        photo: Some(PhotoUpload {
            file_name: "katherine.jpg".to_owned(),
            content_type: "image/jpeg".to_owned(),
            bytes: vec![0xff, 0xd8, 0xff],
        }),
    }
}

#[rstest]
#[tokio::test]
async fn onboarding_stores_profile_and_avatar(backend: Arc<InMemoryBackend>, setup: ProfileSetup) {
    let profiles = ProfileService::new(Arc::clone(&backend), Arc::clone(&backend));

    let saved = profiles
        .complete_profile(Some(&newcomer()), setup)
        .await
        .expect("profile saved");

    let paths = backend.blob_paths();
    assert_eq!(paths.len(), 1);
    assert!(paths[0].starts_with("profile_photos/"));
    let photo = saved.photo_url().expect("avatar url");
    assert!(photo.as_str().ends_with(&paths[0]));
    let found = backend
        .find_by_handle(&Handle::new("katherinejohnson").expect("valid handle"))
        .await
        .expect("lookup")
        .expect("profile stored");
    assert_eq!(found, saved);
    assert!(found.followers().is_empty());
}

#[rstest]
#[tokio::test]
async fn failed_profile_write_leaves_no_avatar(
    backend: Arc<InMemoryBackend>,
    setup: ProfileSetup,
) {
    let profiles = ProfileService::new(Arc::clone(&backend), Arc::clone(&backend));
    backend.fail_next(FailPoint::UpsertUser);

    let err = profiles
        .complete_profile(Some(&newcomer()), setup)
        .await
        .expect_err("profile write fails");

    assert_eq!(err.code(), ErrorCode::ServiceUnavailable);
    assert!(backend.blob_paths().is_empty());
    let stored = backend
        .find_by_id(&UserId::new("uid-katherine").expect("valid id"))
        .await
        .expect("lookup");
    assert!(stored.is_none());
}

#[rstest]
#[tokio::test]
async fn participants_list_shows_joined_profiles(backend: Arc<InMemoryBackend>) {
    let social = SocialService::new(
        Arc::clone(&backend),
        Arc::clone(&backend),
        Arc::clone(&backend),
        SocialLimits::default(),
    );

    let people = social
        .participants(&EventId::new("evt-park").expect("valid id"))
        .await
        .expect("participants load");

    let handles: Vec<&str> = people.iter().map(|user| user.handle().as_ref()).collect();
    assert_eq!(handles, vec!["adalovelace", "gracehopper"]);
}
