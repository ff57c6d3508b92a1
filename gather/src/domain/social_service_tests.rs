//! Tests for the social graph service.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use mockall::Sequence;
use mockall::predicate::eq;
use rstest::rstest;

use super::*;
use crate::domain::ErrorCode;
use crate::domain::ports::{
    MockChatRepository, MockEventRepository, MockUserRepository, UserRepositoryError,
};
use crate::domain::test_support::{event, uid, user};

type Service = SocialService<MockUserRepository, MockEventRepository, MockChatRepository>;

fn make_service(users: MockUserRepository, events: MockEventRepository) -> Service {
    SocialService::new(
        Arc::new(users),
        Arc::new(events),
        Arc::new(MockChatRepository::new()),
        SocialLimits::default(),
    )
}

fn session(id: &str) -> Session {
    Session::new(uid(id))
}

fn target_exists(users: &mut MockUserRepository) {
    users
        .expect_find_by_id()
        .with(eq(uid("uid-b")))
        .returning(|_| Ok(Some(user("uid-b", "Bea"))));
}

#[rstest]
#[tokio::test]
async fn follow_writes_follower_side_first() {
    let mut users = MockUserRepository::new();
    target_exists(&mut users);
    let mut seq = Sequence::new();
    users
        .expect_add_to_set()
        .with(eq(uid("uid-a")), eq(RelationField::Following), eq(uid("uid-b")))
        .times(1)
        .in_sequence(&mut seq)
        .return_once(|_, _, _| Ok(()));
    users
        .expect_add_to_set()
        .with(eq(uid("uid-b")), eq(RelationField::Followers), eq(uid("uid-a")))
        .times(1)
        .in_sequence(&mut seq)
        .return_once(|_, _, _| Ok(()));

    let service = make_service(users, MockEventRepository::new());
    service
        .follow(Some(&session("uid-a")), &uid("uid-b"))
        .await
        .expect("follow succeeds");
}

#[rstest]
#[tokio::test]
async fn unfollow_removes_both_sides() {
    let mut users = MockUserRepository::new();
    target_exists(&mut users);
    users
        .expect_remove_from_set()
        .times(2)
        .returning(|_, _, _| Ok(()));

    let service = make_service(users, MockEventRepository::new());
    service
        .unfollow(Some(&session("uid-a")), &uid("uid-b"))
        .await
        .expect("unfollow succeeds");
}

#[rstest]
#[tokio::test]
async fn following_yourself_is_rejected() {
    let service = make_service(MockUserRepository::new(), MockEventRepository::new());

    let err = service
        .follow(Some(&session("uid-a")), &uid("uid-a"))
        .await
        .expect_err("self follow rejected");

    assert_eq!(err.code(), ErrorCode::InvalidRequest);
}

#[rstest]
#[tokio::test]
async fn follow_requires_a_session() {
    let service = make_service(MockUserRepository::new(), MockEventRepository::new());

    let err = service
        .follow(None, &uid("uid-b"))
        .await
        .expect_err("session required");

    assert_eq!(err.code(), ErrorCode::Unauthorized);
}

#[rstest]
#[tokio::test]
async fn follow_of_missing_user_is_not_found() {
    let mut users = MockUserRepository::new();
    users.expect_find_by_id().return_once(|_| Ok(None));

    let service = make_service(users, MockEventRepository::new());
    let err = service
        .follow(Some(&session("uid-a")), &uid("uid-b"))
        .await
        .expect_err("target missing");

    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[rstest]
#[tokio::test]
async fn failed_second_write_is_compensated_and_toggle_rolled_back() {
    let mut users = MockUserRepository::new();
    target_exists(&mut users);
    users
        .expect_add_to_set()
        .with(eq(uid("uid-a")), eq(RelationField::Following), eq(uid("uid-b")))
        .times(1)
        .return_once(|_, _, _| Ok(()));
    users
        .expect_add_to_set()
        .with(eq(uid("uid-b")), eq(RelationField::Followers), eq(uid("uid-a")))
        .times(1)
        .return_once(|_, _, _| Err(UserRepositoryError::connection("offline")));
    users
        .expect_remove_from_set()
        .with(eq(uid("uid-a")), eq(RelationField::Following), eq(uid("uid-b")))
        .times(1)
        .return_once(|_, _, _| Ok(()));

    let service = make_service(users, MockEventRepository::new());
    let mut toggle = OptimisticToggle::new(false);
    let err = service
        .toggle_follow(Some(&session("uid-a")), &uid("uid-b"), &mut toggle)
        .await
        .expect_err("second write fails");

    assert_eq!(err.code(), ErrorCode::ServiceUnavailable);
    assert!(err.details().is_none());
    assert_eq!(toggle, OptimisticToggle::Settled(false));
}

#[rstest]
#[tokio::test]
async fn failed_compensation_reports_desync() {
    let mut users = MockUserRepository::new();
    target_exists(&mut users);
    users
        .expect_add_to_set()
        .with(eq(uid("uid-a")), eq(RelationField::Following), eq(uid("uid-b")))
        .return_once(|_, _, _| Ok(()));
    users
        .expect_add_to_set()
        .with(eq(uid("uid-b")), eq(RelationField::Followers), eq(uid("uid-a")))
        .return_once(|_, _, _| Err(UserRepositoryError::query("rejected")));
    users
        .expect_remove_from_set()
        .return_once(|_, _, _| Err(UserRepositoryError::connection("offline")));

    let service = make_service(users, MockEventRepository::new());
    let err = service
        .follow(Some(&session("uid-a")), &uid("uid-b"))
        .await
        .expect_err("follow fails");

    let details = err.details().expect("desync details");
    assert_eq!(details["desynchronised"], true);
}

#[rstest]
#[tokio::test]
async fn toggle_confirms_after_both_writes() {
    let mut users = MockUserRepository::new();
    target_exists(&mut users);
    users
        .expect_add_to_set()
        .times(2)
        .returning(|_, _, _| Ok(()));

    let service = make_service(users, MockEventRepository::new());
    let mut toggle = OptimisticToggle::new(false);
    let settled = service
        .toggle_follow(Some(&session("uid-a")), &uid("uid-b"), &mut toggle)
        .await
        .expect("toggle succeeds");

    assert!(settled);
    assert_eq!(toggle, OptimisticToggle::Settled(true));
}

#[rstest]
#[tokio::test]
async fn pending_toggle_rejects_second_tap() {
    let service = make_service(MockUserRepository::new(), MockEventRepository::new());
    let mut toggle = OptimisticToggle::new(false);
    toggle.begin().expect("first tap");

    let err = service
        .toggle_follow(Some(&session("uid-a")), &uid("uid-b"), &mut toggle)
        .await
        .expect_err("second tap rejected");

    assert_eq!(err.code(), ErrorCode::Conflict);
}

#[rstest]
#[tokio::test]
async fn joining_twice_writes_once() {
    let calls = AtomicUsize::new(0);
    let mut events = MockEventRepository::new();
    events.expect_find_by_id().times(2).returning(move |_| {
        let stored = event("evt-1", "uid-host", None, 1);
        if calls.fetch_add(1, Ordering::SeqCst) == 0 {
            Ok(Some(stored))
        } else {
            Ok(Some(stored.with_participants([uid("uid-host"), uid("uid-a")])))
        }
    });
    events
        .expect_add_participant()
        .times(1)
        .return_once(|_, _| Ok(()));

    let service = make_service(MockUserRepository::new(), events);
    let id = EventId::new("evt-1").expect("valid id");
    let me = session("uid-a");

    assert!(service.join(Some(&me), &id).await.expect("first join"));
    assert!(!service.join(Some(&me), &id).await.expect("second join"));
}

#[rstest]
#[tokio::test]
async fn joining_missing_event_is_not_found() {
    let mut events = MockEventRepository::new();
    events.expect_find_by_id().return_once(|_| Ok(None));

    let service = make_service(MockUserRepository::new(), events);
    let err = service
        .join(
            Some(&session("uid-a")),
            &EventId::new("evt-x").expect("valid id"),
        )
        .await
        .expect_err("missing event");

    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[rstest]
#[tokio::test]
async fn profile_repairs_missing_follower_entry() {
    let mut viewer = user("uid-a", "Ada");
    viewer
        .relation_mut(RelationField::Following)
        .insert(uid("uid-b"));
    let mut users = MockUserRepository::new();
    users
        .expect_find_by_id()
        .with(eq(uid("uid-b")))
        .return_once(|_| Ok(Some(user("uid-b", "Bea"))));
    users
        .expect_find_by_id()
        .with(eq(uid("uid-a")))
        .return_once(move |_| Ok(Some(viewer)));
    users
        .expect_add_to_set()
        .with(eq(uid("uid-b")), eq(RelationField::Followers), eq(uid("uid-a")))
        .times(1)
        .return_once(|_, _, _| Ok(()));
    let mut events = MockEventRepository::new();
    events
        .expect_list_joined_by()
        .return_once(|_| Ok(Vec::new()));

    let service = make_service(users, events);
    let view = service
        .profile(Some(&session("uid-a")), &uid("uid-b"))
        .await
        .expect("profile loads");

    assert_eq!(view.is_following, Some(true));
    assert_eq!(view.followers_count, 1);
    assert_eq!(view.total_friends, 1);
}

#[rstest]
#[tokio::test]
async fn failed_repair_still_shows_viewer_truth() {
    let mut target = user("uid-b", "Bea");
    target
        .relation_mut(RelationField::Followers)
        .insert(uid("uid-a"));
    let mut users = MockUserRepository::new();
    users
        .expect_find_by_id()
        .with(eq(uid("uid-b")))
        .return_once(move |_| Ok(Some(target)));
    users
        .expect_find_by_id()
        .with(eq(uid("uid-a")))
        .return_once(|_| Ok(Some(user("uid-a", "Ada"))));
    users
        .expect_remove_from_set()
        .return_once(|_, _, _| Err(UserRepositoryError::connection("offline")));
    let mut events = MockEventRepository::new();
    events
        .expect_list_joined_by()
        .return_once(|_| Ok(Vec::new()));

    let service = make_service(users, events);
    let view = service
        .profile(Some(&session("uid-a")), &uid("uid-b"))
        .await
        .expect("profile loads");

    assert_eq!(view.is_following, Some(false));
    assert_eq!(view.followers_count, 0);
}

#[rstest]
#[tokio::test]
async fn own_profile_has_no_follow_state() {
    let mut users = MockUserRepository::new();
    users
        .expect_find_by_id()
        .return_once(|_| Ok(Some(user("uid-a", "Ada"))));
    let mut events = MockEventRepository::new();
    events
        .expect_list_joined_by()
        .return_once(|_| Ok(Vec::new()));

    let service = make_service(users, events);
    let view = service
        .profile(Some(&session("uid-a")), &uid("uid-a"))
        .await
        .expect("profile loads");

    assert_eq!(view.is_following, None);
}

#[rstest]
#[tokio::test]
async fn recently_joined_is_newest_first_and_limited() {
    let mut events = MockEventRepository::new();
    events.expect_list_joined_by().return_once(|_| {
        Ok(vec![
            event("d1", "uid-host", None, 1),
            event("d4", "uid-host", None, 4),
            event("d2", "uid-host", None, 2),
            event("d3", "uid-host", None, 3),
        ])
    });

    let service = make_service(MockUserRepository::new(), events);
    let recent = service
        .recently_joined(&uid("uid-a"))
        .await
        .expect("list loads");

    let ids: Vec<_> = recent.iter().map(|e| e.id().to_string()).collect();
    assert_eq!(ids, ["d4", "d3", "d2"]);
}

#[rstest]
#[case("")]
#[case("   ")]
#[tokio::test]
async fn blank_search_returns_nothing(#[case] term: &str) {
    let service = make_service(MockUserRepository::new(), MockEventRepository::new());
    let found = service.search(term).await.expect("search succeeds");
    assert!(found.is_empty());
}

#[rstest]
#[tokio::test]
async fn search_matches_handle_or_name_ignoring_case() {
    let mut users = MockUserRepository::new();
    users.expect_list().return_once(|| {
        Ok(vec![
            user("uid-a", "Ada Lovelace"),
            user("uid-b", "Bea Smith"),
            user("uid-c", "Charles Babbage"),
        ])
    });

    let service = make_service(users, MockEventRepository::new());
    let found = service.search("  LOVE ").await.expect("search succeeds");

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id().as_ref(), "uid-a");
}

#[rstest]
#[tokio::test]
async fn joined_events_carry_latest_message() {
    let mut events = MockEventRepository::new();
    events
        .expect_list_joined_by()
        .return_once(|_| Ok(vec![event("evt-1", "uid-host", None, 1)]));
    let mut chat = MockChatRepository::new();
    chat.expect_latest_for_event().return_once(|_| Ok(None));

    let service = SocialService::new(
        Arc::new(MockUserRepository::new()),
        Arc::new(events),
        Arc::new(chat),
        SocialLimits::default(),
    );
    let joined = service
        .joined_events(Some(&session("uid-a")))
        .await
        .expect("joined list loads");

    assert_eq!(joined.len(), 1);
    assert!(joined[0].latest_message.is_none());
}

#[rstest]
#[tokio::test]
async fn participants_resolve_to_profiles_skipping_missing_ones() {
    let picnic = event("evt-1", "uid-a", None, 5).with_participants([
        uid("uid-a"),
        uid("uid-b"),
        uid("uid-gone"),
        uid("uid-flaky"),
    ]);
    let mut events = MockEventRepository::new();
    events
        .expect_find_by_id()
        .with(eq(EventId::new("evt-1").expect("valid id")))
        .return_once(move |_| Ok(Some(picnic)));
    let mut users = MockUserRepository::new();
    users.expect_find_by_id().times(4).returning(|id| match id.as_ref() {
        "uid-a" => Ok(Some(user("uid-a", "Ada"))),
        "uid-b" => Ok(Some(user("uid-b", "Bea"))),
        "uid-flaky" => Err(UserRepositoryError::connection("timeout")),
        _ => Ok(None),
    });

    let service = make_service(users, events);
    let profiles = service
        .participants(&EventId::new("evt-1").expect("valid id"))
        .await
        .expect("participants load");

    let names: Vec<&str> = profiles
        .iter()
        .map(|profile| profile.display_name().as_ref())
        .collect();
    assert_eq!(names, vec!["Ada", "Bea"]);
}

#[rstest]
#[tokio::test]
async fn participants_of_missing_event_is_not_found() {
    let mut events = MockEventRepository::new();
    events.expect_find_by_id().return_once(|_| Ok(None));

    let service = make_service(MockUserRepository::new(), events);
    let err = service
        .participants(&EventId::new("evt-gone").expect("valid id"))
        .await
        .expect_err("event missing");

    assert_eq!(err.code(), ErrorCode::NotFound);
}
