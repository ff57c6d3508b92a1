//! Tests for nearby event ranking.

use chrono::{TimeZone, Utc};
use rstest::{fixture, rstest};

use super::*;
use crate::domain::{CreatorSnapshot, EventDetails, EventId, Price, Title, UserId};

fn event(id: &str, coordinates: Option<(f64, f64)>) -> Event {
    let details = EventDetails {
        title: Title::new(format!("Event {id}")).expect("valid title"),
        description: "Something fun".to_owned(),
        location_text: "Somewhere".to_owned(),
        coordinates: coordinates
            .map(|(lat, lng)| Coordinate::new(lat, lng).expect("valid coordinate")),
        date: Utc
            .with_ymd_and_hms(2026, 7, 1, 18, 0, 0)
            .single()
            .expect("valid date"),
        image: None,
        price: Price::free(),
    };
    let host = CreatorSnapshot {
        uid: UserId::new("uid-host").expect("valid id"),
        handle: None,
        photo_url: None,
    };
    Event::new(EventId::new(id).expect("valid id"), details, host, None).expect("valid event")
}

fn ids(nearby: &NearbyEvents) -> Vec<String> {
    nearby
        .events()
        .into_iter()
        .map(|event| event.id().to_string())
        .collect()
}

#[fixture]
fn origin() -> Coordinate {
    Coordinate::new(0.0, 0.0).expect("valid coordinate")
}

#[rstest]
fn closer_event_is_ranked_first(origin: Coordinate) {
    let events = vec![event("far", Some((0.0, 1.0))), event("here", Some((0.0, 0.0)))];

    let nearby = rank_events(Some(origin), events, &RankingOptions::default());

    let NearbyEvents::Ranked(ranked) = nearby else {
        panic!("expected ranked mode");
    };
    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[0].event.id().as_ref(), "here");
    assert_eq!(ranked[0].distance_km, Some(0.0));
    let far = ranked[1].distance_km.expect("distance present");
    assert!((far - 111.19).abs() < 0.01, "got {far}");
}

#[rstest]
fn output_is_sorted_non_decreasing(origin: Coordinate) {
    let events = vec![
        event("c", Some((3.0, 3.0))),
        event("a", Some((0.5, 0.5))),
        event("d", Some((-10.0, 20.0))),
        event("b", Some((1.0, -1.0))),
    ];

    let NearbyEvents::Ranked(ranked) = rank_events(Some(origin), events, &RankingOptions::default())
    else {
        panic!("expected ranked mode");
    };

    let distances: Vec<f64> = ranked
        .iter()
        .map(|entry| entry.distance_km.expect("located"))
        .collect();
    assert!(distances.windows(2).all(|pair| pair[0] <= pair[1]));
}

#[rstest]
fn ties_keep_input_order(origin: Coordinate) {
    let events = vec![
        event("north", Some((1.0, 0.0))),
        event("south", Some((-1.0, 0.0))),
        event("again-north", Some((1.0, 0.0))),
    ];

    let nearby = rank_events(Some(origin), events, &RankingOptions::default());

    assert_eq!(ids(&nearby), ["north", "south", "again-north"]);
}

#[rstest]
fn missing_coordinates_are_placed_last_by_default(origin: Coordinate) {
    let events = vec![
        event("nowhere-1", None),
        event("far", Some((5.0, 5.0))),
        event("nowhere-2", None),
        event("near", Some((0.1, 0.1))),
    ];

    let nearby = rank_events(Some(origin), events, &RankingOptions::default());

    assert_eq!(ids(&nearby), ["near", "far", "nowhere-1", "nowhere-2"]);
    let NearbyEvents::Ranked(ranked) = nearby else {
        panic!("expected ranked mode");
    };
    assert!(ranked[2].distance_km.is_none());
    assert!(ranked[3].distance_label().is_none());
}

#[rstest]
fn missing_coordinates_can_be_excluded(origin: Coordinate) {
    let options = RankingOptions {
        missing_coordinates: MissingCoordinatePolicy::Exclude,
        ..RankingOptions::default()
    };
    let events = vec![event("nowhere", None), event("near", Some((0.1, 0.1)))];

    let nearby = rank_events(Some(origin), events, &options);

    assert_eq!(ids(&nearby), ["near"]);
}

#[rstest]
fn no_observer_returns_input_order_unranked() {
    let events = vec![event("b", Some((5.0, 5.0))), event("a", None)];

    let nearby = rank_events(None, events, &RankingOptions::default());

    assert!(matches!(nearby, NearbyEvents::Unranked(_)));
    assert_eq!(ids(&nearby), ["b", "a"]);
}

#[rstest]
fn radius_drops_distant_events(origin: Coordinate) {
    let options = RankingOptions {
        max_radius_km: Some(50.0),
        ..RankingOptions::default()
    };
    let events = vec![event("far", Some((0.0, 1.0))), event("near", Some((0.0, 0.1)))];

    let nearby = rank_events(Some(origin), events, &options);

    assert_eq!(ids(&nearby), ["near"]);
}

#[rstest]
fn mappable_events_skip_unlocated_records() {
    let events = vec![event("a", Some((1.0, 1.0))), event("b", None)];
    let pins = mappable_events(&events);
    assert_eq!(pins.len(), 1);
    assert_eq!(pins[0].0.id().as_ref(), "a");
}

#[rstest]
fn within_radius_keeps_close_pins(origin: Coordinate) {
    let events = vec![
        event("near", Some((0.0, 0.5))),
        event("far", Some((0.0, 2.0))),
        event("nowhere", None),
    ];

    let pins = within_radius(&events, origin, 100.0, DistanceFormula::Approximate);

    assert_eq!(pins.len(), 1);
    assert_eq!(pins[0].0.id().as_ref(), "near");
}
