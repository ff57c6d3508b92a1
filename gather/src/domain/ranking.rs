//! Nearby event ranking.
//!
//! Ranking annotates each event with its distance from the observer and
//! sorts ascending. Without an observer coordinate the list is returned
//! unranked: a missing location is a display mode, not a failure.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Coordinate, DistanceFormula, Event, format_distance};

/// Placement of events that carry no coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingCoordinatePolicy {
    /// Drop them from the ranked list.
    Exclude,
    /// Keep them after every located event, in input order.
    #[default]
    Last,
}

/// Tunables for [`rank_events`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RankingOptions {
    /// Distance formula.
    pub formula: DistanceFormula,
    /// Placement of events without coordinates.
    pub missing_coordinates: MissingCoordinatePolicy,
    /// Optional cut-off; located events further away are dropped.
    pub max_radius_km: Option<f64>,
}

/// Event annotated with its distance from the observer.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedEvent {
    /// The event record.
    pub event: Event,
    /// Kilometres from the observer, `None` when the event has no
    /// coordinate.
    pub distance_km: Option<f64>,
}

impl RankedEvent {
    /// Card label such as `3.2 km away`.
    #[must_use]
    pub fn distance_label(&self) -> Option<String> {
        self.distance_km.map(format_distance)
    }
}

/// Result of ranking.
#[derive(Debug, Clone, PartialEq)]
pub enum NearbyEvents {
    /// Observer location was known; events are sorted by distance.
    Ranked(Vec<RankedEvent>),
    /// Observer location was unavailable; events keep input order.
    Unranked(Vec<Event>),
}

impl NearbyEvents {
    /// Number of events in either mode.
    #[must_use]
    pub const fn len(&self) -> usize {
        match self {
            Self::Ranked(events) => events.len(),
            Self::Unranked(events) => events.len(),
        }
    }

    /// Whether no events are present.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrow the events in display order, whatever the mode.
    #[must_use]
    pub fn events(&self) -> Vec<&Event> {
        match self {
            Self::Ranked(events) => events.iter().map(|ranked| &ranked.event).collect(),
            Self::Unranked(events) => events.iter().collect(),
        }
    }
}

/// Rank `events` by distance from `observer`.
///
/// Sorting is stable, so equidistant events keep their input order.
///
/// # Examples
///
/// ```
/// use gather::domain::{NearbyEvents, RankingOptions, rank_events};
///
/// let ranked = rank_events(None, Vec::new(), &RankingOptions::default());
/// assert!(matches!(ranked, NearbyEvents::Unranked(_)));
/// ```
#[must_use]
pub fn rank_events(
    observer: Option<Coordinate>,
    events: Vec<Event>,
    options: &RankingOptions,
) -> NearbyEvents {
    let Some(origin) = observer else {
        debug!(count = events.len(), "observer location unavailable; skipping ranking");
        return NearbyEvents::Unranked(events);
    };

    let mut located = Vec::with_capacity(events.len());
    let mut unlocated = Vec::new();
    for event in events {
        match event.coordinates() {
            Some(coordinate) => {
                let distance = options.formula.distance_km(origin, coordinate);
                if options.max_radius_km.is_some_and(|radius| distance > radius) {
                    continue;
                }
                located.push(RankedEvent {
                    event,
                    distance_km: Some(distance),
                });
            }
            None => unlocated.push(event),
        }
    }

    located.sort_by(|a, b| {
        let left = a.distance_km.unwrap_or(f64::INFINITY);
        let right = b.distance_km.unwrap_or(f64::INFINITY);
        left.total_cmp(&right)
    });

    debug!(
        located = located.len(),
        unlocated = unlocated.len(),
        policy = ?options.missing_coordinates,
        "ranked nearby events"
    );

    if options.missing_coordinates == MissingCoordinatePolicy::Last {
        located.extend(unlocated.into_iter().map(|event| RankedEvent {
            event,
            distance_km: None,
        }));
    }

    NearbyEvents::Ranked(located)
}

/// Events that can be placed on a map, paired with their coordinate.
#[must_use]
pub fn mappable_events(events: &[Event]) -> Vec<(&Event, Coordinate)> {
    events
        .iter()
        .filter_map(|event| event.coordinates().map(|coordinate| (event, coordinate)))
        .collect()
}

/// Map pins no further than `radius_km` from `centre`.
#[must_use]
pub fn within_radius(
    events: &[Event],
    centre: Coordinate,
    radius_km: f64,
    formula: DistanceFormula,
) -> Vec<(&Event, Coordinate)> {
    mappable_events(events)
        .into_iter()
        .filter(|(_, coordinate)| formula.distance_km(centre, *coordinate) <= radius_km)
        .collect()
}

#[cfg(test)]
#[path = "ranking_tests.rs"]
#[expect(clippy::float_arithmetic, reason = "tolerance check on a computed distance")]
mod tests;
