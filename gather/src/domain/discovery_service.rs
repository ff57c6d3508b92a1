//! Nearby event discovery.
//!
//! Reads the event list, refreshes each host snapshot from the current
//! profile where possible, and ranks by distance from the device position.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use tracing::{debug, warn};

use super::ports::{EventRepository, LocationProvider, UserRepository};
use super::service_support::{map_event_error, map_user_error};
use super::{
    Coordinate, Error, Event, EventId, NearbyEvents, RankingOptions, User, UserId,
    mappable_events, rank_events, within_radius,
};

/// Discovery queries over the event list.
#[derive(Clone)]
pub struct NearbyEventsService<E, U, L> {
    events: Arc<E>,
    users: Arc<U>,
    location: Arc<L>,
    options: RankingOptions,
}

impl<E, U, L> NearbyEventsService<E, U, L> {
    /// Create a service with the given ports and ranking options.
    #[must_use]
    pub const fn new(
        events: Arc<E>,
        users: Arc<U>,
        location: Arc<L>,
        options: RankingOptions,
    ) -> Self {
        Self {
            events,
            users,
            location,
            options,
        }
    }
}

impl<E, U, L> NearbyEventsService<E, U, L>
where
    E: EventRepository,
    U: UserRepository,
    L: LocationProvider,
{
    /// Events ranked by distance from the device, or unranked when the
    /// position is unavailable.
    pub async fn nearby(&self) -> Result<NearbyEvents, Error> {
        let observer = self.observer().await;
        let listed = self.events.list().await.map_err(map_event_error)?;
        let events = self.with_current_hosts(listed).await?;
        Ok(rank_events(observer, events, &self.options))
    }

    /// Pins for the map screen: every event with a coordinate, limited to
    /// the configured radius when both it and the device position are known.
    pub async fn map_pins(&self) -> Result<Vec<(Event, Coordinate)>, Error> {
        let events = self.events.list().await.map_err(map_event_error)?;
        let pins = match (self.observer().await, self.options.max_radius_km) {
            (Some(centre), Some(radius)) => {
                within_radius(&events, centre, radius, self.options.formula)
            }
            _ => mappable_events(&events),
        };
        Ok(pins
            .into_iter()
            .map(|(event, coordinate)| (event.clone(), coordinate))
            .collect())
    }

    /// One event with its host refreshed. A missing event is `NotFound`.
    pub async fn event(&self, id: &EventId) -> Result<Event, Error> {
        let mut event = self
            .events
            .find_by_id(id)
            .await
            .map_err(map_event_error)?
            .ok_or_else(|| Error::not_found(format!("event {id} not found")))?;
        if let Some(host) = self
            .users
            .find_by_id(&event.created_by().uid)
            .await
            .map_err(map_user_error)?
        {
            event.refresh_creator(&host);
        }
        Ok(event)
    }

    async fn observer(&self) -> Option<Coordinate> {
        match self.location.current_position().await {
            Ok(position) => position,
            Err(err) => {
                warn!(error = %err, "location lookup failed; showing unranked events");
                None
            }
        }
    }

    async fn with_current_hosts(&self, mut events: Vec<Event>) -> Result<Vec<Event>, Error> {
        let mut hosts: HashMap<UserId, Option<User>> = HashMap::new();
        for event in &mut events {
            let uid = event.created_by().uid.clone();
            if let Entry::Vacant(slot) = hosts.entry(uid.clone()) {
                slot.insert(self.users.find_by_id(&uid).await.map_err(map_user_error)?);
            }
            match hosts.get(&uid) {
                Some(Some(host)) => event.refresh_creator(host),
                _ => debug!(
                    event = %event.id(),
                    host = %uid,
                    "host profile missing; keeping snapshot"
                ),
            }
        }
        Ok(events)
    }
}

#[cfg(test)]
#[path = "discovery_service_tests.rs"]
mod tests;
