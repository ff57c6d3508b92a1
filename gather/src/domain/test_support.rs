//! Builders shared by service unit tests.

use std::sync::Arc;

use chrono::{DateTime, Local, TimeZone, Utc};
use mockable::Clock;

use super::{
    Coordinate, CreatorSnapshot, Event, EventDetails, EventId, Price, Title, User, UserId,
};

pub(crate) fn user(id: &str, name: &str) -> User {
    User::try_from_strings(id, name).expect("valid user")
}

pub(crate) fn uid(id: &str) -> UserId {
    UserId::new(id).expect("valid id")
}

pub(crate) fn event(id: &str, host: &str, coordinates: Option<(f64, f64)>, day: u32) -> Event {
    let details = EventDetails {
        title: Title::new(format!("Event {id}")).expect("valid title"),
        description: "Something fun".to_owned(),
        location_text: "Somewhere".to_owned(),
        coordinates: coordinates
            .map(|(lat, lng)| Coordinate::new(lat, lng).expect("valid coordinate")),
        date: Utc
            .with_ymd_and_hms(2026, 7, day, 18, 0, 0)
            .single()
            .expect("valid date"),
        image: None,
        price: Price::free(),
    };
    let snapshot = CreatorSnapshot {
        uid: uid(host),
        handle: None,
        photo_url: None,
    };
    Event::new(EventId::new(id).expect("valid id"), details, snapshot, None).expect("valid event")
}

pub(crate) fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 4, 9, 30, 0)
        .single()
        .expect("valid fixture timestamp")
}

struct FixtureClock {
    utc_now: DateTime<Utc>,
}

impl Clock for FixtureClock {
    fn local(&self) -> DateTime<Local> {
        self.utc_now.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.utc_now
    }
}

pub(crate) fn fixture_clock() -> Arc<dyn Clock> {
    Arc::new(FixtureClock {
        utc_now: fixed_time(),
    })
}
