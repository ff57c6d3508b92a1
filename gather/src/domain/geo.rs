//! Geographic value objects and great-circle distance.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Validation errors for [`Coordinate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeoValidationError {
    /// Latitude was non-finite or outside `[-90, 90]`.
    InvalidLatitude {
        /// Rejected value.
        value: f64,
    },
    /// Longitude was non-finite or outside `[-180, 180]`.
    InvalidLongitude {
        /// Rejected value.
        value: f64,
    },
}

impl fmt::Display for GeoValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidLatitude { value } => {
                write!(f, "latitude must be finite and within [-90, 90] (got {value})")
            }
            Self::InvalidLongitude { value } => write!(
                f,
                "longitude must be finite and within [-180, 180] (got {value})"
            ),
        }
    }
}

impl std::error::Error for GeoValidationError {}

/// Latitude/longitude pair in degrees.
///
/// # Examples
///
/// ```
/// use gather::domain::Coordinate;
///
/// let origin = Coordinate::new(0.0, 0.0)?;
/// assert_eq!(origin.lat(), 0.0);
/// assert!(Coordinate::new(91.0, 0.0).is_err());
/// # Ok::<(), gather::domain::GeoValidationError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CoordinateDto", into = "CoordinateDto")]
pub struct Coordinate {
    lat: f64,
    lng: f64,
}

impl Coordinate {
    /// Creates a validated coordinate.
    pub fn new(lat: f64, lng: f64) -> Result<Self, GeoValidationError> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(GeoValidationError::InvalidLatitude { value: lat });
        }
        if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
            return Err(GeoValidationError::InvalidLongitude { value: lng });
        }
        Ok(Self { lat, lng })
    }

    /// Latitude in degrees.
    #[must_use]
    pub const fn lat(self) -> f64 {
        self.lat
    }

    /// Longitude in degrees.
    #[must_use]
    pub const fn lng(self) -> f64 {
        self.lng
    }
}

// Documents written by older clients use `latitude`/`longitude`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct CoordinateDto {
    #[serde(alias = "latitude")]
    lat: f64,
    #[serde(alias = "longitude")]
    lng: f64,
}

impl From<Coordinate> for CoordinateDto {
    fn from(value: Coordinate) -> Self {
        Self {
            lat: value.lat,
            lng: value.lng,
        }
    }
}

impl TryFrom<CoordinateDto> for Coordinate {
    type Error = GeoValidationError;

    fn try_from(value: CoordinateDto) -> Result<Self, Self::Error> {
        Self::new(value.lat, value.lng)
    }
}

/// Formula used to turn a pair of coordinates into kilometres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceFormula {
    /// `a = 0.5 − cos(Δlat)/2 + cos(lat1)·cos(lat2)·(1 − cos(Δlon))/2`,
    /// `d = 2R·asin(√a)`. Matches distances already shown to users.
    #[default]
    Approximate,
    /// Standard haversine, `d = 2R·atan2(√a, √(1−a))`.
    Haversine,
}

impl DistanceFormula {
    /// Distance in kilometres between two coordinates.
    ///
    /// # Examples
    ///
    /// ```
    /// use gather::domain::{Coordinate, DistanceFormula};
    ///
    /// let a = Coordinate::new(0.0, 0.0)?;
    /// let b = Coordinate::new(0.0, 1.0)?;
    /// let km = DistanceFormula::Approximate.distance_km(a, b);
    /// assert!((km - 111.19).abs() < 0.01);
    /// # Ok::<(), gather::domain::GeoValidationError>(())
    /// ```
    #[must_use]
    pub fn distance_km(self, from: Coordinate, to: Coordinate) -> f64 {
        match self {
            Self::Approximate => approximate_km(from, to),
            Self::Haversine => haversine_km(from, to),
        }
    }
}

#[expect(clippy::float_arithmetic, reason = "great-circle distance is floating point")]
fn approximate_km(from: Coordinate, to: Coordinate) -> f64 {
    let d_lat = (to.lat - from.lat).to_radians();
    let d_lng = (to.lng - from.lng).to_radians();
    let a = 0.5 - d_lat.cos() / 2.0
        + from.lat.to_radians().cos() * to.lat.to_radians().cos() * (1.0 - d_lng.cos()) / 2.0;
    EARTH_RADIUS_KM * 2.0 * a.clamp(0.0, 1.0).sqrt().asin()
}

#[expect(clippy::float_arithmetic, reason = "great-circle distance is floating point")]
fn haversine_km(from: Coordinate, to: Coordinate) -> f64 {
    let d_lat = (to.lat - from.lat).to_radians();
    let d_lng = (to.lng - from.lng).to_radians();
    let half_chord = (d_lat / 2.0).sin().powi(2)
        + from.lat.to_radians().cos() * to.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let a = half_chord.clamp(0.0, 1.0);
    EARTH_RADIUS_KM * 2.0 * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Render a distance the way event cards show it, e.g. `12.3 km away`.
#[must_use]
pub fn format_distance(km: f64) -> String {
    format!("{km:.1} km away")
}
