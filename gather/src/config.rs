//! Client tunables loaded via OrthoConfig.
//!
//! Every value is optional; missing values fall back to the defaults the
//! domain types carry. Environment variables use the `GATHER_` prefix, for
//! example `GATHER_DISTANCE_FORMULA=haversine`.

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::domain::{DistanceFormula, MissingCoordinatePolicy, RankingOptions, SocialLimits};

/// Rejected configuration value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SettingsError {
    /// The distance formula name is not recognised.
    #[error("unknown distance formula `{0}`; expected `approximate` or `haversine`")]
    UnknownFormula(String),
    /// The missing-coordinate policy name is not recognised.
    #[error("unknown missing-coordinate policy `{0}`; expected `last` or `exclude`")]
    UnknownPolicy(String),
    /// The radius is zero, negative or not finite.
    #[error("max radius must be a positive number of kilometres, got {0}")]
    InvalidRadius(f64),
    /// A result limit of zero would hide everything.
    #[error("{0} must be at least 1")]
    ZeroLimit(&'static str),
}

/// Configuration values for ranking and social screens.
#[derive(Debug, Clone, Default, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "GATHER")]
pub struct GatherSettings {
    /// `approximate` (default) or `haversine`.
    pub distance_formula: Option<String>,
    /// `last` (default) or `exclude`.
    pub missing_coordinates: Option<String>,
    /// Drop located events further away than this many kilometres.
    pub max_radius_km: Option<f64>,
    /// Events shown under "recently joined" on a profile.
    pub recent_joined_limit: Option<usize>,
    /// Maximum user search results.
    pub search_limit: Option<usize>,
}

impl GatherSettings {
    /// Ranking options built from the configured values.
    pub fn ranking_options(&self) -> Result<RankingOptions, SettingsError> {
        let formula = match self.distance_formula.as_deref().map(str::trim) {
            None => DistanceFormula::default(),
            Some(name) if name.eq_ignore_ascii_case("approximate") => DistanceFormula::Approximate,
            Some(name) if name.eq_ignore_ascii_case("haversine") => DistanceFormula::Haversine,
            Some(other) => return Err(SettingsError::UnknownFormula(other.to_owned())),
        };
        let missing_coordinates = match self.missing_coordinates.as_deref().map(str::trim) {
            None => MissingCoordinatePolicy::default(),
            Some(name) if name.eq_ignore_ascii_case("last") => MissingCoordinatePolicy::Last,
            Some(name) if name.eq_ignore_ascii_case("exclude") => MissingCoordinatePolicy::Exclude,
            Some(other) => return Err(SettingsError::UnknownPolicy(other.to_owned())),
        };
        if let Some(radius) = self.max_radius_km
            && !(radius.is_finite() && radius > 0.0)
        {
            return Err(SettingsError::InvalidRadius(radius));
        }
        Ok(RankingOptions {
            formula,
            missing_coordinates,
            max_radius_km: self.max_radius_km,
        })
    }

    /// Social screen limits, falling back to the defaults.
    pub fn social_limits(&self) -> Result<SocialLimits, SettingsError> {
        let defaults = SocialLimits::default();
        let recent_joined = positive(
            self.recent_joined_limit,
            defaults.recent_joined,
            "recent_joined_limit",
        )?;
        let search = positive(self.search_limit, defaults.search, "search_limit")?;
        Ok(SocialLimits {
            recent_joined,
            search,
        })
    }
}

const fn positive(
    value: Option<usize>,
    fallback: usize,
    name: &'static str,
) -> Result<usize, SettingsError> {
    match value {
        Some(0) => Err(SettingsError::ZeroLimit(name)),
        Some(limit) => Ok(limit),
        None => Ok(fallback),
    }
}
