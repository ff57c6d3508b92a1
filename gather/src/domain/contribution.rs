//! Contributions toward an event's shared costs.
//!
//! Amounts keep full precision; rounding happens only in [`format_amount`].

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{EventId, UserId};

/// Validation errors for contribution input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContributionValidationError {
    /// The amount field was blank.
    EmptyAmount,
    /// The amount was not a finite decimal number.
    InvalidAmount {
        /// Text as entered.
        input: String,
    },
    /// The amount was negative.
    NegativeAmount,
    /// The item label was blank.
    EmptyItem,
}

impl fmt::Display for ContributionValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyAmount => write!(f, "amount must not be empty"),
            Self::InvalidAmount { input } => write!(f, "amount '{input}' is not a number"),
            Self::NegativeAmount => write!(f, "amount must not be negative"),
            Self::EmptyItem => write!(f, "item must not be empty"),
        }
    }
}

impl std::error::Error for ContributionValidationError {}

/// Non-negative, finite money amount.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Amount(f64);

impl Amount {
    /// Parse user-entered text.
    ///
    /// # Examples
    ///
    /// ```
    /// use gather::domain::Amount;
    ///
    /// assert_eq!(Amount::parse(" 12.50 ")?.value(), 12.5);
    /// assert!(Amount::parse("twelve").is_err());
    /// # Ok::<(), gather::domain::ContributionValidationError>(())
    /// ```
    pub fn parse(text: &str) -> Result<Self, ContributionValidationError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ContributionValidationError::EmptyAmount);
        }
        let value: f64 =
            trimmed
                .parse()
                .map_err(|_| ContributionValidationError::InvalidAmount {
                    input: trimmed.to_owned(),
                })?;
        Self::from_value(value).map_err(|err| match err {
            ContributionValidationError::NegativeAmount => err,
            _ => ContributionValidationError::InvalidAmount {
                input: trimmed.to_owned(),
            },
        })
    }

    /// Validate a numeric amount.
    pub fn from_value(value: f64) -> Result<Self, ContributionValidationError> {
        if !value.is_finite() {
            return Err(ContributionValidationError::InvalidAmount {
                input: value.to_string(),
            });
        }
        if value < 0.0 {
            return Err(ContributionValidationError::NegativeAmount);
        }
        Ok(Self(value))
    }

    /// Amount as a float.
    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }
}

impl From<Amount> for f64 {
    fn from(value: Amount) -> Self {
        value.0
    }
}

impl TryFrom<f64> for Amount {
    type Error = ContributionValidationError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

/// Format an amount for display, rounded half away from zero to two
/// decimals.
#[must_use]
#[expect(clippy::float_arithmetic, reason = "currency rounding on floating amounts")]
pub fn format_amount(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    format!("{rounded:.2}")
}

/// A single pledge toward an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contribution {
    /// Record id.
    pub id: String,
    /// Event the pledge belongs to.
    pub event_id: EventId,
    /// Contributor.
    pub user_id: UserId,
    /// What is being brought or paid for.
    pub item: String,
    /// Amount pledged.
    pub amount: Amount,
    /// Server timestamp.
    pub created_at: DateTime<Utc>,
}

impl Contribution {
    /// Build a new contribution with a generated id.
    pub fn new(
        event_id: EventId,
        user_id: UserId,
        item: &str,
        amount: Amount,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ContributionValidationError> {
        let label = item.trim();
        if label.is_empty() {
            return Err(ContributionValidationError::EmptyItem);
        }
        Ok(Self {
            id: Uuid::new_v4().simple().to_string(),
            event_id,
            user_id,
            item: label.to_owned(),
            amount,
            created_at,
        })
    }
}

/// Totals for one event.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionSummary {
    /// Sum of all amounts.
    pub total: f64,
    /// Distinct contributors.
    pub share_count: usize,
    /// `total / share_count`, or zero with no contributors.
    pub per_person_share: f64,
}

impl ContributionSummary {
    /// Aggregate a contribution list.
    #[must_use]
    #[expect(clippy::float_arithmetic, reason = "per-person share is a float division")]
    pub fn from_contributions(contributions: &[Contribution]) -> Self {
        let total: f64 = contributions.iter().map(|c| c.amount.value()).sum();
        let share_count = contributions
            .iter()
            .map(|c| &c.user_id)
            .collect::<BTreeSet<_>>()
            .len();
        let per_person_share = if share_count == 0 {
            0.0
        } else {
            #[expect(
                clippy::cast_precision_loss,
                reason = "contributor counts are far below 2^52"
            )]
            let divisor = share_count as f64;
            total / divisor
        };
        Self {
            total,
            share_count,
            per_person_share,
        }
    }
}
