//! Contributions toward an event's shared costs.

use std::sync::Arc;

use mockable::Clock;
use serde::Serialize;
use serde_json::json;
use tracing::info;

use super::ports::{ContributionRepository, EventRepository};
use super::service_support::{map_contribution_error, map_event_error};
use super::{
    Amount, Contribution, ContributionSummary, ContributionValidationError, Error, EventId,
    Session, require_session,
};

/// Contribution list and its aggregate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionLedger {
    /// Contributions in insertion order.
    pub contributions: Vec<Contribution>,
    /// Totals.
    pub summary: ContributionSummary,
}

/// Records and aggregates contributions.
#[derive(Clone)]
pub struct ContributionService<C, E> {
    contributions: Arc<C>,
    events: Arc<E>,
    clock: Arc<dyn Clock>,
}

impl<C, E> ContributionService<C, E> {
    /// Create a service with the given ports and clock.
    #[must_use]
    pub const fn new(contributions: Arc<C>, events: Arc<E>, clock: Arc<dyn Clock>) -> Self {
        Self {
            contributions,
            events,
            clock,
        }
    }
}

impl<C, E> ContributionService<C, E>
where
    C: ContributionRepository,
    E: EventRepository,
{
    /// Record a pledge from free-text input.
    pub async fn contribute(
        &self,
        session: Option<&Session>,
        event: &EventId,
        item: &str,
        amount: &str,
    ) -> Result<Contribution, Error> {
        let user = require_session(session)?.user_id();
        let pledged = Amount::parse(amount).map_err(validation_error)?;
        let contribution =
            Contribution::new(event.clone(), user.clone(), item, pledged, self.clock.utc())
                .map_err(validation_error)?;

        if self
            .events
            .find_by_id(event)
            .await
            .map_err(map_event_error)?
            .is_none()
        {
            return Err(Error::not_found(format!("event {event} not found")));
        }

        self.contributions
            .append(&contribution)
            .await
            .map_err(map_contribution_error)?;
        info!(%event, %user, amount = pledged.value(), "contribution recorded");
        Ok(contribution)
    }

    /// Contributions for `event` with their totals.
    pub async fn ledger(&self, event: &EventId) -> Result<ContributionLedger, Error> {
        let contributions = self
            .contributions
            .list_for_event(event)
            .await
            .map_err(map_contribution_error)?;
        let summary = ContributionSummary::from_contributions(&contributions);
        Ok(ContributionLedger {
            contributions,
            summary,
        })
    }
}

fn validation_error(error: ContributionValidationError) -> Error {
    let field = match error {
        ContributionValidationError::EmptyItem => "item",
        _ => "amount",
    };
    Error::invalid_request(error.to_string()).with_details(json!({ "field": field }))
}
