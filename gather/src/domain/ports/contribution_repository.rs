//! Port abstraction for per-event contribution lists.

use async_trait::async_trait;

use crate::domain::{Contribution, EventId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by contribution repository adapters.
    pub enum ContributionRepositoryError {
        /// Backend could not be reached.
        Connection { message: String } =>
            "contribution repository connection failed: {message}",
        /// Read or write was rejected.
        Query { message: String } => "contribution repository query failed: {message}",
    }
}

/// Append-only contribution sub-collection of an event.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContributionRepository: Send + Sync {
    /// Append a contribution.
    async fn append(&self, contribution: &Contribution) -> Result<(), ContributionRepositoryError>;

    /// Contributions for `event` in insertion order.
    async fn list_for_event(
        &self,
        event: &EventId,
    ) -> Result<Vec<Contribution>, ContributionRepositoryError>;
}
