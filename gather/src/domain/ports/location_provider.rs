//! Port abstraction for the device position.

use async_trait::async_trait;

use crate::domain::Coordinate;

use super::define_port_error;

define_port_error! {
    /// Errors raised by location providers.
    pub enum LocationProviderError {
        /// The position source failed.
        Unavailable { message: String } => "location unavailable: {message}",
    }
}

/// Source of the observer's coordinate.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Current position, `None` when permission was denied or no fix is
    /// available.
    async fn current_position(&self) -> Result<Option<Coordinate>, LocationProviderError>;
}

/// Provider that always reports a fixed position, or none.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixedLocation(pub Option<Coordinate>);

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn current_position(&self) -> Result<Option<Coordinate>, LocationProviderError> {
        Ok(self.0)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[tokio::test]
    async fn fixed_location_reports_its_position() {
        let here = Coordinate::new(1.0, 2.0).expect("valid coordinate");
        let provider = FixedLocation(Some(here));
        assert_eq!(provider.current_position().await, Ok(Some(here)));
    }

    #[rstest]
    #[tokio::test]
    async fn default_reports_no_position() {
        let provider = FixedLocation::default();
        assert_eq!(provider.current_position().await, Ok(None));
    }
}
