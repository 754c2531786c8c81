use async_trait::async_trait;

use crate::domain::model::{GeoPoint, TravelMode, DEFAULT_MAX_GROUP_SIZE};
use crate::domain::ports::{RouteMatrix, RoutingService};
use crate::utils::error::RoutingError;

/// Routing backend that is never reachable. Every matrix built through it
/// consists of straight-line estimates, which is what `--offline` runs and
/// keyless deployments rely on.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineRouting;

#[async_trait]
impl RoutingService for OfflineRouting {
    async fn compute_durations(
        &self,
        _origins: &[GeoPoint],
        _destinations: &[GeoPoint],
        _mode: TravelMode,
    ) -> Result<RouteMatrix, RoutingError> {
        Err(RoutingError::Unavailable {
            message: "offline mode, no routing service configured".to_string(),
        })
    }

    fn max_dimension(&self) -> usize {
        DEFAULT_MAX_GROUP_SIZE
    }
}
