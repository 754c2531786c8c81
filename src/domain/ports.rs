use crate::domain::model::{GeoPoint, TravelMode};
use crate::utils::error::RoutingError;
use async_trait::async_trait;

/// One origin/destination pair as reported by the routing service.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteElement {
    pub origin_index: usize,
    pub destination_index: usize,
    pub duration_seconds: Option<f64>,
    /// False when the service flagged this pair as failed.
    pub ok: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteMatrix {
    pub elements: Vec<RouteElement>,
}

impl RouteMatrix {
    /// Duration for a pair, `None` when the pair is missing or flagged.
    pub fn seconds(&self, origin: usize, destination: usize) -> Option<f64> {
        self.elements
            .iter()
            .find(|e| e.origin_index == origin && e.destination_index == destination)
            .filter(|e| e.ok)
            .and_then(|e| e.duration_seconds)
            .filter(|s| s.is_finite() && *s >= 0.0)
    }
}

/// Travel-time backend. Implementations are long-lived and shared between
/// concurrent matrix requests.
#[async_trait]
pub trait RoutingService: Send + Sync {
    async fn compute_durations(
        &self,
        origins: &[GeoPoint],
        destinations: &[GeoPoint],
        mode: TravelMode,
    ) -> Result<RouteMatrix, RoutingError>;

    /// Largest number of origins (and of destinations) one request may carry.
    fn max_dimension(&self) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seconds_skips_flagged_and_missing_pairs() {
        let matrix = RouteMatrix {
            elements: vec![
                RouteElement {
                    origin_index: 0,
                    destination_index: 1,
                    duration_seconds: Some(120.0),
                    ok: true,
                },
                RouteElement {
                    origin_index: 1,
                    destination_index: 0,
                    duration_seconds: Some(60.0),
                    ok: false,
                },
            ],
        };

        assert_eq!(matrix.seconds(0, 1), Some(120.0));
        assert_eq!(matrix.seconds(1, 0), None);
        assert_eq!(matrix.seconds(1, 1), None);
    }
}
