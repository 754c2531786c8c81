use crate::core::projection::planar_distance_km;
use crate::domain::model::GeoPoint;

pub const DEFAULT_FALLBACK_SPEED_KMH: f64 = 30.0;

/// Straight-line travel estimate used whenever the routing service cannot
/// answer: planar distance at a constant average speed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FallbackEstimator {
    speed_kmh: f64,
}

impl Default for FallbackEstimator {
    fn default() -> Self {
        Self {
            speed_kmh: DEFAULT_FALLBACK_SPEED_KMH,
        }
    }
}

impl FallbackEstimator {
    /// Non-positive or non-finite speeds keep the default.
    pub fn new(speed_kmh: f64) -> Self {
        if speed_kmh.is_finite() && speed_kmh > 0.0 {
            Self { speed_kmh }
        } else {
            Self::default()
        }
    }

    pub fn speed_kmh(&self) -> f64 {
        self.speed_kmh
    }

    pub fn minutes(&self, from: GeoPoint, to: GeoPoint) -> f64 {
        planar_distance_km(from, to) / self.speed_kmh * 60.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minutes_match_distance_over_speed() {
        let estimator = FallbackEstimator::default();
        let a = GeoPoint::new(0.0, 0.0);
        let b = GeoPoint::new(0.03, 0.04);

        // 5.55 km at 30 km/h
        let expected = 5.55 / 30.0 * 60.0;
        assert!((estimator.minutes(a, b) - expected).abs() < 1e-9);
        assert_eq!(estimator.minutes(a, a), 0.0);
    }

    #[test]
    fn test_invalid_speed_keeps_default() {
        assert_eq!(FallbackEstimator::new(0.0).speed_kmh(), 30.0);
        assert_eq!(FallbackEstimator::new(f64::NAN).speed_kmh(), 30.0);
        assert_eq!(FallbackEstimator::new(15.0).speed_kmh(), 15.0);
    }
}
