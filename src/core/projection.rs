//! Local planar projection in kilometers.
//!
//! Degrees are scaled with a constant 111 km per degree of latitude and
//! `111 * cos(origin latitude)` km per degree of longitude. Within roughly
//! 100 km of the origin the error stays around 1%; larger spans are not
//! corrected.

use crate::domain::model::{GeoPoint, Place, ProjectedPoint};
use crate::utils::error::{EngineError, Result};

pub const KM_PER_DEGREE_LAT: f64 = 111.0;

pub fn km_per_degree_lon(origin_latitude: f64) -> f64 {
    KM_PER_DEGREE_LAT * origin_latitude.to_radians().cos()
}

/// Arithmetic mean of the coordinates, `None` for an empty slice.
pub fn centroid(places: &[Place]) -> Option<GeoPoint> {
    if places.is_empty() {
        return None;
    }
    let n = places.len() as f64;
    let (lat, lon) = places
        .iter()
        .fold((0.0, 0.0), |(lat, lon), p| (lat + p.latitude, lon + p.longitude));
    Some(GeoPoint::new(lat / n, lon / n))
}

/// (x, y) of `point` in km relative to `origin`.
pub fn to_local_km(point: GeoPoint, origin: GeoPoint) -> (f64, f64) {
    let x = (point.longitude - origin.longitude) * km_per_degree_lon(origin.latitude);
    let y = (point.latitude - origin.latitude) * KM_PER_DEGREE_LAT;
    (x, y)
}

/// Project `places` around `origin`, or around their centroid when no
/// origin is given. Fails only when there is nothing to derive an origin from.
pub fn project(places: &[Place], origin: Option<GeoPoint>) -> Result<Vec<ProjectedPoint>> {
    let origin = match origin.or_else(|| centroid(places)) {
        Some(origin) => origin,
        None => {
            return Err(EngineError::invalid_input(
                "cannot derive a projection origin from an empty place set",
            ))
        }
    };

    Ok(places
        .iter()
        .map(|p| {
            let (x_km, y_km) = to_local_km(p.location(), origin);
            ProjectedPoint {
                id: p.id.clone(),
                x_km,
                y_km,
            }
        })
        .collect())
}

/// Straight-line distance in km with `a` as the projection origin.
pub fn planar_distance_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let (x, y) = to_local_km(b, a);
    (x * x + y * y).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_around_explicit_origin() {
        let places = vec![Place::new("p", 1.0, 1.0)];
        let projected = project(&places, Some(GeoPoint::new(0.0, 0.0))).unwrap();

        assert_eq!(projected.len(), 1);
        assert!((projected[0].x_km - 111.0).abs() < 1e-9);
        assert!((projected[0].y_km - 111.0).abs() < 1e-9);
    }

    #[test]
    fn test_project_uses_centroid_by_default() {
        let places = vec![Place::new("a", 37.50, 127.00), Place::new("b", 37.52, 127.04)];
        let projected = project(&places, None).unwrap();

        let sum_x: f64 = projected.iter().map(|p| p.x_km).sum();
        let sum_y: f64 = projected.iter().map(|p| p.y_km).sum();
        assert!(sum_x.abs() < 1e-9);
        assert!(sum_y.abs() < 1e-9);
    }

    #[test]
    fn test_longitude_scale_shrinks_with_latitude() {
        assert!((km_per_degree_lon(0.0) - 111.0).abs() < 1e-9);
        assert!((km_per_degree_lon(60.0) - 55.5).abs() < 1e-9);
    }

    #[test]
    fn test_empty_input_needs_origin() {
        assert!(matches!(
            project(&[], None),
            Err(EngineError::InvalidInput { .. })
        ));
        assert!(project(&[], Some(GeoPoint::new(0.0, 0.0))).unwrap().is_empty());
    }

    #[test]
    fn test_planar_distance() {
        let a = GeoPoint::new(0.0, 0.0);
        let b = GeoPoint::new(0.03, 0.04);
        // 3.33 km north, 4.44 km east
        assert!((planar_distance_km(a, b) - 5.55).abs() < 1e-9);
        assert_eq!(planar_distance_km(a, a), 0.0);
    }
}
