use serde::Serialize;
use std::collections::HashMap;

use crate::domain::model::PlaceId;
use crate::utils::error::{EngineError, Result};

/// Travel durations in minutes between an ordered list of origins and an
/// ordered list of destinations. The id lists define the index order, so a
/// lookup is always made by place id rather than by a bare position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DurationMatrix {
    origins: Vec<PlaceId>,
    destinations: Vec<PlaceId>,
    minutes: Vec<Vec<f64>>,
    #[serde(skip)]
    origin_index: HashMap<PlaceId, usize>,
    #[serde(skip)]
    destination_index: HashMap<PlaceId, usize>,
}

impl DurationMatrix {
    /// Square zero matrix over `ids`.
    pub fn zeros(ids: Vec<PlaceId>) -> Self {
        let n = ids.len();
        Self::build(ids.clone(), ids, vec![vec![0.0; n]; n])
    }

    /// Square matrix whose diagonal is forced to 0.
    pub fn square(ids: Vec<PlaceId>, mut minutes: Vec<Vec<f64>>) -> Result<Self> {
        check_shape(ids.len(), ids.len(), &minutes)?;
        for (i, row) in minutes.iter_mut().enumerate() {
            row[i] = 0.0;
        }
        Ok(Self::build(ids.clone(), ids, minutes))
    }

    pub fn rectangular(
        origins: Vec<PlaceId>,
        destinations: Vec<PlaceId>,
        minutes: Vec<Vec<f64>>,
    ) -> Result<Self> {
        check_shape(origins.len(), destinations.len(), &minutes)?;
        Ok(Self::build(origins, destinations, minutes))
    }

    fn build(origins: Vec<PlaceId>, destinations: Vec<PlaceId>, minutes: Vec<Vec<f64>>) -> Self {
        let origin_index = index_of(&origins);
        let destination_index = index_of(&destinations);
        Self {
            origins,
            destinations,
            minutes,
            origin_index,
            destination_index,
        }
    }

    pub fn origins(&self) -> &[PlaceId] {
        &self.origins
    }

    pub fn destinations(&self) -> &[PlaceId] {
        &self.destinations
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.minutes
    }

    pub fn is_square(&self) -> bool {
        self.origins == self.destinations
    }

    pub fn len(&self) -> usize {
        self.origins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.origins.is_empty()
    }

    pub fn at(&self, origin: usize, destination: usize) -> Option<f64> {
        self.minutes.get(origin)?.get(destination).copied()
    }

    pub fn get(&self, origin: &str, destination: &str) -> Option<f64> {
        let i = *self.origin_index.get(origin)?;
        let j = *self.destination_index.get(destination)?;
        self.at(i, j)
    }

    pub fn row_of(&self, origin: &str) -> Option<&[f64]> {
        let i = *self.origin_index.get(origin)?;
        self.minutes.get(i).map(|row| row.as_slice())
    }
}

fn index_of(ids: &[PlaceId]) -> HashMap<PlaceId, usize> {
    ids.iter()
        .enumerate()
        .map(|(i, id)| (id.clone(), i))
        .collect()
}

fn check_shape(rows: usize, cols: usize, minutes: &[Vec<f64>]) -> Result<()> {
    if minutes.len() != rows || minutes.iter().any(|row| row.len() != cols) {
        return Err(EngineError::invalid_input(format!(
            "duration table does not match a {}x{} id layout",
            rows, cols
        )));
    }
    if minutes.iter().flatten().any(|v| !v.is_finite() || *v < 0.0) {
        return Err(EngineError::invalid_input(
            "durations must be finite and non-negative",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<PlaceId> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_square_forces_zero_diagonal() {
        let matrix =
            DurationMatrix::square(ids(&["a", "b"]), vec![vec![5.0, 3.0], vec![4.0, 7.0]]).unwrap();

        assert_eq!(matrix.get("a", "a"), Some(0.0));
        assert_eq!(matrix.get("b", "b"), Some(0.0));
        assert_eq!(matrix.get("a", "b"), Some(3.0));
        assert_eq!(matrix.get("b", "a"), Some(4.0));
        assert!(matrix.is_square());
    }

    #[test]
    fn test_shape_mismatch_is_rejected() {
        let result = DurationMatrix::square(ids(&["a", "b"]), vec![vec![0.0, 1.0]]);
        assert!(matches!(result, Err(EngineError::InvalidInput { .. })));

        let negative = DurationMatrix::square(ids(&["a", "b"]), vec![vec![0.0, -1.0], vec![1.0, 0.0]]);
        assert!(negative.is_err());
    }

    #[test]
    fn test_lookup_by_id_for_unknown_place() {
        let matrix = DurationMatrix::zeros(ids(&["a"]));
        assert_eq!(matrix.get("a", "a"), Some(0.0));
        assert_eq!(matrix.get("a", "z"), None);
        assert!(matrix.row_of("z").is_none());
    }

    #[test]
    fn test_rectangular_keeps_direction() {
        let matrix = DurationMatrix::rectangular(
            ids(&["a", "b"]),
            ids(&["x", "y", "z"]),
            vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]],
        )
        .unwrap();

        assert!(!matrix.is_square());
        assert_eq!(matrix.get("b", "z"), Some(6.0));
        assert_eq!(matrix.at(0, 1), Some(2.0));
        assert_eq!(matrix.row_of("a"), Some(&[1.0, 2.0, 3.0][..]));
        assert_eq!(matrix.get("x", "a"), None);
    }
}
