//! Medoid selection: the group member with the lowest mean travel time to
//! every member (its own zero entry included). Unlike a centroid, the medoid
//! is always a real, visitable place.

use std::collections::HashSet;

use crate::domain::matrix::DurationMatrix;
use crate::domain::model::{Group, PlaceId};
use crate::utils::error::{EngineError, Result};

/// Relative tolerance under which two row means count as tied.
const MEAN_TIE_TOLERANCE: f64 = 1e-9;

fn same_mean(a: f64, b: f64) -> bool {
    (a - b).abs() <= MEAN_TIE_TOLERANCE * a.abs().max(b.abs()).max(1.0)
}

/// Ties (means equal up to float summation noise) resolve to the
/// lexicographically smallest place id.
pub fn select_medoid(group: &Group, matrix: &DurationMatrix) -> Result<PlaceId> {
    match group.members.as_slice() {
        [] => Err(EngineError::invalid_input(format!(
            "group {} has no members",
            group.id
        ))),
        [only] => Ok(only.clone()),
        members => {
            let expected: HashSet<&PlaceId> = members.iter().collect();
            let covered: HashSet<&PlaceId> = matrix.origins().iter().collect();
            if !matrix.is_square() || expected != covered || matrix.len() != members.len() {
                return Err(EngineError::invalid_input(format!(
                    "duration matrix does not cover exactly the members of group {}",
                    group.id
                )));
            }

            let mut best: Option<(&PlaceId, f64)> = None;
            for (id, row) in matrix.origins().iter().zip(matrix.rows()) {
                let mean = row.iter().sum::<f64>() / row.len() as f64;
                best = match best {
                    Some((best_id, best_mean)) if same_mean(best_mean, mean) => {
                        if id < best_id {
                            Some((id, mean))
                        } else {
                            Some((best_id, best_mean))
                        }
                    }
                    Some((best_id, best_mean)) if best_mean < mean => Some((best_id, best_mean)),
                    _ => Some((id, mean)),
                };
            }

            let (medoid, mean) = best.ok_or_else(|| {
                EngineError::invalid_input(format!("group {} has an empty matrix", group.id))
            })?;
            tracing::debug!(
                "Group {} medoid: {} (mean {:.2} min)",
                group.id,
                medoid,
                mean
            );
            Ok(medoid.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<PlaceId> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_triangle_picks_lowest_row_mean() {
        // AB = 10, BC = 15, AC = 20 -> means 10, 8.33, 11.67
        let matrix = DurationMatrix::square(
            ids(&["A", "B", "C"]),
            vec![
                vec![0.0, 10.0, 20.0],
                vec![10.0, 0.0, 15.0],
                vec![20.0, 15.0, 0.0],
            ],
        )
        .unwrap();
        let group = Group::new(0, ids(&["A", "B", "C"]));

        assert_eq!(select_medoid(&group, &matrix).unwrap(), "B");
    }

    #[test]
    fn test_singleton_needs_no_matrix() {
        let group = Group::new(4, ids(&["solo"]));
        let unrelated = DurationMatrix::zeros(ids(&["x", "y"]));
        assert_eq!(select_medoid(&group, &unrelated).unwrap(), "solo");
    }

    #[test]
    fn test_tie_breaks_on_lowest_id() {
        let matrix = DurationMatrix::square(
            ids(&["zeta", "alpha", "mid"]),
            vec![
                vec![0.0, 6.0, 6.0],
                vec![6.0, 0.0, 6.0],
                vec![6.0, 6.0, 0.0],
            ],
        )
        .unwrap();
        let group = Group::new(1, ids(&["mid", "zeta", "alpha"]));

        assert_eq!(select_medoid(&group, &matrix).unwrap(), "alpha");
    }

    #[test]
    fn test_fractional_minutes_tie_on_lowest_id() {
        // Both rows average 0.1 min (6 s, 12 s vs 18 s) but sum to
        // different floats.
        let matrix = DurationMatrix::square(
            ids(&["a", "b", "c"]),
            vec![
                vec![0.0, 6.0 / 60.0, 12.0 / 60.0],
                vec![18.0 / 60.0, 0.0, 0.0],
                vec![30.0 / 60.0, 30.0 / 60.0, 0.0],
            ],
        )
        .unwrap();
        let group = Group::new(0, ids(&["a", "b", "c"]));

        assert_eq!(select_medoid(&group, &matrix).unwrap(), "a");
    }

    #[test]
    fn test_matrix_must_match_group() {
        let matrix = DurationMatrix::zeros(ids(&["a", "b"]));
        let group = Group::new(2, ids(&["a", "c"]));
        assert!(matches!(
            select_medoid(&group, &matrix),
            Err(EngineError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_directional_matrix_uses_outgoing_rows() {
        let matrix = DurationMatrix::square(
            ids(&["a", "b"]),
            vec![vec![0.0, 30.0], vec![5.0, 0.0]],
        )
        .unwrap();
        let group = Group::new(0, ids(&["a", "b"]));
        assert_eq!(select_medoid(&group, &matrix).unwrap(), "b");
    }
}
