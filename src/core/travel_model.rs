use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::domain::matrix::DurationMatrix;
use crate::domain::model::{Group, GroupId, PlaceId, TravelMode};
use crate::utils::error::{EngineError, Result};

/// Diagnostics for one build. Fallback entries are indistinguishable in the
/// matrices themselves; these counters are the only place they show up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildStats {
    pub routing_calls: usize,
    pub fallback_units: usize,
    pub fallback_cells: usize,
}

/// Two-level travel-time model: exact matrices inside each group and a
/// medoid-to-medoid matrix between groups.
#[derive(Debug, Clone, Serialize)]
pub struct TravelTimeModel {
    pub travel_mode: TravelMode,
    pub groups: Vec<Group>,
    pub medoids: BTreeMap<GroupId, PlaceId>,
    pub group_matrices: BTreeMap<GroupId, DurationMatrix>,
    pub medoid_matrix: DurationMatrix,
    pub stats: BuildStats,
    #[serde(skip)]
    group_of: HashMap<PlaceId, GroupId>,
}

impl TravelTimeModel {
    pub(crate) fn new(
        travel_mode: TravelMode,
        groups: Vec<Group>,
        medoids: BTreeMap<GroupId, PlaceId>,
        group_matrices: BTreeMap<GroupId, DurationMatrix>,
        medoid_matrix: DurationMatrix,
        stats: BuildStats,
    ) -> Self {
        let group_of = groups
            .iter()
            .flat_map(|g| g.members.iter().map(move |m| (m.clone(), g.id)))
            .collect();
        Self {
            travel_mode,
            groups,
            medoids,
            group_matrices,
            medoid_matrix,
            stats,
            group_of,
        }
    }

    pub fn group_of(&self, place_id: &str) -> Option<GroupId> {
        self.group_of.get(place_id).copied()
    }

    pub fn medoid_of(&self, group_id: GroupId) -> Option<&PlaceId> {
        self.medoids.get(&group_id)
    }

    pub fn place_count(&self) -> usize {
        self.group_of.len()
    }

    /// Minutes from `from` to `to`. Places in the same group are looked up
    /// directly; otherwise the two groups' medoids stand in for them.
    pub fn duration_between(&self, from: &str, to: &str) -> Result<f64> {
        let from_group = self.require_group(from)?;
        let to_group = self.require_group(to)?;
        if from == to {
            return Ok(0.0);
        }

        let (matrix, a, b) = if from_group == to_group {
            let matrix = self.group_matrices.get(&from_group).ok_or_else(|| {
                EngineError::invalid_input(format!("no matrix for group {}", from_group))
            })?;
            (matrix, from, to)
        } else {
            let a = self.require_medoid(from_group)?;
            let b = self.require_medoid(to_group)?;
            (&self.medoid_matrix, a, b)
        };

        matrix.get(a, b).ok_or_else(|| {
            EngineError::invalid_input(format!("no duration recorded for '{}' -> '{}'", a, b))
        })
    }

    fn require_group(&self, place_id: &str) -> Result<GroupId> {
        self.group_of(place_id)
            .ok_or_else(|| EngineError::invalid_input(format!("unknown place '{}'", place_id)))
    }

    fn require_medoid(&self, group_id: GroupId) -> Result<&str> {
        self.medoid_of(group_id)
            .map(|m| m.as_str())
            .ok_or_else(|| EngineError::invalid_input(format!("group {} has no medoid", group_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<PlaceId> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn sample_model() -> TravelTimeModel {
        let groups = vec![Group::new(0, ids(&["a", "b"])), Group::new(1, ids(&["c"]))];
        let mut medoids = BTreeMap::new();
        medoids.insert(0, "b".to_string());
        medoids.insert(1, "c".to_string());

        let mut group_matrices = BTreeMap::new();
        group_matrices.insert(
            0,
            DurationMatrix::square(ids(&["a", "b"]), vec![vec![0.0, 4.0], vec![6.0, 0.0]]).unwrap(),
        );
        group_matrices.insert(1, DurationMatrix::zeros(ids(&["c"])));

        let medoid_matrix =
            DurationMatrix::square(ids(&["b", "c"]), vec![vec![0.0, 25.0], vec![27.0, 0.0]])
                .unwrap();

        TravelTimeModel::new(
            TravelMode::Transit,
            groups,
            medoids,
            group_matrices,
            medoid_matrix,
            BuildStats::default(),
        )
    }

    #[test]
    fn test_same_group_lookup_is_direct() {
        let model = sample_model();
        assert_eq!(model.duration_between("a", "b").unwrap(), 4.0);
        assert_eq!(model.duration_between("b", "a").unwrap(), 6.0);
        assert_eq!(model.duration_between("a", "a").unwrap(), 0.0);
    }

    #[test]
    fn test_cross_group_lookup_goes_through_medoids() {
        let model = sample_model();
        assert_eq!(model.duration_between("a", "c").unwrap(), 25.0);
        assert_eq!(model.duration_between("c", "a").unwrap(), 27.0);
    }

    #[test]
    fn test_unknown_place_is_invalid_input() {
        let model = sample_model();
        assert!(matches!(
            model.duration_between("a", "nowhere"),
            Err(EngineError::InvalidInput { .. })
        ));
        assert_eq!(model.place_count(), 3);
        assert_eq!(model.group_of("c"), Some(1));
    }
}
