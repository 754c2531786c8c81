//! Size bounding for groups that exceed what one routing request can carry.
//!
//! An oversized group is bisected with seeded 2-means on coordinates
//! projected around the group's own centroid, and each half is split again
//! until every piece fits. Members are sorted by id first, so the result
//! depends only on the member set, the seed and the attempt count.

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

use crate::core::projection;
use crate::domain::model::{
    Group, Place, PlaceId, DEFAULT_MAX_GROUP_SIZE, DEFAULT_SPLIT_ATTEMPTS, DEFAULT_SPLIT_SEED,
};
use crate::utils::error::{EngineError, Result};

const MAX_LLOYD_ITERATIONS: usize = 100;

#[derive(Debug, Clone)]
pub struct BoundedSplitter {
    max_size: usize,
    seed: u64,
    attempts: usize,
}

impl Default for BoundedSplitter {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_GROUP_SIZE,
            seed: DEFAULT_SPLIT_SEED,
            attempts: DEFAULT_SPLIT_ATTEMPTS,
        }
    }
}

struct Bisection {
    labels: Vec<bool>,
    inertia: f64,
}

impl BoundedSplitter {
    pub fn new(max_size: usize, seed: u64, attempts: usize) -> Result<Self> {
        if max_size < 1 {
            return Err(EngineError::invalid_parameter(
                "max_group_size",
                max_size,
                "must be at least 1",
            ));
        }
        if attempts < 1 {
            return Err(EngineError::invalid_parameter(
                "split_attempts",
                attempts,
                "must be at least 1",
            ));
        }
        Ok(Self {
            max_size,
            seed,
            attempts,
        })
    }

    /// Split `group` into pieces of at most `max_size` members. The pieces
    /// are numbered from 0; callers renumber them when merging runs.
    pub fn enforce_max_size(&self, group: &Group, places: &HashMap<&str, &Place>) -> Result<Vec<Group>> {
        let mut members = Vec::with_capacity(group.len());
        for id in &group.members {
            match places.get(id.as_str()) {
                Some(place) => members.push(*place),
                None => {
                    return Err(EngineError::invalid_input(format!(
                        "group {} references unknown place '{}'",
                        group.id, id
                    )))
                }
            }
        }
        members.sort_by(|a, b| a.id.cmp(&b.id));

        let mut pieces = Vec::new();
        self.split_into(members, &mut pieces);

        if pieces.len() > 1 {
            tracing::debug!(
                "Group {} ({} places) split into {} groups of at most {}",
                group.id,
                group.len(),
                pieces.len(),
                self.max_size
            );
        }

        Ok(pieces
            .into_iter()
            .enumerate()
            .map(|(id, members)| Group::new(id, members))
            .collect())
    }

    /// Apply `enforce_max_size` to every group and renumber the result
    /// `0..M`, ordered by each group's smallest member id.
    pub fn enforce_all(&self, groups: Vec<Group>, places: &HashMap<&str, &Place>) -> Result<Vec<Group>> {
        let mut all: Vec<Vec<PlaceId>> = Vec::with_capacity(groups.len());
        for group in &groups {
            for piece in self.enforce_max_size(group, places)? {
                all.push(piece.members);
            }
        }
        for members in all.iter_mut() {
            members.sort();
        }
        all.sort_by(|a, b| a.first().cmp(&b.first()));

        Ok(all
            .into_iter()
            .enumerate()
            .map(|(id, members)| Group::new(id, members))
            .collect())
    }

    fn split_into(&self, members: Vec<&Place>, out: &mut Vec<Vec<PlaceId>>) {
        if members.len() <= self.max_size {
            out.push(members.into_iter().map(|p| p.id.clone()).collect());
            return;
        }

        let (left, right) = match self.bisect(&members) {
            Some(labels) => {
                let mut left = Vec::new();
                let mut right = Vec::new();
                for (place, &is_right) in members.iter().zip(labels.iter()) {
                    if is_right {
                        right.push(*place);
                    } else {
                        left.push(*place);
                    }
                }
                (left, right)
            }
            None => {
                // Coincident points: fall back to an index-order halving.
                let mut left = members;
                let right = left.split_off(left.len() / 2);
                (left, right)
            }
        };

        self.split_into(left, out);
        self.split_into(right, out);
    }

    /// Best 2-means labelling over all attempts, or `None` when no attempt
    /// produced two non-empty halves.
    fn bisect(&self, members: &[&Place]) -> Option<Vec<bool>> {
        let places: Vec<Place> = members.iter().map(|p| (*p).clone()).collect();
        let projected = projection::project(&places, None).ok()?;
        let coords: Vec<(f64, f64)> = projected.iter().map(|p| (p.x_km, p.y_km)).collect();

        let first = coords[0];
        if coords.iter().all(|c| *c == first) {
            return None;
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut best: Option<Bisection> = None;
        for _ in 0..self.attempts {
            if let Some(candidate) = two_means(&coords, &mut rng) {
                let better = best
                    .as_ref()
                    .map_or(true, |b| candidate.inertia < b.inertia);
                if better {
                    best = Some(candidate);
                }
            }
        }
        best.map(|b| b.labels)
    }
}

fn two_means(coords: &[(f64, f64)], rng: &mut StdRng) -> Option<Bisection> {
    let n = coords.len();
    let a = rng.gen_range(0..n);
    // k-means++ seeding; a point coinciding with the first centroid has weight 0.
    let weights: Vec<f64> = coords.iter().map(|c| sq_dist(*c, coords[a])).collect();
    let b = WeightedIndex::new(&weights).ok()?.sample(rng);

    let mut centroids = [coords[a], coords[b]];
    let mut labels = vec![false; n];
    for iteration in 0..MAX_LLOYD_ITERATIONS {
        let mut changed = iteration == 0;
        for (i, c) in coords.iter().enumerate() {
            let to_right = sq_dist(*c, centroids[1]) < sq_dist(*c, centroids[0]);
            if labels[i] != to_right {
                labels[i] = to_right;
                changed = true;
            }
        }
        if !changed {
            break;
        }
        centroids = [mean_of(coords, &labels, false)?, mean_of(coords, &labels, true)?];
    }

    let inertia = coords
        .iter()
        .zip(labels.iter())
        .map(|(c, &right)| sq_dist(*c, centroids[right as usize]))
        .sum();

    Some(Bisection { labels, inertia })
}

fn mean_of(coords: &[(f64, f64)], labels: &[bool], side: bool) -> Option<(f64, f64)> {
    let (mut x, mut y, mut count) = (0.0, 0.0, 0usize);
    for (c, &label) in coords.iter().zip(labels.iter()) {
        if label == side {
            x += c.0;
            y += c.1;
            count += 1;
        }
    }
    if count == 0 {
        return None;
    }
    Some((x / count as f64, y / count as f64))
}

fn sq_dist(a: (f64, f64), b: (f64, f64)) -> f64 {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    dx * dx + dy * dy
}
