//! Density-based clustering (DBSCAN) over projected coordinates.
//!
//! A point is a core point when at least `min_samples` points, itself
//! included, lie within `eps_km`. Core points within `eps_km` of each other
//! share a cluster. A non-core point within reach of a core point is a border
//! point and joins the cluster of its nearest core neighbor (lowest index on
//! ties), so membership never depends on expansion order. Everything else is
//! noise.

use std::collections::HashMap;

use rstar::{PointDistance, RTree, RTreeObject, AABB};

use crate::core::union_find::UnionFind;
use crate::domain::model::{Group, PlaceId, ProjectedPoint};
use crate::utils::error::{EngineError, Result};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupAssignment {
    pub clusters: Vec<Vec<PlaceId>>,
    pub noise: Vec<PlaceId>,
}

impl GroupAssignment {
    /// Clusters first, then one singleton group per noise point.
    pub fn into_groups(self) -> Vec<Group> {
        self.clusters
            .into_iter()
            .chain(self.noise.into_iter().map(|id| vec![id]))
            .enumerate()
            .map(|(id, members)| Group::new(id, members))
            .collect()
    }
}

/// A projected point tagged with its input index for R-tree queries.
#[derive(Debug, Clone, Copy)]
struct IndexedPoint {
    idx: usize,
    x_km: f64,
    y_km: f64,
}

impl RTreeObject for IndexedPoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.x_km, self.y_km])
    }
}

impl PointDistance for IndexedPoint {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.x_km - point[0];
        let dy = self.y_km - point[1];
        dx * dx + dy * dy
    }
}

fn build_rtree(points: &[ProjectedPoint]) -> RTree<IndexedPoint> {
    let indexed: Vec<IndexedPoint> = points
        .iter()
        .enumerate()
        .map(|(idx, p)| IndexedPoint {
            idx,
            x_km: p.x_km,
            y_km: p.y_km,
        })
        .collect();
    RTree::bulk_load(indexed)
}

/// Indices of every point within `eps` of `p` (inclusive), itself included,
/// in ascending order.
fn neighbors(tree: &RTree<IndexedPoint>, p: &ProjectedPoint, eps: f64) -> Vec<usize> {
    let mut found: Vec<usize> = tree
        .locate_within_distance([p.x_km, p.y_km], eps * eps)
        .map(|ip| ip.idx)
        .collect();
    found.sort_unstable();
    found
}

fn squared_distance(a: &ProjectedPoint, b: &ProjectedPoint) -> f64 {
    let dx = a.x_km - b.x_km;
    let dy = a.y_km - b.y_km;
    dx * dx + dy * dy
}

pub fn cluster(points: &[ProjectedPoint], eps_km: f64, min_samples: usize) -> Result<GroupAssignment> {
    if !eps_km.is_finite() || eps_km <= 0.0 {
        return Err(EngineError::invalid_parameter(
            "eps_km",
            eps_km,
            "must be a finite number greater than 0",
        ));
    }
    if min_samples < 1 {
        return Err(EngineError::invalid_parameter(
            "min_samples",
            min_samples,
            "must be at least 1",
        ));
    }

    let n = points.len();
    if n == 0 {
        return Ok(GroupAssignment::default());
    }

    let tree = build_rtree(points);
    let neighborhoods: Vec<Vec<usize>> = points.iter().map(|p| neighbors(&tree, p, eps_km)).collect();
    let is_core: Vec<bool> = neighborhoods.iter().map(|nb| nb.len() >= min_samples).collect();

    let mut uf = UnionFind::new(n);
    for i in (0..n).filter(|&i| is_core[i]) {
        for &j in neighborhoods[i].iter().filter(|&&j| is_core[j]) {
            uf.union(i, j);
        }
    }

    // Each point's representative core, or None for noise.
    let mut anchor: Vec<Option<usize>> = vec![None; n];
    for i in 0..n {
        if is_core[i] {
            anchor[i] = Some(i);
            continue;
        }
        anchor[i] = neighborhoods[i]
            .iter()
            .copied()
            .filter(|&j| is_core[j])
            .min_by(|&a, &b| {
                squared_distance(&points[i], &points[a])
                    .total_cmp(&squared_distance(&points[i], &points[b]))
                    .then(a.cmp(&b))
            });
    }

    // Clusters are numbered by first appearance in input order.
    let mut cluster_of_root: HashMap<usize, usize> = HashMap::new();
    let mut clusters: Vec<Vec<PlaceId>> = Vec::new();
    let mut noise = Vec::new();
    for i in 0..n {
        match anchor[i] {
            Some(core) => {
                let root = uf.find(core);
                let slot = *cluster_of_root.entry(root).or_insert_with(|| {
                    clusters.push(Vec::new());
                    clusters.len() - 1
                });
                clusters[slot].push(points[i].id.clone());
            }
            None => noise.push(points[i].id.clone()),
        }
    }

    tracing::debug!(
        "DBSCAN over {} points: {} clusters, {} noise (eps={}km, min_samples={})",
        n,
        clusters.len(),
        noise.len(),
        eps_km,
        min_samples
    );

    Ok(GroupAssignment { clusters, noise })
}
