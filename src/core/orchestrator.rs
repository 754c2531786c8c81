//! Concurrent fetch-or-fallback assembly of the two-level travel-time model.
//!
//! Every matrix request is a self-contained job: it asks the routing service
//! for one block of durations and, on any failure, fills that block (or just
//! the failed pairs) from the straight-line estimator. Jobs fan out through a
//! bounded `buffer_unordered` stream and are merged by slot once all of them
//! have finished, so the model never depends on completion order.

use futures::stream::{self, StreamExt};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::core::fallback::FallbackEstimator;
use crate::core::medoid::select_medoid;
use crate::core::travel_model::{BuildStats, TravelTimeModel};
use crate::domain::matrix::DurationMatrix;
use crate::domain::model::{GeoPoint, Group, GroupId, MinuteRounding, Place, PlaceId, TravelMode};
use crate::domain::ports::{RouteMatrix, RoutingService};
use crate::utils::error::{EngineError, Result, RoutingError};

pub const DEFAULT_MAX_IN_FLIGHT: usize = 4;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub max_in_flight: usize,
    pub request_timeout: Duration,
    /// Deadline for the whole build. Jobs still pending when it passes are
    /// cancelled and answered by the fallback estimator.
    pub build_timeout: Option<Duration>,
    pub rounding: MinuteRounding,
    pub fallback: FallbackEstimator,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            build_timeout: None,
            rounding: MinuteRounding::default(),
            fallback: FallbackEstimator::default(),
        }
    }
}

/// One square matrix to assemble: a group, or the set of medoids.
struct MatrixUnit {
    label: String,
    stops: Vec<(PlaceId, GeoPoint)>,
}

impl MatrixUnit {
    fn new(label: String, places: &[&Place]) -> Self {
        Self {
            label,
            stops: places.iter().map(|p| (p.id.clone(), p.location())).collect(),
        }
    }

    fn len(&self) -> usize {
        self.stops.len()
    }

    fn ids(&self) -> Vec<PlaceId> {
        self.stops.iter().map(|(id, _)| id.clone()).collect()
    }
}

/// One routing request covering a rectangular block of a unit.
struct MatrixJob {
    slot: usize,
    label: String,
    rows: Range<usize>,
    cols: Range<usize>,
    origins: Vec<(PlaceId, GeoPoint)>,
    destinations: Vec<(PlaceId, GeoPoint)>,
}

struct JobOutcome {
    slot: usize,
    rows: Range<usize>,
    cols: Range<usize>,
    block: Vec<Vec<f64>>,
    called: bool,
    failed: bool,
    fallback_cells: usize,
}

pub struct MatrixOrchestrator {
    routing: Arc<dyn RoutingService>,
    config: OrchestratorConfig,
}

impl MatrixOrchestrator {
    pub fn new(routing: Arc<dyn RoutingService>, config: OrchestratorConfig) -> Self {
        Self { routing, config }
    }

    /// Build the travel-time model for an already bounded set of groups.
    /// Routing failures never surface here; only malformed input does.
    pub async fn build_model(
        &self,
        groups: Vec<Group>,
        places: &[Place],
        mode: TravelMode,
    ) -> Result<TravelTimeModel> {
        let resolved = validate_groups(&groups, places)?;
        let deadline = self.config.build_timeout.map(|d| Instant::now() + d);
        let mut stats = BuildStats::default();

        // Phase 1: one unit per multi-member group.
        let mut group_matrices: BTreeMap<GroupId, DurationMatrix> = BTreeMap::new();
        let mut units = Vec::new();
        let mut unit_groups = Vec::new();
        for (group, members) in groups.iter().zip(&resolved) {
            if group.len() == 1 {
                group_matrices.insert(group.id, DurationMatrix::zeros(group.members.clone()));
                continue;
            }
            units.push(MatrixUnit::new(format!("group {}", group.id), members));
            unit_groups.push(group.id);
        }

        let assembled = self.assemble(units, mode, deadline, &mut stats).await?;
        for (group_id, matrix) in unit_groups.into_iter().zip(assembled) {
            group_matrices.insert(group_id, matrix);
        }

        let mut medoids: BTreeMap<GroupId, PlaceId> = BTreeMap::new();
        let mut medoid_places: BTreeMap<GroupId, &Place> = BTreeMap::new();
        for (group, members) in groups.iter().zip(&resolved) {
            let matrix = group_matrices.get(&group.id).ok_or_else(|| {
                EngineError::invalid_input(format!("no matrix assembled for group {}", group.id))
            })?;
            let medoid = select_medoid(group, matrix)?;
            let place = members
                .iter()
                .copied()
                .find(|p| p.id == medoid)
                .ok_or_else(|| {
                    EngineError::invalid_input(format!(
                        "medoid '{}' is not a member of group {}",
                        medoid, group.id
                    ))
                })?;
            medoid_places.insert(group.id, place);
            medoids.insert(group.id, medoid);
        }

        // Phase 2: the medoid set.
        let medoid_matrix = if medoid_places.len() < 2 {
            DurationMatrix::zeros(medoids.values().cloned().collect())
        } else {
            let stops: Vec<&Place> = medoid_places.values().copied().collect();
            let unit = MatrixUnit::new("medoids".to_string(), &stops);
            self.assemble(vec![unit], mode, deadline, &mut stats)
                .await?
                .pop()
                .ok_or_else(|| EngineError::invalid_input("medoid matrix was not assembled"))?
        };

        tracing::info!(
            "Travel-time model ready: {} groups, {} routing calls, {} fallback jobs, {} fallback cells",
            groups.len(),
            stats.routing_calls,
            stats.fallback_units,
            stats.fallback_cells
        );

        Ok(TravelTimeModel::new(
            mode,
            groups,
            medoids,
            group_matrices,
            medoid_matrix,
            stats,
        ))
    }

    /// Fan all jobs of `units` out, then merge the blocks back per unit.
    async fn assemble(
        &self,
        units: Vec<MatrixUnit>,
        mode: TravelMode,
        deadline: Option<Instant>,
        stats: &mut BuildStats,
    ) -> Result<Vec<DurationMatrix>> {
        let max_dim = self.routing.max_dimension().max(1);
        let mut jobs = Vec::new();
        for (slot, unit) in units.iter().enumerate() {
            let n = unit.len();
            if n > max_dim {
                tracing::debug!(
                    "{} has {} places, tiling into {}x{} requests",
                    unit.label,
                    n,
                    max_dim,
                    max_dim
                );
            }
            for (rows, cols) in tiles(n, max_dim) {
                jobs.push(MatrixJob {
                    slot,
                    label: unit.label.clone(),
                    origins: pairs(unit, rows.clone()),
                    destinations: pairs(unit, cols.clone()),
                    rows,
                    cols,
                });
            }
        }

        let outcomes: Vec<JobOutcome> = stream::iter(jobs)
            .map(|job| self.fetch_or_fallback(job, mode, deadline))
            .buffer_unordered(self.config.max_in_flight.max(1))
            .collect()
            .await;

        let mut tables: Vec<Vec<Vec<f64>>> = units
            .iter()
            .map(|u| vec![vec![0.0; u.len()]; u.len()])
            .collect();
        for outcome in outcomes {
            stats.routing_calls += outcome.called as usize;
            stats.fallback_units += outcome.failed as usize;
            stats.fallback_cells += outcome.fallback_cells;
            let table = &mut tables[outcome.slot];
            for (bi, row) in outcome.rows.clone().zip(outcome.block.iter()) {
                for (bj, value) in outcome.cols.clone().zip(row.iter()) {
                    table[bi][bj] = *value;
                }
            }
        }

        units
            .into_iter()
            .zip(tables)
            .map(|(unit, table)| DurationMatrix::square(unit.ids(), table))
            .collect()
    }

    async fn fetch_or_fallback(
        &self,
        job: MatrixJob,
        mode: TravelMode,
        deadline: Option<Instant>,
    ) -> JobOutcome {
        let past_deadline = deadline.is_some_and(|d| Instant::now() >= d);
        let (called, response) = if past_deadline {
            (
                false,
                Err(RoutingError::Unavailable {
                    message: "build deadline passed before the request was sent".to_string(),
                }),
            )
        } else {
            (true, self.fetch(&job, mode, deadline).await)
        };

        let estimate = |i: usize, j: usize| {
            self.config
                .fallback
                .minutes(job.origins[i].1, job.destinations[j].1)
        };

        let mut fallback_cells = 0;
        let failed = response.is_err();
        let block: Vec<Vec<f64>> = match &response {
            Ok(route) => (0..job.origins.len())
                .map(|i| {
                    (0..job.destinations.len())
                        .map(|j| {
                            if job.origins[i].0 == job.destinations[j].0 {
                                return 0.0;
                            }
                            match route.seconds(i, j) {
                                Some(seconds) => self.config.rounding.seconds_to_minutes(seconds),
                                None => {
                                    fallback_cells += 1;
                                    estimate(i, j)
                                }
                            }
                        })
                        .collect()
                })
                .collect(),
            Err(_) => (0..job.origins.len())
                .map(|i| {
                    (0..job.destinations.len())
                        .map(|j| {
                            if job.origins[i].0 == job.destinations[j].0 {
                                0.0
                            } else {
                                fallback_cells += 1;
                                estimate(i, j)
                            }
                        })
                        .collect()
                })
                .collect(),
        };

        match &response {
            Err(e) => tracing::warn!(
                "Routing failed for {} ({}x{}), using straight-line estimates: {}",
                job.label,
                job.origins.len(),
                job.destinations.len(),
                e
            ),
            Ok(_) if fallback_cells > 0 => tracing::warn!(
                "Routing returned {} failed pairs for {}, using straight-line estimates for them",
                fallback_cells,
                job.label
            ),
            Ok(_) => tracing::debug!(
                "Computed {}x{} matrix for {}",
                job.origins.len(),
                job.destinations.len(),
                job.label
            ),
        }

        JobOutcome {
            slot: job.slot,
            rows: job.rows,
            cols: job.cols,
            block,
            called,
            failed,
            fallback_cells,
        }
    }

    async fn fetch(
        &self,
        job: &MatrixJob,
        mode: TravelMode,
        deadline: Option<Instant>,
    ) -> std::result::Result<RouteMatrix, RoutingError> {
        let origins: Vec<GeoPoint> = job.origins.iter().map(|(_, p)| *p).collect();
        let destinations: Vec<GeoPoint> = job.destinations.iter().map(|(_, p)| *p).collect();

        let request_timeout = self.config.request_timeout;
        let timed = async {
            match tokio::time::timeout(
                request_timeout,
                self.routing.compute_durations(&origins, &destinations, mode),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(RoutingError::Timeout {
                    millis: request_timeout.as_millis(),
                }),
            }
        };

        match deadline {
            Some(deadline) => match tokio::time::timeout_at(deadline, timed).await {
                Ok(result) => result,
                Err(_) => Err(RoutingError::Timeout {
                    millis: self.config.build_timeout.unwrap_or_default().as_millis(),
                }),
            },
            None => timed.await,
        }
    }
}

/// Check that `groups` partition a subset of `places` and resolve every
/// member to its place, in member order.
fn validate_groups<'a>(groups: &[Group], places: &'a [Place]) -> Result<Vec<Vec<&'a Place>>> {
    if groups.is_empty() {
        return Err(EngineError::invalid_input(
            "at least one group is required to build a travel-time model",
        ));
    }

    let lookup: HashMap<&str, &Place> = places.iter().map(|p| (p.id.as_str(), p)).collect();
    let mut seen_groups = HashSet::new();
    let mut seen_places = HashSet::new();
    let mut resolved = Vec::with_capacity(groups.len());
    for group in groups {
        if group.is_empty() {
            return Err(EngineError::invalid_input(format!("group {} is empty", group.id)));
        }
        if !seen_groups.insert(group.id) {
            return Err(EngineError::invalid_input(format!(
                "group id {} is used twice",
                group.id
            )));
        }
        let mut members = Vec::with_capacity(group.len());
        for member in &group.members {
            let place = lookup.get(member.as_str()).copied().ok_or_else(|| {
                EngineError::invalid_input(format!(
                    "group {} references unknown place '{}'",
                    group.id, member
                ))
            })?;
            if !seen_places.insert(member.as_str()) {
                return Err(EngineError::invalid_input(format!(
                    "place '{}' belongs to more than one group",
                    member
                )));
            }
            members.push(place);
        }
        resolved.push(members);
    }
    Ok(resolved)
}

fn pairs(unit: &MatrixUnit, range: Range<usize>) -> Vec<(PlaceId, GeoPoint)> {
    unit.stops[range].to_vec()
}

/// Cover an `n x n` matrix with blocks of at most `max_dim x max_dim`.
fn tiles(n: usize, max_dim: usize) -> Vec<(Range<usize>, Range<usize>)> {
    let bands: Vec<Range<usize>> = (0..n)
        .step_by(max_dim)
        .map(|start| start..start.saturating_add(max_dim).min(n))
        .collect();
    bands
        .iter()
        .flat_map(|rows| bands.iter().map(move |cols| (rows.clone(), cols.clone())))
        .collect()
}
