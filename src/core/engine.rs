use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::core::density;
use crate::core::orchestrator::{MatrixOrchestrator, OrchestratorConfig};
use crate::core::projection;
use crate::core::splitter::BoundedSplitter;
use crate::core::travel_model::TravelTimeModel;
use crate::domain::model::{ClusteringParams, Group, Place, TravelMode};
use crate::domain::ports::RoutingService;
use crate::utils::error::{EngineError, Result};

/// Entry point: places in, travel-time model out.
pub struct TravelMatrixEngine {
    params: ClusteringParams,
    orchestrator: MatrixOrchestrator,
}

impl TravelMatrixEngine {
    pub fn new(
        params: ClusteringParams,
        routing: Arc<dyn RoutingService>,
        config: OrchestratorConfig,
    ) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            orchestrator: MatrixOrchestrator::new(routing, config),
        })
    }

    /// Density clustering followed by size bounding. Every place ends up in
    /// exactly one group of at most `max_group_size` members.
    pub fn partition(&self, places: &[Place]) -> Result<Vec<Group>> {
        validate_places(places)?;

        let projected = projection::project(places, None)?;
        let assignment = density::cluster(&projected, self.params.eps_km, self.params.min_samples)?;
        let noise = assignment.noise.len();
        let initial = assignment.into_groups();

        let splitter = BoundedSplitter::new(
            self.params.max_group_size,
            self.params.split_seed,
            self.params.split_attempts,
        )?;
        let lookup: HashMap<&str, &Place> = places.iter().map(|p| (p.id.as_str(), p)).collect();
        let groups = splitter.enforce_all(initial, &lookup)?;

        tracing::info!(
            "Clustered {} places into {} groups ({} noise singletons, max size {})",
            places.len(),
            groups.len(),
            noise,
            self.params.max_group_size
        );
        Ok(groups)
    }

    pub async fn build_model(&self, places: &[Place], mode: TravelMode) -> Result<TravelTimeModel> {
        let groups = self.partition(places)?;
        self.orchestrator.build_model(groups, places, mode).await
    }
}

fn validate_places(places: &[Place]) -> Result<()> {
    if places.is_empty() {
        return Err(EngineError::invalid_input(
            "at least one place is required to build a travel-time model",
        ));
    }

    let mut seen = HashSet::new();
    for place in places {
        if !seen.insert(place.id.as_str()) {
            return Err(EngineError::invalid_input(format!(
                "place id '{}' appears more than once",
                place.id
            )));
        }
        let lat_ok = place.latitude.is_finite() && (-90.0..=90.0).contains(&place.latitude);
        let lon_ok = place.longitude.is_finite() && (-180.0..=180.0).contains(&place.longitude);
        if !lat_ok || !lon_ok {
            return Err(EngineError::invalid_input(format!(
                "place '{}' has invalid coordinates ({}, {})",
                place.id, place.latitude, place.longitude
            )));
        }
    }
    Ok(())
}
