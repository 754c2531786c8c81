pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::EngineConfig;

pub use adapters::{OfflineRouting, RoutesApiClient};
pub use core::{BuildStats, OrchestratorConfig, TravelMatrixEngine, TravelTimeModel};
pub use domain::matrix::DurationMatrix;
pub use domain::model::{ClusteringParams, GeoPoint, Group, MinuteRounding, Place, TravelMode};
pub use domain::ports::{RouteElement, RouteMatrix, RoutingService};
pub use utils::error::{EngineError, Result, RoutingError};
