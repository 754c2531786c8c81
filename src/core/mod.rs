pub mod density;
pub mod engine;
pub mod fallback;
pub mod medoid;
pub mod orchestrator;
pub mod projection;
pub mod splitter;
pub mod travel_model;
pub mod union_find;

pub use engine::TravelMatrixEngine;
pub use orchestrator::{MatrixOrchestrator, OrchestratorConfig};
pub use travel_model::{BuildStats, TravelTimeModel};
