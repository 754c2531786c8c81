// Routing backends behind the `RoutingService` port.
pub mod offline;
pub mod routes_api;

pub use offline::OfflineRouting;
pub use routes_api::RoutesApiClient;
