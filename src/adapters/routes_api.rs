use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::model::{GeoPoint, TravelMode};
use crate::domain::ports::{RouteElement, RouteMatrix, RoutingService};
use crate::utils::error::{EngineError, Result, RoutingError};

pub const DEFAULT_ROUTES_ENDPOINT: &str =
    "https://routes.googleapis.com/distanceMatrix/v2:computeRouteMatrix";

/// Transit requests are capped at 100 elements, so 10x10 is the largest
/// square block that is valid for every travel mode.
pub const DEFAULT_MAX_DIMENSION: usize = 10;

const FIELD_MASK: &str = "originIndex,destinationIndex,duration,distanceMeters,status,condition";

/// Client for the Google Routes `computeRouteMatrix` endpoint.
#[derive(Debug, Clone)]
pub struct RoutesApiClient {
    client: Client,
    endpoint: String,
    api_key: String,
    max_dimension: usize,
}

impl RoutesApiClient {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
        max_dimension: usize,
    ) -> Result<Self> {
        if max_dimension == 0 {
            return Err(EngineError::invalid_parameter(
                "routing.max_dimension",
                max_dimension,
                "must be at least 1",
            ));
        }
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            EngineError::ConfigError {
                message: format!("failed to build HTTP client: {}", e),
            }
        })?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            max_dimension,
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MatrixRequest<'a> {
    origins: Vec<Waypoint>,
    destinations: Vec<Waypoint>,
    travel_mode: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    routing_preference: Option<&'a str>,
}

#[derive(Serialize)]
struct Waypoint {
    waypoint: Location,
}

#[derive(Serialize)]
struct Location {
    location: LatLngWrapper,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LatLngWrapper {
    lat_lng: LatLng,
}

#[derive(Serialize)]
struct LatLng {
    latitude: f64,
    longitude: f64,
}

impl From<&GeoPoint> for Waypoint {
    fn from(point: &GeoPoint) -> Self {
        Waypoint {
            waypoint: Location {
                location: LatLngWrapper {
                    lat_lng: LatLng {
                        latitude: point.latitude,
                        longitude: point.longitude,
                    },
                },
            },
        }
    }
}

// Proto3 JSON omits zero values, so index 0 arrives as a missing field.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ResponseElement {
    #[serde(default)]
    origin_index: usize,
    #[serde(default)]
    destination_index: usize,
    duration: Option<String>,
    status: Option<ElementStatus>,
    condition: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ElementStatus {
    #[serde(default)]
    code: i32,
}

impl ResponseElement {
    fn into_route_element(self) -> RouteElement {
        let status_ok = self.status.as_ref().map_or(true, |s| s.code == 0);
        let route_found = self.condition.as_deref() != Some("ROUTE_NOT_FOUND");
        let duration_seconds = self.duration.as_deref().and_then(parse_duration_seconds);
        RouteElement {
            origin_index: self.origin_index,
            destination_index: self.destination_index,
            ok: status_ok && route_found && duration_seconds.is_some(),
            duration_seconds,
        }
    }
}

/// Parse a protobuf duration string such as `"300s"` or `"12.5s"`.
fn parse_duration_seconds(raw: &str) -> Option<f64> {
    raw.trim()
        .strip_suffix('s')?
        .parse::<f64>()
        .ok()
        .filter(|s| s.is_finite() && *s >= 0.0)
}

#[async_trait]
impl RoutingService for RoutesApiClient {
    async fn compute_durations(
        &self,
        origins: &[GeoPoint],
        destinations: &[GeoPoint],
        mode: TravelMode,
    ) -> std::result::Result<RouteMatrix, RoutingError> {
        if origins.is_empty() || destinations.is_empty() {
            return Ok(RouteMatrix::default());
        }
        if origins.len() > self.max_dimension || destinations.len() > self.max_dimension {
            return Err(RoutingError::DimensionExceeded {
                origins: origins.len(),
                destinations: destinations.len(),
                limit: self.max_dimension,
            });
        }

        let body = MatrixRequest {
            origins: origins.iter().map(Waypoint::from).collect(),
            destinations: destinations.iter().map(Waypoint::from).collect(),
            travel_mode: mode.as_str(),
            routing_preference: (mode == TravelMode::Drive).then_some("TRAFFIC_AWARE_OPTIMAL"),
        };

        tracing::debug!(
            "POST {} ({}x{}, {})",
            self.endpoint,
            origins.len(),
            destinations.len(),
            mode
        );
        let response = self
            .client
            .post(&self.endpoint)
            .header("X-Goog-Api-Key", &self.api_key)
            .header("X-Goog-FieldMask", FIELD_MASK)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RoutingError::Status {
                code: status.as_u16(),
                body,
            });
        }

        let text = response.text().await?;
        let elements: Vec<ResponseElement> =
            serde_json::from_str(&text).map_err(|e| RoutingError::Parse {
                message: e.to_string(),
            })?;

        let elements: Vec<RouteElement> = elements
            .into_iter()
            .map(ResponseElement::into_route_element)
            .filter(|e| e.origin_index < origins.len() && e.destination_index < destinations.len())
            .collect();

        tracing::debug!("Routing returned {} elements", elements.len());
        Ok(RouteMatrix { elements })
    }

    fn max_dimension(&self) -> usize {
        self.max_dimension
    }
}
