#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use travel_matrix::{GeoPoint, Place, RouteElement, RouteMatrix, RoutingError, RoutingService, TravelMode};

/// In-process routing double. Every pair costs 60 seconds per 0.01 degree of
/// latitude plus longitude difference. Records call count and the peak
/// number of concurrent requests.
pub struct ScriptedRouting {
    pub calls: AtomicUsize,
    pub peak_in_flight: AtomicUsize,
    in_flight: AtomicUsize,
    fail_all: bool,
    delay: Duration,
    max_dimension: usize,
    flagged_origin: Option<GeoPoint>,
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ScriptedRouting {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            fail_all: false,
            delay: Duration::ZERO,
            max_dimension: 10,
            flagged_origin: None,
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail_all = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_max_dimension(mut self, max_dimension: usize) -> Self {
        self.max_dimension = max_dimension;
        self
    }

    /// Report every pair leaving `origin` as failed.
    pub fn flagging_origin(mut self, origin: GeoPoint) -> Self {
        self.flagged_origin = Some(origin);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

pub fn scripted_seconds(from: GeoPoint, to: GeoPoint) -> f64 {
    ((from.latitude - to.latitude).abs() + (from.longitude - to.longitude).abs()) * 6000.0
}

#[async_trait]
impl RoutingService for ScriptedRouting {
    async fn compute_durations(
        &self,
        origins: &[GeoPoint],
        destinations: &[GeoPoint],
        _mode: TravelMode,
    ) -> Result<RouteMatrix, RoutingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(&self.in_flight);
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail_all {
            return Err(RoutingError::Unavailable {
                message: "scripted outage".to_string(),
            });
        }

        let mut elements = Vec::new();
        for (i, o) in origins.iter().enumerate() {
            for (j, d) in destinations.iter().enumerate() {
                let flagged = self.flagged_origin == Some(*o);
                elements.push(RouteElement {
                    origin_index: i,
                    destination_index: j,
                    duration_seconds: Some(scripted_seconds(*o, *d)),
                    ok: !flagged,
                });
            }
        }
        Ok(RouteMatrix { elements })
    }

    fn max_dimension(&self) -> usize {
        self.max_dimension
    }
}

/// `count` places on a small grid around (`lat`, `lon`), 0.002 degrees apart.
pub fn cluster_around(prefix: &str, lat: f64, lon: f64, count: usize) -> Vec<Place> {
    (0..count)
        .map(|i| {
            Place::new(
                format!("{}{:02}", prefix, i),
                lat + (i / 5) as f64 * 0.002,
                lon + (i % 5) as f64 * 0.002,
            )
        })
        .collect()
}
