use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::utils::error::{EngineError, Result};

pub type PlaceId = String;
pub type GroupId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// A place record as handed over by the caller. Only `id` and the
/// coordinates are read; `payload` is carried through untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Place {
    pub id: PlaceId,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub payload: serde_json::Value,
}

impl Place {
    pub fn new(id: impl Into<PlaceId>, latitude: f64, longitude: f64) -> Self {
        Self {
            id: id.into(),
            latitude,
            longitude,
            payload: serde_json::Value::Null,
        }
    }

    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectedPoint {
    pub id: PlaceId,
    pub x_km: f64,
    pub y_km: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Group {
    pub id: GroupId,
    pub members: Vec<PlaceId>,
}

impl Group {
    pub fn new(id: GroupId, members: Vec<PlaceId>) -> Self {
        Self { id, members }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, place_id: &str) -> bool {
        self.members.iter().any(|m| m == place_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TravelMode {
    #[default]
    Transit,
    Drive,
    Walk,
    Bicycle,
}

impl TravelMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TravelMode::Transit => "TRANSIT",
            TravelMode::Drive => "DRIVE",
            TravelMode::Walk => "WALK",
            TravelMode::Bicycle => "BICYCLE",
        }
    }
}

impl fmt::Display for TravelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TravelMode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TRANSIT" => Ok(TravelMode::Transit),
            "DRIVE" | "DRIVING" => Ok(TravelMode::Drive),
            "WALK" | "WALKING" => Ok(TravelMode::Walk),
            "BICYCLE" | "BICYCLING" => Ok(TravelMode::Bicycle),
            other => Err(EngineError::invalid_parameter(
                "travel_mode",
                other,
                "expected one of TRANSIT, DRIVE, WALK, BICYCLE",
            )),
        }
    }
}

/// How routing durations in seconds are turned into minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MinuteRounding {
    /// Fractional minutes, `seconds / 60`.
    #[default]
    Exact,
    Nearest,
    Truncate,
}

impl MinuteRounding {
    pub fn seconds_to_minutes(&self, seconds: f64) -> f64 {
        let minutes = seconds / 60.0;
        match self {
            MinuteRounding::Exact => minutes,
            MinuteRounding::Nearest => minutes.round(),
            MinuteRounding::Truncate => minutes.trunc(),
        }
    }
}

pub const DEFAULT_EPS_KM: f64 = 7.0;
pub const DEFAULT_MIN_SAMPLES: usize = 2;
pub const DEFAULT_MAX_GROUP_SIZE: usize = 10;
pub const DEFAULT_SPLIT_SEED: u64 = 42;
pub const DEFAULT_SPLIT_ATTEMPTS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringParams {
    pub eps_km: f64,
    pub min_samples: usize,
    pub max_group_size: usize,
    pub split_seed: u64,
    pub split_attempts: usize,
}

impl Default for ClusteringParams {
    fn default() -> Self {
        Self {
            eps_km: DEFAULT_EPS_KM,
            min_samples: DEFAULT_MIN_SAMPLES,
            max_group_size: DEFAULT_MAX_GROUP_SIZE,
            split_seed: DEFAULT_SPLIT_SEED,
            split_attempts: DEFAULT_SPLIT_ATTEMPTS,
        }
    }
}

impl ClusteringParams {
    pub fn validate(&self) -> Result<()> {
        if !self.eps_km.is_finite() || self.eps_km <= 0.0 {
            return Err(EngineError::invalid_parameter(
                "eps_km",
                self.eps_km,
                "must be a finite number greater than 0",
            ));
        }
        if self.min_samples < 1 {
            return Err(EngineError::invalid_parameter(
                "min_samples",
                self.min_samples,
                "must be at least 1",
            ));
        }
        if self.max_group_size < 1 {
            return Err(EngineError::invalid_parameter(
                "max_group_size",
                self.max_group_size,
                "must be at least 1",
            ));
        }
        if self.split_attempts < 1 {
            return Err(EngineError::invalid_parameter(
                "split_attempts",
                self.split_attempts,
                "must be at least 1",
            ));
        }
        Ok(())
    }
}
