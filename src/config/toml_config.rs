use crate::adapters::offline::OfflineRouting;
use crate::adapters::routes_api::{RoutesApiClient, DEFAULT_MAX_DIMENSION, DEFAULT_ROUTES_ENDPOINT};
use crate::core::fallback::{FallbackEstimator, DEFAULT_FALLBACK_SPEED_KMH};
use crate::core::orchestrator::{OrchestratorConfig, DEFAULT_MAX_IN_FLIGHT};
use crate::domain::model::{ClusteringParams, MinuteRounding, TravelMode};
use crate::domain::ports::RoutingService;
use crate::utils::error::{EngineError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub const API_KEY_ENV: &str = "GOOGLE_MAPS_API_KEY";
pub const EPS_KM_ENV: &str = "DBSCAN_EPS_KM";
pub const MIN_SAMPLES_ENV: &str = "DBSCAN_MIN_SAMPLES";

/// Engine settings file. Every section and key is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub clustering: ClusteringParams,
    pub routing: RoutingConfig,
    pub fallback: FallbackConfig,
    pub matrix: MatrixConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub travel_mode: TravelMode,
    pub timeout_seconds: u64,
    pub max_in_flight: usize,
    pub max_matrix_dimension: usize,
    pub build_timeout_seconds: Option<u64>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ROUTES_ENDPOINT.to_string(),
            api_key: None,
            travel_mode: TravelMode::default(),
            timeout_seconds: 30,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            max_matrix_dimension: DEFAULT_MAX_DIMENSION,
            build_timeout_seconds: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    pub speed_kmh: f64,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            speed_kmh: DEFAULT_FALLBACK_SPEED_KMH,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatrixConfig {
    pub rounding: MinuteRounding,
}

impl EngineConfig {
    /// Load from a TOML file, substituting `${VAR}` references.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;
        Ok(toml::from_str(&processed_content)?)
    }

    /// Replace `${VAR}` with the environment value. Unset variables are left
    /// as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| EngineError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// Apply `DBSCAN_EPS_KM`, `DBSCAN_MIN_SAMPLES` and, when no key is
    /// configured, `GOOGLE_MAPS_API_KEY`.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(EPS_KM_ENV) {
            self.clustering.eps_km = raw.trim().parse().map_err(|_| EngineError::ConfigError {
                message: format!("{} must be a number, got '{}'", EPS_KM_ENV, raw),
            })?;
        }
        if let Some(raw) = lookup(MIN_SAMPLES_ENV) {
            self.clustering.min_samples =
                raw.trim().parse().map_err(|_| EngineError::ConfigError {
                    message: format!("{} must be a whole number, got '{}'", MIN_SAMPLES_ENV, raw),
                })?;
        }
        if self.api_key().is_none() {
            if let Some(key) = lookup(API_KEY_ENV).filter(|k| !k.trim().is_empty()) {
                self.routing.api_key = Some(key);
            }
        }
        Ok(())
    }

    /// Configured API key, ignoring blanks and unresolved `${VAR}` references.
    pub fn api_key(&self) -> Option<&str> {
        self.routing
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty() && !(k.starts_with("${") && k.ends_with('}')))
    }

    pub fn clustering_params(&self) -> ClusteringParams {
        self.clustering.clone()
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            max_in_flight: self.routing.max_in_flight,
            request_timeout: Duration::from_secs(self.routing.timeout_seconds),
            build_timeout: self.routing.build_timeout_seconds.map(Duration::from_secs),
            rounding: self.matrix.rounding,
            fallback: FallbackEstimator::new(self.fallback.speed_kmh),
        }
    }

    /// The HTTP client when a key is available, otherwise offline estimates.
    pub fn routing_service(&self, offline: bool) -> Result<Arc<dyn RoutingService>> {
        if offline {
            tracing::info!("Offline mode: every duration is a straight-line estimate");
            return Ok(Arc::new(OfflineRouting));
        }
        match self.api_key() {
            Some(key) => Ok(Arc::new(RoutesApiClient::new(
                self.routing.endpoint.clone(),
                key,
                Duration::from_secs(self.routing.timeout_seconds),
                self.routing.max_matrix_dimension,
            )?)),
            None => {
                tracing::warn!(
                    "No routing API key configured (set {} or routing.api_key); using straight-line estimates",
                    API_KEY_ENV
                );
                Ok(Arc::new(OfflineRouting))
            }
        }
    }
}

impl Validate for EngineConfig {
    fn validate(&self) -> Result<()> {
        self.clustering.validate()?;
        validation::validate_url("routing.endpoint", &self.routing.endpoint)?;
        validation::validate_positive_number("routing.timeout_seconds", self.routing.timeout_seconds as usize, 1)?;
        validation::validate_positive_number("routing.max_in_flight", self.routing.max_in_flight, 1)?;
        validation::validate_range(
            "routing.max_matrix_dimension",
            self.routing.max_matrix_dimension,
            1,
            25,
        )?;
        if let Some(seconds) = self.routing.build_timeout_seconds {
            validation::validate_positive_number("routing.build_timeout_seconds", seconds as usize, 1)?;
        }
        validation::validate_positive_f64("fallback.speed_kmh", self.fallback.speed_kmh)?;
        Ok(())
    }
}
