use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid parameter '{field}' = '{value}': {reason}")]
    InvalidParameter {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),
}

impl EngineError {
    pub fn invalid_parameter(
        field: &str,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        EngineError::InvalidParameter {
            field: field.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        EngineError::InvalidInput {
            message: message.into(),
        }
    }

    /// Parameter and input errors are caller mistakes; retrying cannot help.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::IoError(_))
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            EngineError::InvalidParameter { field, reason, .. } => {
                format!("Setting '{}' is not usable: {}", field, reason)
            }
            EngineError::InvalidInput { message } => format!("Input rejected: {}", message),
            EngineError::ConfigError { message } => format!("Configuration problem: {}", message),
            EngineError::IoError(e) => format!("Could not read or write a file: {}", e),
            EngineError::CsvError(e) => format!("Place CSV is malformed: {}", e),
            EngineError::SerializationError(e) => format!("JSON is malformed: {}", e),
            EngineError::TomlError(e) => format!("Config file is not valid TOML: {}", e),
        }
    }
}

/// Failures talking to the routing service. The orchestrator absorbs every
/// variant into the fallback path, so these never leave `build_model`.
#[derive(Error, Debug)]
pub enum RoutingError {
    #[error("Routing request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Routing service returned status {code}: {body}")]
    Status { code: u16, body: String },

    #[error("Routing response could not be parsed: {message}")]
    Parse { message: String },

    #[error("Matrix {origins}x{destinations} exceeds routing limit of {limit}")]
    DimensionExceeded {
        origins: usize,
        destinations: usize,
        limit: usize,
    },

    #[error("Routing request timed out after {millis}ms")]
    Timeout { millis: u128 },

    #[error("Routing service unavailable: {message}")]
    Unavailable { message: String },
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_parameter_message() {
        let err = EngineError::invalid_parameter("eps_km", 0.0, "must be greater than 0");
        assert_eq!(
            err.to_string(),
            "Invalid parameter 'eps_km' = '0': must be greater than 0"
        );
        assert!(!err.is_retryable());
        assert!(err.user_friendly_message().contains("eps_km"));
    }

    #[test]
    fn test_dimension_exceeded_message() {
        let err = RoutingError::DimensionExceeded {
            origins: 12,
            destinations: 12,
            limit: 10,
        };
        assert!(err.to_string().contains("12x12"));
    }
}
