pub mod places;
pub mod toml_config;

pub use places::load_places;
pub use toml_config::EngineConfig;

#[cfg(feature = "cli")]
use clap::{Parser, ValueEnum};
#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Compact,
    /// One JSON object per event
    Json,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "travel-matrix")]
#[command(about = "Cluster places and build a two-level travel-time model")]
pub struct CliConfig {
    /// Places file, a JSON array or a CSV with id,latitude,longitude columns
    #[arg(long)]
    pub places: PathBuf,

    /// Engine settings in TOML
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// TRANSIT, DRIVE, WALK or BICYCLE; overrides routing.travel_mode
    #[arg(long)]
    pub travel_mode: Option<String>,

    /// Skip the routing service and use straight-line estimates only
    #[arg(long)]
    pub offline: bool,

    /// Write the model here instead of stdout
    #[arg(long)]
    pub output: Option<PathBuf>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    /// Log line format on stderr
    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// File settings (or defaults), then environment overrides.
    pub fn engine_config(&self) -> crate::utils::error::Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::from_file(path)?,
            None => EngineConfig::default(),
        };
        config.apply_env_overrides()?;
        if let Some(mode) = &self.travel_mode {
            config.routing.travel_mode = mode.parse()?;
        }
        Ok(config)
    }
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = CliConfig::parse_from([
            "travel-matrix",
            "--places",
            "places.csv",
            "--travel-mode",
            "drive",
            "--offline",
        ]);

        assert_eq!(cli.places, PathBuf::from("places.csv"));
        assert!(cli.offline);
        assert!(!cli.verbose);
        assert!(cli.output.is_none());
        assert_eq!(cli.log_format, LogFormat::Compact);
        assert_eq!(
            cli.engine_config().unwrap().routing.travel_mode,
            crate::domain::model::TravelMode::Drive
        );
    }

    #[test]
    fn test_cli_rejects_unknown_travel_mode() {
        let cli = CliConfig::parse_from(["travel-matrix", "--places", "p.json", "--travel-mode", "boat"]);
        assert!(cli.engine_config().is_err());
    }

    #[test]
    fn test_cli_json_log_format() {
        let cli = CliConfig::parse_from([
            "travel-matrix",
            "--places",
            "places.json",
            "--log-format",
            "json",
        ]);
        assert_eq!(cli.log_format, LogFormat::Json);
    }
}
