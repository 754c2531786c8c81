use clap::Parser;
use std::process::ExitCode;
use travel_matrix::config::{load_places, LogFormat};
use travel_matrix::utils::{logger, validation::Validate};
use travel_matrix::{CliConfig, EngineError, TravelMatrixEngine};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = CliConfig::parse();
    match cli.log_format {
        LogFormat::Compact => logger::init_cli_logger(cli.verbose),
        LogFormat::Json => logger::init_json_logger(cli.verbose),
    }

    tracing::info!("Starting travel-matrix CLI");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Build failed: {}", e);
            eprintln!("{}", e.user_friendly_message());
            if e.is_retryable() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

async fn run(cli: &CliConfig) -> Result<(), EngineError> {
    let config = cli.engine_config()?;
    config.validate()?;

    let places = load_places(&cli.places)?;
    let routing = config.routing_service(cli.offline)?;
    let engine = TravelMatrixEngine::new(
        config.clustering_params(),
        routing,
        config.orchestrator_config(),
    )?;

    let model = engine
        .build_model(&places, config.routing.travel_mode)
        .await?;
    let json = serde_json::to_string_pretty(&model)?;

    match &cli.output {
        Some(path) => {
            std::fs::write(path, json)?;
            tracing::info!("Model written to {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}
