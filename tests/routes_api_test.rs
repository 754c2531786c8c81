use anyhow::Result;
use httpmock::prelude::*;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;
use travel_matrix::utils::validation::Validate;
use travel_matrix::{
    ClusteringParams, EngineConfig, OrchestratorConfig, Place, RoutesApiClient,
    TravelMatrixEngine, TravelMode,
};

fn places() -> Vec<Place> {
    vec![
        Place::new("a", 37.50, 127.00),
        Place::new("b", 37.51, 127.00),
        Place::new("far", 38.00, 127.00),
    ]
}

#[tokio::test]
async fn test_end_to_end_with_mock_routes_api() -> Result<()> {
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/distanceMatrix/v2:computeRouteMatrix")
            .json_body_partial(r#"{"travelMode":"WALK"}"#);
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(serde_json::json!([
                {"duration": "0s", "condition": "ROUTE_EXISTS"},
                {"destinationIndex": 1, "duration": "600s", "condition": "ROUTE_EXISTS"},
                {"originIndex": 1, "duration": "660s", "condition": "ROUTE_EXISTS"},
                {"originIndex": 1, "destinationIndex": 1, "duration": "0s", "condition": "ROUTE_EXISTS"}
            ]));
    });

    let client = RoutesApiClient::new(
        server.url("/distanceMatrix/v2:computeRouteMatrix"),
        "test-key",
        Duration::from_secs(5),
        10,
    )?;
    let engine = TravelMatrixEngine::new(
        ClusteringParams::default(),
        Arc::new(client),
        OrchestratorConfig::default(),
    )?;

    let model = engine.build_model(&places(), TravelMode::Walk).await?;

    // One request for the {a, b} group and one for the medoids.
    api_mock.assert_hits(2);
    assert_eq!(model.stats.routing_calls, 2);
    assert_eq!(model.groups.len(), 2);
    assert_eq!(model.duration_between("a", "b")?, 10.0);
    assert_eq!(model.duration_between("b", "a")?, 11.0);
    assert_eq!(model.medoid_of(0).map(String::as_str), Some("a"));
    // b -> far goes through medoid a.
    assert_eq!(model.duration_between("b", "far")?, 10.0);
    assert_eq!(model.duration_between("far", "b")?, 11.0);
    Ok(())
}

#[tokio::test]
async fn test_server_errors_fall_back() -> Result<()> {
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(POST).path("/matrix");
        then.status(500).body("internal error");
    });

    let client = RoutesApiClient::new(server.url("/matrix"), "k", Duration::from_secs(5), 10)?;
    let engine = TravelMatrixEngine::new(
        ClusteringParams::default(),
        Arc::new(client),
        OrchestratorConfig::default(),
    )?;

    let model = engine.build_model(&places(), TravelMode::Transit).await?;

    api_mock.assert_hits(2);
    assert_eq!(model.stats.fallback_units, 2);
    assert!(model.duration_between("a", "b")? > 0.0);
    assert!(model.duration_between("a", "far")? > model.duration_between("a", "b")?);
    Ok(())
}

#[tokio::test]
async fn test_config_file_drives_the_build() -> Result<()> {
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/matrix")
            .header("x-goog-api-key", "file-key")
            .json_body_partial(r#"{"travelMode":"DRIVE"}"#);
        then.status(200).json_body(serde_json::json!([
            {"destinationIndex": 1, "duration": "90s"},
            {"originIndex": 1, "duration": "150s"}
        ]));
    });

    let mut file = NamedTempFile::new()?;
    write!(
        file,
        r#"
[clustering]
eps_km = 5.0
max_group_size = 4

[routing]
endpoint = "{}"
api_key = "file-key"
travel_mode = "DRIVE"
max_in_flight = 2

[matrix]
rounding = "nearest"
"#,
        server.url("/matrix")
    )?;

    let config = EngineConfig::from_file(file.path())?;
    config.validate()?;
    let engine = TravelMatrixEngine::new(
        config.clustering_params(),
        config.routing_service(false)?,
        config.orchestrator_config(),
    )?;

    let model = engine
        .build_model(&places(), config.routing.travel_mode)
        .await?;

    api_mock.assert_hits(2);
    assert_eq!(model.travel_mode, TravelMode::Drive);
    // 90 s and 150 s rounded to whole minutes.
    assert_eq!(model.duration_between("a", "b")?, 2.0);
    assert_eq!(model.duration_between("b", "a")?, 3.0);
    Ok(())
}

#[tokio::test]
async fn test_model_serializes_to_json() -> Result<()> {
    let engine = TravelMatrixEngine::new(
        ClusteringParams::default(),
        Arc::new(travel_matrix::OfflineRouting),
        OrchestratorConfig::default(),
    )?;
    let model = engine.build_model(&places(), TravelMode::Bicycle).await?;

    let json = serde_json::to_value(&model)?;
    assert_eq!(json["travel_mode"], "BICYCLE");
    assert_eq!(json["groups"].as_array().map(Vec::len), Some(2));
    assert_eq!(json["medoid_matrix"]["origins"].as_array().map(Vec::len), Some(2));
    assert_eq!(json["stats"]["fallback_units"], 2);
    Ok(())
}
