//! Place list loading for the CLI.
//!
//! JSON input is an array of objects carrying `id`, `latitude` and
//! `longitude`; every other key is kept as the place payload. CSV input needs
//! the same three columns, and the remaining columns become string payload
//! fields.

use crate::domain::model::Place;
use crate::utils::error::{EngineError, Result};
use serde_json::{Map, Value};
use std::path::Path;

const ID_KEYS: [&str; 2] = ["id", "google_place_id"];

pub fn load_places<P: AsRef<Path>>(path: P) -> Result<Vec<Place>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    let places = match extension.as_deref() {
        Some("json") => places_from_json(&content)?,
        Some("csv") => places_from_csv(&content)?,
        _ => {
            return Err(EngineError::invalid_parameter(
                "places",
                path.display(),
                "expected a .json or .csv file",
            ))
        }
    };

    tracing::info!("Loaded {} places from {}", places.len(), path.display());
    Ok(places)
}

pub fn places_from_json(content: &str) -> Result<Vec<Place>> {
    let value: Value = serde_json::from_str(content)?;
    let items = match value {
        Value::Array(items) => items,
        _ => {
            return Err(EngineError::invalid_input(
                "places JSON must be an array of objects",
            ))
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(obj) => place_from_object(index, obj),
            _ => Err(EngineError::invalid_input(format!(
                "place #{} is not a JSON object",
                index
            ))),
        })
        .collect()
}

fn place_from_object(index: usize, mut obj: Map<String, Value>) -> Result<Place> {
    let id = ID_KEYS
        .iter()
        .find_map(|key| obj.remove(*key))
        .and_then(|v| match v {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .ok_or_else(|| EngineError::invalid_input(format!("place #{} has no id", index)))?;

    let latitude = take_coordinate(&mut obj, "latitude", &id)?;
    let longitude = take_coordinate(&mut obj, "longitude", &id)?;

    let mut place = Place::new(id, latitude, longitude);
    if !obj.is_empty() {
        place.payload = Value::Object(obj);
    }
    Ok(place)
}

fn take_coordinate(obj: &mut Map<String, Value>, key: &str, id: &str) -> Result<f64> {
    obj.remove(key)
        .and_then(|v| v.as_f64())
        .ok_or_else(|| EngineError::invalid_input(format!("place '{}' has no numeric {}", id, key)))
}

pub fn places_from_csv(content: &str) -> Result<Vec<Place>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());
    let headers = reader.headers()?.clone();

    let column = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));
    let id_col = ID_KEYS
        .iter()
        .find_map(|key| column(*key))
        .ok_or_else(|| EngineError::invalid_input("places CSV needs an 'id' column"))?;
    let lat_col = column("latitude")
        .ok_or_else(|| EngineError::invalid_input("places CSV needs a 'latitude' column"))?;
    let lon_col = column("longitude")
        .ok_or_else(|| EngineError::invalid_input("places CSV needs a 'longitude' column"))?;

    let mut places = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let field = |col: usize| record.get(col).unwrap_or_default();
        let id = field(id_col).to_string();
        let parse = |col: usize, name: &str| -> Result<f64> {
            field(col).parse::<f64>().map_err(|_| {
                EngineError::invalid_input(format!(
                    "row {}: {} '{}' is not a number",
                    row + 1,
                    name,
                    field(col)
                ))
            })
        };

        let mut place = Place::new(id, parse(lat_col, "latitude")?, parse(lon_col, "longitude")?);
        let extra: Map<String, Value> = headers
            .iter()
            .enumerate()
            .filter(|(col, _)| ![id_col, lat_col, lon_col].contains(col))
            .map(|(col, name)| (name.to_string(), Value::String(field(col).to_string())))
            .collect();
        if !extra.is_empty() {
            place.payload = Value::Object(extra);
        }
        places.push(place);
    }
    Ok(places)
}
