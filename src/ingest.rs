//! JSON ingestion for canal datasets and sightings.
//!
//! Accepts a GeoJSON `FeatureCollection` or a bare array of records. The
//! top level must be one of those; anything else is a
//! [`TrackerError::Validation`] raised before any computation. Individual
//! records that cannot be used are skipped with a warning.
//!
//! Canal features carry `SAP_FUNC_LOC` (location code), `SAP_NAME` (name),
//! `Shape__Length` (meters) and a `LineString` or `MultiLineString`
//! geometry. When the length is missing it is derived from the geometry.
//!
//! Sightings are either features with the fields under `properties` or flat
//! objects, using `BoatId`, `Date`, `SAP_FUNC_LOC`, `SAP_DESCRIPTION` and
//! `Waterway` (snake_case names are accepted too).

use std::collections::HashSet;

use geo::{Coord, LineString, MultiLineString};
use log::{info, warn};
use once_cell::sync::Lazy;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::geo_utils::polyline_length;
use crate::{
    calculate_time_and_distance, OptionExt, RawSighting, Report, Result, Segment, TrackerConfig,
};

const CODE_KEYS: &[&str] = &["SAP_FUNC_LOC", "location_code"];
const NAME_KEYS: &[&str] = &["SAP_NAME", "name"];
const LENGTH_KEYS: &[&str] = &["Shape__Length", "length_meters"];
const BOAT_KEYS: &[&str] = &["BoatId", "boat_id"];
const DATE_KEYS: &[&str] = &["Date", "timestamp"];
const DESCRIPTION_KEYS: &[&str] = &["SAP_DESCRIPTION", "location_description"];
const WATERWAY_KEYS: &[&str] = &["Waterway", "waterway"];

/// GeoJSON line geometries; every other type maps to `Unsupported`.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum LineGeometry {
    LineString { coordinates: Vec<Vec<f64>> },
    MultiLineString { coordinates: Vec<Vec<Vec<f64>>> },
    #[serde(other)]
    Unsupported,
}

/// Parse a canal dataset.
pub fn canals_from_geojson(json: &str) -> Result<Vec<Segment>> {
    let root: Value = serde_json::from_str(json)?;
    let records = top_level_records(&root, "canals")?;

    let mut seen: HashSet<String> = HashSet::new();
    let mut segments = Vec::with_capacity(records.len());
    for (i, record) in records.iter().enumerate() {
        let Some(segment) = canal_from_record(i, record) else {
            continue;
        };
        if !seen.insert(segment.id.clone()) {
            warn!(
                "[Ingest] Duplicate canal location code '{}' at record {}, keeping the first",
                segment.id, i
            );
            continue;
        }
        segments.push(segment);
    }

    info!(
        "[Ingest] Loaded {} of {} canal records",
        segments.len(),
        records.len()
    );
    Ok(segments)
}

/// Parse a sighting collection.
pub fn sightings_from_json(json: &str) -> Result<Vec<RawSighting>> {
    let root: Value = serde_json::from_str(json)?;
    let records = top_level_records(&root, "sightings")?;

    let sightings: Vec<RawSighting> = records
        .iter()
        .enumerate()
        .filter_map(|(i, record)| sighting_from_record(i, record))
        .collect();

    info!(
        "[Ingest] Loaded {} of {} sighting records",
        sightings.len(),
        records.len()
    );
    Ok(sightings)
}

/// Validate and parse both inputs, then compute the report.
pub fn report_from_json(
    sightings_json: &str,
    canals_json: &str,
    config: &TrackerConfig,
) -> Result<Report> {
    let sightings = sightings_from_json(sightings_json)?;
    let canals = canals_from_geojson(canals_json)?;
    calculate_time_and_distance(&sightings, &canals, config)
}

fn top_level_records<'a>(root: &'a Value, what: &str) -> Result<&'a Vec<Value>> {
    match root {
        Value::Array(items) => Ok(items),
        Value::Object(obj) => obj
            .get("features")
            .and_then(Value::as_array)
            .ok_or_validation(&format!(
                "{} must be an array or a FeatureCollection with a features array",
                what
            )),
        _ => Err(crate::TrackerError::validation(format!(
            "{} must be an array or a FeatureCollection, got {}",
            what,
            value_kind(root)
        ))),
    }
}

fn canal_from_record(index: usize, record: &Value) -> Option<Segment> {
    let properties = properties_of(record);
    let Some(code) = string_field(properties, CODE_KEYS) else {
        warn!("[Ingest] Canal record {} has no location code, skipping", index);
        return None;
    };
    let name = string_field(properties, NAME_KEYS).unwrap_or_default();

    let geometry = match record.get("geometry").cloned().map(serde_json::from_value::<LineGeometry>) {
        Some(Ok(geometry)) => geometry,
        Some(Err(e)) => {
            warn!("[Ingest] Canal '{}' has malformed geometry: {}", code, e);
            return None;
        }
        None => {
            warn!("[Ingest] Canal '{}' has no geometry, skipping", code);
            return None;
        }
    };
    let lines = match geometry {
        LineGeometry::LineString { coordinates } => {
            to_line(&coordinates).map(|line| MultiLineString::new(vec![line]))
        }
        LineGeometry::MultiLineString { coordinates } => coordinates
            .iter()
            .map(|line| to_line(line))
            .collect::<Option<Vec<_>>>()
            .map(MultiLineString::new),
        LineGeometry::Unsupported => {
            warn!("[Ingest] Canal '{}' is not a line geometry, skipping", code);
            return None;
        }
    };
    let Some(lines) = lines else {
        warn!("[Ingest] Canal '{}' has a position without two coordinates, skipping", code);
        return None;
    };

    let length_meters = match number_field(properties, LENGTH_KEYS) {
        Some(length) => length,
        None => {
            let derived: f64 = lines.0.iter().map(polyline_length).sum();
            warn!(
                "[Ingest] Canal '{}' has no Shape__Length, using geodesic length {:.1}m",
                code, derived
            );
            derived
        }
    };

    match Segment::new(&code, &name, lines, length_meters) {
        Ok(segment) => Some(segment),
        Err(e) => {
            warn!("[Ingest] Skipping canal record {}: {}", index, e);
            None
        }
    }
}

fn sighting_from_record(index: usize, record: &Value) -> Option<RawSighting> {
    let fields = properties_of(record);
    if fields.is_empty() {
        warn!("[Ingest] Sighting record {} is not an object, skipping", index);
        return None;
    }
    let Some(location_code) = string_field(fields, CODE_KEYS) else {
        warn!("[Ingest] Sighting record {} has no location code, skipping", index);
        return None;
    };

    Some(RawSighting {
        boat_id: string_field(fields, BOAT_KEYS).unwrap_or_default(),
        timestamp: string_field(fields, DATE_KEYS).unwrap_or_default(),
        location_code,
        location_description: string_field(fields, DESCRIPTION_KEYS).unwrap_or_default(),
        waterway: string_field(fields, WATERWAY_KEYS).unwrap_or_default(),
    })
}

/// Fields of a feature's `properties`, or of the object itself when flat.
fn properties_of(record: &Value) -> &Map<String, Value> {
    static EMPTY: Lazy<Map<String, Value>> = Lazy::new(Map::new);
    match record {
        Value::Object(obj) => obj
            .get("properties")
            .and_then(Value::as_object)
            .unwrap_or(obj),
        _ => &EMPTY,
    }
}

/// First non-empty field among `keys`, with numbers rendered as text.
fn string_field(fields: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match fields.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn number_field(fields: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|key| match fields.get(*key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn to_line(positions: &[Vec<f64>]) -> Option<LineString<f64>> {
    positions
        .iter()
        .map(|p| match p.as_slice() {
            [x, y, ..] => Some(Coord { x: *x, y: *y }),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()
        .map(LineString::new)
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TrackerError;

    const CANALS: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": { "SAP_FUNC_LOC": "X", "SAP_NAME": "Xray Reach", "Shape__Length": 2000 },
                "geometry": { "type": "LineString", "coordinates": [[-2.02, 52.0], [-2.01, 52.0]] }
            },
            {
                "type": "Feature",
                "properties": { "SAP_FUNC_LOC": "Y", "SAP_NAME": "Yankee Pound" },
                "geometry": { "type": "MultiLineString", "coordinates": [[[-2.01, 52.0, 80.0], [-2.00, 52.0, 81.0]]] }
            },
            {
                "type": "Feature",
                "properties": { "SAP_FUNC_LOC": "L", "SAP_NAME": "Lock 7" },
                "geometry": { "type": "Point", "coordinates": [-2.0, 52.0] }
            },
            {
                "type": "Feature",
                "properties": { "SAP_FUNC_LOC": "X", "SAP_NAME": "Duplicate", "Shape__Length": 1 },
                "geometry": { "type": "LineString", "coordinates": [[0.0, 0.0], [1.0, 1.0]] }
            }
        ]
    }"#;

    #[test]
    fn test_canals_from_feature_collection() {
        let canals = canals_from_geojson(CANALS).unwrap();
        assert_eq!(canals.len(), 2);
        assert_eq!(canals[0].id, "X");
        assert_eq!(canals[0].length_meters, 2000.0);
        assert_eq!(canals[0].name, "Xray Reach");
        // Derived from geometry: 0.01 degrees of longitude at 52N is ~685 m
        assert!((canals[1].length_meters - 684.6).abs() < 2.0);
    }

    #[test]
    fn test_top_level_must_be_collection() {
        assert!(matches!(
            canals_from_geojson(r#""not a collection""#),
            Err(TrackerError::Validation { .. })
        ));
        assert!(matches!(
            sightings_from_json(r#"{"type": "Feature"}"#),
            Err(TrackerError::Validation { .. })
        ));
        assert!(matches!(
            sightings_from_json("{oops"),
            Err(TrackerError::Json(_))
        ));
    }

    #[test]
    fn test_sightings_flat_and_feature_records() {
        let json = r#"[
            { "BoatId": "NB-1", "Date": "01/06/2024 08:00", "SAP_FUNC_LOC": "X", "Waterway": "Grand Union" },
            { "type": "Feature", "properties": { "BoatId": 42, "Date": "01/06/2024 10:00", "SAP_FUNC_LOC": "Y" } },
            { "BoatId": "NB-1", "Date": "01/06/2024 11:00" },
            7
        ]"#;
        let sightings = sightings_from_json(json).unwrap();
        assert_eq!(sightings.len(), 2);
        assert_eq!(sightings[0].waterway, "Grand Union");
        assert_eq!(sightings[1].boat_id, "42");
        assert_eq!(sightings[1].location_code, "Y");
    }

    #[test]
    fn test_report_from_json() {
        let sightings = r#"[
            { "BoatId": "NB-1", "Date": "01/06/2024 08:00", "SAP_FUNC_LOC": "X" },
            { "BoatId": "NB-1", "Date": "01/06/2024 10:00", "SAP_FUNC_LOC": "Y" }
        ]"#;
        let report = report_from_json(sightings, CANALS, &TrackerConfig::default()).unwrap();
        assert_eq!(report.time_taken, "2 hours");
        assert_eq!(report.segment_details.len(), 2);
        assert!(report.total_distance > 2.6 && report.total_distance < 2.7);
    }
}
