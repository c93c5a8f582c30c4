/// Station loader - parses the flat stations.json list
///
/// The station list is a PEGELONLINE-style JSON array (see
/// `ingest::fixtures` for an annotated sample). Records without both
/// coordinates cannot be placed on the forecast grid and are left out of the
/// collection entirely rather than carried with a null geometry.

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::model::{PipelineError, StationRecord};

// ---------------------------------------------------------------------------
// Serde structures for stations.json
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct RawStation {
    #[serde(default)]
    longitude: Option<f64>,
    #[serde(default)]
    latitude: Option<f64>,
    #[serde(default)]
    shortname: Option<String>,
    #[serde(default)]
    km: Option<f64>,
    #[serde(default)]
    agency: Option<String>,
    #[serde(default)]
    number: Option<String>,
    #[serde(default)]
    water: Option<RawWater>,
}

#[derive(Deserialize)]
struct RawWater {
    #[serde(default)]
    shortname: Option<String>,
}

impl RawStation {
    /// Converts to a `StationRecord`, or `None` when a coordinate is missing.
    fn into_record(self) -> Option<StationRecord> {
        // Only absent/null coordinates drop a record; 0.0 is a real position.
        let (longitude, latitude) = (self.longitude?, self.latitude?);
        Some(StationRecord {
            name: self.shortname,
            id: self.number,
            agency: self.agency,
            river_name: self.water.and_then(|w| w.shortname),
            river_km: self.km,
            longitude,
            latitude,
        })
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parses a stations.json body into station records, keeping input order.
///
/// # Errors
/// `PipelineError::StationData` if the body is not a JSON array of objects
/// with the expected field types.
pub fn parse_station_json(json: &str) -> Result<Vec<StationRecord>, PipelineError> {
    let raw: Vec<RawStation> = serde_json::from_str(json)
        .map_err(|e| PipelineError::StationData(format!("JSON deserialization failed: {}", e)))?;

    Ok(raw.into_iter().filter_map(RawStation::into_record).collect())
}

/// Reads and parses the station file at `path`.
///
/// A missing or unreadable file is fatal for the run.
pub fn load_stations(path: &Path) -> Result<Vec<StationRecord>, PipelineError> {
    let contents = fs::read_to_string(path).map_err(|e| {
        PipelineError::StationData(format!("Failed to read {}: {}", path.display(), e))
    })?;
    parse_station_json(&contents)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
