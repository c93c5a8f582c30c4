/// GeoJSON output and run summary.
///
/// Each station becomes a Point feature. Properties always carry the station
/// metadata and the risk category; forecast properties depend on the
/// outcome:
///
/// | outcome        | discharge_step_N / discharge_Nday | avg_discharge | flood_risk_score | forecast_steps |
/// |----------------|-----------------------------------|---------------|------------------|----------------|
/// | Scored         | yes                               | mean          | yes              | step count     |
/// | NoData         | no                                | 0             | no               | 0              |
/// | LookupFailed   | no                                | no            | no               | 0              |

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::model::{EnhancedStation, PipelineError, RiskCategory, StationForecast, StationRecord};

// ---------------------------------------------------------------------------
// GeoJSON structures
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    kind: &'static str,
    pub features: Vec<Feature>,
}

#[derive(Debug, Serialize)]
pub struct Feature {
    #[serde(rename = "type")]
    kind: &'static str,
    pub geometry: Point,
    pub properties: Map<String, Value>,
}

#[derive(Debug, Serialize)]
pub struct Point {
    #[serde(rename = "type")]
    kind: &'static str,
    /// [longitude, latitude]
    pub coordinates: [f64; 2],
}

impl FeatureCollection {
    fn new(features: Vec<Feature>) -> Self {
        Self { kind: "FeatureCollection", features }
    }
}

fn point(station: &StationRecord) -> Point {
    Point { kind: "Point", coordinates: [station.longitude, station.latitude] }
}

fn station_properties(station: &StationRecord) -> Map<String, Value> {
    let mut props = Map::new();
    props.insert("station".to_string(), Value::from(station.name.clone()));
    props.insert("station_id".to_string(), Value::from(station.id.clone()));
    props.insert("agency".to_string(), Value::from(station.agency.clone()));
    props.insert("river_name".to_string(), Value::from(station.river_name.clone()));
    props.insert("river_km".to_string(), Value::from(station.river_km));
    props
}

/// JSON number for a float; non-finite values become null.
fn number(value: f64) -> Value {
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

// ---------------------------------------------------------------------------
// Feature construction
// ---------------------------------------------------------------------------

/// Stations without forecast properties (the intermediate station layer).
pub fn stations_to_geojson(stations: &[StationRecord]) -> FeatureCollection {
    FeatureCollection::new(
        stations
            .iter()
            .map(|s| Feature { kind: "Feature", geometry: point(s), properties: station_properties(s) })
            .collect(),
    )
}

/// Builds the feature for one enhanced station.
pub fn enhanced_feature(enhanced: &EnhancedStation) -> Feature {
    let mut props = station_properties(&enhanced.station);

    if let StationForecast::Scored { values, avg_discharge, score, .. } = &enhanced.forecast {
        for (i, value) in values.iter().enumerate() {
            props.insert(format!("discharge_step_{}", i + 1), number(*value));
            props.insert(format!("discharge_{}day", i + 1), number(*value));
        }
        props.insert("avg_discharge".to_string(), number(*avg_discharge));
        props.insert("flood_risk_score".to_string(), Value::from(*score));
    } else if let Some(avg) = enhanced.avg_discharge() {
        props.insert("avg_discharge".to_string(), number(avg));
    }

    props.insert(
        "flood_risk_category".to_string(),
        Value::from(enhanced.category().as_str()),
    );
    props.insert("forecast_steps".to_string(), Value::from(enhanced.forecast_steps()));

    Feature { kind: "Feature", geometry: point(&enhanced.station), properties: props }
}

pub fn enhanced_to_geojson(stations: &[EnhancedStation]) -> FeatureCollection {
    FeatureCollection::new(stations.iter().map(enhanced_feature).collect())
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Serializes `collection` and replaces `path` in one rename, so readers
/// never see a half-written file.
pub fn write_geojson(collection: &FeatureCollection, path: &Path) -> Result<(), PipelineError> {
    let body = serde_json::to_string_pretty(collection)
        .map_err(|e| PipelineError::Output(format!("Failed to serialize GeoJSON: {}", e)))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            PipelineError::Output(format!("Failed to create {}: {}", parent.display(), e))
        })?;
    }

    let partial = path.with_extension("geojson.part");
    fs::write(&partial, body)
        .map_err(|e| PipelineError::Output(format!("Failed to write {}: {}", partial.display(), e)))?;
    fs::rename(&partial, path)
        .map_err(|e| PipelineError::Output(format!("Failed to move output into {}: {}", path.display(), e)))
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// Per-run statistics printed after the output is written.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub total: usize,
    pub counts: BTreeMap<RiskCategory, usize>,
    /// Mean `avg_discharge` over stations that report one.
    pub mean_discharge: Option<f64>,
    /// (station label, avg discharge, category) for the first few stations.
    pub sample: Vec<(String, Option<f64>, RiskCategory)>,
}

const SAMPLE_SIZE: usize = 5;

pub fn summarize(stations: &[EnhancedStation]) -> RunSummary {
    let mut counts = BTreeMap::new();
    for s in stations {
        *counts.entry(s.category()).or_insert(0) += 1;
    }

    let discharges: Vec<f64> = stations.iter().filter_map(|s| s.avg_discharge()).collect();
    let mean_discharge = if discharges.is_empty() {
        None
    } else {
        Some(discharges.iter().sum::<f64>() / discharges.len() as f64)
    };

    let sample = stations
        .iter()
        .take(SAMPLE_SIZE)
        .map(|s| (s.station.label().to_string(), s.avg_discharge(), s.category()))
        .collect();

    RunSummary { total: stations.len(), counts, mean_discharge, sample }
}

impl RunSummary {
    pub fn count(&self, category: RiskCategory) -> usize {
        self.counts.get(&category).copied().unwrap_or(0)
    }

    /// Prints the summary to stdout.
    pub fn print(&self) {
        println!("\n📊 FLOOD RISK SUMMARY:");
        for category in RiskCategory::ALL {
            let count = self.count(category);
            if count > 0 {
                println!("   {}: {} stations", category, count);
            }
        }
        match self.mean_discharge {
            Some(mean) => println!("   Average discharge: {:.2} (scaled units)", mean),
            None => println!("   Average discharge: n/a"),
        }

        println!("\n🔍 SAMPLE STATIONS:");
        for (name, discharge, category) in &self.sample {
            match discharge {
                Some(d) => println!("   {}: Discharge={:.1}, Risk={}", name, d, category),
                None => println!("   {}: Discharge=n/a, Risk={}", name, category),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn station(name: &str) -> StationRecord {
        StationRecord {
            name: Some(name.to_string()),
            id: Some("586010".to_string()),
            agency: Some("BERLIN".to_string()),
            river_name: Some("SPREE".to_string()),
            river_km: None,
            longitude: 13.40972,
            latitude: 52.51306,
        }
    }

    fn scored(name: &str, values: Vec<f64>, avg: f64, score: u32, category: RiskCategory) -> EnhancedStation {
        EnhancedStation {
            station: station(name),
            forecast: StationForecast::Scored { values, avg_discharge: avg, score, category },
        }
    }

    #[test]
    fn test_scored_feature_properties() {
        let feature = enhanced_feature(&scored("A", vec![100.0, 100.0, 400.0], 200.0, 5, RiskCategory::High));
        let props = &feature.properties;

        assert_eq!(props["station"], "A");
        assert_eq!(props["station_id"], "586010");
        assert_eq!(props["river_name"], "SPREE");
        assert_eq!(props["river_km"], Value::Null);
        assert_eq!(props["discharge_step_1"], 100.0);
        assert_eq!(props["discharge_3day"], 400.0);
        assert_eq!(props["avg_discharge"], 200.0);
        assert_eq!(props["flood_risk_score"], 5);
        assert_eq!(props["flood_risk_category"], "High");
        assert_eq!(props["forecast_steps"], 3);
        assert_eq!(feature.geometry.coordinates, [13.40972, 52.51306], "GeoJSON order is [lon, lat]");
    }

    #[test]
    fn test_no_data_feature_properties() {
        let feature = enhanced_feature(&EnhancedStation { station: station("B"), forecast: StationForecast::NoData });
        let props = &feature.properties;

        assert_eq!(props["flood_risk_category"], "Unknown");
        assert_eq!(props["avg_discharge"], 0.0);
        assert_eq!(props["forecast_steps"], 0);
        assert!(!props.contains_key("flood_risk_score"));
        assert!(!props.contains_key("discharge_step_1"));
    }

    #[test]
    fn test_lookup_failed_feature_properties() {
        let feature = enhanced_feature(&EnhancedStation {
            station: station("C"),
            forecast: StationForecast::LookupFailed("outside grid".to_string()),
        });
        let props = &feature.properties;

        assert_eq!(props["flood_risk_category"], "Unknown");
        assert_eq!(props["forecast_steps"], 0);
        assert!(!props.contains_key("avg_discharge"));
    }

    #[test]
    fn test_collection_serializes_as_geojson() {
        let collection = enhanced_to_geojson(&[scored("A", vec![60.0], 60.0, 1, RiskCategory::Low)]);
        let json = serde_json::to_value(&collection).expect("serializable");

        assert_eq!(json["type"], "FeatureCollection");
        assert_eq!(json["features"][0]["type"], "Feature");
        assert_eq!(json["features"][0]["geometry"]["type"], "Point");
        assert_eq!(json["features"][0]["properties"]["flood_risk_category"], "Low");
    }

    #[test]
    fn test_raw_station_layer_has_no_forecast_properties() {
        let collection = stations_to_geojson(&[station("A"), station("B")]);
        assert_eq!(collection.features.len(), 2);
        assert!(!collection.features[0].properties.contains_key("flood_risk_category"));
    }

    #[test]
    fn test_summary_counts_and_mean() {
        let stations = vec![
            scored("A", vec![500.0, 800.0], 650.0, 7, RiskCategory::Extreme),
            scored("B", vec![60.0, 60.0], 60.0, 1, RiskCategory::Low),
            EnhancedStation { station: station("C"), forecast: StationForecast::NoData },
            EnhancedStation { station: station("D"), forecast: StationForecast::LookupFailed("x".to_string()) },
        ];
        let summary = summarize(&stations);

        assert_eq!(summary.total, 4);
        assert_eq!(summary.count(RiskCategory::Extreme), 1);
        assert_eq!(summary.count(RiskCategory::Low), 1);
        assert_eq!(summary.count(RiskCategory::Unknown), 2);
        assert_eq!(summary.count(RiskCategory::High), 0);
        // (650 + 60 + 0) / 3; the failed lookup has no discharge
        let mean = summary.mean_discharge.expect("three stations report discharge");
        assert!((mean - 710.0 / 3.0).abs() < 1e-9);
        assert_eq!(summary.sample.len(), 4);
        assert_eq!(summary.sample[3], ("D".to_string(), None, RiskCategory::Unknown));
    }

    #[test]
    fn test_summary_of_empty_run() {
        let summary = summarize(&[]);
        assert_eq!(summary.total, 0);
        assert!(summary.mean_discharge.is_none());
    }

    #[test]
    fn test_non_finite_numbers_become_null() {
        assert_eq!(number(f64::INFINITY), Value::Null);
        assert_eq!(number(1.5), 1.5);
    }
}
