/// Station enhancer: joins stations to the forecast grid and scores them.
///
/// For every station the nearest grid cell is sampled at each lead-time
/// step, scaled by the unit correction factor, and turned into a
/// `StationForecast`. The output always has one entry per input station, in
/// input order; stations that cannot be scored are carried as `Unknown`.

use crate::analysis::risk::{categorize_risk, flood_risk_score};
use crate::forecast::{scale_factor, DischargeLookup};
use crate::logging::{self, Stage};
use crate::model::{EnhancedStation, LookupError, StationForecast, StationRecord};

/// Stations whose values are echoed in debug mode.
const DEBUG_SAMPLE: usize = 5;

/// Samples the nearest cell for every step, scaled, with NaN replaced by 0.
fn sample_station(
    station: &StationRecord,
    forecast: &dyn DischargeLookup,
    scale: f64,
) -> Result<Vec<f64>, LookupError> {
    (0..forecast.step_count())
        .map(|step| {
            let value = forecast.lookup(station.latitude, station.longitude, step)? * scale;
            Ok(if value.is_nan() { 0.0 } else { value })
        })
        .collect()
}

/// Scores one set of per-step values.
pub fn evaluate_values(values: Vec<f64>) -> StationForecast {
    if values.iter().all(|v| *v == 0.0) {
        return StationForecast::NoData;
    }
    let avg_discharge = values.iter().sum::<f64>() / values.len() as f64;
    let score = flood_risk_score(avg_discharge, &values);
    StationForecast::Scored {
        values,
        avg_discharge,
        score,
        category: categorize_risk(score),
    }
}

/// Enhances a single station against the forecast with a precomputed scale.
pub fn enhance_station(
    station: &StationRecord,
    forecast: &dyn DischargeLookup,
    scale: f64,
) -> StationForecast {
    match sample_station(station, forecast, scale) {
        Ok(values) => evaluate_values(values),
        Err(e) => StationForecast::LookupFailed(e.to_string()),
    }
}

/// Enhances every station. Never drops a station.
///
/// With `debug` set, the sampled values of the first few stations are logged.
pub fn enhance_stations(
    stations: &[StationRecord],
    forecast: &dyn DischargeLookup,
    debug: bool,
) -> Vec<EnhancedStation> {
    let scale = scale_factor(forecast.units());
    logging::info(
        Stage::Enhance,
        None,
        &format!("Discharge units: {}", forecast.units()),
    );
    if scale != 1.0 {
        logging::warn(
            Stage::Enhance,
            None,
            &format!("Per-area discharge units; applying scaling factor ×{} (approximate correction)", scale),
        );
    }

    let enhanced: Vec<EnhancedStation> = stations
        .iter()
        .enumerate()
        .map(|(idx, station)| {
            let outcome = enhance_station(station, forecast, scale);
            match &outcome {
                StationForecast::Scored { values, .. } if debug && idx < DEBUG_SAMPLE => {
                    logging::debug(Stage::Enhance, Some(station.label()), &format!("→ {:?}", values));
                }
                StationForecast::NoData if debug && idx < DEBUG_SAMPLE => {
                    logging::debug(Stage::Enhance, Some(station.label()), "→ all steps zero or missing");
                }
                StationForecast::LookupFailed(reason) => {
                    logging::warn(
                        Stage::Enhance,
                        Some(station.label()),
                        &format!("Could not process station: {}", reason),
                    );
                }
                _ => {}
            }
            EnhancedStation { station: station.clone(), forecast: outcome }
        })
        .collect();

    let scored = enhanced
        .iter()
        .filter(|e| matches!(e.forecast, StationForecast::Scored { .. }))
        .count();
    let no_data = enhanced
        .iter()
        .filter(|e| e.forecast == StationForecast::NoData)
        .count();
    logging::log_enhance_summary(enhanced.len(), scored, no_data, enhanced.len() - scored - no_data);

    enhanced
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
