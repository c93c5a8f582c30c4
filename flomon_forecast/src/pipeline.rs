/// Pipeline driver: download → stations → forecast → enhance → write.
///
/// Each stage consumes the previous stage's output. Any stage error aborts
/// the run before the output file is touched; per-station lookup failures
/// never reach this level (the enhancer keeps them as `Unknown`).

use std::path::Path;

use crate::analysis::enhance::enhance_stations;
use crate::config::{self, PipelineConfig};
use crate::forecast::grib::load_forecast;
use crate::forecast::{DischargeLookup, ForecastGrid, LoadOptions, VariableRequest};
use crate::ingest::cds;
use crate::logging::{self, Stage};
use crate::model::{ForecastError, PipelineError};
use crate::output::{self, RunSummary};
use crate::stations::load_stations;

/// Run-time switches that are not part of the configuration file.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Use the existing forecast file instead of downloading one.
    pub skip_download: bool,
    /// Log sampled values for the first stations.
    pub debug: bool,
}

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

/// Makes sure a forecast file is present, downloading it when enabled.
pub fn acquire_forecast(config: &PipelineConfig, options: RunOptions) -> Result<(), PipelineError> {
    let target = &config.paths.forecast_file;

    if options.skip_download || !config.download.enabled {
        if !target.exists() {
            return Err(PipelineError::Config(format!(
                "Forecast file {} not found and download is disabled",
                target.display()
            )));
        }
        logging::info(
            Stage::Download,
            None,
            &format!("Using existing forecast file {}", target.display()),
        );
        return Ok(());
    }

    let credentials = config::api_credentials(&config.download)?;
    let bytes = cds::retrieve_forecast(&config.download, &config.area, &credentials, target)
        .map_err(|e| PipelineError::Download(e.to_string()))?;
    logging::info(
        Stage::Download,
        None,
        &format!("Forecast saved to {} ({} bytes)", target.display(), bytes),
    );
    Ok(())
}

/// Loads the configured variable, retrying with relaxed matching before
/// giving up.
pub fn open_forecast(path: &Path, request: &VariableRequest) -> Result<ForecastGrid, PipelineError> {
    open_with_fallback(|options| load_forecast(path, request, options))
}

/// Tries `load` with `Strict` then `Relaxed` options. Unreadable files are
/// not retried.
pub(crate) fn open_with_fallback<L>(mut load: L) -> Result<ForecastGrid, PipelineError>
where
    L: FnMut(LoadOptions) -> Result<ForecastGrid, ForecastError>,
{
    let mut last_error = None;

    for options in [LoadOptions::Strict, LoadOptions::Relaxed] {
        match load(options) {
            Ok(grid) => {
                logging::info(
                    Stage::Forecast,
                    None,
                    &format!(
                        "Opened {} ({} load): {} steps {:?}, {}×{} grid",
                        grid.variable(),
                        options,
                        grid.step_count(),
                        grid.steps(),
                        grid.latitudes().len(),
                        grid.longitudes().len()
                    ),
                );
                return Ok(grid);
            }
            Err(e @ (ForecastError::Io(_) | ForecastError::Decode(_) | ForecastError::NoMessages)) => {
                return Err(e.into());
            }
            Err(e) => {
                logging::warn(Stage::Forecast, None, &format!("{} load failed: {}", options, e));
                last_error = Some(e);
            }
        }
    }

    Err(last_error.map(PipelineError::from).unwrap_or_else(|| {
        PipelineError::Forecast(ForecastError::NoMessages)
    }))
}

// ---------------------------------------------------------------------------
// Full run
// ---------------------------------------------------------------------------

/// Runs every stage after the download against an already-available
/// forecast, returning the summary. Used by `run` and by tests with a
/// synthetic forecast.
pub fn process<F: DischargeLookup>(
    config: &PipelineConfig,
    forecast: &F,
    options: RunOptions,
) -> Result<RunSummary, PipelineError> {
    let stations = load_stations(&config.paths.stations_json)?;
    logging::info(
        Stage::Stations,
        None,
        &format!("Loaded {} water stations from {}", stations.len(), config.paths.stations_json.display()),
    );

    if let Some(raw_path) = &config.paths.raw_stations_geojson {
        output::write_geojson(&output::stations_to_geojson(&stations), raw_path)?;
        logging::info(Stage::Output, None, &format!("Station layer written to {}", raw_path.display()));
    }

    let enhanced = enhance_stations(&stations, forecast, options.debug);

    output::write_geojson(&output::enhanced_to_geojson(&enhanced), &config.paths.output_geojson)?;
    logging::info(
        Stage::Output,
        None,
        &format!("Enhanced stations written to {}", config.paths.output_geojson.display()),
    );

    Ok(output::summarize(&enhanced))
}

/// Runs the whole pipeline.
pub fn run(config: &PipelineConfig, options: RunOptions) -> Result<RunSummary, PipelineError> {
    let request = VariableRequest::from_config(&config.forecast).ok_or_else(|| {
        PipelineError::Config(format!(
            "Unknown forecast variable '{}'; set forecast.parameter = [discipline, category, number]",
            config.forecast.variable
        ))
    })?;

    acquire_forecast(config, options)?;
    let forecast = open_forecast(&config.paths.forecast_file, &request)?;
    process(config, &forecast, options)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(variable: &str) -> ForecastGrid {
        ForecastGrid::new(variable, "m**3 s**-1", vec![0, 24], vec![52.5], vec![13.0], vec![10.0, 20.0])
            .expect("valid grid")
    }

    fn not_found() -> ForecastError {
        ForecastError::VariableNotFound {
            requested: "dis24".to_string(),
            available: vec!["1/0/6 (Remotely sensed snow cover)".to_string()],
        }
    }

    #[test]
    fn test_strict_success_skips_relaxed_load() {
        let mut attempts = Vec::new();
        let result = open_with_fallback(|options| {
            attempts.push(options);
            Ok(grid("dis24"))
        });
        assert!(result.is_ok());
        assert_eq!(attempts, vec![LoadOptions::Strict]);
    }

    #[test]
    fn test_relaxed_load_used_when_strict_misses_variable() {
        let mut attempts = Vec::new();
        let result = open_with_fallback(|options| {
            attempts.push(options);
            match options {
                LoadOptions::Strict => Err(not_found()),
                LoadOptions::Relaxed => Ok(grid("1/0/6")),
            }
        });

        let opened = result.expect("relaxed load should succeed");
        assert_eq!(opened.variable(), "1/0/6");
        assert_eq!(attempts, vec![LoadOptions::Strict, LoadOptions::Relaxed]);
    }

    #[test]
    fn test_both_loads_failing_reports_available_variables() {
        let result = open_with_fallback(|_| Err(not_found()));
        match result {
            Err(PipelineError::Forecast(ForecastError::VariableNotFound { available, .. })) => {
                assert_eq!(available.len(), 1, "error should list what the file holds")
            }
            other => panic!("expected VariableNotFound, got {:?}", other.map(|g| g.variable().to_string())),
        }
    }

    #[test]
    fn test_unreadable_file_is_not_retried() {
        let mut attempts = 0;
        let result = open_with_fallback(|_| {
            attempts += 1;
            Err(ForecastError::Io("forecast.grib: No such file or directory".to_string()))
        });
        assert!(matches!(result, Err(PipelineError::Forecast(ForecastError::Io(_)))));
        assert_eq!(attempts, 1);
    }
}
