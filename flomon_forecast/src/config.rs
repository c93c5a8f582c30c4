/// Pipeline configuration loader - parses pipeline.toml
///
/// Keeps file paths, the forecast bounding box and the Copernicus request
/// parameters out of the code so a run can be pointed at substitute inputs
/// (tests, other regions) without recompiling.
///
/// Credentials never live in the TOML file. The data-store key is read from
/// the environment (`CDSAPI_KEY`, optionally via `.env`).

use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::model::PipelineError;

/// Environment variable holding the Copernicus data-store API key.
pub const ENV_API_KEY: &str = "CDSAPI_KEY";
/// Environment variable overriding `download.api_url`.
pub const ENV_API_URL: &str = "CDSAPI_URL";

// ---------------------------------------------------------------------------
// TOML structures
// ---------------------------------------------------------------------------

/// Root configuration passed to `pipeline::run`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub paths: PathsConfig,
    pub area: BoundingBox,
    pub forecast: ForecastConfig,
    pub download: DownloadConfig,
}

/// Input and output file locations.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub stations_json: PathBuf,
    pub forecast_file: PathBuf,
    pub output_geojson: PathBuf,
    /// Stations without forecast properties; skipped when unset.
    pub raw_stations_geojson: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            stations_json: PathBuf::from("stations.json"),
            forecast_file: PathBuf::from("forecast.grib"),
            output_geojson: PathBuf::from("germany_waterlevels_with_forecast.geojson"),
            raw_stations_geojson: None,
        }
    }
}

/// Geographic request area, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct BoundingBox {
    pub north: f64,
    pub west: f64,
    pub south: f64,
    pub east: f64,
}

impl Default for BoundingBox {
    fn default() -> Self {
        // Berlin / Brandenburg
        Self { north: 52.7, west: 12.0, south: 52.3, east: 13.8 }
    }
}

impl BoundingBox {
    /// Order expected by the data-store `area` field.
    pub fn as_request_area(&self) -> [f64; 4] {
        [self.north, self.west, self.south, self.east]
    }

    pub fn validate(&self) -> Result<(), String> {
        for (name, lat) in [("north", self.north), ("south", self.south)] {
            if !(-90.0..=90.0).contains(&lat) {
                return Err(format!("area.{} = {} is not a valid latitude", name, lat));
            }
        }
        for (name, lon) in [("west", self.west), ("east", self.east)] {
            if !(-180.0..=360.0).contains(&lon) {
                return Err(format!("area.{} = {} is not a valid longitude", name, lon));
            }
        }
        if self.north <= self.south {
            return Err(format!("area.north ({}) must be above area.south ({})", self.north, self.south));
        }
        if self.west >= self.east {
            return Err(format!("area.west ({}) must be below area.east ({})", self.west, self.east));
        }
        Ok(())
    }
}

/// Which variable to extract from the forecast file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Short name, e.g. "dis24".
    pub variable: String,
    /// Explicit GRIB2 (discipline, category, number); overrides the built-in table.
    pub parameter: Option<[u8; 3]>,
    /// Explicit unit string; overrides the built-in table.
    pub units: Option<String>,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self { variable: "dis24".to_string(), parameter: None, units: None }
    }
}

/// Copernicus retrieve request parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    pub enabled: bool,
    pub api_url: String,
    pub dataset: String,
    pub system_version: String,
    pub hydrological_model: String,
    pub product_type: String,
    pub variable: String,
    pub leadtime_hours: Vec<u32>,
    /// Forecast date as YYYY-MM-DD; today (UTC) when unset.
    pub date: Option<String>,
    pub poll_interval_secs: u64,
    pub max_wait_secs: u64,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_url: "https://ewds.climate.copernicus.eu/api".to_string(),
            dataset: "cems-glofas-forecast".to_string(),
            system_version: "operational".to_string(),
            hydrological_model: "lisflood".to_string(),
            product_type: "control_forecast".to_string(),
            variable: "river_discharge_in_the_last_24_hours".to_string(),
            leadtime_hours: vec![24, 48, 72],
            date: None,
            poll_interval_secs: 10,
            max_wait_secs: 1800,
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl PipelineConfig {
    /// Parses a configuration from TOML text and validates it.
    pub fn from_toml_str(contents: &str) -> Result<Self, PipelineError> {
        let config: PipelineConfig = toml::from_str(contents)
            .map_err(|e| PipelineError::Config(format!("Failed to parse configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a TOML file.
    ///
    /// Relative paths inside the file are resolved against the file's
    /// directory, so a config can be run from anywhere.
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let contents = fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let mut config = Self::from_toml_str(&contents)?;
        if let Some(base) = path.parent() {
            config.paths.resolve_against(base);
        }
        Ok(config)
    }

    /// Loads `path` if given; otherwise `pipeline.toml` in the working
    /// directory, falling back to defaults when that file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, PipelineError> {
        match path {
            Some(p) => Self::load(p),
            None => {
                let default_path = Path::new("pipeline.toml");
                if default_path.exists() {
                    Self::load(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        self.area.validate().map_err(PipelineError::Config)?;
        if self.forecast.variable.trim().is_empty() {
            return Err(PipelineError::Config("forecast.variable must not be empty".to_string()));
        }
        if self.download.leadtime_hours.is_empty() {
            return Err(PipelineError::Config("download.leadtime_hours must not be empty".to_string()));
        }
        if self.download.poll_interval_secs == 0 {
            return Err(PipelineError::Config("download.poll_interval_secs must be positive".to_string()));
        }
        Ok(())
    }
}

impl PathsConfig {
    fn resolve_against(&mut self, base: &Path) {
        let join = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        join(&mut self.stations_json);
        join(&mut self.forecast_file);
        join(&mut self.output_geojson);
        if let Some(raw) = self.raw_stations_geojson.as_mut() {
            join(raw);
        }
    }
}

/// Data-store credentials resolved from the environment.
#[derive(Debug, Clone)]
pub struct ApiCredentials {
    pub url: String,
    pub key: String,
}

/// Reads the API key (and optional URL override) from the environment,
/// loading `.env` first if present.
pub fn api_credentials(download: &DownloadConfig) -> Result<ApiCredentials, PipelineError> {
    dotenv::dotenv().ok();

    let key = env::var(ENV_API_KEY).map_err(|_| {
        PipelineError::Config(format!(
            "{} environment variable not set.\n\n  \
             Set it in .env or the shell, or run with --skip-download\n  \
             to use an existing forecast file.",
            ENV_API_KEY
        ))
    })?;
    let url = env::var(ENV_API_URL).unwrap_or_else(|_| download.api_url.clone());

    Ok(ApiCredentials { url: url.trim_end_matches('/').to_string(), key })
}
