/// Core data types for the GloFAS station forecast pipeline.
///
/// This module defines the shared domain model imported by all other modules:
/// station records, the per-station forecast outcome, risk categories and the
/// error types. It contains no I/O.

use std::fmt;

// ---------------------------------------------------------------------------
// Station types
// ---------------------------------------------------------------------------

/// A water-monitoring station with a known position.
///
/// Only stations whose source record carried both coordinates are ever
/// constructed; see `stations::parse_station_json`.
#[derive(Debug, Clone, PartialEq)]
pub struct StationRecord {
    /// Short station name (`shortname` in the source JSON).
    pub name: Option<String>,
    /// Agency station number (`number`).
    pub id: Option<String>,
    pub agency: Option<String>,
    /// Short river name (`water.shortname`).
    pub river_name: Option<String>,
    /// River kilometre of the gauge (`km`).
    pub river_km: Option<f64>,
    /// WGS84 longitude.
    pub longitude: f64,
    /// WGS84 latitude.
    pub latitude: f64,
}

impl StationRecord {
    /// Name used in log lines; falls back to the station number.
    pub fn label(&self) -> &str {
        self.name
            .as_deref()
            .or(self.id.as_deref())
            .unwrap_or("unknown")
    }
}

// ---------------------------------------------------------------------------
// Risk categories
// ---------------------------------------------------------------------------

/// Ordinal flood-risk label attached to every output station.
///
/// Variant order is significant: `VeryLow < Low < Medium < High < Extreme`.
/// `Unknown` sorts last and is only used when scoring was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RiskCategory {
    VeryLow,
    Low,
    Medium,
    High,
    Extreme,
    Unknown,
}

impl RiskCategory {
    /// All categories in reporting order.
    pub const ALL: [RiskCategory; 6] = [
        RiskCategory::Extreme,
        RiskCategory::High,
        RiskCategory::Medium,
        RiskCategory::Low,
        RiskCategory::VeryLow,
        RiskCategory::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskCategory::VeryLow => "Very Low",
            RiskCategory::Low => "Low",
            RiskCategory::Medium => "Medium",
            RiskCategory::High => "High",
            RiskCategory::Extreme => "Extreme",
            RiskCategory::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Enhancement outcome
// ---------------------------------------------------------------------------

/// What the enhancer learned about one station.
///
/// Every input station yields exactly one of these, so the output collection
/// is always the same size as the input.
#[derive(Debug, Clone, PartialEq)]
pub enum StationForecast {
    /// At least one non-zero step; scored and classified.
    Scored {
        /// Scaled discharge per lead-time step, NaN replaced by 0.0.
        values: Vec<f64>,
        avg_discharge: f64,
        score: u32,
        category: RiskCategory,
    },
    /// Every step was zero or NaN. Scoring skipped.
    NoData,
    /// The grid lookup itself failed (e.g. station outside the grid).
    LookupFailed(String),
}

/// A station record paired with its forecast outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct EnhancedStation {
    pub station: StationRecord,
    pub forecast: StationForecast,
}

impl EnhancedStation {
    pub fn category(&self) -> RiskCategory {
        match &self.forecast {
            StationForecast::Scored { category, .. } => *category,
            StationForecast::NoData | StationForecast::LookupFailed(_) => RiskCategory::Unknown,
        }
    }

    /// Mean scaled discharge. `NoData` reports 0; a failed lookup has none.
    pub fn avg_discharge(&self) -> Option<f64> {
        match &self.forecast {
            StationForecast::Scored { avg_discharge, .. } => Some(*avg_discharge),
            StationForecast::NoData => Some(0.0),
            StationForecast::LookupFailed(_) => None,
        }
    }

    pub fn score(&self) -> Option<u32> {
        match &self.forecast {
            StationForecast::Scored { score, .. } => Some(*score),
            _ => None,
        }
    }

    /// Number of lead-time steps that contributed to the score (0 when skipped).
    pub fn forecast_steps(&self) -> usize {
        match &self.forecast {
            StationForecast::Scored { values, .. } => values.len(),
            _ => 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors from a single nearest-cell lookup. Recovered per station.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupError {
    /// The query point lies more than one grid spacing outside the grid.
    OutOfGrid { latitude: f64, longitude: f64 },
    /// Step index past the last lead-time step.
    StepOutOfRange { step: usize, available: usize },
    /// NaN or infinite query coordinate.
    InvalidCoordinate,
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupError::OutOfGrid { latitude, longitude } => {
                write!(f, "point ({:.4}, {:.4}) is outside the forecast grid", latitude, longitude)
            }
            LookupError::StepOutOfRange { step, available } => {
                write!(f, "step {} out of range ({} steps available)", step, available)
            }
            LookupError::InvalidCoordinate => write!(f, "invalid coordinate"),
        }
    }
}

impl std::error::Error for LookupError {}

/// Errors raised while opening or decoding a forecast file.
#[derive(Debug, Clone, PartialEq)]
pub enum ForecastError {
    /// The file could not be opened or read.
    Io(String),
    /// The GRIB decoder rejected the file or one of its messages.
    Decode(String),
    /// The requested variable is not present. `available` lists what is.
    VariableNotFound { requested: String, available: Vec<String> },
    /// Messages do not form one regular lat/lon grid.
    IrregularGrid(String),
    /// The file holds no GRIB messages at all.
    NoMessages,
}

impl fmt::Display for ForecastError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForecastError::Io(msg) => write!(f, "Forecast file error: {}", msg),
            ForecastError::Decode(msg) => write!(f, "GRIB decode error: {}", msg),
            ForecastError::VariableNotFound { requested, available } => {
                write!(f, "Variable '{}' not found in forecast file", requested)?;
                if available.is_empty() {
                    write!(f, " (no variables available)")
                } else {
                    write!(f, "\n  Available variables: {}", available.join(", "))
                }
            }
            ForecastError::IrregularGrid(msg) => write!(f, "Irregular forecast grid: {}", msg),
            ForecastError::NoMessages => write!(f, "Forecast file contains no GRIB messages"),
        }
    }
}

impl std::error::Error for ForecastError {}

/// Fatal, run-aborting pipeline errors.
#[derive(Debug)]
pub enum PipelineError {
    /// Missing or invalid configuration.
    Config(String),
    /// Station JSON missing, unreadable or malformed.
    StationData(String),
    /// Forecast download failed.
    Download(String),
    /// Forecast could not be loaded with any load option.
    Forecast(ForecastError),
    /// Output could not be serialised or written.
    Output(String),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Config(msg) => write!(f, "Configuration error: {}", msg),
            PipelineError::StationData(msg) => write!(f, "Station data error: {}", msg),
            PipelineError::Download(msg) => write!(f, "Download error: {}", msg),
            PipelineError::Forecast(e) => write!(f, "{}", e),
            PipelineError::Output(msg) => write!(f, "Output error: {}", msg),
        }
    }
}

impl std::error::Error for PipelineError {}

impl From<ForecastError> for PipelineError {
    fn from(e: ForecastError) -> Self {
        PipelineError::Forecast(e)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
