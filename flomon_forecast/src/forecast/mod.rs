/// Gridded discharge forecast and the nearest-cell lookup seam.
///
/// `ForecastGrid` holds one variable as a dense (step, latitude, longitude)
/// array. The enhancer never touches the array directly; it goes through the
/// `DischargeLookup` trait so tests can substitute a synthetic grid.
///
/// Submodules:
/// - `grib` — reads a GRIB2 file into a `ForecastGrid`.

pub mod grib;

use std::fmt;

use crate::config::ForecastConfig;
use crate::model::{ForecastError, LookupError};

// ---------------------------------------------------------------------------
// Lookup seam
// ---------------------------------------------------------------------------

/// Nearest-neighbour access to a discharge forecast.
pub trait DischargeLookup {
    /// Number of lead-time steps.
    fn step_count(&self) -> usize;

    /// Unit string of the stored values, in provider notation (e.g. "m**3 s**-1").
    fn units(&self) -> &str;

    /// Raw value of the grid cell nearest to (`latitude`, `longitude`) at
    /// step index `step`. No interpolation. May be NaN for masked cells.
    fn lookup(&self, latitude: f64, longitude: f64, step: usize) -> Result<f64, LookupError>;
}

// ---------------------------------------------------------------------------
// Unit scaling
// ---------------------------------------------------------------------------

/// Tokens that mark a per-area (mass or depth flux) unit.
const PER_AREA_TOKENS: &[&str] = &["kg", "mm", "m**2", "m**-2", "m^2", "m-2"];

/// Factor applied to every raw value before scoring.
///
/// Per-area units are multiplied by 1000 as an approximate conversion to
/// volumetric discharge. The correction is kept as-is; it is not a proper
/// unit conversion.
pub fn scale_factor(units: &str) -> f64 {
    let units = units.to_lowercase();
    if PER_AREA_TOKENS.iter().any(|t| units.contains(t)) {
        1000.0
    } else {
        1.0
    }
}

// ---------------------------------------------------------------------------
// Variable identification
// ---------------------------------------------------------------------------

/// GRIB2 parameter identity: product discipline, parameter category and
/// parameter number (Code Table 4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParameterId {
    pub discipline: u8,
    pub category: u8,
    pub number: u8,
}

impl ParameterId {
    pub const fn new(discipline: u8, category: u8, number: u8) -> Self {
        Self { discipline, category, number }
    }
}

impl fmt::Display for ParameterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.discipline, self.category, self.number)
    }
}

/// Short name → parameter and units for the variables GloFAS delivers.
pub struct KnownVariable {
    pub short_name: &'static str,
    pub parameter: ParameterId,
    pub units: &'static str,
}

pub static KNOWN_VARIABLES: &[KnownVariable] = &[
    // River discharge in the last 24 hours (hydrological discipline,
    // "discharge from rivers or streams")
    KnownVariable {
        short_name: "dis24",
        parameter: ParameterId::new(1, 0, 7),
        units: "m**3 s**-1",
    },
];

pub fn find_known_variable(short_name: &str) -> Option<&'static KnownVariable> {
    KNOWN_VARIABLES.iter().find(|v| v.short_name == short_name)
}

fn find_known_parameter(parameter: ParameterId) -> Option<&'static KnownVariable> {
    KNOWN_VARIABLES.iter().find(|v| v.parameter == parameter)
}

/// A fully resolved request for one variable.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableRequest {
    pub short_name: String,
    pub parameter: ParameterId,
    pub units: String,
}

impl VariableRequest {
    /// Resolves the configured short name, applying explicit overrides.
    ///
    /// Returns `None` for an unknown short name without an explicit
    /// `parameter` triple.
    pub fn from_config(config: &ForecastConfig) -> Option<Self> {
        let known = find_known_variable(&config.variable);
        let parameter = match config.parameter {
            Some([d, c, n]) => ParameterId::new(d, c, n),
            None => known?.parameter,
        };
        let units = config
            .units
            .clone()
            .or_else(|| known.map(|k| k.units.to_string()))
            .unwrap_or_else(|| "unknown".to_string());

        Some(Self { short_name: config.variable.clone(), parameter, units })
    }

    /// Units to report when the grid was loaded from `parameter`, which may
    /// differ from the requested one after a relaxed load.
    fn units_for(&self, parameter: ParameterId) -> String {
        if parameter == self.parameter {
            self.units.clone()
        } else {
            find_known_parameter(parameter)
                .map(|k| k.units.to_string())
                .unwrap_or_else(|| "unknown".to_string())
        }
    }

    fn label(&self) -> String {
        format!("{} ({})", self.short_name, self.parameter)
    }
}

/// How strictly the loader matches the requested variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOptions {
    /// Only the requested parameter is accepted.
    Strict,
    /// Falls back to the file's only parameter when the requested one is absent.
    Relaxed,
}

impl fmt::Display for LoadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadOptions::Strict => write!(f, "strict"),
            LoadOptions::Relaxed => write!(f, "relaxed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Grid axes
// ---------------------------------------------------------------------------

/// One coordinate axis of a regular grid, in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct GridAxis {
    coords: Vec<f64>,
    min: f64,
    max: f64,
    spacing: f64,
}

impl GridAxis {
    pub fn new(coords: Vec<f64>) -> Result<Self, ForecastError> {
        if coords.is_empty() {
            return Err(ForecastError::IrregularGrid("empty coordinate axis".to_string()));
        }
        if coords.iter().any(|c| !c.is_finite()) {
            return Err(ForecastError::IrregularGrid("non-finite grid coordinate".to_string()));
        }
        let min = coords.iter().copied().fold(f64::INFINITY, f64::min);
        let max = coords.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let spacing = if coords.len() > 1 {
            (max - min) / (coords.len() - 1) as f64
        } else {
            f64::INFINITY
        };
        Ok(Self { coords, min, max, spacing })
    }

    pub fn len(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    pub fn coords(&self) -> &[f64] {
        &self.coords
    }

    /// Whether `q` lies within one grid spacing of the axis extent.
    /// A single-point axis accepts every query.
    fn covers(&self, q: f64) -> bool {
        q >= self.min - self.spacing && q <= self.max + self.spacing
    }

    /// Index of the coordinate closest to `q`; ties go to the earlier index.
    fn nearest_index(&self, q: f64) -> usize {
        let mut best = 0;
        let mut best_dist = f64::INFINITY;
        for (i, c) in self.coords.iter().enumerate() {
            let dist = (c - q).abs();
            if dist < best_dist {
                best = i;
                best_dist = dist;
            }
        }
        best
    }

    /// Nearest index for a latitude, or `None` outside the grid.
    fn nearest(&self, q: f64) -> Option<usize> {
        self.covers(q).then(|| self.nearest_index(q))
    }

    /// Nearest index for a longitude, trying the query in both the
    /// -180..180 and 0..360 conventions.
    fn nearest_longitude(&self, q: f64) -> Option<usize> {
        [q, q + 360.0, q - 360.0]
            .into_iter()
            .filter(|c| self.covers(*c))
            .map(|c| (self.nearest_index(c), c))
            .min_by(|(ia, ca), (ib, cb)| {
                let da = (self.coords[*ia] - ca).abs();
                let db = (self.coords[*ib] - cb).abs();
                da.total_cmp(&db)
            })
            .map(|(i, _)| i)
    }
}

// ---------------------------------------------------------------------------
// Forecast grid
// ---------------------------------------------------------------------------

/// One forecast variable on a regular lat/lon grid.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastGrid {
    variable: String,
    units: String,
    /// Forecast time of each step as reported by the file, ascending.
    steps: Vec<u32>,
    latitudes: GridAxis,
    longitudes: GridAxis,
    /// Row-major [step][lat][lon].
    values: Vec<f64>,
}

impl ForecastGrid {
    pub fn new(
        variable: impl Into<String>,
        units: impl Into<String>,
        steps: Vec<u32>,
        latitudes: Vec<f64>,
        longitudes: Vec<f64>,
        values: Vec<f64>,
    ) -> Result<Self, ForecastError> {
        let latitudes = GridAxis::new(latitudes)?;
        let longitudes = GridAxis::new(longitudes)?;
        if steps.is_empty() {
            return Err(ForecastError::IrregularGrid("no lead-time steps".to_string()));
        }
        let expected = steps.len() * latitudes.len() * longitudes.len();
        if values.len() != expected {
            return Err(ForecastError::IrregularGrid(format!(
                "expected {} values ({} steps × {} lat × {} lon), got {}",
                expected,
                steps.len(),
                latitudes.len(),
                longitudes.len(),
                values.len()
            )));
        }
        Ok(Self {
            variable: variable.into(),
            units: units.into(),
            steps,
            latitudes,
            longitudes,
            values,
        })
    }

    pub fn variable(&self) -> &str {
        &self.variable
    }

    pub fn steps(&self) -> &[u32] {
        &self.steps
    }

    pub fn latitudes(&self) -> &GridAxis {
        &self.latitudes
    }

    pub fn longitudes(&self) -> &GridAxis {
        &self.longitudes
    }

    /// Value at explicit indices; `None` when any index is out of range.
    pub fn value_at(&self, step: usize, lat_index: usize, lon_index: usize) -> Option<f64> {
        if step >= self.steps.len()
            || lat_index >= self.latitudes.len()
            || lon_index >= self.longitudes.len()
        {
            return None;
        }
        let idx = (step * self.latitudes.len() + lat_index) * self.longitudes.len() + lon_index;
        self.values.get(idx).copied()
    }
}

impl DischargeLookup for ForecastGrid {
    fn step_count(&self) -> usize {
        self.steps.len()
    }

    fn units(&self) -> &str {
        &self.units
    }

    fn lookup(&self, latitude: f64, longitude: f64, step: usize) -> Result<f64, LookupError> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(LookupError::InvalidCoordinate);
        }
        if step >= self.steps.len() {
            return Err(LookupError::StepOutOfRange { step, available: self.steps.len() });
        }
        let out_of_grid = || LookupError::OutOfGrid { latitude, longitude };
        let lat_index = self.latitudes.nearest(latitude).ok_or_else(out_of_grid)?;
        let lon_index = self.longitudes.nearest_longitude(longitude).ok_or_else(out_of_grid)?;

        self.value_at(step, lat_index, lon_index).ok_or_else(out_of_grid)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// 2 steps over a 3×4 grid covering 52.3–52.7 N, 12.0–13.8 E.
    /// Step 0 value = 10 * lat_index + lon_index; step 1 adds 100.
    fn sample_grid() -> ForecastGrid {
        let lats = vec![52.7, 52.5, 52.3];
        let lons = vec![12.0, 12.6, 13.2, 13.8];
        let mut values = Vec::new();
        for step in 0..2 {
            for j in 0..lats.len() {
                for i in 0..lons.len() {
                    values.push((step * 100 + j * 10 + i) as f64);
                }
            }
        }
        ForecastGrid::new("dis24", "m**3 s**-1", vec![0, 24], lats, lons, values)
            .expect("sample grid should be valid")
    }

    // --- Scale factor ---------------------------------------------------------

    #[test]
    fn test_scale_factor_volumetric_units_unscaled() {
        assert_eq!(scale_factor("m**3 s**-1"), 1.0);
        assert_eq!(scale_factor("m3/s"), 1.0);
        assert_eq!(scale_factor(""), 1.0);
    }

    #[test]
    fn test_scale_factor_per_area_units_times_1000() {
        assert_eq!(scale_factor("kg m**-2"), 1000.0);
        assert_eq!(scale_factor("mm"), 1000.0);
        assert_eq!(scale_factor("m**3 m**-2"), 1000.0);
        assert_eq!(scale_factor("KG M-2 S-1"), 1000.0, "token match is case-insensitive");
    }

    // --- Variable resolution ------------------------------------------------

    #[test]
    fn test_variable_request_uses_known_table() {
        let request = VariableRequest::from_config(&ForecastConfig::default())
            .expect("dis24 is a known variable");
        assert_eq!(request.parameter, ParameterId::new(1, 0, 7));
        assert_eq!(request.units, "m**3 s**-1");
    }

    #[test]
    fn test_variable_request_overrides() {
        let config = ForecastConfig {
            variable: "rowe".to_string(),
            parameter: Some([1, 0, 5]),
            units: Some("kg m**-2".to_string()),
        };
        let request = VariableRequest::from_config(&config).expect("explicit parameter given");
        assert_eq!(request.parameter, ParameterId::new(1, 0, 5));
        assert_eq!(request.units, "kg m**-2");
    }

    #[test]
    fn test_unknown_variable_without_parameter_is_unresolved() {
        let config = ForecastConfig { variable: "swvl1".to_string(), parameter: None, units: None };
        assert!(VariableRequest::from_config(&config).is_none());
    }

    // --- Grid construction ----------------------------------------------------

    #[test]
    fn test_grid_rejects_mismatched_value_count() {
        let result = ForecastGrid::new("dis24", "m**3 s**-1", vec![0], vec![52.5], vec![13.0, 13.5], vec![1.0]);
        assert!(matches!(result, Err(ForecastError::IrregularGrid(_))));
    }

    #[test]
    fn test_grid_rejects_empty_steps() {
        let result = ForecastGrid::new("dis24", "m**3 s**-1", vec![], vec![52.5], vec![13.0], vec![]);
        assert!(matches!(result, Err(ForecastError::IrregularGrid(_))));
    }

    // --- Nearest-neighbour lookup --------------------------------------------

    #[test]
    fn test_lookup_exact_grid_point() {
        let grid = sample_grid();
        assert_eq!(grid.lookup(52.5, 13.2, 0), Ok(12.0));
        assert_eq!(grid.lookup(52.5, 13.2, 1), Ok(112.0));
    }

    #[test]
    fn test_lookup_snaps_to_nearest_cell() {
        let grid = sample_grid();
        // 52.58 is nearest 52.5 (j=1); 13.45 is nearest 13.2 (i=2)
        assert_eq!(grid.lookup(52.58, 13.45, 0), Ok(12.0));
        // 52.62 is nearest 52.7 (j=0); 13.55 is nearest 13.8 (i=3)
        assert_eq!(grid.lookup(52.62, 13.55, 0), Ok(3.0));
    }

    #[test]
    fn test_lookup_just_outside_edge_uses_edge_cell() {
        let grid = sample_grid();
        // Within one spacing (0.2° lat, 0.6° lon) of the extent
        assert_eq!(grid.lookup(52.8, 11.7, 0), Ok(0.0));
    }

    #[test]
    fn test_lookup_far_outside_is_out_of_grid() {
        let grid = sample_grid();
        let result = grid.lookup(51.05, 13.74, 0);
        assert_eq!(
            result,
            Err(LookupError::OutOfGrid { latitude: 51.05, longitude: 13.74 }),
            "Dresden is well south of the Berlin grid"
        );
    }

    #[test]
    fn test_lookup_accepts_0_360_longitudes() {
        let lons = vec![350.0, 355.0, 360.0];
        let grid = ForecastGrid::new("dis24", "m**3 s**-1", vec![0], vec![50.0], lons, vec![1.0, 2.0, 3.0])
            .expect("valid grid");
        assert_eq!(grid.lookup(50.0, -5.0, 0), Ok(2.0));
    }

    #[test]
    fn test_lookup_step_out_of_range() {
        let grid = sample_grid();
        assert_eq!(
            grid.lookup(52.5, 13.2, 2),
            Err(LookupError::StepOutOfRange { step: 2, available: 2 })
        );
    }

    #[test]
    fn test_lookup_rejects_nan_coordinates() {
        let grid = sample_grid();
        assert_eq!(grid.lookup(f64::NAN, 13.2, 0), Err(LookupError::InvalidCoordinate));
    }

    #[test]
    fn test_single_cell_grid_matches_any_point() {
        let grid = ForecastGrid::new("dis24", "m**3 s**-1", vec![0], vec![52.5], vec![13.0], vec![7.5])
            .expect("valid grid");
        assert_eq!(grid.lookup(48.0, 9.0, 0), Ok(7.5));
    }

    #[test]
    fn test_lookup_passes_nan_cells_through() {
        let grid = ForecastGrid::new(
            "dis24",
            "m**3 s**-1",
            vec![0],
            vec![52.5],
            vec![13.0, 13.5],
            vec![f64::NAN, 4.0],
        )
        .expect("valid grid");
        let value = grid.lookup(52.5, 13.0, 0).expect("in grid");
        assert!(value.is_nan(), "masked cells are the enhancer's concern, not the grid's");
    }
}
