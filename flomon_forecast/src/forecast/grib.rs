/// GRIB2 forecast reader.
///
/// Decodes a GloFAS GRIB2 file with the `grib` crate and assembles the
/// messages of one parameter into a `ForecastGrid`.
///
/// GloFAS GRIB layout (one file per request):
///   one message per (parameter, lead-time step)
///     indicator.discipline             — 1 (hydrological products)
///     prod_def.parameter_category/number
///     prod_def.forecast_time           — start of the 24 h window
///     grid: regular lat/lon, scanned row by row (north to south)
///     masked cells (sea, no river) decode to NaN
///
/// Reading happens in two passes: a header-only scan lists the parameters,
/// then only the chosen parameter's messages are decoded.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use grib::codetables::{CodeTable4_2, Lookup};

use super::{ForecastGrid, LoadOptions, ParameterId, VariableRequest};
use crate::logging::{self, Stage};
use crate::model::ForecastError;

// ---------------------------------------------------------------------------
// Decoded message types
// ---------------------------------------------------------------------------

/// Header of one GRIB submessage.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageSummary {
    pub parameter: ParameterId,
    /// Code Table 4.2 parameter name, e.g. "Discharge from rivers or streams".
    pub name: String,
    pub forecast_time: Option<u32>,
}

impl MessageSummary {
    fn describe(&self) -> String {
        format!("{} ({})", self.parameter, self.name)
    }
}

/// A submessage with decoded grid points and values.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DecodedMessage {
    pub forecast_time: Option<u32>,
    /// (latitude, longitude) per grid point, in scan order.
    pub points: Vec<(f64, f64)>,
    pub values: Vec<f64>,
}

// ---------------------------------------------------------------------------
// File access
// ---------------------------------------------------------------------------

/// Scans `path`, returning every submessage header. Grid points and values
/// are decoded only for submessages of `decode` (pass `None` for headers only).
fn scan(
    path: &Path,
    decode: Option<ParameterId>,
) -> Result<(Vec<MessageSummary>, Vec<DecodedMessage>), ForecastError> {
    let file = File::open(path)
        .map_err(|e| ForecastError::Io(format!("{}: {}", path.display(), e)))?;
    let grib2 = grib::from_reader(BufReader::new(file))
        .map_err(|e| ForecastError::Decode(format!("{}: {}", path.display(), e)))?;

    let mut summaries = Vec::new();
    let mut decoded = Vec::new();

    for (index, submessage) in grib2.iter() {
        let discipline = submessage.indicator().discipline;
        let prod_def = submessage.prod_def();
        let (Some(category), Some(number)) =
            (prod_def.parameter_category(), prod_def.parameter_number())
        else {
            logging::debug(
                Stage::Forecast,
                None,
                &format!("Skipping submessage {:?} without parameter identification", index),
            );
            continue;
        };
        let forecast_time = prod_def.forecast_time().map(|ft| ft.value);

        let parameter = ParameterId::new(discipline, category, number);
        let name = CodeTable4_2::new(discipline, category)
            .lookup(usize::from(number))
            .to_string();

        summaries.push(MessageSummary { parameter, name, forecast_time });

        if decode != Some(parameter) {
            continue;
        }

        let points: Vec<(f64, f64)> = submessage
            .latlons()
            .map_err(|e| ForecastError::Decode(format!("submessage {:?}: {}", index, e)))?
            .map(|(lat, lon)| (f64::from(lat), f64::from(lon)))
            .collect();

        let decoder = grib::Grib2SubmessageDecoder::from(submessage)
            .map_err(|e| ForecastError::Decode(format!("submessage {:?}: {}", index, e)))?;
        let values: Vec<f64> = decoder
            .dispatch()
            .map_err(|e| ForecastError::Decode(format!("submessage {:?}: {}", index, e)))?
            .map(f64::from)
            .collect();

        decoded.push(DecodedMessage { forecast_time, points, values });
    }

    Ok((summaries, decoded))
}

/// Lists every submessage header in a GRIB file.
pub fn list_messages(path: &Path) -> Result<Vec<MessageSummary>, ForecastError> {
    scan(path, None).map(|(summaries, _)| summaries)
}

/// Distinct parameters in a file, formatted for diagnostics.
pub fn available_variables(summaries: &[MessageSummary]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    summaries
        .iter()
        .filter(|s| seen.insert(s.parameter))
        .map(MessageSummary::describe)
        .collect()
}

/// Opens a GRIB file and extracts the requested variable as a `ForecastGrid`.
///
/// # Errors
/// - `ForecastError::Io` / `Decode` — unreadable or corrupt file.
/// - `ForecastError::NoMessages` — the file holds no identifiable messages.
/// - `ForecastError::VariableNotFound` — the parameter is absent (and, for
///   `LoadOptions::Relaxed`, the file holds more than one other parameter).
/// - `ForecastError::IrregularGrid` — steps do not share one regular grid.
pub fn load_forecast(
    path: &Path,
    request: &VariableRequest,
    options: LoadOptions,
) -> Result<ForecastGrid, ForecastError> {
    let summaries = list_messages(path)?;
    let parameter = select_parameter(&summaries, request, options)?;
    if parameter != request.parameter {
        logging::warn(
            Stage::Forecast,
            None,
            &format!(
                "Requested {} not present; using the file's only parameter {}",
                request.short_name, parameter
            ),
        );
    }

    let (_, messages) = scan(path, Some(parameter))?;
    let label = if parameter == request.parameter {
        request.short_name.clone()
    } else {
        parameter.to_string()
    };
    assemble_grid(label, request.units_for(parameter), messages)
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

/// Picks the parameter to decode according to `options`.
pub(crate) fn select_parameter(
    summaries: &[MessageSummary],
    request: &VariableRequest,
    options: LoadOptions,
) -> Result<ParameterId, ForecastError> {
    if summaries.is_empty() {
        return Err(ForecastError::NoMessages);
    }
    if summaries.iter().any(|s| s.parameter == request.parameter) {
        return Ok(request.parameter);
    }

    let distinct: BTreeSet<ParameterId> = summaries.iter().map(|s| s.parameter).collect();
    if options == LoadOptions::Relaxed && distinct.len() == 1 {
        if let Some(only) = distinct.into_iter().next() {
            return Ok(only);
        }
    }

    Err(ForecastError::VariableNotFound {
        requested: request.label(),
        available: available_variables(summaries),
    })
}

/// Builds a grid from the decoded messages of a single parameter.
///
/// Steps are ordered by forecast time; a repeated forecast time keeps the
/// first message. Axes come from the first message's scan: the leading run
/// of points sharing one latitude gives the longitudes, every row's first
/// point gives the latitudes.
pub(crate) fn assemble_grid(
    variable: String,
    units: String,
    mut messages: Vec<DecodedMessage>,
) -> Result<ForecastGrid, ForecastError> {
    if messages.is_empty() {
        return Err(ForecastError::NoMessages);
    }

    messages.sort_by_key(|m| m.forecast_time.unwrap_or(0));
    messages.dedup_by_key(|m| m.forecast_time);

    let (latitudes, longitudes) = derive_axes(&messages[0].points)?;
    let cells = latitudes.len() * longitudes.len();

    let mut steps = Vec::with_capacity(messages.len());
    let mut values = Vec::with_capacity(messages.len() * cells);
    for message in messages {
        if message.points.len() != cells || message.values.len() != cells {
            return Err(ForecastError::IrregularGrid(format!(
                "step {:?} has {} points and {} values, expected {}",
                message.forecast_time,
                message.points.len(),
                message.values.len(),
                cells
            )));
        }
        steps.push(message.forecast_time.unwrap_or(0));
        values.extend(message.values);
    }

    ForecastGrid::new(variable, units, steps, latitudes, longitudes, values)
}

fn derive_axes(points: &[(f64, f64)]) -> Result<(Vec<f64>, Vec<f64>), ForecastError> {
    let Some(&(first_lat, _)) = points.first() else {
        return Err(ForecastError::IrregularGrid("message has no grid points".to_string()));
    };
    let row_len = points.iter().take_while(|(lat, _)| *lat == first_lat).count();
    if points.len() % row_len != 0 {
        return Err(ForecastError::IrregularGrid(format!(
            "{} points do not divide into rows of {}",
            points.len(),
            row_len
        )));
    }

    let longitudes: Vec<f64> = points[..row_len].iter().map(|(_, lon)| *lon).collect();
    let latitudes: Vec<f64> = points.chunks(row_len).map(|row| row[0].0).collect();

    let regular = points.chunks(row_len).all(|row| {
        row.iter()
            .zip(&longitudes)
            .all(|((lat, lon), expected_lon)| *lat == row[0].0 && lon == expected_lon)
    });
    if !regular {
        return Err(ForecastError::IrregularGrid(
            "grid points are not a regular lat/lon raster".to_string(),
        ));
    }

    Ok((latitudes, longitudes))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
