/// Forecast analysis for the station pipeline.
///
/// Submodules:
/// - `enhance` — nearest-cell join of stations against the forecast grid.
/// - `risk`    — flood-risk scoring and category table.

pub mod enhance;
pub mod risk;
