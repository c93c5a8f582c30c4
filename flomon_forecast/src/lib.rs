/// flomon_forecast: GloFAS discharge forecast → station flood-risk layer.
///
/// # Module structure
///
/// ```text
/// flomon_forecast
/// ├── model       — shared data types (StationRecord, StationForecast, RiskCategory, errors)
/// ├── config      — pipeline configuration loader (pipeline.toml + CDSAPI_* env)
/// ├── logging     — stage-tagged console/file logging
/// ├── stations    — stations.json loader
/// ├── forecast    — ForecastGrid + DischargeLookup seam, unit scaling
/// │   └── grib    — GRIB2 reader (strict / relaxed variable matching)
/// ├── ingest
/// │   ├── cds     — Copernicus retrieve API client
/// │   └── fixtures (test only) — representative JSON payloads
/// ├── analysis
/// │   ├── enhance — nearest-cell join and per-station outcome
/// │   └── risk    — flood-risk score and category table
/// ├── output      — GeoJSON writer and run summary
/// └── pipeline    — download → load → enhance → write driver
/// ```

/// Public modules
pub mod analysis;
pub mod config;
pub mod forecast;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod stations;
