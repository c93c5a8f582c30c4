/// External data acquisition.
///
/// - `cds` — Copernicus data-store retrieve client (GloFAS forecast GRIB).
/// - `fixtures` (test only) — representative station and API payloads.

pub mod cds;
pub mod fixtures;
