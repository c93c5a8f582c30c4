/// Test fixtures: representative payloads for the station loader and the
/// Copernicus retrieve client.
///
/// Station records follow the PEGELONLINE `stations.json` shape:
///   [ { uuid, number, shortname, longname, km, agency,
///       longitude, latitude, water: { shortname, longname } } ]
///
/// Note: `number` is a JSON string, `km` a number, and either coordinate may
/// be absent for stations that have not been surveyed.

/// Three surveyed Elbe/Spree stations and one record without a latitude.
#[cfg(test)]
pub(crate) fn fixture_stations_json() -> &'static str {
    r#"[
      {
        "uuid": "070b1eb4-3872-4e07-b2e5-e25fd9251b93",
        "number": "501060",
        "shortname": "DRESDEN",
        "longname": "DRESDEN",
        "km": 55.63,
        "agency": "DRESDEN",
        "longitude": 13.738831783620384,
        "latitude": 51.054459765598125,
        "water": { "shortname": "ELBE", "longname": "ELBE" }
      },
      {
        "uuid": "593647aa-9fea-43ec-a7d6-6476a76ae868",
        "number": "586010",
        "shortname": "BERLIN-MÜHLENDAMM UP",
        "longname": "BERLIN-MÜHLENDAMM UP",
        "km": 17.49,
        "agency": "BERLIN",
        "longitude": 13.40972,
        "latitude": 52.51306,
        "water": { "shortname": "SPREE-ODER-WASSERSTRASSE", "longname": "SPREE-ODER-WASSERSTRASSE" }
      },
      {
        "uuid": "c0f1e8e8-ea2f-4a87-a8bf-3d7aaf0d0d43",
        "number": "580412",
        "shortname": "KETZIN",
        "longname": "KETZIN",
        "km": 44.3,
        "agency": "BRANDENBURG",
        "longitude": 12.84833,
        "latitude": 52.47528,
        "water": { "shortname": "HAVEL", "longname": "HAVEL" }
      },
      {
        "uuid": "a2a1a3b4-0000-4000-8000-000000000001",
        "number": "9990001",
        "shortname": "UNSURVEYED",
        "longname": "UNSURVEYED GAUGE",
        "agency": "BERLIN",
        "longitude": 13.1
      }
    ]"#
}

/// Stations with sparse metadata: null coordinate, missing `water` object,
/// missing `km`.
#[cfg(test)]
pub(crate) fn fixture_sparse_stations_json() -> &'static str {
    r#"[
      { "number": "1", "shortname": "NULL-LON", "longitude": null, "latitude": 52.4 },
      { "number": "2", "shortname": "NO-WATER", "longitude": 13.0, "latitude": 52.4 },
      { "shortname": "ONLY-COORDS", "longitude": 12.5, "latitude": 52.6, "water": {} }
    ]"#
}

/// Response to `POST /retrieve/v1/processes/{dataset}/execution`.
#[cfg(test)]
pub(crate) fn fixture_job_accepted_json() -> &'static str {
    r#"{
      "processID": "cems-glofas-forecast",
      "type": "process",
      "jobID": "6d5a3f0e-1f0c-4d8e-9d54-0b5c2b8a1e77",
      "status": "accepted",
      "created": "2025-09-30T06:12:41.123456",
      "updated": "2025-09-30T06:12:41.123456",
      "links": [
        { "href": "https://ewds.climate.copernicus.eu/api/retrieve/v1/jobs/6d5a3f0e-1f0c-4d8e-9d54-0b5c2b8a1e77", "rel": "monitor" }
      ]
    }"#
}

/// Job status after processing finished.
#[cfg(test)]
pub(crate) fn fixture_job_successful_json() -> &'static str {
    r#"{
      "processID": "cems-glofas-forecast",
      "type": "process",
      "jobID": "6d5a3f0e-1f0c-4d8e-9d54-0b5c2b8a1e77",
      "status": "successful",
      "started": "2025-09-30T06:12:45.000000",
      "finished": "2025-09-30T06:13:30.000000"
    }"#
}

/// Job results: the asset link for the produced GRIB file.
#[cfg(test)]
pub(crate) fn fixture_job_results_json() -> &'static str {
    r#"{
      "asset": {
        "value": {
          "type": "application/x-grib",
          "href": "https://object-store.os-api.cci2.ecmwf.int/cci2-prod-cache/f3/f3c9e2.grib",
          "file:checksum": "b7e4f0c1d2",
          "file:size": 4126,
          "file:local_path": "s3://cci2-prod-cache/f3/f3c9e2.grib"
        }
      }
    }"#
}
