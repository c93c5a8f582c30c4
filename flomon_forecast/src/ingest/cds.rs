/// Copernicus data-store retrieve client (CDS / EWDS "retrieve/v1" API).
///
/// Downloads the GloFAS control forecast for the configured area:
///   1. POST {api}/retrieve/v1/processes/{dataset}/execution  → jobID
///   2. GET  {api}/retrieve/v1/jobs/{jobID}                   → status
///   3. GET  {api}/retrieve/v1/jobs/{jobID}/results           → asset href
///   4. GET  href                                             → GRIB file
///
/// Authentication is a personal access token sent as `PRIVATE-TOKEN`.
/// Failed jobs and failed downloads are reported, never retried.

use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::error::Error;
use std::fs::{self, File};
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use crate::config::{ApiCredentials, BoundingBox, DownloadConfig};
use crate::logging::{self, Stage};

const TOKEN_HEADER: &str = "PRIVATE-TOKEN";

// ============================================================================
// API Response Structures
// ============================================================================

/// Job document returned by the execution and job-status endpoints.
#[derive(Debug, Deserialize)]
pub struct JobInfo {
    #[serde(rename = "jobID")]
    pub job_id: String,
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JobResults {
    asset: ResultAsset,
}

#[derive(Debug, Deserialize)]
struct ResultAsset {
    value: AssetValue,
}

#[derive(Debug, Deserialize)]
struct AssetValue {
    href: String,
    #[serde(rename = "file:size")]
    #[serde(default)]
    size: Option<u64>,
}

/// Lifecycle of a retrieve job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Successful,
    Failed(String),
}

impl JobInfo {
    pub fn state(&self) -> JobState {
        match self.status.as_str() {
            "accepted" | "running" => JobState::Pending,
            "successful" => JobState::Successful,
            other => JobState::Failed(
                self.message
                    .clone()
                    .unwrap_or_else(|| format!("job {}", other)),
            ),
        }
    }
}

// ============================================================================
// Request Construction
// ============================================================================

/// Forecast date to request: the configured date, or today (UTC).
pub fn forecast_date(download: &DownloadConfig) -> Result<NaiveDate, String> {
    match &download.date {
        Some(date) => NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|e| format!("download.date '{}' is not YYYY-MM-DD: {}", date, e)),
        None => Ok(Utc::now().date_naive()),
    }
}

/// Builds the `inputs` object of a retrieve request.
pub fn build_request(download: &DownloadConfig, area: &BoundingBox, date: NaiveDate) -> Value {
    let leadtimes: Vec<String> = download.leadtime_hours.iter().map(|h| h.to_string()).collect();
    json!({
        "system_version": download.system_version,
        "hydrological_model": download.hydrological_model,
        "product_type": download.product_type,
        "variable": download.variable,
        "year": date.format("%Y").to_string(),
        "month": date.format("%m").to_string(),
        "day": date.format("%d").to_string(),
        "leadtime_hour": leadtimes,
        "data_format": "grib",
        "area": area.as_request_area(),
    })
}

fn execution_url(api_url: &str, dataset: &str) -> String {
    format!("{}/retrieve/v1/processes/{}/execution", api_url, dataset)
}

fn job_url(api_url: &str, job_id: &str) -> String {
    format!("{}/retrieve/v1/jobs/{}", api_url, job_id)
}

fn results_url(api_url: &str, job_id: &str) -> String {
    format!("{}/results", job_url(api_url, job_id))
}

// ============================================================================
// Response Parsing
// ============================================================================

pub fn parse_job(json: &str) -> Result<JobInfo, serde_json::Error> {
    serde_json::from_str(json)
}

/// Extracts the download link (and advertised size) from a results document.
pub fn parse_results(json: &str) -> Result<(String, Option<u64>), serde_json::Error> {
    let results: JobResults = serde_json::from_str(json)?;
    Ok((results.asset.value.href, results.asset.value.size))
}

// ============================================================================
// API Client Functions
// ============================================================================

fn get_text(
    client: &reqwest::blocking::Client,
    url: &str,
    credentials: &ApiCredentials,
) -> Result<String, Box<dyn Error>> {
    let response = client
        .get(url)
        .header(TOKEN_HEADER, &credentials.key)
        .header("Accept", "application/json")
        .send()?;

    if !response.status().is_success() {
        return Err(format!("Data store API error: {} ({})", response.status(), url).into());
    }
    Ok(response.text()?)
}

/// Submits a retrieve job and returns the accepted job.
pub fn submit_job(
    client: &reqwest::blocking::Client,
    credentials: &ApiCredentials,
    dataset: &str,
    request: &Value,
) -> Result<JobInfo, Box<dyn Error>> {
    let url = execution_url(&credentials.url, dataset);
    let response = client
        .post(&url)
        .header(TOKEN_HEADER, &credentials.key)
        .json(&json!({ "inputs": request }))
        .send()?;

    let status = response.status();
    let body = response.text()?;
    if !status.is_success() {
        return Err(format!("Data store rejected request: {} - {}", status, body).into());
    }
    Ok(parse_job(&body)?)
}

/// Fetches the current state of a job.
pub fn fetch_job(
    client: &reqwest::blocking::Client,
    credentials: &ApiCredentials,
    job_id: &str,
) -> Result<JobInfo, Box<dyn Error>> {
    let body = get_text(client, &job_url(&credentials.url, job_id), credentials)?;
    Ok(parse_job(&body)?)
}

/// Polls a job until it succeeds, fails, or `max_wait` elapses.
pub fn wait_for_job(
    client: &reqwest::blocking::Client,
    credentials: &ApiCredentials,
    job: JobInfo,
    poll_interval: Duration,
    max_wait: Duration,
) -> Result<JobInfo, Box<dyn Error>> {
    let started = Instant::now();
    let mut job = job;

    loop {
        match job.state() {
            JobState::Successful => return Ok(job),
            JobState::Failed(reason) => {
                return Err(format!("Retrieve job {} failed: {}", job.job_id, reason).into());
            }
            JobState::Pending => {}
        }
        if started.elapsed() >= max_wait {
            return Err(format!(
                "Retrieve job {} still '{}' after {} s",
                job.job_id,
                job.status,
                max_wait.as_secs()
            )
            .into());
        }

        logging::debug(
            Stage::Download,
            None,
            &format!("Job {} is {}; checking again in {} s", job.job_id, job.status, poll_interval.as_secs()),
        );
        thread::sleep(poll_interval);
        job = fetch_job(client, credentials, &job.job_id)?;
    }
}

/// Streams `href` to `target`, writing through a temporary sibling file so
/// a failed transfer never leaves a truncated forecast behind.
pub fn download_file(
    client: &reqwest::blocking::Client,
    href: &str,
    target: &Path,
) -> Result<u64, Box<dyn Error>> {
    let mut response = client.get(href).send()?;
    if !response.status().is_success() {
        return Err(format!("Download failed: {} ({})", response.status(), href).into());
    }

    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let partial = target.with_extension("part");
    let bytes = {
        let mut file = File::create(&partial)?;
        response.copy_to(&mut file)?
    };
    fs::rename(&partial, target)?;
    Ok(bytes)
}

/// Runs a full retrieve for the configured forecast and saves it to `target`.
pub fn retrieve_forecast(
    download: &DownloadConfig,
    area: &BoundingBox,
    credentials: &ApiCredentials,
    target: &Path,
) -> Result<u64, Box<dyn Error>> {
    let date = forecast_date(download)?;
    let request = build_request(download, area, date);

    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(600))
        .build()?;

    logging::info(
        Stage::Download,
        None,
        &format!("Requesting {} for {} ({})", download.dataset, date, credentials.url),
    );
    let job = submit_job(&client, credentials, &download.dataset, &request)?;
    logging::info(Stage::Download, None, &format!("Job {} accepted", job.job_id));

    let job = wait_for_job(
        &client,
        credentials,
        job,
        Duration::from_secs(download.poll_interval_secs),
        Duration::from_secs(download.max_wait_secs),
    )?;

    let body = get_text(&client, &results_url(&credentials.url, &job.job_id), credentials)?;
    let (href, advertised) = parse_results(&body)?;
    let bytes = download_file(&client, &href, target)?;

    if let Some(expected) = advertised {
        if expected != bytes {
            logging::warn(
                Stage::Download,
                None,
                &format!("Downloaded {} bytes but the data store advertised {}", bytes, expected),
            );
        }
    }
    Ok(bytes)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::fixtures::*;

    #[test]
    fn test_build_request_matches_glofas_fields() {
        let download = DownloadConfig::default();
        let area = BoundingBox::default();
        let date = NaiveDate::from_ymd_opt(2025, 9, 3).expect("valid date");
        let request = build_request(&download, &area, date);

        assert_eq!(request["system_version"], "operational");
        assert_eq!(request["hydrological_model"], "lisflood");
        assert_eq!(request["product_type"], "control_forecast");
        assert_eq!(request["variable"], "river_discharge_in_the_last_24_hours");
        assert_eq!(request["year"], "2025");
        assert_eq!(request["month"], "09", "month must be zero-padded");
        assert_eq!(request["day"], "03", "day must be zero-padded");
        assert_eq!(request["leadtime_hour"], json!(["24", "48", "72"]));
        assert_eq!(request["data_format"], "grib");
        assert_eq!(request["area"], json!([52.7, 12.0, 52.3, 13.8]));
    }

    #[test]
    fn test_forecast_date_from_config() {
        let download = DownloadConfig { date: Some("2025-09-30".to_string()), ..DownloadConfig::default() };
        assert_eq!(forecast_date(&download), Ok(NaiveDate::from_ymd_opt(2025, 9, 30).expect("valid date")));
    }

    #[test]
    fn test_forecast_date_rejects_bad_format() {
        let download = DownloadConfig { date: Some("30.09.2025".to_string()), ..DownloadConfig::default() };
        assert!(forecast_date(&download).is_err());
    }

    #[test]
    fn test_urls() {
        let api = "https://ewds.climate.copernicus.eu/api";
        assert_eq!(
            execution_url(api, "cems-glofas-forecast"),
            "https://ewds.climate.copernicus.eu/api/retrieve/v1/processes/cems-glofas-forecast/execution"
        );
        assert_eq!(results_url(api, "abc"), "https://ewds.climate.copernicus.eu/api/retrieve/v1/jobs/abc/results");
    }

    #[test]
    fn test_parse_accepted_job() {
        let job = parse_job(fixture_job_accepted_json()).expect("fixture should parse");
        assert_eq!(job.job_id, "6d5a3f0e-1f0c-4d8e-9d54-0b5c2b8a1e77");
        assert_eq!(job.state(), JobState::Pending);
    }

    #[test]
    fn test_parse_successful_job() {
        let job = parse_job(fixture_job_successful_json()).expect("fixture should parse");
        assert_eq!(job.state(), JobState::Successful);
    }

    #[test]
    fn test_failed_job_state_carries_message() {
        let job = JobInfo {
            job_id: "x".to_string(),
            status: "failed".to_string(),
            message: Some("no data for 2025-09-31".to_string()),
        };
        assert_eq!(job.state(), JobState::Failed("no data for 2025-09-31".to_string()));

        let rejected = JobInfo { job_id: "y".to_string(), status: "rejected".to_string(), message: None };
        assert_eq!(rejected.state(), JobState::Failed("job rejected".to_string()));
    }

    #[test]
    fn test_parse_results_href() {
        let (href, size) = parse_results(fixture_job_results_json()).expect("fixture should parse");
        assert!(href.ends_with(".grib"));
        assert_eq!(size, Some(4126));
    }
}
