//! GloFAS Station Forecast - Main Pipeline
//!
//! A batch job that:
//! 1. Downloads the latest GloFAS river discharge forecast (GRIB)
//! 2. Loads water-monitoring stations from stations.json
//! 3. Joins each station to its nearest forecast grid cell
//! 4. Scores flood risk from discharge magnitude and trend
//! 5. Writes the stations as GeoJSON with forecast properties
//!
//! Usage:
//!   cargo run --release                                  # Download + process
//!   cargo run --release -- --skip-download               # Reuse forecast.grib
//!   cargo run --release -- --config pipeline.toml --debug
//!
//! Options:
//!   --config PATH      Pipeline configuration (default: ./pipeline.toml if present)
//!   --skip-download    Use the existing forecast file
//!   --debug            Print sampled values for the first stations
//!   --log-file PATH    Also append log lines to PATH
//!   --log-timestamps   Print full timestamped log lines on the console
//!
//! Environment:
//!   CDSAPI_KEY - Copernicus data-store personal access token
//!   CDSAPI_URL - optional API base URL override

use flomon_forecast::config::PipelineConfig;
use flomon_forecast::logging::{self, LogLevel};
use flomon_forecast::pipeline::{self, RunOptions};
use std::env;
use std::path::PathBuf;

fn usage(program: &str) -> String {
    format!(
        "Usage: {} [--config PATH] [--skip-download] [--debug] [--log-file PATH] [--log-timestamps]",
        program
    )
}

fn main() {
    println!("🌊 GloFAS Station Forecast");
    println!("==========================\n");

    let args: Vec<String> = env::args().collect();
    let mut config_path: Option<PathBuf> = None;
    let mut log_file: Option<String> = None;
    let mut options = RunOptions::default();
    let mut console_timestamps = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "--log-file" => {
                let Some(value) = args.get(i + 1) else {
                    eprintln!("Error: {} requires a path", args[i]);
                    std::process::exit(1);
                };
                if args[i] == "--config" {
                    config_path = Some(PathBuf::from(value));
                } else {
                    log_file = Some(value.clone());
                }
                i += 2;
            }
            "--skip-download" => {
                options.skip_download = true;
                i += 1;
            }
            "--log-timestamps" => {
                console_timestamps = true;
                i += 1;
            }
            "--debug" => {
                options.debug = true;
                i += 1;
            }
            "--help" | "-h" => {
                println!("{}", usage(&args[0]));
                return;
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                eprintln!("{}", usage(&args[0]));
                std::process::exit(1);
            }
        }
    }

    let level = if options.debug { LogLevel::Debug } else { LogLevel::Info };
    logging::init_logger(level, log_file.as_deref(), console_timestamps);

    println!("⚙️  Loading configuration...");
    let config = match PipelineConfig::load_or_default(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("\n❌ {}\n", e);
            std::process::exit(1);
        }
    };
    println!("✓ Configuration loaded");
    println!("  - Stations: {}", config.paths.stations_json.display());
    println!("  - Forecast: {}", config.paths.forecast_file.display());
    println!("  - Output:   {}", config.paths.output_geojson.display());
    println!(
        "  - Area:     N {} / W {} / S {} / E {}\n",
        config.area.north, config.area.west, config.area.south, config.area.east
    );

    println!("🚀 Starting flood risk analysis...");
    match pipeline::run(&config, options) {
        Ok(summary) => {
            summary.print();
            println!("\n✅ All tasks complete. {} stations written to {}",
                summary.total, config.paths.output_geojson.display());
        }
        Err(e) => {
            eprintln!("\n❌ ERROR: {}\n", e);
            std::process::exit(1);
        }
    }
}
