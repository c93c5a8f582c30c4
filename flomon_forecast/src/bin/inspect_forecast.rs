//! Forecast File Inspector
//!
//! Lists every GRIB2 submessage in a forecast file (parameter id, name,
//! forecast time) and the distinct variables available. Useful when the
//! pipeline reports that the configured variable is missing.
//!
//! Usage:
//!   cargo run --bin inspect_forecast -- forecast.grib
//!   cargo run --bin inspect_forecast -- forecast.grib --variable dis24

use flomon_forecast::config::ForecastConfig;
use flomon_forecast::forecast::grib::{available_variables, list_messages, load_forecast};
use flomon_forecast::forecast::{DischargeLookup, LoadOptions, VariableRequest};
use std::env;
use std::path::Path;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🔎 Forecast File Inspector");
    println!("==========================\n");

    let args: Vec<String> = env::args().collect();
    let Some(file) = args.get(1) else {
        eprintln!("Usage: {} FILE [--variable NAME]", args[0]);
        std::process::exit(1);
    };
    let variable = args
        .iter()
        .position(|a| a == "--variable")
        .and_then(|i| args.get(i + 1))
        .cloned();

    let path = Path::new(file);
    let messages = list_messages(path)?;
    println!("📋 {} submessages in {}:", messages.len(), path.display());
    for m in &messages {
        let time = m.forecast_time.map(|t| t.to_string()).unwrap_or_else(|| "-".to_string());
        println!("   {:<10} step {:>5}  {}", m.parameter.to_string(), time, m.name);
    }

    println!("\nAvailable variables:");
    for v in available_variables(&messages) {
        println!("   {}", v);
    }

    if let Some(name) = variable {
        let config = ForecastConfig { variable: name.clone(), ..ForecastConfig::default() };
        let Some(request) = VariableRequest::from_config(&config) else {
            eprintln!("\n❌ Unknown variable '{}'", name);
            std::process::exit(1);
        };

        for options in [LoadOptions::Strict, LoadOptions::Relaxed] {
            match load_forecast(path, &request, options) {
                Ok(grid) => {
                    println!("\n✅ Opened '{}' with {} load", grid.variable(), options);
                    println!("   Units: {}", grid.units());
                    println!("   Steps: {:?}", grid.steps());
                    println!(
                        "   Grid:  {} lat × {} lon",
                        grid.latitudes().len(),
                        grid.longitudes().len()
                    );
                    return Ok(());
                }
                Err(e) => println!("\n❌ {} load failed: {}", options, e),
            }
        }
        std::process::exit(1);
    }

    Ok(())
}
