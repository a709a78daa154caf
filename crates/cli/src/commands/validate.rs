//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ScenarioSummary>,
}

#[derive(Serialize)]
struct ScenarioSummary {
    version: String,
    name: String,
    duration_s: f64,
    vehicle_count: usize,
    stop_count: usize,
    sink_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating scenario");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Scenario validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    // Check file exists
    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    // Try to load and validate
    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ScenarioSummary {
                    version: format!("{:?}", blueprint.version),
                    name: blueprint.world.name.clone(),
                    duration_s: blueprint.world.duration_s,
                    vehicle_count: blueprint.vehicles.len(),
                    stop_count: blueprint.stop_count(),
                    sink_count: blueprint.sinks.len(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect scenario warnings (non-fatal issues)
fn collect_warnings(blueprint: &contracts::ScenarioBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();
    let duration = blueprint.world.duration_s;

    if blueprint.sinks.is_empty() {
        warnings.push("No sinks configured - statistics will be dropped".to_string());
    }

    if blueprint.vehicles.is_empty() {
        warnings.push("No vehicles configured".to_string());
    }

    for vehicle in &blueprint.vehicles {
        if vehicle.depart_s > duration {
            warnings.push(format!(
                "Vehicle '{}' departs after the end of the simulation ({}s > {}s)",
                vehicle.id, vehicle.depart_s, duration
            ));
        }
        if vehicle.road_id.parse::<f64>().is_err() {
            warnings.push(format!(
                "Vehicle '{}' road id '{}' is not numeric - firstRoadNumber will not be recorded",
                vehicle.id, vehicle.road_id
            ));
        }
        for stop in &vehicle.stops {
            if stop.at_s < vehicle.depart_s {
                warnings.push(format!(
                    "Vehicle '{}' stop at {}s happens before it departs ({}s)",
                    vehicle.id, stop.at_s, vehicle.depart_s
                ));
            }
            if stop.at_s > duration {
                warnings.push(format!(
                    "Vehicle '{}' stop at {}s never fires (duration {}s)",
                    vehicle.id, stop.at_s, duration
                ));
            }
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Scenario is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Name: {}", summary.name);
            println!("  Duration: {}s", summary.duration_s);
            println!("  Vehicles: {}", summary.vehicle_count);
            println!("  Stop actions: {}", summary.stop_count);
            println!("  Sinks: {}", summary.sink_count);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Scenario is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
