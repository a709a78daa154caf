//! `info` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Scenario info for JSON output
#[derive(Serialize)]
struct ScenarioInfo {
    version: String,
    world: WorldInfo,
    vehicles: Vec<VehicleInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sinks: Vec<SinkInfo>,
}

#[derive(Serialize)]
struct WorldInfo {
    name: String,
    step_s: f64,
    duration_s: f64,
    traci_host: String,
    traci_port: u16,
}

#[derive(Serialize)]
struct VehicleInfo {
    id: String,
    road_id: String,
    desired_speed: f64,
    depart_s: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    arrive_s: Option<f64>,
    stop_count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    stops: Vec<StopInfo>,
}

#[derive(Serialize)]
struct StopInfo {
    label: String,
    at_s: f64,
    resume_at_s: f64,
    color: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    road_humidity: String,
}

#[derive(Serialize)]
struct SinkInfo {
    name: String,
    sink_type: String,
    #[serde(skip_serializing_if = "std::collections::HashMap::is_empty")]
    params: std::collections::HashMap<String, String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading scenario info");

    if !args.config.exists() {
        anyhow::bail!("Scenario file not found: {}", args.config.display());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load scenario from {}", args.config.display()))?;

    if args.json {
        let info = build_scenario_info(&blueprint, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize scenario info")?;
        println!("{}", json);
    } else {
        print_scenario_info(&blueprint, args);
    }

    Ok(())
}

fn build_scenario_info(blueprint: &contracts::ScenarioBlueprint, args: &InfoArgs) -> ScenarioInfo {
    let vehicles = blueprint
        .vehicles
        .iter()
        .map(|v| VehicleInfo {
            id: v.id.clone(),
            road_id: v.road_id.clone(),
            desired_speed: v.desired_speed,
            depart_s: v.depart_s,
            arrive_s: v.arrive_s,
            stop_count: v.stops.len(),
            stops: if args.stops {
                v.stops
                    .iter()
                    .map(|s| StopInfo {
                        label: s.label.clone(),
                        at_s: s.at_s,
                        resume_at_s: s.at_s + s.resume_after_s,
                        color: s.color.clone(),
                        road_humidity: s.road_humidity.clone(),
                    })
                    .collect()
            } else {
                Vec::new()
            },
        })
        .collect();

    let sinks = if args.sinks {
        blueprint
            .sinks
            .iter()
            .map(|s| SinkInfo {
                name: s.name.clone(),
                sink_type: format!("{:?}", s.sink_type),
                params: s.params.clone(),
            })
            .collect()
    } else {
        Vec::new()
    };

    ScenarioInfo {
        version: format!("{:?}", blueprint.version),
        world: WorldInfo {
            name: blueprint.world.name.clone(),
            step_s: blueprint.world.step_s,
            duration_s: blueprint.world.duration_s,
            traci_host: blueprint.world.traci_host.clone(),
            traci_port: blueprint.world.traci_port,
        },
        vehicles,
        sinks,
    }
}

fn print_scenario_info(blueprint: &contracts::ScenarioBlueprint, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                  Mobility Sim Scenario                       ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    // World info
    println!("📍 World");
    println!("   ├─ Version: {:?}", blueprint.version);
    println!("   ├─ Name: {}", blueprint.world.name);
    println!(
        "   ├─ Step / Duration: {}s / {}s",
        blueprint.world.step_s, blueprint.world.duration_s
    );
    println!(
        "   └─ Traffic control: {}:{}",
        blueprint.world.traci_host, blueprint.world.traci_port
    );

    // Vehicles
    println!("\n🚗 Vehicles ({})", blueprint.vehicles.len());
    for (i, vehicle) in blueprint.vehicles.iter().enumerate() {
        let is_last = i == blueprint.vehicles.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };

        let window = match vehicle.arrive_s {
            Some(arrive) => format!("{}s - {}s", vehicle.depart_s, arrive),
            None => format!("from {}s", vehicle.depart_s),
        };
        println!(
            "   {} {} (road '{}', {} m/s, {})",
            prefix, vehicle.id, vehicle.road_id, vehicle.desired_speed, window
        );

        if args.stops && !vehicle.stops.is_empty() {
            println!("   {}  🛑 Stops ({}):", child_prefix, vehicle.stops.len());
            for (j, stop) in vehicle.stops.iter().enumerate() {
                let stop_is_last = j == vehicle.stops.len() - 1;
                let stop_prefix = if stop_is_last { "└─" } else { "├─" };
                println!(
                    "   {}     {} {} at {}s, resume at {}s ({})",
                    child_prefix,
                    stop_prefix,
                    stop.label,
                    stop.at_s,
                    stop.at_s + stop.resume_after_s,
                    stop.color
                );
            }
        } else {
            println!("   {}  └─ {} stops", child_prefix, vehicle.stops.len());
        }
    }

    // Sinks
    if !blueprint.sinks.is_empty() {
        println!("\n📤 Sinks ({})", blueprint.sinks.len());
        for (i, sink) in blueprint.sinks.iter().enumerate() {
            let is_last = i == blueprint.sinks.len() - 1;
            let prefix = if is_last { "└─" } else { "├─" };
            if args.sinks && !sink.params.is_empty() {
                println!("   {} {} ({:?}) {:?}", prefix, sink.name, sink.sink_type, sink.params);
            } else {
                println!("   {} {} ({:?})", prefix, sink.name, sink.sink_type);
            }
        }
    }

    println!();
}
