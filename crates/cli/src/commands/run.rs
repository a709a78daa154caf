//! `run` command implementation.

use anyhow::{Context, Result};
use std::sync::atomic::Ordering;
use tracing::{info, warn};

use mobility_sim_cli::{CliError, Simulation, SimulationConfig, TelemetryMode};

use crate::cli::RunArgs;

/// Execute the `run` command
pub async fn run_simulation(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading scenario");

    // Validate config path
    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    // Load and parse configuration
    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load scenario from {}", args.config.display()))?;

    info!(
        scenario = %blueprint.world.name,
        step_s = blueprint.world.step_s,
        duration_s = blueprint.world.duration_s,
        vehicles = blueprint.vehicles.len(),
        stops = blueprint.stop_count(),
        sinks = blueprint.sinks.len(),
        "Scenario loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - scenario is valid, exiting");
        print_scenario_summary(&blueprint);
        return Ok(());
    }

    // Initialize Metrics (optional)
    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
        info!("Metrics endpoint available on port {}", args.metrics_port);
    }

    // Build simulation configuration
    let mut config = SimulationConfig::new(blueprint);
    config.until = args.until;
    config.step = args.step;
    if let Some(ref path) = args.replay {
        config.telemetry = TelemetryMode::Replay(path.clone());
    }
    config.timing().context("Invalid run arguments")?;

    let mut simulation = Simulation::new(config);
    let shutdown = simulation.shutdown_handle();

    info!("Starting simulation...");

    // The simulation is synchronous; keep the runtime free for signals
    let mut handle = tokio::task::spawn_blocking(move || simulation.run());

    let joined = tokio::select! {
        joined = &mut handle => joined,
        _ = shutdown_signal() => {
            warn!("Received shutdown signal, stopping simulation...");
            shutdown.store(true, Ordering::Relaxed);
            handle.await
        }
    };

    let stats = joined
        .map_err(|e| CliError::shutdown(e.to_string()))?
        .context("Simulation failed")?;

    info!(
        sim_time = stats.sim_time,
        steps = stats.steps,
        duration_secs = stats.duration.as_secs_f64(),
        speedup = format!("{:.1}", stats.speedup()),
        "Simulation completed"
    );
    stats.print_summary();

    info!("Mobility Sim finished");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print scenario summary for dry-run mode
fn print_scenario_summary(blueprint: &contracts::ScenarioBlueprint) {
    println!("\n=== Scenario Summary ===\n");
    println!("World:");
    println!("  Name: {}", blueprint.world.name);
    println!(
        "  Step: {}s, duration: {}s",
        blueprint.world.step_s, blueprint.world.duration_s
    );
    println!(
        "  Traffic control: {}:{}",
        blueprint.world.traci_host, blueprint.world.traci_port
    );

    println!("\nVehicles ({}):", blueprint.vehicles.len());
    for vehicle in &blueprint.vehicles {
        println!(
            "  - {} on road '{}' at {} m/s, departs {}s - {} stops",
            vehicle.id,
            vehicle.road_id,
            vehicle.desired_speed,
            vehicle.depart_s,
            vehicle.stops.len()
        );
    }

    if !blueprint.sinks.is_empty() {
        println!("\nSinks ({}):", blueprint.sinks.len());
        for sink in &blueprint.sinks {
            println!("  - {} ({:?})", sink.name, sink.sink_type);
        }
    }

    println!();
}
