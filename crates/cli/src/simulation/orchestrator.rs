//! Simulation orchestrator - coordinates all components.
//!
//! Telemetry comes either from the mock traffic manager (vehicles from the
//! scenario) or from a recorded JSONL trace.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use contracts::{Clock, ScalarSink, ScenarioBlueprint, SimClock, SimTime, TelemetrySource};
use timers::TimerRegistry;
use tracing::{info, instrument, warn};
use traffic_control::{ManagerLocator, MockTrafficManager, ScenarioManager, TelemetryReplay};

use super::fleet::Fleet;
use super::stats::RunStats;
use crate::error::{CliError, Result};

/// Where telemetry comes from
#[derive(Debug, Clone)]
pub enum TelemetryMode {
    /// Mock traffic manager; vehicles from the scenario
    Mock,
    /// Recorded JSONL trace; no traffic manager, commands fail
    Replay(PathBuf),
}

/// Simulation configuration
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// The scenario
    pub blueprint: ScenarioBlueprint,

    /// End time override (None = scenario duration)
    pub until: Option<f64>,

    /// Step override (None = scenario step)
    pub step: Option<f64>,

    /// Telemetry source
    pub telemetry: TelemetryMode,
}

impl SimulationConfig {
    pub fn new(blueprint: ScenarioBlueprint) -> Self {
        Self {
            blueprint,
            until: None,
            step: None,
            telemetry: TelemetryMode::Mock,
        }
    }

    /// Resolved (step, end time)
    ///
    /// # Errors
    /// `InvalidArgument` for a non-positive step or a negative end time.
    pub fn timing(&self) -> Result<(f64, SimTime)> {
        let step = self.step.unwrap_or(self.blueprint.world.step_s);
        if !step.is_finite() || step <= 0.0 {
            return Err(CliError::invalid_argument(
                "step",
                format!("must be > 0, got {step}"),
            ));
        }

        let until = self.until.unwrap_or(self.blueprint.world.duration_s);
        if !until.is_finite() || until < 0.0 {
            return Err(CliError::invalid_argument(
                "until",
                format!("must be >= 0, got {until}"),
            ));
        }

        Ok((step, SimTime::from_secs(until)))
    }
}

/// Main simulation driver
///
/// Each step: advance the clock, fire due timers, apply telemetry, deliver
/// notices. At the end every tracker is finished into the configured sinks.
pub struct Simulation {
    config: SimulationConfig,
    manager: Option<Arc<MockTrafficManager>>,
    extra_sinks: Vec<Box<dyn ScalarSink>>,
    shutdown: Arc<AtomicBool>,
    fleet: Option<Fleet>,
}

impl Simulation {
    /// Create a new simulation with the given configuration
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            config,
            manager: None,
            extra_sinks: Vec::new(),
            shutdown: Arc::new(AtomicBool::new(false)),
            fleet: None,
        }
    }

    /// Use this mock traffic manager instead of building one from the scenario
    pub fn with_traffic_manager(mut self, manager: Arc<MockTrafficManager>) -> Self {
        self.manager = Some(manager);
        self
    }

    /// Add a sink next to the configured ones
    pub fn with_sink(mut self, sink: Box<dyn ScalarSink>) -> Self {
        self.extra_sinks.push(sink);
        self
    }

    /// Flag that stops the run after the current step
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    /// Fleet of the last run
    pub fn fleet(&self) -> Option<&Fleet> {
        self.fleet.as_ref()
    }

    /// Run the simulation to completion
    ///
    /// # Errors
    /// Invalid timing, an unreadable trace, sink creation or flush failures,
    /// and scheduling rejections of the configured stops.
    #[instrument(name = "simulation_run", skip_all, fields(scenario = %self.config.blueprint.world.name))]
    pub fn run(&mut self) -> Result<RunStats> {
        let started = Instant::now();
        let (step, end) = self.config.timing()?;
        let blueprint = &self.config.blueprint;

        let (mut source, locator) = self.telemetry()?;
        let mut fleet = Fleet::from_blueprint(blueprint, locator);

        let mut dispatcher = results::create_dispatcher(&blueprint.sinks)?;
        for sink in self.extra_sinks.drain(..) {
            dispatcher.push(sink);
        }
        if dispatcher.is_empty() {
            warn!("No sinks configured - statistics will be dropped");
        }

        let mut timers = TimerRegistry::new();
        let timers_scheduled = fleet.schedule_stops(&mut timers)?;

        info!(
            vehicles = fleet.len(),
            stops = timers_scheduled,
            step,
            until = %end,
            "Simulation starting"
        );

        let mut clock = SimClock::default();
        let mut stats = RunStats {
            scenario: blueprint.world.name.clone(),
            timers_scheduled,
            ..Default::default()
        };
        let mut tick: u64 = 0;

        loop {
            let now = clock.now();

            let fired = timers.advance_to(now, &mut fleet)?;
            fleet.record_timers_fired(fired);
            stats.timers_fired += fired as u64;

            fleet.apply_telemetry(source.poll(now), now, &mut dispatcher);
            fleet.deliver_notices(now);
            observability::record_active_vehicles(fleet.active_count());
            stats.steps += 1;

            if now >= end {
                break;
            }
            if self.shutdown.load(Ordering::Relaxed) {
                warn!(time = %now, "Shutdown requested, stopping simulation");
                stats.interrupted = true;
                break;
            }

            tick += 1;
            let next = SimTime::from_secs((tick as f64 * step).min(end.as_secs()));
            clock.advance_to(next)?;
        }

        let now = clock.now();
        let finished = fleet.finish_all(now, &mut dispatcher);
        dispatcher.flush()?;

        stats.sim_time = now.as_secs();
        stats.vehicles = fleet.len();
        stats.fleet = fleet.counters();
        stats.sinks = dispatcher.metrics();
        stats.mobility = fleet.metrics_summary();
        stats.duration = started.elapsed();

        info!(
            sim_time = stats.sim_time,
            steps = stats.steps,
            finished,
            "Simulation finished"
        );

        self.fleet = Some(fleet);
        Ok(stats)
    }

    fn telemetry(&self) -> Result<(Box<dyn TelemetrySource>, Arc<dyn ManagerLocator>)> {
        match &self.config.telemetry {
            TelemetryMode::Mock => {
                let manager = match &self.manager {
                    Some(manager) => manager.clone(),
                    None => Arc::new(MockTrafficManager::from_blueprint(&self.config.blueprint)),
                };
                info!("Running in MOCK mode (no traffic-control server required)");
                Ok((Box::new(manager.telemetry()), manager.locator()))
            }
            TelemetryMode::Replay(path) => {
                let replay = TelemetryReplay::load(path)?;
                info!(path = %path.display(), records = replay.len(), "Running in REPLAY mode");
                let locator: Arc<dyn ManagerLocator> =
                    Arc::new(|| None::<Arc<dyn ScenarioManager>>);
                Ok((Box::new(replay), locator))
            }
        }
    }
}
