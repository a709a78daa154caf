//! Run statistics.

use std::time::Duration;

use observability::MetricsSummary;
use results::SinkMetrics;

use super::fleet::FleetCounters;

/// Statistics from one simulation run
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    /// Scenario name
    pub scenario: String,

    /// Simulation steps executed
    pub steps: u64,

    /// Simulation time at which the run stopped (seconds)
    pub sim_time: f64,

    /// Wall-clock duration of the run
    pub duration: Duration,

    /// Run stopped early by a shutdown request
    pub interrupted: bool,

    /// Vehicles seen in telemetry or configuration
    pub vehicles: usize,

    /// Stop actions registered at start
    pub timers_scheduled: usize,

    /// Timer fires (stop and resume actions)
    pub timers_fired: u64,

    /// Fleet counters
    pub fleet: FleetCounters,

    /// Per-sink write counters
    pub sinks: Vec<(String, SinkMetrics)>,

    /// Speed / acceleration samples
    pub mobility: MetricsSummary,
}

impl RunStats {
    /// Simulated seconds per wall-clock second
    pub fn speedup(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.sim_time / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Simulation Statistics                     ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Scenario: {}", self.scenario);
        println!("   ├─ Simulated time: {:.2}s ({} steps)", self.sim_time, self.steps);
        println!("   ├─ Wall time: {:.3}s", self.duration.as_secs_f64());
        println!("   ├─ Speedup: {:.1}x", self.speedup());
        println!("   ├─ Vehicles: {}", self.vehicles);
        println!("   └─ Interrupted: {}", self.interrupted);

        let fleet = &self.fleet;
        println!("\n🚗 Fleet");
        println!("   ├─ Updates applied: {}", fleet.updates_applied);
        println!("   ├─ Updates rejected: {}", fleet.updates_rejected);
        println!("   ├─ Vehicles finished: {}", fleet.vehicles_finished);
        println!(
            "   ├─ Timers: {} scheduled, {} fired",
            self.timers_scheduled, self.timers_fired
        );
        println!(
            "   ├─ Notices: {} sent, {} delivered",
            fleet.notices_sent, fleet.notices_delivered
        );
        println!("   └─ Command failures: {}", fleet.command_failures);

        println!("\n📈 Mobility");
        println!("   ├─ Speed samples: {}", self.mobility.total_samples);
        println!("   ├─ Speed (m/s): {}", self.mobility.speed);
        println!("   └─ Acceleration (m/s²): {}", self.mobility.acceleration);

        if !self.sinks.is_empty() {
            println!("\n📤 Sinks");
            for (i, (name, metrics)) in self.sinks.iter().enumerate() {
                let prefix = if i == self.sinks.len() - 1 { "└─" } else { "├─" };
                println!(
                    "   {} {}: {} written, {} failed",
                    prefix, name, metrics.write_count, metrics.failure_count
                );
            }
        }

        println!();
    }
}
