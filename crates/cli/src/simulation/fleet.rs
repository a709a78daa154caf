//! Fleet - per-vehicle nodes and the shared context of timer actions.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use contracts::{
    ErrorCategory, ScalarSink, ScenarioBlueprint, SimTime, StopConfig, TelemetryEvent,
    TelemetryReport,
};
use mobility::{KinematicStateTracker, TrackerPhase, UpdateIndicator};
use observability::{MetricsSampleRecorder, MetricsSummary, MobilityMetricsAggregator};
use timers::TimerRegistry;
use tracing::{debug, error, info, instrument, warn};
use traffic_control::{ExternalHandleCache, ManagerLocator};

use super::hazard::{HazardApp, HazardNotice};

/// One simulated vehicle: tracker, command handle and application state
pub struct VehicleNode {
    external_id: String,
    tracker: KinematicStateTracker,
    handle: ExternalHandleCache,
    indicator: UpdateIndicator,
    app: HazardApp,
    retired: bool,
}

impl VehicleNode {
    fn new(
        external_id: &str,
        stops: Vec<StopConfig>,
        locator: Arc<dyn ManagerLocator>,
        metrics: Arc<Mutex<MobilityMetricsAggregator>>,
    ) -> Self {
        let indicator = UpdateIndicator::new();
        let tracker = KinematicStateTracker::new()
            .with_observer(Box::new(indicator.clone()))
            .with_recorder(Box::new(MetricsSampleRecorder::with_aggregator(metrics)));

        Self {
            external_id: external_id.to_string(),
            tracker,
            handle: ExternalHandleCache::new(locator),
            indicator,
            app: HazardApp::new(stops),
            retired: false,
        }
    }

    pub fn external_id(&self) -> &str {
        &self.external_id
    }

    pub fn tracker(&self) -> &KinematicStateTracker {
        &self.tracker
    }

    pub fn indicator(&self) -> &UpdateIndicator {
        &self.indicator
    }

    pub fn app(&self) -> &HazardApp {
        &self.app
    }

    /// Taken out of the simulation after a contract violation
    pub fn is_retired(&self) -> bool {
        self.retired
    }

    /// Tracker is accepting updates
    pub fn is_active(&self) -> bool {
        self.tracker.phase() == TrackerPhase::Active
    }
}

/// Fleet counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FleetCounters {
    pub updates_applied: u64,
    pub updates_rejected: u64,
    pub vehicles_finished: u64,
    pub notices_sent: u64,
    pub notices_delivered: u64,
    pub command_failures: u64,
    pub sink_failures: u64,
}

/// All vehicles of a run
///
/// Also the context handed to every timer action, which captures only a
/// vehicle id and the stop index.
pub struct Fleet {
    nodes: BTreeMap<String, VehicleNode>,
    locator: Arc<dyn ManagerLocator>,
    metrics: Arc<Mutex<MobilityMetricsAggregator>>,
    outbox: Vec<HazardNotice>,
    counters: FleetCounters,
}

impl Fleet {
    pub fn new(locator: Arc<dyn ManagerLocator>) -> Self {
        Self {
            nodes: BTreeMap::new(),
            locator,
            metrics: Arc::new(Mutex::new(MobilityMetricsAggregator::new())),
            outbox: Vec::new(),
            counters: FleetCounters::default(),
        }
    }

    /// One node per configured vehicle
    pub fn from_blueprint(blueprint: &ScenarioBlueprint, locator: Arc<dyn ManagerLocator>) -> Self {
        let mut fleet = Self::new(locator);
        for vehicle in &blueprint.vehicles {
            fleet.add_vehicle(&vehicle.id, vehicle.stops.clone());
        }
        fleet
    }

    pub fn add_vehicle(&mut self, external_id: &str, stops: Vec<StopConfig>) {
        let node = VehicleNode::new(
            external_id,
            stops,
            self.locator.clone(),
            self.metrics.clone(),
        );
        self.nodes.insert(external_id.to_string(), node);
    }

    pub fn node(&self, external_id: &str) -> Option<&VehicleNode> {
        self.nodes.get(external_id)
    }

    /// Nodes in id order
    pub fn nodes(&self) -> impl Iterator<Item = &VehicleNode> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.nodes.values().filter(|n| n.is_active()).count()
    }

    pub fn counters(&self) -> FleetCounters {
        self.counters
    }

    /// Notices waiting for the next delivery
    pub fn pending_notices(&self) -> &[HazardNotice] {
        &self.outbox
    }

    /// Count timer fires into the run summary
    pub fn record_timers_fired(&self, fired: usize) {
        let mut metrics = self.metrics.lock().unwrap_or_else(PoisonError::into_inner);
        for _ in 0..fired {
            metrics.timer_fired();
        }
    }

    pub fn metrics_summary(&self) -> MetricsSummary {
        self.metrics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .summary()
    }

    /// Register every configured stop action
    ///
    /// # Errors
    /// Scheduling rejections (a stop before the registry's current time).
    pub fn schedule_stops(&self, timers: &mut TimerRegistry<Fleet>) -> timers::Result<usize> {
        let mut scheduled = 0;
        for node in self.nodes.values() {
            for (index, stop) in node.app.stops().iter().enumerate() {
                let external_id = node.external_id.clone();
                timers.schedule_once_at(SimTime::from_secs(stop.at_s), move |timers, fleet| {
                    fleet.stop_vehicle(timers, &external_id, index)
                })?;
                scheduled += 1;
            }
        }
        debug!(scheduled, "stop actions scheduled");
        Ok(scheduled)
    }

    /// Stop action: halt, broadcast, and chain the resume timer
    fn stop_vehicle(&mut self, timers: &mut TimerRegistry<Fleet>, external_id: &str, index: usize) {
        let now = timers.now();
        let Some(node) = self.nodes.get_mut(external_id) else {
            warn!(vehicle_id = external_id, "stop action for unknown vehicle");
            return;
        };
        if node.retired {
            return;
        }

        let notice = match node.app.on_stop(external_id, index, &node.handle, now) {
            Ok(notice) => notice,
            Err(e) => {
                warn!(vehicle_id = external_id, error = %e, "stop action failed");
                self.counters.command_failures += 1;
                return;
            }
        };
        self.outbox.push(notice);
        self.counters.notices_sent += 1;

        let resume_after = node.app.stops()[index].resume_after_s;
        let id = external_id.to_string();
        let scheduled = timers.schedule_once_in(resume_after, move |_, fleet| {
            fleet.resume_vehicle(&id)
        });
        if let Err(e) = scheduled {
            warn!(vehicle_id = external_id, error = %e, "resume not scheduled");
        }
    }

    fn resume_vehicle(&mut self, external_id: &str) {
        let Some(node) = self.nodes.get(external_id) else {
            return;
        };
        if let Err(e) = HazardApp::on_resume(external_id, &node.handle) {
            warn!(vehicle_id = external_id, error = %e, "resume failed");
            self.counters.command_failures += 1;
        }
    }

    /// Apply one poll worth of telemetry
    ///
    /// Unknown identities get a node without stop actions. A departed
    /// vehicle's statistics are finalized into `sink`.
    #[instrument(level = "debug", name = "fleet_apply_telemetry", skip_all, fields(now = %now, events = events.len()))]
    pub fn apply_telemetry(
        &mut self,
        events: Vec<TelemetryEvent>,
        now: SimTime,
        sink: &mut dyn ScalarSink,
    ) {
        for event in events {
            match event {
                TelemetryEvent::Report(report) => self.apply_report(&report, now, sink),
                TelemetryEvent::Departed { external_id } => {
                    if self.finish_vehicle(&external_id, now, sink) {
                        info!(vehicle_id = %external_id, time = %now, "vehicle departed");
                    }
                }
            }
        }
    }

    fn apply_report(&mut self, report: &TelemetryReport, now: SimTime, sink: &mut dyn ScalarSink) {
        if !self.nodes.contains_key(&report.external_id) {
            debug!(vehicle_id = %report.external_id, "new vehicle in telemetry");
            self.add_vehicle(&report.external_id, Vec::new());
        }
        let Some(node) = self.nodes.get_mut(&report.external_id) else {
            return;
        };
        if node.retired || node.tracker.phase() == TrackerPhase::Finished {
            return;
        }

        match node.tracker.apply(report, now) {
            Ok(_) => self.counters.updates_applied += 1,
            Err(e) => {
                self.counters.updates_rejected += 1;
                self.metrics
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .update_rejected();

                if e.category() == ErrorCategory::ContractViolation {
                    error!(vehicle_id = %report.external_id, error = %e, "update rejected, retiring vehicle");
                    let external_id = report.external_id.clone();
                    self.finish_vehicle(&external_id, now, sink);
                    if let Some(node) = self.nodes.get_mut(&external_id) {
                        node.retired = true;
                    }
                } else {
                    warn!(vehicle_id = %report.external_id, error = %e, "update rejected");
                }
            }
        }
    }

    /// Finalize one tracker into `sink`; false if it was not active
    fn finish_vehicle(&mut self, external_id: &str, now: SimTime, sink: &mut dyn ScalarSink) -> bool {
        let Some(node) = self.nodes.get_mut(external_id) else {
            return false;
        };
        if !node.is_active() {
            return false;
        }

        match node.tracker.finish(now, sink) {
            Ok(snapshot) => {
                debug!(vehicle_id = external_id, total_time = snapshot.total_time, "statistics exported");
            }
            Err(e) => {
                // the tracker is finalized even when the sink write fails
                warn!(vehicle_id = external_id, error = %e, "statistics export failed");
                self.counters.sink_failures += 1;
            }
        }
        self.counters.vehicles_finished += 1;
        true
    }

    /// Finalize every still-active tracker at `now`
    pub fn finish_all(&mut self, now: SimTime, sink: &mut dyn ScalarSink) -> usize {
        let active: Vec<String> = self
            .nodes
            .values()
            .filter(|n| n.is_active())
            .map(|n| n.external_id.clone())
            .collect();

        active
            .iter()
            .filter(|id| self.finish_vehicle(id, now, sink))
            .count()
    }

    /// Deliver the queued notices to every other active vehicle
    ///
    /// Acknowledgements produced here are queued for the next delivery.
    /// Returns the number of notices handed to receivers.
    pub fn deliver_notices(&mut self, now: SimTime) -> usize {
        let pending = std::mem::take(&mut self.outbox);
        let mut delivered = 0;

        for notice in &pending {
            for node in self.nodes.values_mut() {
                if node.external_id == notice.sender || node.retired || !node.is_active() {
                    continue;
                }
                if let Some(reply) = node.app.on_notice(&node.external_id, notice, &node.handle, now) {
                    self.outbox.push(reply);
                    self.counters.notices_sent += 1;
                }
                delivered += 1;
            }
        }

        self.counters.notices_delivered += delivered as u64;
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{Coord, Speed, TelemetrySource};
    use results::MemoryScalarSink;
    use traffic_control::{MockCommand, MockTrafficManager};

    fn stop(at_s: f64, resume_after_s: f64) -> StopConfig {
        StopConfig {
            at_s,
            resume_after_s,
            label: "obstacle!".to_string(),
            road_humidity: "80".to_string(),
            color: "green".to_string(),
        }
    }

    fn setup() -> (Arc<MockTrafficManager>, Fleet) {
        let manager = Arc::new(MockTrafficManager::new());
        manager.add_vehicle("veh0", "7", Coord::zeros(), 0.0, 10.0);
        manager.add_vehicle("veh1", "7", Coord::new(-20.0, 0.0, 0.0), 0.0, 10.0);

        let mut fleet = Fleet::new(manager.locator());
        fleet.add_vehicle("veh0", vec![stop(2.0, 3.0)]);
        fleet.add_vehicle("veh1", Vec::new());
        (manager, fleet)
    }

    #[test]
    fn test_stop_resume_chain() {
        let (manager, mut fleet) = setup();
        let mut telemetry = manager.telemetry();
        let mut timers = TimerRegistry::new();
        let sink = MemoryScalarSink::new("memory");
        let mut sink: Box<dyn ScalarSink> = Box::new(sink);

        assert_eq!(fleet.schedule_stops(&mut timers).unwrap(), 1);

        for step in 0..=6 {
            let now = SimTime::from_secs(step as f64);
            timers.advance_to(now, &mut fleet).unwrap();
            fleet.apply_telemetry(telemetry.poll(now), now, sink.as_mut());
            fleet.deliver_notices(now);
        }

        let speeds: Vec<Speed> = manager
            .commands()
            .into_iter()
            .filter_map(|c| match c {
                MockCommand::SetSpeed { external_id, speed, .. } if external_id == "veh0" => {
                    Some(speed)
                }
                _ => None,
            })
            .collect();
        assert_eq!(speeds, vec![Speed::Known(0.0), Speed::Unknown]);

        let counters = fleet.counters();
        assert_eq!(counters.updates_applied, 14);
        // obstacle to veh1, its ack back to veh0, veh0's ack to veh1
        assert_eq!(counters.notices_delivered, 3);
        assert_eq!(fleet.node("veh0").unwrap().app().color(), Some("green"));
        assert_eq!(fleet.node("veh1").unwrap().app().received().len(), 2);
    }

    #[test]
    fn test_indicator_toggles_per_update() {
        let (manager, mut fleet) = setup();
        let mut telemetry = manager.telemetry();
        let mut sink = MemoryScalarSink::new("memory");

        for step in 0..4 {
            let now = SimTime::from_secs(step as f64);
            fleet.apply_telemetry(telemetry.poll(now), now, &mut sink);
        }

        // first report seeds the tracker, the next three are updates
        assert_eq!(fleet.node("veh0").unwrap().indicator().toggles(), 3);
        assert_eq!(fleet.active_count(), 2);
    }

    #[test]
    fn test_finish_all_exports_scalars() {
        let (manager, mut fleet) = setup();
        let mut telemetry = manager.telemetry();
        let mut sink = MemoryScalarSink::new("memory");
        let log = sink.log();

        for step in 0..3 {
            let now = SimTime::from_secs(step as f64);
            fleet.apply_telemetry(telemetry.poll(now), now, &mut sink);
        }
        assert_eq!(fleet.finish_all(SimTime::from_secs(2.0), &mut sink), 2);
        assert_eq!(fleet.finish_all(SimTime::from_secs(2.0), &mut sink), 0);

        assert_eq!(log.get("veh0.mobility", "totalTime"), Some(2.0));
        assert_eq!(log.get("veh1.mobility", "firstRoadNumber"), Some(7.0));
        assert_eq!(fleet.counters().vehicles_finished, 2);
    }

    #[test]
    fn test_duplicate_report_retires_vehicle() {
        let (manager, mut fleet) = setup();
        let mut telemetry = manager.telemetry();
        let mut sink = MemoryScalarSink::new("memory");
        let log = sink.log();

        let t0 = SimTime::ZERO;
        let t1 = SimTime::from_secs(1.0);
        fleet.apply_telemetry(telemetry.poll(t0), t0, &mut sink);
        let events = telemetry.poll(t1);
        fleet.apply_telemetry(events.clone(), t1, &mut sink);
        fleet.apply_telemetry(events, t1, &mut sink);

        assert_eq!(fleet.counters().updates_rejected, 2);
        assert!(fleet.node("veh0").unwrap().is_retired());
        assert_eq!(log.get("veh0.mobility", "stopTime"), Some(1.0));
        assert_eq!(fleet.metrics_summary().rejected_updates, 2);
    }

    #[test]
    fn test_unknown_vehicle_gets_node() {
        let mut fleet = Fleet::new(Arc::new(|| None::<Arc<dyn traffic_control::ScenarioManager>>));
        let mut sink = MemoryScalarSink::new("memory");
        let report = TelemetryReport {
            external_id: "ghost".to_string(),
            position: Coord::zeros(),
            road_id: "1".to_string(),
            speed: Speed::Known(3.0),
            angle: 0.0,
        };
        fleet.apply_telemetry(vec![TelemetryEvent::Report(report)], SimTime::ZERO, &mut sink);
        assert!(fleet.node("ghost").unwrap().is_active());
    }
}
