//! Kinematic state tracker.
//!
//! Turns the periodic position/speed reports of one vehicle into its
//! kinematic state and drives the vehicle's statistics.

use contracts::{
    heading_orientation, heading_velocity, ContractError, Coord, KinematicState,
    MobilityObserver, NoopObserver, NoopSampleRecorder, Orientation, SampleRecorder, ScalarSink,
    SimTime, Speed, TelemetryReport,
};
use tracing::{debug, instrument, trace};

use crate::statistics::{RecordedSample, StatisticsAggregator, StatisticsSnapshot};

/// Tracker lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerPhase {
    /// No identity or state yet
    Created,
    /// Seeded from the first report, statistics not started
    PreInitialized,
    /// Accepting updates
    Active,
    /// Statistics finalized and exported
    Finished,
}

/// Kinematic state of one externally driven vehicle
pub struct KinematicStateTracker {
    external_id: String,
    phase: TrackerPhase,
    state: KinematicState,
    angular_velocity: Orientation,
    road_id: String,
    seeded_speed: Speed,
    statistics: StatisticsAggregator,
    observer: Box<dyn MobilityObserver>,
    recorder: Box<dyn SampleRecorder>,
}

impl std::fmt::Debug for KinematicStateTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KinematicStateTracker")
            .field("external_id", &self.external_id)
            .field("phase", &self.phase)
            .field("state", &self.state)
            .field("road_id", &self.road_id)
            .finish()
    }
}

impl Default for KinematicStateTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl KinematicStateTracker {
    pub fn new() -> Self {
        Self {
            external_id: String::new(),
            phase: TrackerPhase::Created,
            state: KinematicState::default(),
            angular_velocity: Orientation::identity(),
            road_id: String::new(),
            seeded_speed: Speed::Unknown,
            statistics: StatisticsAggregator::new(),
            observer: Box::new(NoopObserver),
            recorder: Box::new(NoopSampleRecorder),
        }
    }

    /// Notify `observer` after every accepted update
    pub fn with_observer(mut self, observer: Box<dyn MobilityObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Forward speed / acceleration samples to `recorder`
    pub fn with_recorder(mut self, recorder: Box<dyn SampleRecorder>) -> Self {
        self.recorder = recorder;
        self
    }

    /// Seed identity and state from the first report
    ///
    /// Not subject to the one-update-per-tick check. The seeded speed becomes
    /// the previous known speed of the statistics.
    pub fn pre_initialize(
        &mut self,
        external_id: &str,
        position: Coord,
        road_id: &str,
        speed: Speed,
        angle: f64,
    ) -> Result<(), ContractError> {
        if external_id.is_empty() {
            return Err(ContractError::MissingExternalId);
        }
        if !matches!(
            self.phase,
            TrackerPhase::Created | TrackerPhase::PreInitialized
        ) {
            return Err(ContractError::lifecycle(
                external_id,
                format!("pre_initialize in phase {:?}", self.phase),
            ));
        }

        self.external_id = external_id.to_string();
        self.state = KinematicState::from_heading(position, speed, angle);
        self.road_id = road_id.to_string();
        self.seeded_speed = speed;
        self.phase = TrackerPhase::PreInitialized;

        debug!(external_id, road_id, ?speed, angle, "tracker pre-initialized");
        Ok(())
    }

    /// Start the statistics at `now` and begin accepting updates
    pub fn initialize(&mut self, now: SimTime) -> Result<(), ContractError> {
        if !matches!(
            self.phase,
            TrackerPhase::Created | TrackerPhase::PreInitialized
        ) {
            return Err(ContractError::lifecycle(
                &self.external_id,
                format!("initialize in phase {:?}", self.phase),
            ));
        }

        self.statistics.initialize(now);
        self.statistics.seed_previous_speed(self.seeded_speed);
        self.statistics.observe_road(&self.road_id);
        self.phase = TrackerPhase::Active;
        Ok(())
    }

    /// Apply one report
    ///
    /// The first report of a fresh tracker seeds and activates it; later
    /// reports go through [`update`](Self::update).
    pub fn apply(
        &mut self,
        report: &TelemetryReport,
        now: SimTime,
    ) -> Result<RecordedSample, ContractError> {
        if self.phase == TrackerPhase::Created {
            self.pre_initialize(
                &report.external_id,
                report.position,
                &report.road_id,
                report.speed,
                report.angle,
            )?;
            self.initialize(now)?;
            return Ok(RecordedSample::default());
        }

        let previous_road = std::mem::replace(&mut self.road_id, report.road_id.clone());
        let result = self.update(report.position, report.speed, report.angle, now);
        if result.is_err() {
            self.road_id = previous_road;
        }
        result
    }

    /// Accept a new observation
    ///
    /// # Errors
    /// `DuplicateUpdate` for a second update at the same timestamp,
    /// `NonMonotonicUpdate` for an older one, `Lifecycle` outside the active
    /// phase. A rejected update leaves the state untouched.
    #[instrument(
        level = "trace",
        name = "tracker_update",
        skip_all,
        fields(external_id = %self.external_id, timestamp = %timestamp)
    )]
    pub fn update(
        &mut self,
        position: Coord,
        speed: Speed,
        angle: f64,
        timestamp: SimTime,
    ) -> Result<RecordedSample, ContractError> {
        if let Err(err) = self.check_update(timestamp) {
            observability::record_update_rejected(&self.external_id, rejection_reason(&err));
            return Err(err);
        }

        self.statistics.observe_road(&self.road_id);
        let sample = self.statistics.record(timestamp, speed)?;

        self.state.position = position;
        self.state.velocity = heading_velocity(speed, angle);
        self.state.orientation = heading_orientation(angle);
        self.state.last_update = Some(timestamp);

        if let Some(speed) = sample.speed {
            self.recorder.record_speed(&self.external_id, timestamp, speed);
        }
        if let Some(acceleration) = sample.acceleration {
            self.recorder
                .record_acceleration(&self.external_id, timestamp, acceleration);
        }
        observability::record_mobility_update(&self.external_id);
        self.observer.on_state_changed(&self.external_id, &self.state);

        trace!(?speed, angle, "update accepted");
        Ok(sample)
    }

    fn check_update(&self, timestamp: SimTime) -> Result<(), ContractError> {
        if self.phase != TrackerPhase::Active {
            return Err(ContractError::lifecycle(
                &self.external_id,
                format!("update in phase {:?}", self.phase),
            ));
        }

        match self.state.last_update {
            Some(last) if timestamp == last => Err(ContractError::DuplicateUpdate {
                external_id: self.external_id.clone(),
                timestamp: timestamp.as_secs(),
            }),
            Some(last) if timestamp < last => Err(ContractError::NonMonotonicUpdate {
                external_id: self.external_id.clone(),
                last: last.as_secs(),
                timestamp: timestamp.as_secs(),
            }),
            _ => Ok(()),
        }
    }

    /// Finalize the statistics at `now` and export them to `sink`
    ///
    /// Scalars are recorded under `"<external id>.mobility"`.
    pub fn finish(
        &mut self,
        now: SimTime,
        sink: &mut dyn ScalarSink,
    ) -> Result<&StatisticsSnapshot, ContractError> {
        if self.phase != TrackerPhase::Active {
            return Err(ContractError::lifecycle(
                &self.external_id,
                format!("finish in phase {:?}", self.phase),
            ));
        }

        self.statistics.finalize(now)?;
        self.phase = TrackerPhase::Finished;
        self.statistics
            .export_scalars(&format!("{}.mobility", self.external_id), sink)?;

        debug!(external_id = %self.external_id, stop_time = %now, "tracker finished");
        Ok(self.statistics.snapshot())
    }

    /// Identity assigned by the first report
    pub fn external_id(&self) -> Result<&str, ContractError> {
        if self.external_id.is_empty() {
            Err(ContractError::MissingExternalId)
        } else {
            Ok(&self.external_id)
        }
    }

    pub fn phase(&self) -> TrackerPhase {
        self.phase
    }

    /// Seeded and not yet finished
    pub fn is_pre_initialized(&self) -> bool {
        matches!(
            self.phase,
            TrackerPhase::PreInitialized | TrackerPhase::Active
        )
    }

    pub fn state(&self) -> &KinematicState {
        &self.state
    }

    pub fn current_position(&self) -> Coord {
        self.state.position
    }

    pub fn current_velocity(&self) -> Coord {
        self.state.velocity
    }

    pub fn current_orientation(&self) -> Orientation {
        self.state.orientation
    }

    /// Always identity: angular velocity is not reported
    pub fn current_angular_velocity(&self) -> Orientation {
        self.angular_velocity
    }

    pub fn current_acceleration(&self) -> Result<Coord, ContractError> {
        Err(ContractError::UnsupportedOperation {
            operation: "current_acceleration",
        })
    }

    pub fn current_angular_acceleration(&self) -> Result<Orientation, ContractError> {
        Err(ContractError::UnsupportedOperation {
            operation: "current_angular_acceleration",
        })
    }

    pub fn last_update_time(&self) -> Option<SimTime> {
        self.state.last_update
    }

    /// Road of the latest report
    pub fn road_id(&self) -> &str {
        &self.road_id
    }

    pub fn statistics(&self) -> &StatisticsAggregator {
        &self.statistics
    }
}

fn rejection_reason(err: &ContractError) -> &'static str {
    match err {
        ContractError::DuplicateUpdate { .. } => "duplicate",
        ContractError::NonMonotonicUpdate { .. } => "regression",
        _ => "lifecycle",
    }
}
