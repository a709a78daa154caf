//! Optional observers of a tracked vehicle
//!
//! Both hooks sit outside the update contract: the tracker works the same
//! with the no-op implementations.

use crate::{KinematicState, SimTime};

/// Notified after every accepted kinematic update
pub trait MobilityObserver: Send {
    fn on_state_changed(&mut self, external_id: &str, state: &KinematicState);
}

/// Observer that ignores every notification
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl MobilityObserver for NoopObserver {
    fn on_state_changed(&mut self, _external_id: &str, _state: &KinematicState) {}
}

/// Receives the speed / acceleration time series of a vehicle
pub trait SampleRecorder: Send {
    fn record_speed(&mut self, external_id: &str, time: SimTime, speed: f64);

    fn record_acceleration(&mut self, external_id: &str, time: SimTime, acceleration: f64);
}

/// Recorder that drops every sample
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSampleRecorder;

impl SampleRecorder for NoopSampleRecorder {
    fn record_speed(&mut self, _external_id: &str, _time: SimTime, _speed: f64) {}

    fn record_acceleration(&mut self, _external_id: &str, _time: SimTime, _acceleration: f64) {}
}

/// In-memory time series, mostly for tests and trace export
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleLog {
    pub speed: Vec<(SimTime, f64)>,
    pub acceleration: Vec<(SimTime, f64)>,
}

impl SampleRecorder for SampleLog {
    fn record_speed(&mut self, _external_id: &str, time: SimTime, speed: f64) {
        self.speed.push((time, speed));
    }

    fn record_acceleration(&mut self, _external_id: &str, time: SimTime, acceleration: f64) {
        self.acceleration.push((time, acceleration));
    }
}
