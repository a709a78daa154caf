//! Per-vehicle running statistics.
//!
//! Pure accumulator over `(timestamp, speed)` samples. The tracker drives it;
//! it never reads the clock on its own.

use contracts::{ContractError, ScalarSink, SimTime, Speed};
use serde::Serialize;

/// Statistics of one vehicle
///
/// Never-set bounds are `None` and are left out of the exported scalars.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatisticsSnapshot {
    /// Number of the first road seen, if its id is numeric
    pub first_road_number: Option<f64>,
    pub start_time: SimTime,
    /// Time covered by observations, excluding the interval before the first
    pub total_time: f64,
    pub stop_time: SimTime,
    pub min_speed: Option<f64>,
    pub max_speed: Option<f64>,
    /// Never accrued from position deltas
    pub total_distance: f64,
    pub total_co2_emission: f64,
}

impl StatisticsSnapshot {
    /// Named scalars in export order, unset fields omitted
    pub fn scalars(&self) -> Vec<(&'static str, f64)> {
        let mut scalars = Vec::with_capacity(8);
        if let Some(road) = self.first_road_number {
            scalars.push(("firstRoadNumber", road));
        }
        scalars.push(("startTime", self.start_time.as_secs()));
        scalars.push(("totalTime", self.total_time));
        scalars.push(("stopTime", self.stop_time.as_secs()));
        if let Some(min) = self.min_speed {
            scalars.push(("minSpeed", min));
        }
        if let Some(max) = self.max_speed {
            scalars.push(("maxSpeed", max));
        }
        scalars.push(("totalDistance", self.total_distance));
        scalars.push(("totalCO2Emission", self.total_co2_emission));
        scalars
    }
}

/// What one `record` call surfaced
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RecordedSample {
    /// Known speed sample, if the record accrued time
    pub speed: Option<f64>,
    /// `(speed - previous) / interval` between consecutive known speeds
    pub acceleration: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Recording,
    Finalized,
}

/// Running statistics accumulator
#[derive(Debug, Clone)]
pub struct StatisticsAggregator {
    snapshot: StatisticsSnapshot,
    phase: Phase,
    last_record: SimTime,
    previous_speed: Option<f64>,
}

impl Default for StatisticsAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl StatisticsAggregator {
    pub fn new() -> Self {
        Self {
            snapshot: StatisticsSnapshot::default(),
            phase: Phase::Idle,
            last_record: SimTime::ZERO,
            previous_speed: None,
        }
    }

    /// Reset every field and start recording at `now`
    pub fn initialize(&mut self, now: SimTime) {
        self.snapshot = StatisticsSnapshot {
            start_time: now,
            ..StatisticsSnapshot::default()
        };
        self.phase = Phase::Recording;
        self.last_record = now;
        self.previous_speed = None;
    }

    /// Seed the previous known speed so the first record can derive an acceleration
    pub fn seed_previous_speed(&mut self, speed: Speed) {
        self.previous_speed = speed.known();
    }

    /// Remember the first road whose id is numeric
    pub fn observe_road(&mut self, road_id: &str) {
        if self.snapshot.first_road_number.is_some() {
            return;
        }
        if let Ok(number) = road_id.trim().parse::<f64>() {
            if number.is_finite() {
                self.snapshot.first_road_number = Some(number);
            }
        }
    }

    /// Accumulate one observation
    ///
    /// # Errors
    /// `StatisticsState` before `initialize` or after `finalize`.
    pub fn record(
        &mut self,
        timestamp: SimTime,
        speed: Speed,
    ) -> Result<RecordedSample, ContractError> {
        match self.phase {
            Phase::Idle => {
                return Err(ContractError::StatisticsState {
                    message: "not initialized",
                })
            }
            Phase::Finalized => {
                return Err(ContractError::StatisticsState {
                    message: "already finalized",
                })
            }
            Phase::Recording => {}
        }

        let mut sample = RecordedSample::default();

        if timestamp != self.snapshot.start_time {
            let interval = (timestamp - self.last_record).as_secs();
            self.snapshot.total_time += interval;

            match speed {
                Speed::Known(speed) => {
                    self.snapshot.min_speed =
                        Some(self.snapshot.min_speed.map_or(speed, |m| m.min(speed)));
                    self.snapshot.max_speed =
                        Some(self.snapshot.max_speed.map_or(speed, |m| m.max(speed)));
                    sample.speed = Some(speed);

                    if let Some(previous) = self.previous_speed {
                        if interval > 0.0 {
                            sample.acceleration = Some((speed - previous) / interval);
                        }
                    }
                    self.previous_speed = Some(speed);
                }
                Speed::Unknown => self.previous_speed = None,
            }
        }

        self.last_record = timestamp;
        Ok(sample)
    }

    /// Freeze the snapshot at `now`
    ///
    /// # Errors
    /// `StatisticsState` if never initialized or already finalized.
    pub fn finalize(&mut self, now: SimTime) -> Result<&StatisticsSnapshot, ContractError> {
        match self.phase {
            Phase::Idle => Err(ContractError::StatisticsState {
                message: "not initialized",
            }),
            Phase::Finalized => Err(ContractError::StatisticsState {
                message: "already finalized",
            }),
            Phase::Recording => {
                self.snapshot.stop_time = now;
                self.phase = Phase::Finalized;
                Ok(&self.snapshot)
            }
        }
    }

    /// Write every scalar of the snapshot to `sink` under `owner`
    pub fn export_scalars(
        &self,
        owner: &str,
        sink: &mut dyn ScalarSink,
    ) -> Result<(), ContractError> {
        for (name, value) in self.snapshot.scalars() {
            sink.record_scalar(owner, name, value)?;
        }
        Ok(())
    }

    pub fn snapshot(&self) -> &StatisticsSnapshot {
        &self.snapshot
    }

    pub fn is_finalized(&self) -> bool {
        self.phase == Phase::Finalized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct VecSink(Vec<(String, String, f64)>);

    impl ScalarSink for VecSink {
        fn name(&self) -> &str {
            "vec"
        }

        fn record_scalar(
            &mut self,
            owner: &str,
            name: &str,
            value: f64,
        ) -> Result<(), ContractError> {
            self.0.push((owner.to_string(), name.to_string(), value));
            Ok(())
        }

        fn flush(&mut self) -> Result<(), ContractError> {
            Ok(())
        }
    }

    fn t(secs: f64) -> SimTime {
        SimTime::from_secs(secs)
    }

    #[test]
    fn test_empty_snapshot() {
        let mut stats = StatisticsAggregator::new();
        stats.initialize(t(2.0));
        let snapshot = stats.finalize(t(9.0)).unwrap().clone();

        assert_eq!(snapshot.total_time, 0.0);
        assert_eq!(snapshot.min_speed, None);
        assert_eq!(snapshot.max_speed, None);
        assert_eq!(snapshot.total_distance, 0.0);
        assert_eq!(snapshot.stop_time, t(9.0));

        let names: Vec<_> = snapshot.scalars().into_iter().map(|(n, _)| n).collect();
        assert_eq!(
            names,
            [
                "startTime",
                "totalTime",
                "stopTime",
                "totalDistance",
                "totalCO2Emission"
            ]
        );
    }

    #[test]
    fn test_bounds_over_known_speeds() {
        let mut stats = StatisticsAggregator::new();
        stats.initialize(t(0.0));
        for (i, speed) in [7.0, 3.0, 12.5, 4.0].into_iter().enumerate() {
            stats.record(t(i as f64 + 1.0), Speed::Known(speed)).unwrap();
        }
        stats.record(t(5.0), Speed::Unknown).unwrap();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.min_speed, Some(3.0));
        assert_eq!(snapshot.max_speed, Some(12.5));
        assert_eq!(snapshot.total_time, 5.0);
    }

    #[test]
    fn test_record_at_start_only_updates_bookkeeping() {
        let mut stats = StatisticsAggregator::new();
        stats.initialize(t(3.0));

        let sample = stats.record(t(3.0), Speed::Known(9.0)).unwrap();
        assert_eq!(sample, RecordedSample::default());
        assert_eq!(stats.snapshot().max_speed, None);

        stats.record(t(4.5), Speed::Known(9.0)).unwrap();
        assert_eq!(stats.snapshot().total_time, 1.5);
    }

    #[test]
    fn test_unknown_speed_breaks_acceleration_chain() {
        let mut stats = StatisticsAggregator::new();
        stats.initialize(t(0.0));

        assert_eq!(stats.record(t(1.0), Speed::Known(10.0)).unwrap().acceleration, None);
        assert_eq!(
            stats.record(t(2.0), Speed::Known(14.0)).unwrap().acceleration,
            Some(4.0)
        );

        let gap = stats.record(t(3.0), Speed::Unknown).unwrap();
        assert_eq!(gap, RecordedSample::default());

        let after = stats.record(t(4.0), Speed::Known(2.0)).unwrap();
        assert_eq!(after.speed, Some(2.0));
        assert_eq!(after.acceleration, None);
        assert_eq!(stats.snapshot().min_speed, Some(2.0));
    }

    #[test]
    fn test_seeded_speed_yields_first_acceleration() {
        let mut stats = StatisticsAggregator::new();
        stats.initialize(t(0.0));
        stats.seed_previous_speed(Speed::Known(10.0));

        let sample = stats.record(t(2.0), Speed::Known(20.0)).unwrap();
        assert_eq!(sample.acceleration, Some(5.0));
    }

    #[test]
    fn test_first_numeric_road() {
        let mut stats = StatisticsAggregator::new();
        stats.initialize(t(0.0));
        stats.observe_road(":junction_3");
        stats.observe_road("42");
        stats.observe_road("7");

        assert_eq!(stats.snapshot().first_road_number, Some(42.0));
        assert_eq!(stats.snapshot().scalars()[0], ("firstRoadNumber", 42.0));
    }

    #[test]
    fn test_lifecycle_errors() {
        let mut stats = StatisticsAggregator::new();
        assert!(stats.record(t(1.0), Speed::Known(1.0)).is_err());

        stats.initialize(t(0.0));
        stats.finalize(t(1.0)).unwrap();
        assert!(stats.is_finalized());

        let err = stats.record(t(2.0), Speed::Known(1.0)).unwrap_err();
        assert!(err.category().is_fatal());
        assert!(stats.finalize(t(2.0)).is_err());
    }

    #[test]
    fn test_export_scalars() {
        let mut stats = StatisticsAggregator::new();
        stats.initialize(t(0.0));
        stats.record(t(1.0), Speed::Known(5.0)).unwrap();
        stats.finalize(t(1.0)).unwrap();

        let mut sink = VecSink::default();
        stats.export_scalars("veh0.mobility", &mut sink).unwrap();

        assert_eq!(sink.0.len(), 7);
        assert!(sink.0.iter().all(|(owner, _, _)| owner == "veh0.mobility"));
        assert!(sink
            .0
            .iter()
            .any(|(_, name, value)| name == "minSpeed" && *value == 5.0));
    }
}
