//! Timer specification builder
//!
//! Describes when a timer first fires and whether (and how long) it repeats.
//! Nothing is validated until the spec is handed to
//! [`TimerRegistry::create`](crate::TimerRegistry::create).

use contracts::SimTime;

use crate::error::{Result, TimerError};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Start {
    At(SimTime),
    In(f64),
}

/// When and how often a timer fires
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimerSpec {
    start: Start,
    period: Option<f64>,
    repetitions: Option<u64>,
    until: Option<SimTime>,
}

/// Validated schedule, anchored at a concrete time
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Schedule {
    pub first: SimTime,
    pub period: Option<f64>,
    pub repetitions: Option<u64>,
    pub until: Option<SimTime>,
}

impl TimerSpec {
    /// Fire once at absolute time `time`
    pub fn once_at(time: SimTime) -> Self {
        Self {
            start: Start::At(time),
            period: None,
            repetitions: None,
            until: None,
        }
    }

    /// Fire once `delay` seconds from now
    pub fn once_in(delay: f64) -> Self {
        Self {
            start: Start::In(delay),
            ..Self::once_at(SimTime::ZERO)
        }
    }

    /// Fire every `period` seconds, starting now unless told otherwise
    pub fn every(period: f64) -> Self {
        Self {
            start: Start::In(0.0),
            period: Some(period),
            repetitions: None,
            until: None,
        }
    }

    /// First fire at absolute time `time`
    pub fn starting_at(mut self, time: SimTime) -> Self {
        self.start = Start::At(time);
        self
    }

    /// First fire `delay` seconds from now
    pub fn starting_in(mut self, delay: f64) -> Self {
        self.start = Start::In(delay);
        self
    }

    /// Stop after `n` fires (periodic timers only)
    pub fn repetitions(mut self, n: u64) -> Self {
        self.repetitions = Some(n);
        self
    }

    /// Do not fire after `end` (periodic timers only)
    pub fn until(mut self, end: SimTime) -> Self {
        self.until = Some(end);
        self
    }

    pub fn is_periodic(&self) -> bool {
        self.period.is_some()
    }

    pub(crate) fn resolve(&self, now: SimTime) -> Result<Schedule> {
        let first = match self.start {
            Start::At(time) => {
                if !time.is_finite() {
                    return Err(TimerError::NonFinite { field: "fire time" });
                }
                if time < now {
                    return Err(TimerError::InPast {
                        requested: time.as_secs(),
                        now: now.as_secs(),
                    });
                }
                time
            }
            Start::In(delay) => {
                if !delay.is_finite() {
                    return Err(TimerError::NonFinite { field: "delay" });
                }
                if delay < 0.0 {
                    return Err(TimerError::NegativeDelay { delay });
                }
                now + SimTime::from_secs(delay)
            }
        };

        if let Some(period) = self.period {
            if !period.is_finite() {
                return Err(TimerError::NonFinite { field: "period" });
            }
            if period <= 0.0 {
                return Err(TimerError::NonPositivePeriod { period });
            }
            if first + SimTime::from_secs(period) <= first {
                return Err(TimerError::PeriodBelowResolution {
                    period,
                    at: first.as_secs(),
                });
            }
        }

        if self.repetitions == Some(0) {
            return Err(TimerError::ZeroRepetitions);
        }

        if let Some(end) = self.until {
            if !end.is_finite() {
                return Err(TimerError::NonFinite { field: "end time" });
            }
            if end < first {
                return Err(TimerError::EndBeforeStart {
                    first: first.as_secs(),
                    end: end.as_secs(),
                });
            }
        }

        Ok(Schedule {
            first,
            period: self.period,
            repetitions: self.repetitions,
            until: self.until,
        })
    }
}
