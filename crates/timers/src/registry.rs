//! Scheduled callback registry.
//!
//! Time-ordered set of one-shot and periodic timers. The driver advances the
//! registry with the simulation clock; every due timer fires exactly once per
//! fire time, in `(fire time, insertion order)` order.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::fmt;

use contracts::{ContractError, SimTime};
use tracing::{debug, instrument, trace, warn};

use crate::error::Result;
use crate::spec::{Schedule, TimerSpec};

/// Timer callback
///
/// Receives the registry (to schedule or cancel timers while firing) and the
/// application context.
pub type TimerAction<C> = Box<dyn FnMut(&mut TimerRegistry<C>, &mut C) + Send>;

/// Opaque timer identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

impl fmt::Display for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

/// Timer lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    /// Waiting for its next fire time (periodic timers stay here)
    Pending,
    /// Fired for the last time
    Fired,
    /// Cancelled before its last fire
    Cancelled,
}

struct Entry<C> {
    fire_time: SimTime,
    period: Option<f64>,
    remaining: Option<u64>,
    until: Option<SimTime>,
    /// Set when a periodic timer cancels itself while firing
    cancelled: bool,
    /// Taken out while firing
    action: Option<TimerAction<C>>,
    fired: u64,
    /// Queue key of the live heap entry
    seq: u64,
}

/// What is left of a timer once it is terminal
#[derive(Debug, Clone, Copy)]
struct Retired {
    state: TimerState,
    fired: u64,
}

/// Registry of scheduled callbacks over an application context `C`
pub struct TimerRegistry<C> {
    now: SimTime,
    next_handle: u64,
    next_seq: u64,
    queue: BinaryHeap<Reverse<(SimTime, u64, TimerHandle)>>,
    /// Live timers only
    entries: HashMap<TimerHandle, Entry<C>>,
    retired: HashMap<TimerHandle, Retired>,
}

impl<C> fmt::Debug for TimerRegistry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerRegistry")
            .field("now", &self.now)
            .field("pending", &self.pending_count())
            .field("retired", &self.retired.len())
            .finish()
    }
}

impl<C> Default for TimerRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> TimerRegistry<C> {
    /// Registry at t=0
    pub fn new() -> Self {
        Self::starting_at(SimTime::ZERO)
    }

    /// Registry whose clock starts at `now`
    pub fn starting_at(now: SimTime) -> Self {
        Self {
            now,
            next_handle: 0,
            next_seq: 0,
            queue: BinaryHeap::new(),
            entries: HashMap::new(),
            retired: HashMap::new(),
        }
    }

    /// Current time (the fire time while a timer is firing)
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Validate `spec` against the current time and schedule `action`
    ///
    /// # Errors
    /// Scheduling rejections from `spec` (time in the past, negative
    /// delay, non-positive period, a period too small to move the clock,
    /// non-finite values).
    pub fn create<F>(&mut self, spec: TimerSpec, action: F) -> Result<TimerHandle>
    where
        F: FnMut(&mut TimerRegistry<C>, &mut C) + Send + 'static,
    {
        let schedule = spec.resolve(self.now)?;
        Ok(self.insert(schedule, Box::new(action)))
    }

    /// One-shot timer at absolute time `time`
    pub fn schedule_once_at<F>(&mut self, time: SimTime, action: F) -> Result<TimerHandle>
    where
        F: FnMut(&mut TimerRegistry<C>, &mut C) + Send + 'static,
    {
        self.create(TimerSpec::once_at(time), action)
    }

    /// One-shot timer `delay` seconds from now
    pub fn schedule_once_in<F>(&mut self, delay: f64, action: F) -> Result<TimerHandle>
    where
        F: FnMut(&mut TimerRegistry<C>, &mut C) + Send + 'static,
    {
        self.create(TimerSpec::once_in(delay), action)
    }

    /// Periodic timer first firing at `first_time`, then every `period` seconds
    pub fn schedule_periodic<F>(
        &mut self,
        first_time: SimTime,
        period: f64,
        action: F,
    ) -> Result<TimerHandle>
    where
        F: FnMut(&mut TimerRegistry<C>, &mut C) + Send + 'static,
    {
        self.create(TimerSpec::every(period).starting_at(first_time), action)
    }

    fn insert(&mut self, schedule: Schedule, action: TimerAction<C>) -> TimerHandle {
        let handle = TimerHandle(self.next_handle);
        self.next_handle += 1;
        let seq = self.bump_seq();

        self.entries.insert(
            handle,
            Entry {
                fire_time: schedule.first,
                period: schedule.period,
                remaining: schedule.repetitions,
                until: schedule.until,
                cancelled: false,
                action: Some(action),
                fired: 0,
                seq,
            },
        );
        self.queue.push(Reverse((schedule.first, seq, handle)));

        debug!(
            %handle,
            fire_time = %schedule.first,
            period = ?schedule.period,
            "timer scheduled"
        );
        handle
    }

    fn bump_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    fn retire(&mut self, handle: TimerHandle, state: TimerState, fired: u64) {
        self.retired.insert(handle, Retired { state, fired });
    }

    /// Cancel a pending timer
    ///
    /// Returns whether the timer moved to `Cancelled`. Cancelling a timer
    /// that is already terminal (or unknown) does nothing. A one-shot timer
    /// cancelling itself from its own action has already run and still
    /// ends as `Fired`; a periodic one stops repeating.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let Some(entry) = self.entries.get_mut(&handle) else {
            return false;
        };
        if entry.cancelled {
            return false;
        }

        if entry.action.is_none() {
            // firing right now
            if entry.period.is_none() {
                return false;
            }
            entry.cancelled = true;
        } else if let Some(entry) = self.entries.remove(&handle) {
            // stale heap key is skipped in `advance_to`
            self.retire(handle, TimerState::Cancelled, entry.fired);
        }
        debug!(%handle, "timer cancelled");
        true
    }

    pub fn state(&self, handle: TimerHandle) -> Option<TimerState> {
        match self.entries.get(&handle) {
            Some(entry) if entry.cancelled => Some(TimerState::Cancelled),
            Some(_) => Some(TimerState::Pending),
            None => self.retired.get(&handle).map(|r| r.state),
        }
    }

    /// Next fire time of a pending timer
    pub fn fire_time(&self, handle: TimerHandle) -> Option<SimTime> {
        self.entries
            .get(&handle)
            .filter(|e| !e.cancelled)
            .map(|e| e.fire_time)
    }

    /// How often the timer has fired so far
    pub fn fired_count(&self, handle: TimerHandle) -> u64 {
        match self.entries.get(&handle) {
            Some(entry) => entry.fired,
            None => self.retired.get(&handle).map_or(0, |r| r.fired),
        }
    }

    pub fn pending_count(&self) -> usize {
        self.entries.values().filter(|e| !e.cancelled).count()
    }

    /// Earliest fire time among pending timers
    pub fn next_fire_time(&self) -> Option<SimTime> {
        self.entries
            .values()
            .filter(|e| !e.cancelled)
            .map(|e| e.fire_time)
            .min()
    }

    /// Fire every timer due at or before `to`, then move the clock to `to`
    ///
    /// Timers scheduled by a firing action that fall due before `to` fire in
    /// the same call. Returns the number of fires.
    ///
    /// # Errors
    /// `ClockRegression` if `to` lies before the current time.
    #[instrument(level = "trace", name = "timers_advance", skip_all, fields(to = %to))]
    pub fn advance_to(&mut self, to: SimTime, ctx: &mut C) -> Result<usize> {
        if !to.is_finite() || to < self.now {
            return Err(ContractError::ClockRegression {
                now: self.now.as_secs(),
                requested: to.as_secs(),
            }
            .into());
        }

        let mut fired = 0;
        while let Some(&Reverse((time, seq, handle))) = self.queue.peek() {
            if time > to {
                break;
            }
            self.queue.pop();

            // stale heap key: cancelled, or rescheduled under a newer seq
            let Some(entry) = self.entries.get_mut(&handle) else {
                continue;
            };
            if entry.seq != seq {
                continue;
            }
            let Some(mut action) = entry.action.take() else {
                continue;
            };
            entry.fired += 1;
            let periodic = entry.period.is_some();

            self.now = time;
            trace!(%handle, fire_time = %time, "timer firing");
            action(self, ctx);
            observability::record_timer_fired(periodic);
            fired += 1;

            self.complete(handle, action);
        }

        self.now = to;
        observability::record_timers_pending(self.pending_count());
        Ok(fired)
    }

    fn complete(&mut self, handle: TimerHandle, action: TimerAction<C>) {
        let Some(mut entry) = self.entries.remove(&handle) else {
            return;
        };
        if entry.cancelled {
            self.retire(handle, TimerState::Cancelled, entry.fired);
            return;
        }

        let Some(period) = entry.period else {
            self.retire(handle, TimerState::Fired, entry.fired);
            return;
        };

        if let Some(remaining) = entry.remaining.as_mut() {
            *remaining = remaining.saturating_sub(1);
        }
        let next = entry.fire_time + SimTime::from_secs(period);
        if next <= entry.fire_time {
            warn!(
                %handle,
                period,
                fire_time = %entry.fire_time,
                "period no longer advances the clock, timer retired"
            );
            self.retire(handle, TimerState::Fired, entry.fired);
            return;
        }
        let exhausted =
            entry.remaining == Some(0) || entry.until.is_some_and(|end| next > end);

        if exhausted {
            debug!(%handle, fires = entry.fired, "periodic timer exhausted");
            self.retire(handle, TimerState::Fired, entry.fired);
            return;
        }

        entry.fire_time = next;
        entry.seq = self.bump_seq();
        entry.action = Some(action);
        self.queue.push(Reverse((next, entry.seq, handle)));
        self.entries.insert(handle, entry);
    }
}
