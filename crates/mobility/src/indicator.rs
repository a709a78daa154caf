//! Host status toggle
//!
//! Flips between two tags on every accepted update so a viewer can see that
//! a vehicle is still receiving telemetry.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use contracts::{KinematicState, MobilityObserver};
use tracing::trace;

const TAGS: [&str; 2] = [". ", " ."];

/// Two-state update indicator
///
/// Clones share the same toggle, so one clone can be handed to the tracker
/// while another is kept for display.
#[derive(Debug, Clone, Default)]
pub struct UpdateIndicator {
    toggles: Arc<AtomicU64>,
}

impl UpdateIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current tag
    pub fn tag(&self) -> &'static str {
        TAGS[(self.toggles() % 2) as usize]
    }

    /// Number of toggles so far
    pub fn toggles(&self) -> u64 {
        self.toggles.load(Ordering::Relaxed)
    }

    pub fn toggle(&self) -> &'static str {
        let previous = self.toggles.fetch_add(1, Ordering::Relaxed);
        TAGS[((previous + 1) % 2) as usize]
    }
}

impl MobilityObserver for UpdateIndicator {
    fn on_state_changed(&mut self, external_id: &str, _state: &KinematicState) {
        let tag = self.toggle();
        trace!(external_id, tag, "update indicator toggled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_alternates() {
        let display = UpdateIndicator::new();
        let mut observer = display.clone();
        assert_eq!(display.tag(), ". ");

        let state = KinematicState::default();
        observer.on_state_changed("veh0", &state);
        assert_eq!(display.tag(), " .");
        observer.on_state_changed("veh0", &state);
        assert_eq!(display.tag(), ". ");
        assert_eq!(display.toggles(), 2);
    }
}
