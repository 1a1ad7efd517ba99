//! Aggregate outcome of a reboot run.

use crate::core::domain::model::power_direction::PowerDirection;

/// Success and failure counts for one phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseTally {
    pub succeeded: usize,
    pub failed: usize,
}

impl PhaseTally {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

impl std::fmt::Display for PhaseTally {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{} succeeded", self.succeeded, self.total())
    }
}

/// Counts of succeeded and failed toggles and restarts, plus a line per failure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub turned_off: PhaseTally,
    pub turned_on: PhaseTally,
    pub restarts: PhaseTally,
    pub failures: Vec<String>,
}

impl RunSummary {
    pub fn record_toggle(&mut self, direction: PowerDirection, outcome: Result<(), String>) {
        let tally = match direction {
            PowerDirection::Off => &mut self.turned_off,
            PowerDirection::On => &mut self.turned_on,
        };
        match outcome {
            Ok(()) => tally.succeeded += 1,
            Err(reason) => {
                tally.failed += 1;
                self.failures.push(format!("Turn{}: {}", direction, reason));
            }
        }
    }

    pub fn record_restart(&mut self, outcome: Result<(), String>) {
        match outcome {
            Ok(()) => self.restarts.succeeded += 1,
            Err(reason) => {
                self.restarts.failed += 1;
                self.failures.push(format!("restart: {}", reason));
            }
        }
    }

    /// Folds another summary into this one.
    pub fn merge(&mut self, other: RunSummary) {
        self.turned_off.succeeded += other.turned_off.succeeded;
        self.turned_off.failed += other.turned_off.failed;
        self.turned_on.succeeded += other.turned_on.succeeded;
        self.turned_on.failed += other.turned_on.failed;
        self.restarts.succeeded += other.restarts.succeeded;
        self.restarts.failed += other.restarts.failed;
        self.failures.extend(other.failures);
    }

    /// True when nothing failed.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "TurnOFF {}, restarts {}, TurnON {}",
            self.turned_off, self.restarts, self.turned_on
        )
    }
}
