//! `MotionEngine` shell. Implements only the staleness watchdog: the rest
//! of the motion/force-control loop — closed-loop force control,
//! trajectory planning — is not built here.

use m2_common::fault::FaultBit;

/// Tracks the timestamp of the most recent telemetry snapshot used for
/// control and classifies how stale it's become.
pub struct MotionEngine {
    stale_warn_secs: f64,
    stale_fault_secs: f64,
    last_control_timestamp: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StalenessOutcome {
    Fresh,
    Warn,
    /// Past the fault threshold; safe mode must be requested.
    Fault,
}

impl MotionEngine {
    pub fn new(stale_warn_secs: f64, stale_fault_secs: f64) -> Self {
        Self {
            stale_warn_secs,
            stale_fault_secs,
            last_control_timestamp: None,
        }
    }

    /// Record that `timestamp` was used for a control decision.
    pub fn note_control_timestamp(&mut self, timestamp: f64) {
        self.last_control_timestamp = Some(timestamp);
    }

    /// Called by the 1 Hz timeout poster. `now` is wall-clock time; the gap
    /// is measured against the last snapshot actually used for control,
    /// not merely received.
    pub fn check_staleness(&self, now: f64) -> StalenessOutcome {
        let age = match self.last_control_timestamp {
            Some(last) => now - last,
            None => return StalenessOutcome::Fresh,
        };
        if age >= self.stale_fault_secs {
            StalenessOutcome::Fault
        } else if age >= self.stale_warn_secs {
            StalenessOutcome::Warn
        } else {
            StalenessOutcome::Fresh
        }
    }

    /// Maps a `StalenessOutcome` to the fault bit it raises, if any.
    pub fn fault_bit_for(outcome: StalenessOutcome) -> Option<FaultBit> {
        match outcome {
            StalenessOutcome::Fresh => None,
            StalenessOutcome::Warn => Some(FaultBit::StaleDataWarn),
            StalenessOutcome::Fault => Some(FaultBit::StaleDataFault),
        }
    }
}
