//! `SystemState` and its transition events.

/// The operational state of the system as a whole, distinct from either
/// bus's `PowerState`. Has no `Fault` variant: a safe-mode demotion drops
/// to `Standby` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemState {
    Startup,
    Standby,
    Idle,
    InMotion,
    Pause,
    Offline,
}

impl Default for SystemState {
    fn default() -> Self {
        SystemState::Startup
    }
}

/// Events that drive `SystemState` transitions, outside of the power-bus
/// reconciliation handled separately by `report_power_system_state_change`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemEvent {
    CtrlReady,
    StartMotion,
    PauseMotion,
    ResumeMotion,
    StopMotion,
    PowerOffRequested,
    SafeModeRequested,
    Shutdown,
}

/// Pure transition function: `(from, event) -> Option<to>`. `None` means
/// the event has no effect in that state.
pub fn transition(from: SystemState, event: SystemEvent) -> Option<SystemState> {
    use SystemEvent::*;
    use SystemState::*;
    match (from, event) {
        (_, Shutdown) => Some(Offline),
        (Offline, _) => None,
        (_, SafeModeRequested) => Some(Standby),
        (Startup, CtrlReady) => Some(Standby),
        (Idle, StartMotion) => Some(InMotion),
        (InMotion, PauseMotion) => Some(Pause),
        (Pause, ResumeMotion) => Some(InMotion),
        (InMotion, StopMotion) => Some(Idle),
        (Idle, PowerOffRequested) => Some(Standby),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SystemEvent::*;
    use SystemState::*;

    #[test]
    fn startup_to_standby_on_ctrl_ready() {
        assert_eq!(transition(Startup, CtrlReady), Some(Standby));
    }

    #[test]
    fn idle_to_in_motion_to_pause_and_back() {
        assert_eq!(transition(Idle, StartMotion), Some(InMotion));
        assert_eq!(transition(InMotion, PauseMotion), Some(Pause));
        assert_eq!(transition(Pause, ResumeMotion), Some(InMotion));
        assert_eq!(transition(InMotion, StopMotion), Some(Idle));
    }

    #[test]
    fn shutdown_is_terminal_from_any_state() {
        for from in [Startup, Standby, Idle, InMotion, Pause] {
            assert_eq!(transition(from, Shutdown), Some(Offline));
        }
        assert_eq!(transition(Offline, Shutdown), Some(Offline));
    }

    #[test]
    fn offline_ignores_everything_but_is_already_terminal() {
        assert_eq!(transition(Offline, CtrlReady), None);
        assert_eq!(transition(Offline, StartMotion), None);
    }

    #[test]
    fn safe_mode_drops_to_standby_from_any_non_offline_state() {
        for from in [Startup, Standby, Idle, InMotion, Pause] {
            assert_eq!(transition(from, SafeModeRequested), Some(Standby));
        }
    }

    #[test]
    fn unrecognized_event_in_state_is_a_no_op() {
        assert_eq!(transition(Standby, StartMotion), None);
    }
}
