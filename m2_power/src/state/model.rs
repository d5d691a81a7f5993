//! `Model`/`StateMap`: the operational reconciler that sits above
//! `PowerSystem`. Owns the current `SystemState` and reconciles it
//! against bus target/actual power states on every power state change
//! notification.

use m2_common::fault::Bus;
use m2_common::power_state::PowerState;

use super::machine::{transition, SystemEvent, SystemState};
use crate::power::system::PowerStateChange;

/// States that require both buses to be `On` to remain valid.
fn requires_both_on(state: SystemState) -> bool {
    matches!(state, SystemState::Idle | SystemState::InMotion | SystemState::Pause)
}

/// States that require both buses to be commanded `Off`.
fn requires_both_off(state: SystemState) -> bool {
    matches!(state, SystemState::Startup | SystemState::Offline)
}

pub struct Model {
    state: SystemState,
    motor_target: PowerState,
    motor_actual: PowerState,
    comm_target: PowerState,
    comm_actual: PowerState,
}

impl Model {
    pub fn new() -> Self {
        Self {
            state: SystemState::default(),
            motor_target: PowerState::Off,
            motor_actual: PowerState::Off,
            comm_target: PowerState::Off,
            comm_actual: PowerState::Off,
        }
    }

    pub fn state(&self) -> SystemState {
        self.state
    }

    /// Drive a plain operational event (motion/shutdown/safe-mode/etc).
    /// `force_buses_off`/`force_buses_on` are set when the resulting state
    /// demands the caller immediately command both buses accordingly.
    pub fn handle_event(&mut self, event: SystemEvent) -> bool {
        if let Some(next) = transition(self.state, event) {
            tracing::info!(from = ?self.state, to = ?next, ?event, "system state transition");
            self.state = next;
            true
        } else {
            false
        }
    }

    /// Record a bus's current target/actual from a `PowerSystem` tick, and
    /// run `report_power_system_state_change`: the central reconciler that
    /// keeps `SystemState` consistent with the power buses.
    ///
    /// Returns `Some(true)`/`Some(false)` when the reconciliation demands
    /// the caller command both buses on/off, or `None` if no bus command
    /// is required this call.
    pub fn report_power_system_state_change(
        &mut self,
        change: PowerStateChange,
        target: PowerState,
    ) -> Option<bool> {
        match change.bus {
            Bus::Motor => {
                self.motor_actual = change.actual;
                self.motor_target = target;
            }
            Bus::Comm => {
                self.comm_actual = change.actual;
                self.comm_target = target;
            }
        }
        self.reconcile()
    }

    fn reconcile(&mut self) -> Option<bool> {
        let both_on = self.motor_actual == PowerState::On && self.comm_actual == PowerState::On;
        let either_not_on = self.motor_actual != PowerState::On || self.comm_actual != PowerState::On;
        let either_target_not_off = self.motor_target != PowerState::Off || self.comm_target != PowerState::Off;

        if requires_both_on(self.state) && either_not_on {
            tracing::warn!(state = ?self.state, "bus dropped while state required both on, demoting to Standby");
            self.state = SystemState::Standby;
            return None;
        }

        if requires_both_off(self.state) && either_target_not_off {
            return Some(false);
        }

        if self.state == SystemState::Standby && both_on {
            self.state = SystemState::Idle;
        }

        None
    }
}

impl Default for Model {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(bus: Bus, actual: PowerState) -> PowerStateChange {
        PowerStateChange { bus, actual }
    }

    #[test]
    fn standby_advances_to_idle_once_both_buses_on() {
        let mut model = Model::new();
        model.handle_event(SystemEvent::CtrlReady);
        assert_eq!(model.state(), SystemState::Standby);

        model.report_power_system_state_change(change(Bus::Comm, PowerState::On), PowerState::On);
        model.report_power_system_state_change(change(Bus::Motor, PowerState::On), PowerState::On);
        assert_eq!(model.state(), SystemState::Idle);
    }

    #[test]
    fn idle_drops_to_standby_if_a_bus_leaves_on() {
        let mut model = Model::new();
        model.handle_event(SystemEvent::CtrlReady);
        model.report_power_system_state_change(change(Bus::Comm, PowerState::On), PowerState::On);
        model.report_power_system_state_change(change(Bus::Motor, PowerState::On), PowerState::On);
        model.handle_event(SystemEvent::StartMotion);
        assert_eq!(model.state(), SystemState::InMotion);

        model.report_power_system_state_change(change(Bus::Motor, PowerState::TurningOff), PowerState::Off);
        assert_eq!(model.state(), SystemState::Standby);
    }

    #[test]
    fn startup_requires_both_off() {
        let mut model = Model::new();
        assert_eq!(model.state(), SystemState::Startup);
        let demand = model.report_power_system_state_change(change(Bus::Motor, PowerState::Off), PowerState::On);
        assert_eq!(demand, Some(false));
    }

    #[test]
    fn safe_mode_drops_straight_to_standby() {
        let mut model = Model::new();
        model.handle_event(SystemEvent::CtrlReady);
        model.report_power_system_state_change(change(Bus::Comm, PowerState::On), PowerState::On);
        model.report_power_system_state_change(change(Bus::Motor, PowerState::On), PowerState::On);
        model.handle_event(SystemEvent::StartMotion);
        assert!(model.handle_event(SystemEvent::SafeModeRequested));
        assert_eq!(model.state(), SystemState::Standby);
    }
}
