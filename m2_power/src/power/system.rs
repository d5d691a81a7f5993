//! Dual-bus orchestrator. Owns both `PowerSubsystem` instances, enforces
//! COMM-before-MOTOR ordering, and turns one `SysInfo` snapshot into a
//! merged fault delta plus any power-state change notifications.

use m2_common::bitmap::{InputPortBits, InputPortPos, OutputPortBits, OutputPortPos};
use m2_common::config::CoreConfig;
use m2_common::fault::{Bus, FaultBit, FaultBitmap};
use m2_common::power_state::PowerState;
use m2_common::sysinfo::SysInfo;

use super::health::general_health_faults;
use super::subsystem::PowerSubsystem;

/// What changed on this tick, for `Model::report_power_system_state_change`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerStateChange {
    pub bus: Bus,
    pub actual: PowerState,
}

/// Result of one `process_tick` call.
#[derive(Debug, Clone)]
pub struct TickOutcome {
    pub current_faults: FaultBitmap,
    pub changes: Vec<PowerStateChange>,
}

pub struct PowerSystem {
    motor: PowerSubsystem,
    comm: PowerSubsystem,
    sys_info_timeout_secs: f64,
    last_seen_timestamp: Option<f64>,
}

impl PowerSystem {
    pub fn new(config: &CoreConfig) -> Self {
        Self {
            motor: PowerSubsystem::new(Bus::Motor, config.motor),
            comm: PowerSubsystem::new(Bus::Comm, config.comm),
            sys_info_timeout_secs: config.sys_info_timeout_secs,
            last_seen_timestamp: None,
        }
    }

    pub fn motor(&self) -> &PowerSubsystem {
        &self.motor
    }

    pub fn comm(&self) -> &PowerSubsystem {
        &self.comm
    }

    /// Refuses to turn MOTOR on when COMM's actual state is not `On`.
    /// Returns `true` if the request was accepted.
    pub fn power_motor(&mut self, on: bool) -> bool {
        if on && self.comm.actual() != PowerState::On {
            return false;
        }
        self.motor.request(on);
        true
    }

    /// Turning COMM off forces MOTOR off first.
    pub fn power_comm(&mut self, on: bool) {
        if !on {
            self.motor.request(false);
        }
        self.comm.request(on);
    }

    /// `queue_daq_info_read`: process one telemetry snapshot.
    ///
    /// MOTOR is always processed after COMM within this single call, so a
    /// COMM state change this tick is visible to the COMM-before-MOTOR
    /// check below.
    pub fn process_tick(&mut self, info: &SysInfo, output: &mut OutputPortBits, now: f64) -> TickOutcome {
        let mut current_faults = FaultBitmap::new();
        let mut changes = Vec::new();

        if let Some(last) = self.last_seen_timestamp {
            if now - last > self.sys_info_timeout_secs {
                self.trip_timeout(now, output, &mut current_faults, &mut changes);
                return TickOutcome {
                    current_faults,
                    changes,
                };
            }
        }
        self.last_seen_timestamp = Some(info.timestamp);

        current_faults = current_faults | general_health_faults(&info.input_port);

        // MOTOR_POWER_ON asserted without ILC_COMM_POWER_ON -> force MOTOR off.
        if output.get_pos(OutputPortPos::MotorPowerOn) && !output.get_pos(OutputPortPos::IlcCommPowerOn) {
            self.motor.force_off(info.timestamp, output);
        }

        let comm_before = self.comm.actual();
        let comm_after = self.comm.process_daq(info, output, &mut current_faults);
        if comm_after != comm_before {
            changes.push(PowerStateChange {
                bus: Bus::Comm,
                actual: comm_after,
            });
        }

        // Invariant 1: MOTOR may not be On/TurningOn unless COMM actual is On.
        if comm_after != PowerState::On
            && matches!(
                self.motor.actual(),
                PowerState::On | PowerState::TurningOn | PowerState::Reset
            )
        {
            self.motor.force_off(info.timestamp, output);
        }

        let motor_before = self.motor.actual();
        let motor_after = self.motor.process_daq(info, output, &mut current_faults);
        if motor_after != motor_before {
            changes.push(PowerStateChange {
                bus: Bus::Motor,
                actual: motor_after,
            });
        }

        TickOutcome {
            current_faults,
            changes,
        }
    }

    fn trip_timeout(
        &mut self,
        now: f64,
        output: &mut OutputPortBits,
        current_faults: &mut FaultBitmap,
        changes: &mut Vec<PowerStateChange>,
    ) {
        tracing::warn!("SysInfo stale, forcing both buses off");
        let motor_before = self.motor.actual();
        let comm_before = self.comm.actual();
        self.motor.force_off(now, output);
        self.comm.force_off(now, output);
        if self.motor.actual() != motor_before {
            changes.push(PowerStateChange {
                bus: Bus::Motor,
                actual: self.motor.actual(),
            });
        }
        if self.comm.actual() != comm_before {
            changes.push(PowerStateChange {
                bus: Bus::Comm,
                actual: self.comm.actual(),
            });
        }
        current_faults.set_bit(FaultBit::PowerSystemTimeout, true);
    }

    /// Called by the 1Hz timeout poster when no fresh snapshot has arrived
    /// at all (distinct from a stale-but-present snapshot in `process_tick`).
    pub fn check_timeout(&mut self, now: f64, output: &mut OutputPortBits) -> TickOutcome {
        let mut current_faults = FaultBitmap::new();
        let mut changes = Vec::new();
        let stale = match self.last_seen_timestamp {
            Some(last) => now - last > self.sys_info_timeout_secs,
            None => false,
        };
        if stale {
            self.trip_timeout(now, output, &mut current_faults, &mut changes);
        }
        TickOutcome {
            current_faults,
            changes,
        }
    }
}

/// Placeholder InputPortBits accessor used by doc examples/tests that want
/// a breaker-all-ok snapshot without repeating the feed enumeration.
pub fn all_breakers_ok_input() -> InputPortBits {
    let mut input = InputPortBits::new();
    for group in m2_common::bitmap::MOTOR_BREAKER_FEEDS {
        for pos in group {
            input.set_pos(pos, true);
        }
    }
    for group in m2_common::bitmap::COMM_BREAKER_FEEDS {
        for pos in group {
            input.set_pos(pos, true);
        }
    }
    input.set_pos(InputPortPos::RedundancyOk, true);
    input.set_pos(InputPortPos::LoadDistributionOk, true);
    input.set_pos(InputPortPos::PowerSupply1DcOk, true);
    input.set_pos(InputPortPos::PowerSupply2DcOk, true);
    input
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info_at(t: f64, iterations: u64, input: InputPortBits) -> SysInfo {
        SysInfo {
            timestamp: t,
            output_port: OutputPortBits::new(),
            input_port: input,
            motor_voltage: 24.0,
            motor_current: 1.0,
            motor_breaker_closed: true,
            comm_voltage: 24.0,
            comm_current: 0.5,
            comm_breaker_closed: true,
            iterations,
        }
    }

    #[test]
    fn motor_on_refused_when_comm_not_on() {
        let mut sys = PowerSystem::new(&CoreConfig::default());
        assert!(!sys.power_motor(true));
        assert_eq!(sys.motor.target(), PowerState::Off);
    }

    #[test]
    fn comm_off_forces_motor_off() {
        let mut sys = PowerSystem::new(&CoreConfig::default());
        sys.comm.request(true);
        sys.motor.request(true);
        sys.power_comm(false);
        assert_eq!(sys.motor.target(), PowerState::Off);
        assert_eq!(sys.comm.target(), PowerState::Off);
    }

    #[test]
    fn power_up_happy_path_comm_then_motor() {
        let mut sys = PowerSystem::new(&CoreConfig::default());
        let mut output = OutputPortBits::new();
        sys.power_comm(true);
        let input = all_breakers_ok_input();

        let mut t = 0.0;
        let mut iterations = 0u64;
        for _ in 0..200 {
            t += 0.01;
            iterations += 1;
            sys.process_tick(&info_at(t, iterations, input), &mut output, t);
            if sys.comm().actual() == PowerState::On {
                break;
            }
        }
        assert_eq!(sys.comm().actual(), PowerState::On);

        assert!(sys.power_motor(true));
        for _ in 0..200 {
            t += 0.01;
            iterations += 1;
            sys.process_tick(&info_at(t, iterations, input), &mut output, t);
            if sys.motor().actual() == PowerState::On {
                break;
            }
        }
        assert_eq!(sys.motor().actual(), PowerState::On);
    }

    #[test]
    fn stale_snapshot_forces_both_off_and_raises_timeout_fault() {
        let mut sys = PowerSystem::new(&CoreConfig::default());
        let mut output = OutputPortBits::new();
        let input = all_breakers_ok_input();
        sys.process_tick(&info_at(0.0, 0, input), &mut output, 0.0);
        sys.comm.request(true);
        // jump far enough ahead that the next snapshot is itself stale.
        let outcome = sys.process_tick(&info_at(0.01, 1, input), &mut output, 5.0);
        assert!(outcome.current_faults.get(FaultBit::PowerSystemTimeout));
        assert_eq!(sys.comm().target(), PowerState::Off);
        assert_eq!(sys.motor().target(), PowerState::Off);
    }
}
