//! Per-bus power state machine: an explicit phase enum for the
//! multi-step `TurningOn` sequence, elapsed-time gates instead of cycle
//! counters (this domain samples telemetry on a timestamped snapshot, not
//! a fixed-rate cycle counter), and a single `process_daq` entry point
//! that runs the handler for the current `actual` state.

use m2_common::bitmap::{OutputPortBits, OutputPortPos};
use m2_common::config::PowerSubsystemConfig;
use m2_common::fault::{Bus, FaultBit, FaultBitmap};
use m2_common::power_state::PowerState;
use m2_common::sysinfo::SysInfo;

use super::breaker::{check_breaker_status, BreakerStatus};

/// Sub-phases of `TurningOn`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TurningOnPhase {
    /// Waiting for the telemetry counter to advance by 10 ticks.
    Telemetry,
    /// Waiting for `output_should_be_on` to become true.
    OutputCheck,
    /// Waiting for the breaker to report active and pass `check_breaker_status`.
    BreakerWait,
}

fn power_on_pos(bus: Bus) -> OutputPortPos {
    match bus {
        Bus::Motor => OutputPortPos::MotorPowerOn,
        Bus::Comm => OutputPortPos::IlcCommPowerOn,
    }
}

fn reset_pos(bus: Bus) -> OutputPortPos {
    match bus {
        Bus::Motor => OutputPortPos::ResetMotorBreakers,
        Bus::Comm => OutputPortPos::ResetCommBreakers,
    }
}

fn voltage_fault_bit(bus: Bus) -> FaultBit {
    match bus {
        Bus::Motor => FaultBit::MotorVoltageFault,
        Bus::Comm => FaultBit::CommVoltageFault,
    }
}

fn voltage_warn_bit(bus: Bus) -> FaultBit {
    match bus {
        Bus::Motor => FaultBit::MotorVoltageWarn,
        Bus::Comm => FaultBit::CommVoltageWarn,
    }
}

fn over_current_bit(bus: Bus) -> FaultBit {
    match bus {
        Bus::Motor => FaultBit::MotorOverCurrent,
        Bus::Comm => FaultBit::CommOverCurrent,
    }
}

fn relay_bit(bus: Bus) -> FaultBit {
    match bus {
        Bus::Motor => FaultBit::MotorRelay,
        Bus::Comm => FaultBit::CommRelay,
    }
}

fn multi_breaker_fault_bit(bus: Bus) -> FaultBit {
    match bus {
        Bus::Motor => FaultBit::MotorMultiBreakerFault,
        Bus::Comm => FaultBit::CommMultiBreakerFault,
    }
}

/// `output_should_be_on`: the bus's own power-on output bit, gated for
/// MOTOR by the interlock-enable output bit. COMM has no interlock of its
/// own.
pub fn output_should_be_on(bus: Bus, output: &OutputPortBits) -> bool {
    match bus {
        Bus::Motor => {
            output.get_pos(OutputPortPos::MotorPowerOn)
                && output.get_pos(OutputPortPos::CrioInterlockEnable)
        }
        Bus::Comm => output.get_pos(OutputPortPos::IlcCommPowerOn),
    }
}

fn bus_voltage(bus: Bus, info: &SysInfo) -> f64 {
    match bus {
        Bus::Motor => info.motor_voltage,
        Bus::Comm => info.comm_voltage,
    }
}

fn bus_current(bus: Bus, info: &SysInfo) -> f64 {
    match bus {
        Bus::Motor => info.motor_current,
        Bus::Comm => info.comm_current,
    }
}

fn bus_breaker_closed(bus: Bus, info: &SysInfo) -> bool {
    match bus {
        Bus::Motor => info.motor_breaker_closed,
        Bus::Comm => info.comm_breaker_closed,
    }
}

/// One bus's power state machine: target/actual pair, config, and the
/// bookkeeping needed to time its phases.
#[derive(Debug, Clone)]
pub struct PowerSubsystem {
    bus: Bus,
    config: PowerSubsystemConfig,
    target: PowerState,
    actual: PowerState,
    turning_on_phase: TurningOnPhase,
    phase_entered_at: f64,
    phase_entered_iterations: u64,
    on_entered_at: f64,
    off_entered_at: f64,
    reset_entered_at: f64,
}

impl PowerSubsystem {
    pub fn new(bus: Bus, config: PowerSubsystemConfig) -> Self {
        Self {
            bus,
            config,
            target: PowerState::Off,
            actual: PowerState::Off,
            turning_on_phase: TurningOnPhase::Telemetry,
            phase_entered_at: 0.0,
            phase_entered_iterations: 0,
            on_entered_at: 0.0,
            off_entered_at: 0.0,
            reset_entered_at: 0.0,
        }
    }

    pub fn bus(&self) -> Bus {
        self.bus
    }

    pub fn target(&self) -> PowerState {
        self.target
    }

    pub fn actual(&self) -> PowerState {
        self.actual
    }

    pub fn config(&self) -> &PowerSubsystemConfig {
        &self.config
    }

    /// Commanded on/off. Does not itself move `actual` — that happens on
    /// the next `process_daq` call, since it has to write the output bit
    /// under the snapshot that `process_daq` observes.
    pub fn request(&mut self, on: bool) {
        self.target = if on { PowerState::On } else { PowerState::Off };
    }

    /// Force the bus toward `Off` regardless of the current target,
    /// without waiting for a `process_daq` tick to observe a new target.
    /// Used by `PowerSystem` to enforce the COMM-before-MOTOR invariant
    /// and the staleness/timeout path.
    pub fn force_off(&mut self, now: f64, output: &mut OutputPortBits) {
        self.target = PowerState::Off;
        if !matches!(self.actual, PowerState::Off | PowerState::TurningOff) {
            output.set_pos(power_on_pos(self.bus), false);
            self.actual = PowerState::TurningOff;
            self.off_entered_at = now;
        }
    }

    /// Advance this bus's state machine by one snapshot. Returns the
    /// `actual` state after processing, so callers can detect a change.
    pub fn process_daq(
        &mut self,
        info: &SysInfo,
        output: &mut OutputPortBits,
        faults: &mut FaultBitmap,
    ) -> PowerState {
        let before = self.actual;
        match self.actual {
            PowerState::Off => self.process_off(info, output),
            PowerState::TurningOn => self.process_turning_on(info, output, faults),
            PowerState::Reset => self.process_reset(info, output),
            PowerState::On => self.process_on(info, output, faults),
            PowerState::TurningOff => self.process_turning_off(info, output, faults),
            PowerState::Unknown => self.process_off(info, output),
        }
        if self.actual != before {
            tracing::info!(bus = ?self.bus, from = ?before, to = ?self.actual, "power state transition");
        }
        self.actual
    }

    fn process_off(&mut self, info: &SysInfo, output: &mut OutputPortBits) {
        if self.target == PowerState::On {
            output.set_pos(power_on_pos(self.bus), true);
            if self.bus == Bus::Motor {
                output.set_pos(OutputPortPos::CrioInterlockEnable, true);
            }
            self.actual = PowerState::TurningOn;
            self.turning_on_phase = TurningOnPhase::Telemetry;
            self.phase_entered_at = info.timestamp;
            self.phase_entered_iterations = info.iterations;
        }
    }

    fn process_turning_on(
        &mut self,
        info: &SysInfo,
        output: &mut OutputPortBits,
        faults: &mut FaultBitmap,
    ) {
        if self.target == PowerState::Off {
            self.enter_turning_off(info, output);
            return;
        }
        match self.turning_on_phase {
            TurningOnPhase::Telemetry => {
                if info.iterations.wrapping_sub(self.phase_entered_iterations) >= 10 {
                    self.turning_on_phase = TurningOnPhase::OutputCheck;
                    self.phase_entered_at = info.timestamp;
                }
            }
            TurningOnPhase::OutputCheck => {
                if output_should_be_on(self.bus, output) {
                    self.turning_on_phase = TurningOnPhase::BreakerWait;
                    self.phase_entered_at = info.timestamp;
                }
            }
            TurningOnPhase::BreakerWait => {
                let elapsed = info.timestamp - self.phase_entered_at;
                let breaker_active = bus_breaker_closed(self.bus, info);
                if breaker_active {
                    match check_breaker_status(self.bus, &info.input_port) {
                        BreakerStatus::Ok => {
                            self.actual = PowerState::On;
                            self.on_entered_at = info.timestamp;
                        }
                        BreakerStatus::Warning => {
                            if elapsed >= self.config.breaker_operating_voltage_rise_time_secs {
                                faults.set_bit(FaultBit::SingleBreakerTrip, true);
                                self.enter_reset(info, output);
                            }
                        }
                        BreakerStatus::Fault => {
                            if elapsed >= self.config.breaker_operating_voltage_rise_time_secs {
                                faults.set_bit(multi_breaker_fault_bit(self.bus), true);
                                self.enter_reset(info, output);
                            }
                        }
                    }
                } else if elapsed >= self.config.breaker_operating_voltage_rise_time_secs {
                    faults.set_bit(multi_breaker_fault_bit(self.bus), true);
                    self.enter_reset(info, output);
                }
            }
        }
    }

    fn enter_reset(&mut self, info: &SysInfo, output: &mut OutputPortBits) {
        output.set_pos(reset_pos(self.bus), true);
        self.actual = PowerState::Reset;
        self.reset_entered_at = info.timestamp;
    }

    fn process_reset(&mut self, info: &SysInfo, output: &mut OutputPortBits) {
        if bus_breaker_closed(self.bus, info) {
            output.set_pos(reset_pos(self.bus), false);
            self.actual = PowerState::On;
            self.on_entered_at = info.timestamp;
            return;
        }
        if info.timestamp - self.reset_entered_at >= self.config.reset_breaker_pulse_width_secs {
            output.set_pos(reset_pos(self.bus), false);
            self.actual = PowerState::TurningOn;
            self.turning_on_phase = TurningOnPhase::Telemetry;
            self.phase_entered_at = info.timestamp;
            self.phase_entered_iterations = info.iterations;
        }
    }

    fn process_on(&mut self, info: &SysInfo, output: &mut OutputPortBits, faults: &mut FaultBitmap) {
        if self.target == PowerState::Off {
            self.enter_turning_off(info, output);
            return;
        }
        if !output_should_be_on(self.bus, output) {
            faults.set_bit(FaultBit::InterlockFault, true);
            self.enter_turning_off(info, output);
            return;
        }

        let elapsed = info.timestamp - self.on_entered_at;
        if elapsed < self.config.voltage_settling_time_secs + self.config.breaker_operating_voltage_rise_time_secs
        {
            // sub-phase 1: still settling, no checks yet.
            return;
        }

        let voltage = bus_voltage(self.bus, info);
        if voltage < self.config.breaker_operating_voltage {
            // sub-phase 2: breaker voltage never came up.
            faults.set_bit(voltage_fault_bit(self.bus), true);
            faults.set_bit(FaultBit::HardwareFault, true);
            self.enter_turning_off(info, output);
            return;
        }

        let current = bus_current(self.bus, info);
        if current > self.config.max_current {
            faults.set_bit(over_current_bit(self.bus), true);
            self.enter_turning_off(info, output);
            return;
        }

        // Strict inequality on the inside: exactly at a fault boundary counts as faulted.
        let in_fault_window = voltage > self.config.min_voltage_fault && voltage < self.config.max_voltage_fault;
        if !in_fault_window {
            faults.set_bit(voltage_fault_bit(self.bus), true);
            self.enter_turning_off(info, output);
            return;
        }

        let in_warn_window = voltage > self.config.min_voltage_warn && voltage < self.config.max_voltage_warn;
        if !in_warn_window {
            faults.set_bit(voltage_warn_bit(self.bus), true);
        }
    }

    fn enter_turning_off(&mut self, info: &SysInfo, output: &mut OutputPortBits) {
        output.set_pos(power_on_pos(self.bus), false);
        if self.bus == Bus::Motor {
            output.set_pos(OutputPortPos::CrioInterlockEnable, false);
        }
        self.actual = PowerState::TurningOff;
        self.off_entered_at = info.timestamp;
    }

    fn process_turning_off(&mut self, info: &SysInfo, _output: &mut OutputPortBits, faults: &mut FaultBitmap) {
        let voltage = bus_voltage(self.bus, info);
        if voltage <= self.config.voltage_off_level {
            self.actual = PowerState::Off;
            return;
        }
        if info.timestamp - self.off_entered_at >= self.config.output_off_max_delay_secs() {
            faults.set_bit(relay_bit(self.bus), true);
            self.actual = PowerState::Off;
        }
    }
}
