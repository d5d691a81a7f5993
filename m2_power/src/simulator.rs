//! Simulator I/O layer. Stands in for the FPGA reader in production: each
//! tick it advances simple analog models for both buses and publishes a
//! `SysInfo` snapshot. Forced-fault switches let tests drive
//! overvoltage/overcurrent without fighting the ramp model.

use m2_common::bitmap::{InputPortBits, OutputPortBits, OutputPortPos, COMM_BREAKER_FEEDS, MOTOR_BREAKER_FEEDS};
use m2_common::fault::Bus;
use m2_common::sysinfo::SysInfo;

/// Analog-model tuning. Not specified numerically by the source (these
/// are purely a test/simulation convenience, absent on real hardware);
/// defaults are chosen to settle well within the per-bus timing
/// constants in `m2_common::config::PowerSubsystemConfig`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulatorConfig {
    pub voltage_change_rate_on: f64,
    pub voltage_change_rate_off: f64,
    pub current_gain: f64,
    pub breaker_close_delay_secs: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            voltage_change_rate_on: 500.0,
            voltage_change_rate_off: 200.0,
            current_gain: 0.05,
            breaker_close_delay_secs: 0.010,
        }
    }
}

struct BusModel {
    voltage: f64,
    current: f64,
    breaker_closed: bool,
    breaker_target_since: f64,
    breaker_target: bool,
    force_overvoltage: bool,
    force_overcurrent: bool,
}

impl BusModel {
    fn new() -> Self {
        Self {
            voltage: 0.0,
            current: 0.0,
            breaker_closed: false,
            breaker_target_since: 0.0,
            breaker_target: false,
            force_overvoltage: false,
            force_overcurrent: false,
        }
    }
}

pub struct Simulator {
    cfg: SimulatorConfig,
    nominal_voltage: f64,
    motor: BusModel,
    comm: BusModel,
    last_tick: f64,
    iterations: u64,
}

impl Simulator {
    pub fn new(cfg: SimulatorConfig, nominal_voltage: f64) -> Self {
        Self {
            cfg,
            nominal_voltage,
            motor: BusModel::new(),
            comm: BusModel::new(),
            last_tick: 0.0,
            iterations: 0,
        }
    }

    pub fn force_overvoltage(&mut self, bus: Bus, on: bool) {
        self.bus_mut(bus).force_overvoltage = on;
    }

    pub fn force_overcurrent(&mut self, bus: Bus, on: bool) {
        self.bus_mut(bus).force_overcurrent = on;
    }

    fn bus_mut(&mut self, bus: Bus) -> &mut BusModel {
        match bus {
            Bus::Motor => &mut self.motor,
            Bus::Comm => &mut self.comm,
        }
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

    fn step_bus(&mut self, bus: Bus, output: &OutputPortBits, now: f64, dt: f64) {
        let power_on = output.get_pos(Self::power_on_pos(bus));
        let reset = output.get_pos(Self::reset_pos(bus));
        let model = self.bus_mut(bus);

        if power_on {
            model.voltage = (model.voltage + self.cfg_rate_on(bus) * dt).min(self.nominal_voltage);
        } else {
            model.voltage = (model.voltage - self.cfg_rate_off(bus) * dt).max(0.0);
        }
        if model.force_overvoltage {
            model.voltage = self.nominal_voltage * 1.5;
        }

        model.current = if model.breaker_closed {
            model.voltage * self.cfg.current_gain
        } else {
            0.0
        };
        if model.force_overcurrent {
            model.current = 1_000.0;
        }

        let target = power_on && !reset;
        if target != model.breaker_target {
            model.breaker_target = target;
            model.breaker_target_since = now;
        }
        if target && !model.breaker_closed && now - model.breaker_target_since >= self.cfg.breaker_close_delay_secs {
            model.breaker_closed = true;
        }
        if !target {
            model.breaker_closed = false;
        }
    }

    fn cfg_rate_on(&self, _bus: Bus) -> f64 {
        self.cfg.voltage_change_rate_on
    }
    fn cfg_rate_off(&self, _bus: Bus) -> f64 {
        self.cfg.voltage_change_rate_off
    }

    /// Advance the model by `dt` seconds and publish a snapshot.
    pub fn tick(&mut self, output: &OutputPortBits, now: f64) -> SysInfo {
        let dt = (now - self.last_tick).max(0.0);
        self.last_tick = now;
        self.iterations += 1;

        self.step_bus(Bus::Motor, output, now, dt);
        self.step_bus(Bus::Comm, output, now, dt);

        let mut input = InputPortBits::new();
        for group in MOTOR_BREAKER_FEEDS {
            for pos in group {
                input.set_pos(pos, self.motor.breaker_closed);
            }
        }
        for group in COMM_BREAKER_FEEDS {
            for pos in group {
                input.set_pos(pos, self.comm.breaker_closed);
            }
        }
        input.set_pos(m2_common::bitmap::InputPortPos::RedundancyOk, true);
        input.set_pos(m2_common::bitmap::InputPortPos::LoadDistributionOk, true);
        input.set_pos(m2_common::bitmap::InputPortPos::PowerSupply1DcOk, true);
        input.set_pos(m2_common::bitmap::InputPortPos::PowerSupply2DcOk, true);

        SysInfo {
            timestamp: now,
            output_port: *output,
            input_port: input,
            motor_voltage: self.motor.voltage,
            motor_current: self.motor.current,
            motor_breaker_closed: self.motor.breaker_closed,
            comm_voltage: self.comm.voltage,
            comm_current: self.comm.current,
            comm_breaker_closed: self.comm.breaker_closed,
            iterations: self.iterations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voltage_ramps_toward_nominal_when_power_on() {
        let mut sim = Simulator::new(SimulatorConfig::default(), 24.0);
        let mut output = OutputPortBits::new();
        output.set_pos(OutputPortPos::MotorPowerOn, true);
        let first = sim.tick(&output, 0.01);
        assert!(first.motor_voltage > 0.0);
        let second = sim.tick(&output, 0.1);
        assert!(second.motor_voltage > first.motor_voltage);
    }

    #[test]
    fn voltage_decays_when_power_off() {
        let mut sim = Simulator::new(SimulatorConfig::default(), 24.0);
        let mut output = OutputPortBits::new();
        output.set_pos(OutputPortPos::MotorPowerOn, true);
        sim.tick(&output, 0.1);
        output.set_pos(OutputPortPos::MotorPowerOn, false);
        let info = sim.tick(&output, 0.2);
        let info2 = sim.tick(&output, 0.3);
        assert!(info2.motor_voltage < info.motor_voltage);
    }

    #[test]
    fn breaker_closes_after_close_delay() {
        let mut sim = Simulator::new(SimulatorConfig::default(), 24.0);
        let mut output = OutputPortBits::new();
        output.set_pos(OutputPortPos::MotorPowerOn, true);
        sim.tick(&output, 0.001);
        assert!(!sim.motor.breaker_closed);
        let info = sim.tick(&output, 0.5);
        assert!(info.motor_breaker_closed);
    }

    #[test]
    fn forced_overvoltage_overrides_ramp() {
        let mut sim = Simulator::new(SimulatorConfig::default(), 24.0);
        sim.force_overvoltage(Bus::Motor, true);
        let output = OutputPortBits::new();
        let info = sim.tick(&output, 0.1);
        assert!(info.motor_voltage > 24.0);
    }
}
