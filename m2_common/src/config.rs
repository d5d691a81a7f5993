//! Configuration loading: a `serde`+`toml` deserializable struct with a
//! `validate()` that checks documented numeric bounds and returns
//! `ConfigError::ValidationError` on violation.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;

/// Blanket-implementable config loading: any `Deserialize` type gets
/// `load()` for free.
pub trait ConfigLoader: Sized + for<'de> Deserialize<'de> {
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound(path.display().to_string()))?;
        toml::from_str(&text).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

/// Per-bus timing/voltage/current constants.
///
/// MOTOR and COMM get distinct instances; values below are the production
/// defaults taken from the source's `_setupMotor`/`_setupCOMM`. COMM's
/// output-voltage settling time is 20ms here, not the 10ms documented in
/// the source's design comment: the actual `_setupCOMM()` code sets it to
/// the same value as MOTOR, and code wins over comment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerSubsystemConfig {
    pub relay_close_delay_secs: f64,
    pub breaker_on_time_secs: f64,
    /// Zero for COMM, which has no interlock chain of its own.
    pub interlock_output_on_delay_secs: f64,
    pub relay_open_delay_secs: f64,
    pub interlock_output_off_delay_secs: f64,
    pub reset_breaker_pulse_width_secs: f64,
    pub breaker_operating_voltage: f64,
    pub nominal_voltage: f64,
    pub min_voltage_warn: f64,
    pub max_voltage_warn: f64,
    pub min_voltage_fault: f64,
    pub max_voltage_fault: f64,
    pub breaker_operating_voltage_rise_time_secs: f64,
    pub voltage_settling_time_secs: f64,
    pub voltage_fall_time_secs: f64,
    pub voltage_off_level: f64,
    pub max_current: f64,
}

impl PowerSubsystemConfig {
    pub fn motor() -> Self {
        let nominal = 24.0;
        Self {
            relay_close_delay_secs: 0.050,
            breaker_on_time_secs: 0.500,
            interlock_output_on_delay_secs: 0.050,
            relay_open_delay_secs: 0.030,
            interlock_output_off_delay_secs: 0.050,
            reset_breaker_pulse_width_secs: 0.400,
            breaker_operating_voltage: 19.0,
            nominal_voltage: nominal,
            min_voltage_warn: nominal * 0.95,
            max_voltage_warn: nominal * 1.05,
            min_voltage_fault: nominal * 0.90,
            max_voltage_fault: nominal * 1.10,
            breaker_operating_voltage_rise_time_secs: 0.085,
            voltage_settling_time_secs: 0.020,
            voltage_fall_time_secs: 0.300,
            voltage_off_level: 12.0,
            max_current: 20.0,
        }
    }

    pub fn comm() -> Self {
        let nominal = 24.0;
        Self {
            relay_close_delay_secs: 0.050,
            breaker_on_time_secs: 0.500,
            interlock_output_on_delay_secs: 0.0,
            relay_open_delay_secs: 0.030,
            interlock_output_off_delay_secs: 0.0,
            reset_breaker_pulse_width_secs: 0.400,
            breaker_operating_voltage: 19.0,
            nominal_voltage: nominal,
            min_voltage_warn: nominal * 0.95,
            max_voltage_warn: nominal * 1.05,
            min_voltage_fault: nominal * 0.90,
            max_voltage_fault: nominal * 1.10,
            breaker_operating_voltage_rise_time_secs: 0.030,
            voltage_settling_time_secs: 0.020,
            voltage_fall_time_secs: 0.050,
            voltage_off_level: 12.0,
            max_current: 10.0,
        }
    }

    pub fn output_on_max_delay_secs(&self) -> f64 {
        self.relay_close_delay_secs + self.breaker_on_time_secs + self.interlock_output_on_delay_secs
    }

    pub fn output_off_max_delay_secs(&self) -> f64 {
        self.relay_open_delay_secs + self.interlock_output_off_delay_secs
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.nominal_voltage <= 0.0 {
            return Err(ConfigError::ValidationError(
                "nominal_voltage must be positive".into(),
            ));
        }
        if !(self.min_voltage_fault < self.min_voltage_warn
            && self.min_voltage_warn < self.nominal_voltage
            && self.nominal_voltage < self.max_voltage_warn
            && self.max_voltage_warn < self.max_voltage_fault)
        {
            return Err(ConfigError::ValidationError(
                "voltage warn/fault windows must nest around nominal_voltage".into(),
            ));
        }
        if self.max_current <= 0.0 {
            return Err(ConfigError::ValidationError(
                "max_current must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Top-level configuration the control core itself needs. Server ports,
/// per-subsystem scale/link names, and log file rotation are not
/// covered here; this struct only holds the keys `m2_power`/`m2_server`
/// actually read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreConfig {
    #[serde(default = "default_io_sample_hz")]
    pub io_sample_hz: f64,
    #[serde(default = "default_sys_info_timeout_secs")]
    pub sys_info_timeout_secs: f64,
    #[serde(default = "default_stale_warn_secs")]
    pub stale_warn_secs: f64,
    #[serde(default = "default_stale_fault_secs")]
    pub stale_fault_secs: f64,
    #[serde(default = "default_telemetry_hz")]
    pub telemetry_hz: f64,
    #[serde(default = "PowerSubsystemConfig::motor")]
    pub motor: PowerSubsystemConfig,
    #[serde(default = "PowerSubsystemConfig::comm")]
    pub comm: PowerSubsystemConfig,
}

fn default_io_sample_hz() -> f64 {
    20.0
}
fn default_sys_info_timeout_secs() -> f64 {
    1.5
}
fn default_stale_warn_secs() -> f64 {
    1.0
}
fn default_stale_fault_secs() -> f64 {
    2.0
}
fn default_telemetry_hz() -> f64 {
    20.0
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            io_sample_hz: default_io_sample_hz(),
            sys_info_timeout_secs: default_sys_info_timeout_secs(),
            stale_warn_secs: default_stale_warn_secs(),
            stale_fault_secs: default_stale_fault_secs(),
            telemetry_hz: default_telemetry_hz(),
            motor: PowerSubsystemConfig::motor(),
            comm: PowerSubsystemConfig::comm(),
        }
    }
}

impl ConfigLoader for CoreConfig {}

impl CoreConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.io_sample_hz <= 0.0 {
            return Err(ConfigError::ValidationError(
                "io_sample_hz must be positive".into(),
            ));
        }
        if self.telemetry_hz <= 0.0 {
            return Err(ConfigError::ValidationError(
                "telemetry_hz must be positive".into(),
            ));
        }
        if self.stale_warn_secs >= self.stale_fault_secs {
            return Err(ConfigError::ValidationError(
                "stale_warn_secs must be less than stale_fault_secs".into(),
            ));
        }
        self.motor.validate()?;
        self.comm.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn motor_output_on_max_delay_is_600ms() {
        let cfg = PowerSubsystemConfig::motor();
        assert!((cfg.output_on_max_delay_secs() - 0.600).abs() < 1e-9);
    }

    #[test]
    fn motor_output_off_max_delay_is_80ms() {
        let cfg = PowerSubsystemConfig::motor();
        assert!((cfg.output_off_max_delay_secs() - 0.080).abs() < 1e-9);
    }

    #[test]
    fn comm_output_on_max_delay_is_550ms() {
        let cfg = PowerSubsystemConfig::comm();
        assert!((cfg.output_on_max_delay_secs() - 0.550).abs() < 1e-9);
    }

    #[test]
    fn comm_output_off_max_delay_is_30ms() {
        let cfg = PowerSubsystemConfig::comm();
        assert!((cfg.output_off_max_delay_secs() - 0.030).abs() < 1e-9);
    }

    #[test]
    fn voltage_windows_match_percentages() {
        let cfg = PowerSubsystemConfig::motor();
        assert!((cfg.min_voltage_warn - 22.8).abs() < 1e-9);
        assert!((cfg.max_voltage_warn - 25.2).abs() < 1e-9);
        assert!((cfg.min_voltage_fault - 21.6).abs() < 1e-9);
        assert!((cfg.max_voltage_fault - 26.4).abs() < 1e-9);
    }

    #[test]
    fn default_core_config_validates() {
        CoreConfig::default().validate().unwrap();
    }

    #[test]
    fn stale_thresholds_must_be_ordered() {
        let mut cfg = CoreConfig::default();
        cfg.stale_warn_secs = 3.0;
        cfg.stale_fault_secs = 2.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn load_from_toml_string() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("core.toml");
        std::fs::write(
            &path,
            "io_sample_hz = 20.0\nsys_info_timeout_secs = 1.5\nstale_warn_secs = 1.0\nstale_fault_secs = 2.0\ntelemetry_hz = 20.0\n\n[motor]\nrelay_close_delay_secs = 0.05\nbreaker_on_time_secs = 0.5\ninterlock_output_on_delay_secs = 0.05\nrelay_open_delay_secs = 0.03\ninterlock_output_off_delay_secs = 0.05\nreset_breaker_pulse_width_secs = 0.4\nbreaker_operating_voltage = 19.0\nnominal_voltage = 24.0\nmin_voltage_warn = 22.8\nmax_voltage_warn = 25.2\nmin_voltage_fault = 21.6\nmax_voltage_fault = 26.4\nbreaker_operating_voltage_rise_time_secs = 0.085\nvoltage_settling_time_secs = 0.02\nvoltage_fall_time_secs = 0.3\nvoltage_off_level = 12.0\nmax_current = 20.0\n\n[comm]\nrelay_close_delay_secs = 0.05\nbreaker_on_time_secs = 0.5\ninterlock_output_on_delay_secs = 0.0\nrelay_open_delay_secs = 0.03\ninterlock_output_off_delay_secs = 0.0\nreset_breaker_pulse_width_secs = 0.4\nbreaker_operating_voltage = 19.0\nnominal_voltage = 24.0\nmin_voltage_warn = 22.8\nmax_voltage_warn = 25.2\nmin_voltage_fault = 21.6\nmax_voltage_fault = 26.4\nbreaker_operating_voltage_rise_time_secs = 0.03\nvoltage_settling_time_secs = 0.02\nvoltage_fall_time_secs = 0.05\nvoltage_off_level = 12.0\nmax_current = 10.0\n",
        )
        .unwrap();
        let cfg = CoreConfig::load(&path).unwrap();
        cfg.validate().unwrap();
    }
}
