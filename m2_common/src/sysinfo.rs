//! The atomic telemetry snapshot shared between the I/O layer and the
//! power/fault/motion consumers.

use crate::bitmap::{InputPortBits, OutputPortBits};

/// One coherent read of all input bits and analog channels with a
/// timestamp. Produced atomically by the I/O layer.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SysInfo {
    /// Seconds since the Unix epoch, as sampled by the I/O layer.
    pub timestamp: f64,
    pub output_port: OutputPortBits,
    pub input_port: InputPortBits,
    pub motor_voltage: f64,
    pub motor_current: f64,
    pub motor_breaker_closed: bool,
    pub comm_voltage: f64,
    pub comm_current: f64,
    pub comm_breaker_closed: bool,
    pub iterations: u64,
}

impl SysInfo {
    pub fn age_secs(&self, now: f64) -> f64 {
        (now - self.timestamp).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SysInfo {
        SysInfo {
            timestamp: 10.0,
            output_port: OutputPortBits::new(),
            input_port: InputPortBits::new(),
            motor_voltage: 24.0,
            motor_current: 1.0,
            motor_breaker_closed: true,
            comm_voltage: 24.0,
            comm_current: 0.5,
            comm_breaker_closed: true,
            iterations: 42,
        }
    }

    #[test]
    fn age_secs_is_nonnegative() {
        let info = sample();
        assert_eq!(info.age_secs(10.0), 0.0);
        assert_eq!(info.age_secs(12.0), 2.0);
        assert_eq!(info.age_secs(5.0), 0.0);
    }

    #[test]
    fn json_roundtrip() {
        let info = sample();
        let s = serde_json::to_string(&info).unwrap();
        let back: SysInfo = serde_json::from_str(&s).unwrap();
        assert_eq!(info, back);
    }
}
