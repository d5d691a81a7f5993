//! Per-bus power state, shared by MOTOR and COMM.

/// State of one power bus. Each `PowerSubsystem` tracks a *target* and an
/// *actual* value of this type independently.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum PowerState {
    Unknown = 1,
    Off = 2,
    TurningOn = 3,
    Reset = 4,
    On = 5,
    TurningOff = 6,
}

impl PowerState {
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(PowerState::Unknown),
            2 => Some(PowerState::Off),
            3 => Some(PowerState::TurningOn),
            4 => Some(PowerState::Reset),
            5 => Some(PowerState::On),
            6 => Some(PowerState::TurningOff),
            _ => None,
        }
    }
}

impl Default for PowerState {
    fn default() -> Self {
        PowerState::Unknown
    }
}

/// Which bus a power command/state report refers to, matching the
/// `cmd_power.powerType` wire encoding.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum PowerType {
    Motor = 1,
    Comm = 2,
}

impl PowerType {
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(PowerType::Motor),
            2 => Some(PowerType::Comm),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_u8_roundtrip() {
        for v in 1u8..=6 {
            assert_eq!(PowerState::from_u8(v).unwrap() as u8, v);
        }
        assert!(PowerState::from_u8(0).is_none());
        assert!(PowerState::from_u8(7).is_none());
    }

    #[test]
    fn power_type_from_u8() {
        assert_eq!(PowerType::from_u8(1), Some(PowerType::Motor));
        assert_eq!(PowerType::from_u8(2), Some(PowerType::Comm));
        assert_eq!(PowerType::from_u8(3), None);
    }
}
