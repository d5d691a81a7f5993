//! 64-bit fault/warning/info bitmap with named bits and lazily-cached
//! composed masks.
//!
//! Mirrors `FaultStatusBits` in the source this was ported from: a fixed
//! enum of named bit positions, mask-builder functions composed from that
//! enum, and a pure update function. The source caches its masks behind a
//! mutex-guarded shared pointer with double-checked locking; `OnceLock` is
//! the idiomatic Rust equivalent of "compute once, share the result".

use std::sync::OnceLock;

use thiserror::Error;

/// A bit position was outside `0..64`.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
#[error("fault bit position {0} out of range (max 63)")]
pub struct RangeError(pub u8);

/// Named fault/warning/info bit positions.
///
/// Positions 34-63 are reserved (unnamed, always readable/writable via the
/// raw `u64`, never produced by this crate).
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultBit {
    StaleDataWarn = 0,
    StaleDataFault = 1,
    MotorVoltageFault = 2,
    MotorVoltageWarn = 3,
    CommVoltageFault = 4,
    CommVoltageWarn = 5,
    MotorOverCurrent = 6,
    CommOverCurrent = 7,
    PowerRelayOpenFault = 8,
    PowerHealthFault = 9,
    MotorMultiBreakerFault = 10,
    CommMultiBreakerFault = 11,
    SingleBreakerTrip = 12,
    PowerSupplyLoadShareErr = 13,
    MotorRelay = 14,
    CommRelay = 15,
    HardwareFault = 16,
    InterlockFault = 17,
    PowerSystemTimeout = 18,
    CrioCommFault = 19,
    UserGeneratedFault = 20,
    ActuatorLimitCl = 21,
    InclinometerWLut = 22,
    CrioTimingFault = 23,
    InclinometerRangeErr = 24,
    MirrorTempSensorFault = 25,
    ElevationAngleDiffFault = 26,
    ActuatorFault = 27,
    ExcessiveForce = 28,
    AxialActuatorEncoderRange = 29,
    TangentActuatorEncoderRange = 30,
    IlcStateTransitionFault = 31,
    TangentLoadCellFault = 32,
    LossOfTmaCommOnEnableFault = 33,
    ParameterFileReadFault = 34,
}

impl FaultBit {
    pub const fn name(self) -> &'static str {
        use FaultBit::*;
        match self {
            StaleDataWarn => "STALE_DATA_WARN",
            StaleDataFault => "STALE_DATA_FAULT",
            MotorVoltageFault => "MOTOR_VOLTAGE_FAULT",
            MotorVoltageWarn => "MOTOR_VOLTAGE_WARN",
            CommVoltageFault => "COMM_VOLTAGE_FAULT",
            CommVoltageWarn => "COMM_VOLTAGE_WARN",
            MotorOverCurrent => "MOTOR_OVER_CURRENT",
            CommOverCurrent => "COMM_OVER_CURRENT",
            PowerRelayOpenFault => "POWER_RELAY_OPEN_FAULT",
            PowerHealthFault => "POWER_HEALTH_FAULT",
            MotorMultiBreakerFault => "MOTOR_MULTI_BREAKER_FAULT",
            CommMultiBreakerFault => "COMM_MULTI_BREAKER_FAULT",
            SingleBreakerTrip => "SINGLE_BREAKER_TRIP",
            PowerSupplyLoadShareErr => "POWER_SUPPLY_LOAD_SHARE_ERR",
            MotorRelay => "MOTOR_RELAY",
            CommRelay => "COMM_RELAY",
            HardwareFault => "HARDWARE_FAULT",
            InterlockFault => "INTERLOCK_FAULT",
            PowerSystemTimeout => "POWER_SYSTEM_TIMEOUT",
            CrioCommFault => "CRIO_COMM_FAULT",
            UserGeneratedFault => "USER_GENERATED_FAULT",
            ActuatorLimitCl => "ACTUATOR_LIMIT_CL",
            InclinometerWLut => "INCLINOMETER_W_LUT",
            CrioTimingFault => "CRIO_TIMING_FAULT",
            InclinometerRangeErr => "INCLINOMETER_RANGE_ERR",
            MirrorTempSensorFault => "MIRROR_TEMP_SENSOR_FAULT",
            ElevationAngleDiffFault => "ELEVATION_ANGLE_DIFF_FAULT",
            ActuatorFault => "ACTUATOR_FAULT",
            ExcessiveForce => "EXCESSIVE_FORCE",
            AxialActuatorEncoderRange => "AXIAL_ACTUATOR_ENCODER_RANGE",
            TangentActuatorEncoderRange => "TANGENT_ACTUATOR_ENCODER_RANGE",
            IlcStateTransitionFault => "ILC_STATE_TRANSITION_FAULT",
            TangentLoadCellFault => "TANGENT_LOAD_CELL_FAULT",
            LossOfTmaCommOnEnableFault => "LOSS_OF_TMA_COMM_ON_ENABLE_FAULT",
            ParameterFileReadFault => "PARAMETER_FILE_READ_FAULT",
        }
    }

    pub const fn mask(self) -> u64 {
        1u64 << (self as u8)
    }
}

const ALL_BITS: [FaultBit; 35] = [
    FaultBit::StaleDataWarn,
    FaultBit::StaleDataFault,
    FaultBit::MotorVoltageFault,
    FaultBit::MotorVoltageWarn,
    FaultBit::CommVoltageFault,
    FaultBit::CommVoltageWarn,
    FaultBit::MotorOverCurrent,
    FaultBit::CommOverCurrent,
    FaultBit::PowerRelayOpenFault,
    FaultBit::PowerHealthFault,
    FaultBit::MotorMultiBreakerFault,
    FaultBit::CommMultiBreakerFault,
    FaultBit::SingleBreakerTrip,
    FaultBit::PowerSupplyLoadShareErr,
    FaultBit::MotorRelay,
    FaultBit::CommRelay,
    FaultBit::HardwareFault,
    FaultBit::InterlockFault,
    FaultBit::PowerSystemTimeout,
    FaultBit::CrioCommFault,
    FaultBit::UserGeneratedFault,
    FaultBit::ActuatorLimitCl,
    FaultBit::InclinometerWLut,
    FaultBit::CrioTimingFault,
    FaultBit::InclinometerRangeErr,
    FaultBit::MirrorTempSensorFault,
    FaultBit::ElevationAngleDiffFault,
    FaultBit::ActuatorFault,
    FaultBit::ExcessiveForce,
    FaultBit::AxialActuatorEncoderRange,
    FaultBit::TangentActuatorEncoderRange,
    FaultBit::IlcStateTransitionFault,
    FaultBit::TangentLoadCellFault,
    FaultBit::LossOfTmaCommOnEnableFault,
    FaultBit::ParameterFileReadFault,
];

fn mask_of(bits: &[FaultBit]) -> u64 {
    bits.iter().fold(0u64, |acc, b| acc | b.mask())
}

/// Which bus a per-subsystem mask applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bus {
    Motor,
    Comm,
}

/// Lazily-computed, cached mask set. Every getter here is a pure function
/// of the fixed enum above; caching just avoids rebuilding the same `u64`
/// on every call.
struct Masks {
    closed_loop_allowed: u64,
    open_loop_allowed: u64,
    telemetry_only_allowed: u64,
    faults: u64,
    warnings: u64,
    info: u64,
}

fn masks() -> &'static Masks {
    static MASKS: OnceLock<Masks> = OnceLock::new();
    MASKS.get_or_init(|| {
        let closed_loop_allowed = 0u64;
        let open_loop_allowed = closed_loop_allowed
            | mask_of(&[
                FaultBit::ActuatorLimitCl,
                FaultBit::InclinometerWLut,
                FaultBit::CrioTimingFault,
                FaultBit::InclinometerRangeErr,
                FaultBit::MirrorTempSensorFault,
                FaultBit::ElevationAngleDiffFault,
            ]);
        let telemetry_only_allowed = open_loop_allowed
            | mask_of(&[
                FaultBit::ActuatorFault,
                FaultBit::ExcessiveForce,
                FaultBit::MotorVoltageFault,
                FaultBit::MotorOverCurrent,
                FaultBit::MotorMultiBreakerFault,
                FaultBit::AxialActuatorEncoderRange,
                FaultBit::TangentActuatorEncoderRange,
                FaultBit::IlcStateTransitionFault,
            ]);
        let faults = telemetry_only_allowed
            | mask_of(&[
                FaultBit::CommVoltageFault,
                FaultBit::CommOverCurrent,
                FaultBit::PowerRelayOpenFault,
                FaultBit::PowerHealthFault,
                FaultBit::CommMultiBreakerFault,
                FaultBit::PowerSupplyLoadShareErr,
                FaultBit::InterlockFault,
                FaultBit::TangentLoadCellFault,
                FaultBit::LossOfTmaCommOnEnableFault,
                FaultBit::CrioCommFault,
                FaultBit::UserGeneratedFault,
                FaultBit::ParameterFileReadFault,
                FaultBit::PowerSystemTimeout,
            ]);
        let warnings = mask_of(&[
            FaultBit::StaleDataWarn,
            FaultBit::MotorVoltageWarn,
            FaultBit::CommVoltageWarn,
            FaultBit::SingleBreakerTrip,
        ]);
        let info = mask_of(&[
            FaultBit::StaleDataFault,
            FaultBit::HardwareFault,
            FaultBit::MotorRelay,
            FaultBit::CommRelay,
        ]);
        Masks {
            closed_loop_allowed,
            open_loop_allowed,
            telemetry_only_allowed,
            faults,
            warnings,
            info,
        }
    })
}

pub fn mask_closed_loop_control() -> u64 {
    masks().closed_loop_allowed
}
pub fn mask_open_loop_control() -> u64 {
    masks().open_loop_allowed
}
pub fn mask_telemetry_only_control() -> u64 {
    masks().telemetry_only_allowed
}
pub fn mask_faults() -> u64 {
    masks().faults
}
pub fn mask_warn() -> u64 {
    masks().warnings
}
pub fn mask_info() -> u64 {
    masks().info
}

/// Bits a given power subsystem bus may raise as faults/warnings.
pub fn mask_power_subsystem_faults(bus: Bus) -> u64 {
    match bus {
        Bus::Motor => mask_of(&[
            FaultBit::MotorVoltageFault,
            FaultBit::MotorOverCurrent,
            FaultBit::MotorMultiBreakerFault,
            FaultBit::MotorRelay,
            FaultBit::HardwareFault,
            FaultBit::InterlockFault,
            FaultBit::PowerSystemTimeout,
        ]),
        Bus::Comm => mask_of(&[
            FaultBit::CommVoltageFault,
            FaultBit::CommOverCurrent,
            FaultBit::CommMultiBreakerFault,
            FaultBit::CommRelay,
            FaultBit::PowerRelayOpenFault,
            FaultBit::PowerHealthFault,
            FaultBit::PowerSupplyLoadShareErr,
            FaultBit::CrioCommFault,
            FaultBit::PowerSystemTimeout,
        ]),
    }
}

pub fn mask_power_subsystem_warn(bus: Bus) -> u64 {
    match bus {
        Bus::Motor => mask_of(&[FaultBit::MotorVoltageWarn, FaultBit::SingleBreakerTrip]),
        Bus::Comm => mask_of(&[FaultBit::CommVoltageWarn, FaultBit::SingleBreakerTrip]),
    }
}

pub fn telemetry_affected_fault_mask() -> u64 {
    mask_faults()
}

pub fn telemetry_affected_warn_mask() -> u64 {
    mask_warn() | mask_info()
}

/// A 64-bit fault/warning/info bitmap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FaultBitmap {
    bits: u64,
}

impl FaultBitmap {
    pub const fn new() -> Self {
        Self { bits: 0 }
    }

    pub const fn from_bits(bits: u64) -> Self {
        Self { bits }
    }

    pub const fn bits(self) -> u64 {
        self.bits
    }

    pub fn get(&self, bit: FaultBit) -> bool {
        self.bits & bit.mask() != 0
    }

    pub fn set_bit(&mut self, bit: FaultBit, value: bool) {
        if value {
            self.bits |= bit.mask();
        } else {
            self.bits &= !bit.mask();
        }
    }

    pub fn set_pos(&mut self, pos: u8, value: bool) -> Result<(), RangeError> {
        if pos > 63 {
            return Err(RangeError(pos));
        }
        if value {
            self.bits |= 1u64 << pos;
        } else {
            self.bits &= !(1u64 << pos);
        }
        Ok(())
    }

    pub fn get_bits_set_in_mask(&self, mask: u64) -> u64 {
        self.bits & mask
    }

    pub fn get_bits_set_out_of_mask(&self, mask: u64) -> u64 {
        self.bits & !mask
    }

    pub fn set_bit_enums(&self) -> Vec<FaultBit> {
        ALL_BITS.iter().copied().filter(|b| self.get(*b)).collect()
    }

    pub fn binary_str(&self) -> String {
        format!("{:064b}", self.bits)
    }
}

impl std::ops::BitOr for FaultBitmap {
    type Output = FaultBitmap;
    fn bitor(self, rhs: Self) -> Self::Output {
        FaultBitmap::from_bits(self.bits | rhs.bits)
    }
}

impl std::ops::BitAnd for FaultBitmap {
    type Output = FaultBitmap;
    fn bitand(self, rhs: Self) -> Self::Output {
        FaultBitmap::from_bits(self.bits & rhs.bits)
    }
}

/// Pure fault-summary recomputation.
///
/// `summary`/`new_status` are raw fault bitmaps (not yet masked), `enable`
/// gates which bits are allowed to change the reported `changed_bits`
/// output, and `affected_warn_info`/`affected_fault` are the masks of bits
/// this call is permitted to touch at all.
pub fn update_fault_status(
    summary: u64,
    enable_mask: u64,
    new_status: u64,
    affected_warn_info: u64,
    affected_fault: u64,
) -> (u64, u64) {
    let affected_all = affected_fault | affected_warn_info;
    let cf_prime = summary & !affected_warn_info;
    let new_masked = new_status & affected_all;
    let updated_summary = summary ^ (new_masked | cf_prime);
    let changed_bits = enable_mask & affected_all & updated_summary;
    (updated_summary, changed_bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_all_positions() {
        let mut b = FaultBitmap::new();
        for pos in 0..64u8 {
            b.set_pos(pos, true).unwrap();
            assert_ne!(b.bits() & (1u64 << pos), 0);
            b.set_pos(pos, false).unwrap();
            assert_eq!(b.bits() & (1u64 << pos), 0);
        }
    }

    #[test]
    fn out_of_range_position_fails() {
        let mut b = FaultBitmap::new();
        assert_eq!(b.set_pos(64, true), Err(RangeError(64)));
    }

    #[test]
    fn closed_loop_allowed_is_empty() {
        assert_eq!(mask_closed_loop_control(), 0);
    }

    #[test]
    fn open_loop_is_superset_of_closed_loop() {
        assert_eq!(
            mask_open_loop_control() & mask_closed_loop_control(),
            mask_closed_loop_control()
        );
    }

    #[test]
    fn telemetry_only_is_superset_of_open_loop() {
        assert_eq!(
            mask_telemetry_only_control() & mask_open_loop_control(),
            mask_open_loop_control()
        );
    }

    #[test]
    fn faults_mask_is_superset_of_telemetry_only() {
        assert_eq!(
            mask_faults() & mask_telemetry_only_control(),
            mask_telemetry_only_control()
        );
    }

    #[test]
    fn update_fault_status_matches_worked_example() {
        // worked example: warn bit already set, a new fault bit arrives.
        let (updated, changed) = update_fault_status(0x10, 0xFFFF_FFFF, 0x20, 0x10, 0x20);
        assert_eq!(updated, 0x30);
        assert_eq!(changed, 0x30);
    }

    #[test]
    fn update_fault_status_is_pure() {
        let a = update_fault_status(0x10, 0xFFFF_FFFF, 0x20, 0x10, 0x20);
        let b = update_fault_status(0x10, 0xFFFF_FFFF, 0x20, 0x10, 0x20);
        assert_eq!(a, b);
    }

    #[test]
    fn set_bit_enums_reports_named_bits() {
        let mut b = FaultBitmap::new();
        b.set_bit(FaultBit::MotorVoltageFault, true);
        b.set_bit(FaultBit::CommOverCurrent, true);
        let set = b.set_bit_enums();
        assert!(set.contains(&FaultBit::MotorVoltageFault));
        assert!(set.contains(&FaultBit::CommOverCurrent));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn motor_and_comm_subsystem_masks_disjoint_on_bus_specific_bits() {
        let motor = mask_power_subsystem_faults(Bus::Motor);
        let comm = mask_power_subsystem_faults(Bus::Comm);
        assert_ne!(motor & FaultBit::MotorVoltageFault.mask(), 0);
        assert_eq!(comm & FaultBit::MotorVoltageFault.mask(), 0);
        assert_ne!(comm & FaultBit::CommVoltageFault.mask(), 0);
        assert_eq!(motor & FaultBit::CommVoltageFault.mask(), 0);
    }
}
