//! Typed wrappers over the 8-bit output port and 32-bit input port.
//!
//! Both bitmaps follow the same shape: a plain integer, named bit
//! positions, and range-checked mutation. Reads of an out-of-range
//! position never fail — they return a default appropriate to the bitmap
//! (see `InputPortBits::get` for the `ALWAYS_HIGH`/`ALWAYS_LOW` special
//! cases); only writes can fail.

use thiserror::Error;

/// A bit position was outside the valid range for this bitmap.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
#[error("bit position {pos} out of range (max {max})")]
pub struct RangeError {
    pub pos: u8,
    pub max: u8,
}

/// Named bit positions of [`OutputPortBits`].
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputPortPos {
    MotorPowerOn = 0,
    IlcCommPowerOn = 1,
    CrioInterlockEnable = 2,
    ResetMotorBreakers = 3,
    ResetCommBreakers = 4,
    SpareD05 = 5,
    SpareD06 = 6,
    SpareD07 = 7,
}

impl OutputPortPos {
    pub const fn name(self) -> &'static str {
        match self {
            OutputPortPos::MotorPowerOn => "MOTOR_POWER_ON",
            OutputPortPos::IlcCommPowerOn => "ILC_COMM_POWER_ON",
            OutputPortPos::CrioInterlockEnable => "CRIO_INTERLOCK_ENABLE",
            OutputPortPos::ResetMotorBreakers => "RESET_MOTOR_BREAKERS",
            OutputPortPos::ResetCommBreakers => "RESET_COMM_BREAKERS",
            OutputPortPos::SpareD05 => "SPARE_D05",
            OutputPortPos::SpareD06 => "SPARE_D06",
            OutputPortPos::SpareD07 => "SPARE_D07",
        }
    }
}

/// 8-bit output port bitmap. Write-through target for `PowerSubsystem` and
/// the command dispatcher; the simulator/FPGA reads it once per tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct OutputPortBits {
    bits: u8,
}

impl OutputPortBits {
    pub const MAX_POS: u8 = 7;

    pub const fn new() -> Self {
        Self { bits: 0 }
    }

    pub const fn from_bits(bits: u8) -> Self {
        Self { bits }
    }

    pub const fn bits(self) -> u8 {
        self.bits
    }

    /// Out-of-range positions return `false`.
    pub fn get(&self, pos: u8) -> bool {
        if pos > Self::MAX_POS {
            return false;
        }
        (self.bits >> pos) & 1 == 1
    }

    pub fn get_pos(&self, pos: OutputPortPos) -> bool {
        self.get(pos as u8)
    }

    pub fn set(&mut self, pos: u8, value: bool) -> Result<(), RangeError> {
        if pos > Self::MAX_POS {
            return Err(RangeError {
                pos,
                max: Self::MAX_POS,
            });
        }
        if value {
            self.bits |= 1 << pos;
        } else {
            self.bits &= !(1 << pos);
        }
        Ok(())
    }

    pub fn set_pos(&mut self, pos: OutputPortPos, value: bool) {
        self.set(pos as u8, value)
            .expect("OutputPortPos is always in range");
    }

    pub fn get_bits_set_in_mask(&self, mask: u8) -> u8 {
        self.bits & mask
    }

    pub fn all_set_bit_names(&self) -> Vec<&'static str> {
        ALL_OUTPUT_POS
            .iter()
            .filter(|p| self.get_pos(**p))
            .map(|p| p.name())
            .collect()
    }
}

const ALL_OUTPUT_POS: [OutputPortPos; 8] = [
    OutputPortPos::MotorPowerOn,
    OutputPortPos::IlcCommPowerOn,
    OutputPortPos::CrioInterlockEnable,
    OutputPortPos::ResetMotorBreakers,
    OutputPortPos::ResetCommBreakers,
    OutputPortPos::SpareD05,
    OutputPortPos::SpareD06,
    OutputPortPos::SpareD07,
];

/// Named bit positions of [`InputPortBits`].
///
/// The motor bus has three breaker feed groups (`MTR_FEED_{1,2,3}`), three
/// bits each (nine bits total). The comm bus has three feed groups, two
/// physical bits each; `check_breaker_status` synthesizes the third bit of
/// each comm feed as always-1 (see `m2_power::power::breaker`).
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputPortPos {
    RedundancyOk = 0,
    LoadDistributionOk = 1,
    PowerSupply1DcOk = 2,
    PowerSupply2DcOk = 3,
    /// Active-low: asserted (bit set) means current is *not* ok.
    PowerSupply1CurrentOk = 4,
    PowerSupply2CurrentOk = 5,
    J1W9_1MtrPwrBrkrOk = 6,
    J1W9_2MtrPwrBrkrOk = 7,
    J1W9_3MtrPwrBrkrOk = 8,
    J2W10_1MtrPwrBrkrOk = 9,
    J2W10_2MtrPwrBrkrOk = 10,
    J2W10_3MtrPwrBrkrOk = 11,
    J3W11_1MtrPwrBrkrOk = 12,
    J3W11_2MtrPwrBrkrOk = 13,
    J3W11_3MtrPwrBrkrOk = 14,
    J1W12_1CommPwrBrkrOk = 15,
    J1W12_2CommPwrBrkrOk = 16,
    J2W13_1CommPwrBrkrOk = 17,
    J2W13_2CommPwrBrkrOk = 18,
    J3W14_1CommPwrBrkrOk = 19,
    J3W14_2CommPwrBrkrOk = 20,
    InterlockPowerRelay = 21,
}

impl InputPortPos {
    pub const fn name(self) -> &'static str {
        use InputPortPos::*;
        match self {
            RedundancyOk => "REDUNDANCY_OK",
            LoadDistributionOk => "LOAD_DISTRIBUTION_OK",
            PowerSupply1DcOk => "POWER_SUPPLY_1_DC_OK",
            PowerSupply2DcOk => "POWER_SUPPLY_2_DC_OK",
            PowerSupply1CurrentOk => "POWER_SUPPLY_1_CURRENT_OK",
            PowerSupply2CurrentOk => "POWER_SUPPLY_2_CURRENT_OK",
            J1W9_1MtrPwrBrkrOk => "J1_W9_1_MTR_PWR_BRKR_OK",
            J1W9_2MtrPwrBrkrOk => "J1_W9_2_MTR_PWR_BRKR_OK",
            J1W9_3MtrPwrBrkrOk => "J1_W9_3_MTR_PWR_BRKR_OK",
            J2W10_1MtrPwrBrkrOk => "J2_W10_1_MTR_PWR_BRKR_OK",
            J2W10_2MtrPwrBrkrOk => "J2_W10_2_MTR_PWR_BRKR_OK",
            J2W10_3MtrPwrBrkrOk => "J2_W10_3_MTR_PWR_BRKR_OK",
            J3W11_1MtrPwrBrkrOk => "J3_W11_1_MTR_PWR_BRKR_OK",
            J3W11_2MtrPwrBrkrOk => "J3_W11_2_MTR_PWR_BRKR_OK",
            J3W11_3MtrPwrBrkrOk => "J3_W11_3_MTR_PWR_BRKR_OK",
            J1W12_1CommPwrBrkrOk => "J1_W12_1_COMM_PWR_BRKR_OK",
            J1W12_2CommPwrBrkrOk => "J1_W12_2_COMM_PWR_BRKR_OK",
            J2W13_1CommPwrBrkrOk => "J2_W13_1_COMM_PWR_BRKR_OK",
            J2W13_2CommPwrBrkrOk => "J2_W13_2_COMM_PWR_BRKR_OK",
            J3W14_1CommPwrBrkrOk => "J3_W14_1_COMM_PWR_BRKR_OK",
            J3W14_2CommPwrBrkrOk => "J3_W14_2_COMM_PWR_BRKR_OK",
            InterlockPowerRelay => "INTERLOCK_POWER_RELAY",
        }
    }
}

/// The three motor breaker feed groups, each three bits wide, MSB first.
pub const MOTOR_BREAKER_FEEDS: [[InputPortPos; 3]; 3] = [
    [
        InputPortPos::J1W9_1MtrPwrBrkrOk,
        InputPortPos::J1W9_2MtrPwrBrkrOk,
        InputPortPos::J1W9_3MtrPwrBrkrOk,
    ],
    [
        InputPortPos::J2W10_1MtrPwrBrkrOk,
        InputPortPos::J2W10_2MtrPwrBrkrOk,
        InputPortPos::J2W10_3MtrPwrBrkrOk,
    ],
    [
        InputPortPos::J3W11_1MtrPwrBrkrOk,
        InputPortPos::J3W11_2MtrPwrBrkrOk,
        InputPortPos::J3W11_3MtrPwrBrkrOk,
    ],
];

/// The three comm breaker feed groups, two physical bits each. The third,
/// always-1, bit is synthesized by the reader, not stored here.
pub const COMM_BREAKER_FEEDS: [[InputPortPos; 2]; 3] = [
    [
        InputPortPos::J1W12_1CommPwrBrkrOk,
        InputPortPos::J1W12_2CommPwrBrkrOk,
    ],
    [
        InputPortPos::J2W13_1CommPwrBrkrOk,
        InputPortPos::J2W13_2CommPwrBrkrOk,
    ],
    [
        InputPortPos::J3W14_1CommPwrBrkrOk,
        InputPortPos::J3W14_2CommPwrBrkrOk,
    ],
];

/// Pseudo-position: always reads as logic-high regardless of backing bits.
pub const ALWAYS_HIGH_POS: u8 = 32;
/// Pseudo-position: always reads as logic-low regardless of backing bits.
pub const ALWAYS_LOW_POS: u8 = 33;

/// 32-bit input port bitmap. Read-only to the control core; produced by the
/// I/O layer (simulator or FPGA reader) once per tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct InputPortBits {
    bits: u32,
}

impl InputPortBits {
    pub const MAX_POS: u8 = 31;

    pub const fn new() -> Self {
        Self { bits: 0 }
    }

    pub const fn from_bits(bits: u32) -> Self {
        Self { bits }
    }

    pub const fn bits(self) -> u32 {
        self.bits
    }

    /// `ALWAYS_HIGH` returns `true`, `ALWAYS_LOW` returns `false`, any other
    /// out-of-range position returns `false`.
    pub fn get(&self, pos: u8) -> bool {
        if pos == ALWAYS_HIGH_POS {
            return true;
        }
        if pos == ALWAYS_LOW_POS {
            return false;
        }
        if pos > Self::MAX_POS {
            return false;
        }
        (self.bits >> pos) & 1 == 1
    }

    pub fn get_pos(&self, pos: InputPortPos) -> bool {
        self.get(pos as u8)
    }

    pub fn set(&mut self, pos: u8, value: bool) -> Result<(), RangeError> {
        if pos > Self::MAX_POS {
            return Err(RangeError {
                pos,
                max: Self::MAX_POS,
            });
        }
        if value {
            self.bits |= 1 << pos;
        } else {
            self.bits &= !(1 << pos);
        }
        Ok(())
    }

    pub fn set_pos(&mut self, pos: InputPortPos, value: bool) {
        self.set(pos as u8, value)
            .expect("InputPortPos is always in range");
    }

    pub fn get_bits_set_in_mask(&self, mask: u32) -> u32 {
        self.bits & mask
    }

    pub fn all_set_bit_names(&self) -> Vec<&'static str> {
        ALL_INPUT_POS
            .iter()
            .filter(|p| self.get_pos(**p))
            .map(|p| p.name())
            .collect()
    }
}

const ALL_INPUT_POS: [InputPortPos; 22] = [
    InputPortPos::RedundancyOk,
    InputPortPos::LoadDistributionOk,
    InputPortPos::PowerSupply1DcOk,
    InputPortPos::PowerSupply2DcOk,
    InputPortPos::PowerSupply1CurrentOk,
    InputPortPos::PowerSupply2CurrentOk,
    InputPortPos::J1W9_1MtrPwrBrkrOk,
    InputPortPos::J1W9_2MtrPwrBrkrOk,
    InputPortPos::J1W9_3MtrPwrBrkrOk,
    InputPortPos::J2W10_1MtrPwrBrkrOk,
    InputPortPos::J2W10_2MtrPwrBrkrOk,
    InputPortPos::J2W10_3MtrPwrBrkrOk,
    InputPortPos::J3W11_1MtrPwrBrkrOk,
    InputPortPos::J3W11_2MtrPwrBrkrOk,
    InputPortPos::J3W11_3MtrPwrBrkrOk,
    InputPortPos::J1W12_1CommPwrBrkrOk,
    InputPortPos::J1W12_2CommPwrBrkrOk,
    InputPortPos::J2W13_1CommPwrBrkrOk,
    InputPortPos::J2W13_2CommPwrBrkrOk,
    InputPortPos::J3W14_1CommPwrBrkrOk,
    InputPortPos::J3W14_2CommPwrBrkrOk,
    InputPortPos::InterlockPowerRelay,
];
