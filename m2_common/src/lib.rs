//! # M2 Common
//!
//! Shared types for the M2 cell power-and-state control core: port bitmaps,
//! the fault bitset, the telemetry snapshot, configuration, the error
//! taxonomy, and the JSON wire envelopes used by command dispatch and
//! telemetry broadcast.
//!
//! This crate has no threads and no I/O of its own; it is the vocabulary
//! that `m2_power` and `m2_server` build on.

pub mod bitmap;
pub mod config;
pub mod error;
pub mod fault;
pub mod power_state;
pub mod sysinfo;
pub mod wire;

pub mod prelude {
    pub use crate::bitmap::{InputPortBits, OutputPortBits, OutputPortPos, RangeError};
    pub use crate::config::{CoreConfig, PowerSubsystemConfig};
    pub use crate::error::ConfigError;
    pub use crate::fault::{FaultBit, FaultBitmap};
    pub use crate::power_state::PowerState;
    pub use crate::sysinfo::SysInfo;
}
