//! Subsystem-fault and invariant-violation error types. Configuration
//! and protocol errors live in `m2_common::error`.

use thiserror::Error;

/// A power subsystem condition that should short-circuit the current
/// `process_daq` call. The durable record of the fault lives in the fault
/// bitmap; this is the local signal a caller can match on.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum PowerError {
    #[error("voltage out of fault window")]
    VoltageFault,
    #[error("current exceeds max_current")]
    ExcessiveCurrent,
    #[error("breaker feed group reports fault")]
    BreakerFault,
    #[error("interlock chain open while power commanded on")]
    InterlockFault,
    #[error("relay did not reach expected state within timeout")]
    RelayFault,
}

/// A broken invariant — a state the control core should never reach.
/// Fatal: `m2_server::main` logs at `tracing::error!` and aborts.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum InvariantError {
    #[error("MOTOR bus was {motor_state:?} for more than one tick while COMM actual was not On")]
    CommBeforeMotorViolated { motor_state: &'static str },

    #[error("POWER_SYSTEM_TIMEOUT raised without both buses being commanded off")]
    TimeoutWithoutBothBusesOff,
}
