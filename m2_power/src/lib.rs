//! # M2 Power
//!
//! The power/fault/state control core: per-bus power state machines, the
//! dual-bus `PowerSystem` orchestrator, the process-wide `FaultMgr`, the
//! simulator I/O layer, the high-level `Model`/`StateMap` operational
//! state machine, and the `MotionEngine` staleness watchdog.
//!
//! Every public transition function here is synchronous and side-effect
//! free on anything but its own receiver — the threading model that calls
//! them lives in `m2_server`.

pub mod error;
pub mod fault_mgr;
pub mod motion;
pub mod power;
pub mod simulator;
pub mod state;
