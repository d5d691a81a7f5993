//! Configuration errors and protocol (wire) errors. Subsystem-fault and
//! invariant-violation errors live in `m2_power::error`, since they need
//! the fault bitmap types defined there.

use thiserror::Error;

/// Configuration errors: fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(String),

    #[error("failed to parse config: {0}")]
    ParseError(String),

    #[error("config validation failed: {0}")]
    ValidationError(String),
}

/// Protocol errors: malformed JSON, bad envelope shape, unknown command
/// id. Local to one connection; never fatal.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("malformed JSON: {0}")]
    MalformedJson(String),

    #[error("missing required field {0}")]
    MissingField(&'static str),

    #[error("field {field} has wrong type, expected {expected}")]
    WrongFieldType {
        field: &'static str,
        expected: &'static str,
    },

    #[error("unknown command id {0}")]
    UnknownId(String),

    #[error("sequence_id {got} is not greater than last seen {last_seen}")]
    StaleSequenceId { got: u64, last_seen: u64 },
}
