//! Process-level error surface. Wraps the per-crate taxa from
//! `m2_common::error`/`m2_power::error` so `main` has one type to match on
//! for its exit-code convention.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] m2_common::error::ConfigError),

    #[error(transparent)]
    Invariant(#[from] m2_power::error::InvariantError),
}
