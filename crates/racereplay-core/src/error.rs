//! Replay errors

use thiserror::Error;

use crate::api::FetchError;

/// Errors surfaced to callers of the replay session
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReplayError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("No data: {0}")]
    NotFound(String),

    #[error("Position {position} out of range (timeline has {len} entries)")]
    OutOfRange { position: usize, len: usize },

    #[error("No car selected")]
    NoSession,

    #[error("Invalid configuration: {0}")]
    Config(String),
}
