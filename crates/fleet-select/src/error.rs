//! Selection error types.

use thiserror::Error;

/// Errors that can occur while building or querying a selection strategy.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SelectError {
    #[error("invalid selection policy: {0}")]
    InvalidPolicy(String),

    #[error("no candidates to select from")]
    EmptyCandidates,
}

pub type SelectResult<T> = Result<T, SelectError>;
