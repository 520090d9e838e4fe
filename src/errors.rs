// src/errors.rs

//! Crate-wide error types.
//!
//! Runtime operations on the state use `anyhow::Result` directly; the
//! persistence layer has its own structured error so callers can tell a
//! truncated stream from an I/O failure.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StateError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed build state data: {0}")]
    Malformed(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;

/// Result alias for the persistence layer.
pub type StateResult<T> = std::result::Result<T, StateError>;
