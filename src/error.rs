//! Error taxonomy for the interactive-MLP engine.
//!
//! A well-formed caller (matched widths, modes used per protocol) never
//! observes one of these; they exist for genuine misuse and for the one
//! recoverable-corruption signal (`NumericCorruption`), which is reported
//! rather than treated as fatal.

use thiserror::Error;

/// Errors surfaced by the engine's public API.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// An unknown activation/loss identifier, zero layers, or a mismatched
    /// activation count at construction time.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A feature/label/input vector's width disagrees with what the
    /// receiving component expects.
    #[error("shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// `Dataset::add` was called at capacity with replay disabled.
    #[error("dataset at capacity and replay is disabled")]
    CapacityExceeded,

    /// Training was requested against an empty dataset.
    #[error("no training examples available")]
    EmptyInput,

    /// `sanitise`/`sanitise_all` found and repaired non-finite state.
    #[error("non-finite weights detected and reset to zero")]
    NumericCorruption,
}

pub type EngineResult<T> = Result<T, EngineError>;
