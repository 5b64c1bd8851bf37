// src/error.rs

use thiserror::Error;

/// Setup-time configuration errors. These are fatal and reported before
/// any stepping begins; numeric edge cases inside a step are handled by
/// the algorithms' defined fallbacks instead.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("unknown step kind `{0}`; valid choices are `euler` and `rk4`")]
    UnknownStepKind(String),

    #[error("step size must be non-zero")]
    ZeroStepSize,

    #[error("integrator mass must be positive, got {0}")]
    NonPositiveMass(f64),

    #[error("at least two anchor images are required, got {0}")]
    TooFewAnchors(usize),

    #[error("{anchors} anchor images require {} interpolation counts, got {counts}", .anchors - 1)]
    InterpolationCountMismatch { anchors: usize, counts: usize },
}
