//! Error types for the fieldviz core.

use thiserror::Error;

/// Errors produced by tracing, contouring, and scene handling.
///
/// Numerical degradations inside a tracing pass (low field, step limits,
/// exhausted retries) are not errors; they are reported through
/// [`TraceLog`](crate::event::TraceLog) instead.
#[derive(Debug, Error)]
pub enum FieldError {
    /// Canvas width or height was zero, negative, or not finite.
    #[error("invalid dimensions: width and height must be positive and finite")]
    InvalidDimensions,

    /// Two charges in the same pass share an id.
    #[error("duplicate charge id: {0}")]
    DuplicateChargeId(u32),

    /// A charge had a NaN or infinite coordinate or magnitude.
    #[error("charge {id} has a non-finite position or magnitude")]
    NonFiniteCharge { id: u32 },

    /// A requested parameter name was not found in the params object.
    #[error("parameter not found: {0}")]
    ParamNotFound(String),

    /// A parameter existed but had the wrong JSON type.
    #[error("parameter type mismatch for '{name}': expected {expected}, got {got}")]
    ParamTypeMismatch {
        name: String,
        expected: String,
        got: String,
    },

    /// No solver is registered under this name.
    #[error("unknown solver: {0}")]
    UnknownSolver(String),

    /// The solver cannot produce the requested kind of plot.
    #[error("solver '{solver}' does not support {plot} plots")]
    UnsupportedPlot { solver: String, plot: String },

    /// A scene description was structurally valid JSON but semantically wrong.
    #[error("invalid scene: {0}")]
    InvalidScene(String),

    /// Reading or writing an artifact failed.
    #[error("i/o error: {0}")]
    Io(String),
}
