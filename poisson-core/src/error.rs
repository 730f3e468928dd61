//! Error types for Poisson solver operations.

use thiserror::Error;

/// Result type alias using the crate Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while setting up, solving or exporting a problem.
#[derive(Error, Debug)]
pub enum Error {
    /// Mesh construction or topology errors.
    #[error("mesh error: {0}")]
    Mesh(String),

    /// Unsupported element or degenerate cell geometry.
    #[error("element error: {0}")]
    Element(String),

    /// Function space and dofmap errors.
    #[error("function space error: {0}")]
    FunctionSpace(String),

    /// Assembly errors.
    #[error("assembly error: {0}")]
    Assembly(String),

    /// Solver errors.
    #[error("solver error: {0}")]
    Solver(String),

    /// Matrix singularity or conditioning issues.
    #[error("singular matrix: {0}")]
    SingularMatrix(String),

    /// Iterative solver failed to reach the requested tolerance.
    #[error("solver did not converge after {iterations} iterations (residual {residual:e})")]
    NotConverged { iterations: usize, residual: f64 },

    /// Invalid problem configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Output file format errors.
    #[error("output error: {0}")]
    Output(String),

    /// The crate was built without a rendering backend.
    #[error("visualization is unavailable: {0}")]
    VisualizationUnavailable(String),

    /// I/O errors (file operations).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file parse errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
