use thiserror::Error;

/// Error types for the astrovoigt-rs library.
#[derive(Error, Debug)]
pub enum VoigtFitError {
    /// Missing or inconsistent user input: species fields, array lengths, non-positive b.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The fit is numerically degenerate (non-convergence, duplicated component).
    #[error("Numeric degeneracy: {0}")]
    NumericDegeneracy(String),

    /// A physical or construction assumption was broken inside the synthesis engine.
    #[error("Domain assumption violated: {0}")]
    DomainAssumption(String),

    /// Error indicating a mismatch in array or matrix dimensions.
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Error indicating the optimizer failed to converge.
    #[error("Algorithm failed to converge: {0}")]
    ConvergenceFailure(String),

    /// Error for parameter-related problems.
    #[error("Parameter error: {0}")]
    ParameterError(String),

    /// Parameter not found.
    #[error("Parameter not found: {0}")]
    ParameterNotFound(String),

    /// Linear algebra error.
    #[error("Linear algebra error: {0}")]
    LinearAlgebra(String),

    /// Invalid input data.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl VoigtFitError {
    /// Whether the model-order selector may treat this error as a normal stop
    /// rather than a failure of the whole run.
    pub fn is_numeric_stop(&self) -> bool {
        matches!(
            self,
            VoigtFitError::NumericDegeneracy(_)
                | VoigtFitError::ConvergenceFailure(_)
                | VoigtFitError::LinearAlgebra(_)
        )
    }
}

impl From<crate::parameters::parameter::ParameterError> for VoigtFitError {
    fn from(err: crate::parameters::parameter::ParameterError) -> Self {
        use crate::parameters::parameter::ParameterError;
        match err {
            ParameterError::ParameterNotFound { name } => VoigtFitError::ParameterNotFound(name),
            ParameterError::CircularDependency { .. } => VoigtFitError::Configuration(err.to_string()),
            other => VoigtFitError::ParameterError(other.to_string()),
        }
    }
}

impl From<crate::parameters::bounds::BoundsError> for VoigtFitError {
    fn from(err: crate::parameters::bounds::BoundsError) -> Self {
        VoigtFitError::ParameterError(err.to_string())
    }
}

/// Result type alias for astrovoigt-rs operations.
pub type Result<T> = std::result::Result<T, VoigtFitError>;
