use crate::solver::SolverError;
use thiserror::Error;

/// Every way building a selection model or fitting a selector can fail.
#[derive(Error, Debug)]
pub enum SelectionError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(
        "The solver could not be reached or rejected the credentials: {0}. Check the solver configuration before retrying."
    )]
    SolverUnavailable(String),

    #[error("The solver refused the model: {0}")]
    SolverRejected(String),

    #[error("No feasible solutions were found by the solver")]
    NoFeasibleSolution,

    #[error("The selector has not been fitted yet; call `fit` first")]
    NotFitted,

    #[error("The solver returned a malformed sample set: {0}")]
    MalformedSampleSet(String),

    #[error("Scratch storage for the correlation matrix failed: {0}")]
    Storage(#[from] std::io::Error),
}

impl SelectionError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

impl From<SolverError> for SelectionError {
    fn from(value: SolverError) -> Self {
        match value {
            SolverError::Unavailable(msg) => Self::SolverUnavailable(msg),
            SolverError::Authentication(msg) => {
                Self::SolverUnavailable(format!("authentication failed: {msg}"))
            }
            SolverError::Rejected(msg) => Self::SolverRejected(msg),
        }
    }
}
