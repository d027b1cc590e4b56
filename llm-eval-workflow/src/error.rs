use llm_eval_core::CoreError;
use thiserror::Error;

/// Failure confined to one item. Recorded as a failed result; the job goes on.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ItemError {
    /// The generation stream ended with an error outcome
    #[error("{0}")]
    Stream(String),

    /// A configured check could not be evaluated
    #[error("{0}")]
    Validator(String),
}

/// Failure outside the item boundary. Moves the job to `Failed` and stops it.
#[derive(Error, Debug)]
pub enum JobFatalError {
    #[error("{0}")]
    Configuration(String),

    #[error(transparent)]
    Persistence(#[from] CoreError),

    #[error("{0}")]
    InvalidState(String),
}

impl JobFatalError {
    pub fn is_persistence(&self) -> bool {
        matches!(self, JobFatalError::Persistence(_))
    }
}
