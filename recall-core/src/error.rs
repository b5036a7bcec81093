//! Error taxonomy for the scheduler core.
//!
//! Model-related conditions degrade rather than propagate: an uninitialized
//! model scores 0.5 and an empty training set is a no-op refit, so only
//! boundary validation and lookups surface here as hard errors.

use thiserror::Error;

pub type SchedulerResult<T> = Result<T, SchedulerError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchedulerError {
    /// Rejected at the boundary; task state is unchanged.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A training call reached a model that was never bootstrapped.
    #[error("priority model is not initialized")]
    UninitializedModel,

    #[error("task not found: {0}")]
    TaskNotFound(String),
}

impl SchedulerError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}
