use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PassgateError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Assertion refused. The cause is logged server-side and never carried here.
    #[error("Assertion rejected")]
    Rejected,
}

pub type Result<T> = std::result::Result<T, PassgateError>;
