use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("operation failed: {0}")]
    OperationFailed(String),

    /// Identity fields of a lane image are fixed at construction.
    #[error("attribute `{field}` cannot be changed")]
    ImmutableField { field: &'static str },
    #[error("scan cycle must contain at least one lane")]
    EmptyGroup,
    #[error("lane image belongs to another group")]
    ForeignGroup,
    #[error("frame dimensions do not line up: {0}")]
    DimensionMismatch(String),

    #[error("detection failed for {path}: {reason}")]
    Detection { path: String, reason: String },
    #[error("frame source error: {0}")]
    FrameSource(String),
    #[error("controller link error: {0}")]
    Link(String),
}

pub type DomainResult<T> = Result<T, DomainError>;
