//! Crate-wide error types.
//!
//! Subsystems return their own narrow error enum; [`Error`] is the
//! umbrella type call sites that cross subsystem boundaries use. This
//! mirrors the split the rest of the ecosystem uses between `thiserror`
//! for typed library errors and `anyhow` at the edges that talk to
//! caller code (executors, CLIs, servers).

use thiserror::Error;

/// The semantic error kinds this crate distinguishes. Not every
/// subsystem produces every kind; this is the union used for cross-cutting
/// matches (e.g. deciding whether a failure is fatal to the current step).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Expired,
    Corrupted,
    SystemError,
    InvalidInput,
    RateLimited,
    Network,
    DuplicateProviderId,
    SchemaValidation,
    ToolNotFound,
    ToolInvocation,
    FormNotPending,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Tool \"{0}\" not found")]
    ToolNotFound(String),

    #[error("Form {0} not found in pending forms")]
    FormNotPending(String),

    #[error("tool invocation failed: {0}")]
    ToolInvocation(#[source] anyhow::Error),

    #[error("schema validation failed: {0:?}")]
    SchemaValidation(Vec<crate::schema::SchemaIssue>),

    #[error("duplicate provider id: {0}")]
    DuplicateProviderId(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ToolNotFound(_) => ErrorKind::ToolNotFound,
            Error::FormNotPending(_) => ErrorKind::FormNotPending,
            Error::ToolInvocation(_) => ErrorKind::ToolInvocation,
            Error::SchemaValidation(_) => ErrorKind::SchemaValidation,
            Error::DuplicateProviderId(_) => ErrorKind::DuplicateProviderId,
            Error::InvalidInput(_) => ErrorKind::InvalidInput,
            Error::Other(_) => ErrorKind::SystemError,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
