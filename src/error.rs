//! Error taxonomy for the analysis core.
//!
//! Almost every operation here is total: malformed facts degrade instead of
//! failing and the resolver reports "unresolved" as a result, not an error.
//! What is left is a target that cannot be found and configuration that
//! cannot be compiled.

use thiserror::Error;

/// Category of an [`Error`], for callers that match on the kind rather than
/// on the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Config,
}

#[derive(Debug, Error)]
pub enum Error {
    /// Impact-analysis target is neither a tracked file nor a module.
    #[error("not found: {target}")]
    NotFound { target: String },

    /// A bridge endpoint or glob pattern in the project configuration is invalid.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    pub fn not_found(target: impl Into<String>) -> Self {
        Error::NotFound {
            target: target.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::Config(_) => ErrorKind::Config,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

pub type Result<T> = std::result::Result<T, Error>;
