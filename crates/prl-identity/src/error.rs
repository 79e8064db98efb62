use prl_canon::CanonicalizationError;
use thiserror::Error;

/// Errors produced when an anchor cannot be created or validated.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("{0} must be a non-empty string")]
    EmptyField(&'static str),

    #[error("invalid anchor id: {0}")]
    InvalidId(String),

    #[error("unsupported identity anchor version: {0}")]
    UnsupportedVersion(String),

    #[error("payload cannot be canonicalized: {0}")]
    Canonicalization(#[from] CanonicalizationError),
}
